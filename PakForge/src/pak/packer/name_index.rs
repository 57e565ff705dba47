//! Name index payload: virtual path to asset key lookup

use std::collections::HashSet;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use super::{ensure_size, to_u32};
use crate::error::{Error, Result};
use crate::model::AssetKey;
use crate::pak::format::{NAME_INDEX_MAGIC, NAME_INDEX_VERSION};

pub const NAME_INDEX_HEADER_SIZE: usize = 24;
pub const NAME_INDEX_ENTRY_SIZE: usize = 24;

/// One virtual path and the asset it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameIndexEntry {
    pub path: String,
    pub key: AssetKey,
}

/// Reject paths that cannot be looked up unambiguously.
///
/// A virtual path starts with `/`, has no empty, `.` or `..` segments and
/// no trailing slash.
pub fn validate_virtual_path(path: &str) -> Result<()> {
    let reject = |reason| {
        Err(Error::NameIndexPath {
            path: path.to_string(),
            reason,
        })
    };

    let Some(rest) = path.strip_prefix('/') else {
        return reject("must start with '/'");
    };
    if rest.is_empty() {
        return reject("empty name");
    }
    if rest.ends_with('/') {
        return reject("trailing slash");
    }
    for segment in rest.split('/') {
        match segment {
            "" => return reject("empty segment"),
            "." | ".." => return reject("relative segment"),
            _ => {}
        }
    }
    Ok(())
}

/// Encoded size of a name index holding `entries`.
#[must_use]
pub fn name_index_size(entries: &[NameIndexEntry]) -> usize {
    NAME_INDEX_HEADER_SIZE
        + entries.len() * NAME_INDEX_ENTRY_SIZE
        + entries.iter().map(|e| e.path.len()).sum::<usize>()
}

/// Pack the name index. Entries are emitted sorted by path bytes; invalid
/// or duplicate paths are rejected.
pub fn pack_name_index(entries: &[NameIndexEntry]) -> Result<Vec<u8>> {
    let mut sorted: Vec<&NameIndexEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));

    let mut seen = HashSet::with_capacity(sorted.len());
    for entry in &sorted {
        validate_virtual_path(&entry.path)?;
        if !seen.insert(entry.path.as_str()) {
            return Err(Error::NameIndexPath {
                path: entry.path.clone(),
                reason: "duplicate path",
            });
        }
    }

    let strings_size: usize = sorted.iter().map(|e| e.path.len()).sum();
    let mut buf = Vec::with_capacity(name_index_size(entries));
    buf.extend_from_slice(&NAME_INDEX_MAGIC);
    buf.write_u32::<LittleEndian>(NAME_INDEX_VERSION)?;
    buf.write_u32::<LittleEndian>(to_u32("name index entry count", sorted.len())?)?;
    buf.write_u32::<LittleEndian>(to_u32("name index string table size", strings_size)?)?;
    buf.write_u32::<LittleEndian>(0)?;

    let mut string_offset = 0usize;
    for entry in &sorted {
        buf.extend_from_slice(entry.key.as_bytes());
        buf.write_u32::<LittleEndian>(to_u32("name index string offset", string_offset)?)?;
        buf.write_u32::<LittleEndian>(to_u32("name index string length", entry.path.len())?)?;
        string_offset += entry.path.len();
    }
    for entry in &sorted {
        buf.extend_from_slice(entry.path.as_bytes());
    }

    ensure_size("name index", buf, name_index_size(entries))
}

/// Parse a name index payload.
///
/// Returns `None` when the payload is malformed; read-back reports that as
/// an issue instead of failing.
#[must_use]
pub fn parse_name_index(bytes: &[u8]) -> Option<Vec<NameIndexEntry>> {
    let mut cursor = Cursor::new(bytes);
    let mut magic = [0u8; 8];
    cursor.read_exact(&mut magic).ok()?;
    if magic != NAME_INDEX_MAGIC {
        return None;
    }
    if cursor.read_u32::<LittleEndian>().ok()? != NAME_INDEX_VERSION {
        return None;
    }
    let count = cursor.read_u32::<LittleEndian>().ok()? as usize;
    let strings_size = cursor.read_u32::<LittleEndian>().ok()? as usize;
    let _reserved = cursor.read_u32::<LittleEndian>().ok()?;

    let entries_size = count.checked_mul(NAME_INDEX_ENTRY_SIZE)?;
    let strings_start = NAME_INDEX_HEADER_SIZE.checked_add(entries_size)?;
    let strings = bytes.get(strings_start..strings_start.checked_add(strings_size)?)?;

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let mut key = [0u8; 16];
        cursor.read_exact(&mut key).ok()?;
        let offset = cursor.read_u32::<LittleEndian>().ok()? as usize;
        let len = cursor.read_u32::<LittleEndian>().ok()? as usize;
        let path = strings.get(offset..offset.checked_add(len)?)?;
        entries.push(NameIndexEntry {
            path: std::str::from_utf8(path).ok()?.to_string(),
            key: AssetKey(key),
        });
    }
    Some(entries)
}
