//! Pack read-back
//!
//! [`inspect`] parses a finished pack into [`PakInfo`] without judging it:
//! a bad checksum or an inconsistent directory is recorded, not raised.
//! [`validate`] then turns the structured info into human-readable issues.

use std::path::Path;

use serde::Serialize;

use super::checksum::checksum_bytes;
use super::format::{
    AssetType, DATA_ALIGNMENT, FORMAT_VERSION, MeshType, ResourceType, TABLE_ALIGNMENT,
};
use super::packer::{
    ASSET_HEADER_SIZE, COMPONENT_DIRECTORY_ENTRY_SIZE, DIRECTORY_ENTRY_SIZE, DirectoryEntryRecord,
    FOOTER_SIZE, FooterRecord, HEADER_SIZE, HeaderRecord, MESH_VIEW_SIZE, NAME_SIZE,
    NameIndexEntry, PROCEDURAL_MESH_DESCRIPTOR_SIZE, RegionRecord, SHADER_REFERENCE_SIZE,
    STANDARD_MESH_DESCRIPTOR_SIZE, SUBMESH_DESCRIPTOR_SIZE, asset_descriptor_size, decode_name,
    parse_name_index, resource_descriptor_size,
};
use crate::error::{Error, Result};
use crate::model::AssetKey;

/// One directory entry plus what its descriptor says about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetEntryInfo {
    #[serde(flatten)]
    pub entry: DirectoryEntryRecord,
    /// Name from the asset header, when the descriptor is readable.
    pub name: Option<String>,
    /// Size implied by the descriptor's own counts and offsets.
    pub measured_size: Option<u64>,
}

impl AssetEntryInfo {
    #[must_use]
    pub fn asset_type(&self) -> Option<AssetType> {
        AssetType::from_u8(self.entry.asset_type)
    }
}

/// Everything read back from a pack file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PakInfo {
    pub file_size: u64,
    pub header: HeaderRecord,
    pub footer: FooterRecord,
    /// Empty when the directory span is not self-consistent.
    pub entries: Vec<AssetEntryInfo>,
    pub directory_parsed: bool,
    /// `None` when absent or malformed.
    pub name_index: Option<Vec<NameIndexEntry>>,
    pub computed_checksum: u32,
    pub checksum_matches: bool,
}

impl PakInfo {
    /// Offset of the footer, always `file_size - FOOTER_SIZE`.
    #[must_use]
    pub fn footer_offset(&self) -> u64 {
        self.file_size - FOOTER_SIZE as u64
    }

    /// Key of the asset published under a virtual path.
    #[must_use]
    pub fn lookup_path(&self, path: &str) -> Option<AssetKey> {
        self.name_index
            .as_ref()?
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.key)
    }

    /// Directory entry for an asset key.
    #[must_use]
    pub fn find_entry(&self, key: &AssetKey) -> Option<&AssetEntryInfo> {
        self.entries.iter().find(|e| e.entry.key == *key)
    }
}

/// Read and parse a pack file.
pub fn inspect(path: impl AsRef<Path>) -> Result<PakInfo> {
    let path = path.as_ref();
    tracing::debug!("Inspecting {}", path.display());
    let bytes = std::fs::read(path)?;
    inspect_bytes(&bytes)
}

/// Parse an in-memory pack image.
///
/// Fails only when the header or footer cannot be read at all.
pub fn inspect_bytes(bytes: &[u8]) -> Result<PakInfo> {
    let file_size = bytes.len() as u64;
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(Error::TruncatedPak { size: file_size });
    }

    let header = HeaderRecord::parse(&bytes[..HEADER_SIZE])?;
    let footer_offset = bytes.len() - FOOTER_SIZE;
    let footer = FooterRecord::parse(&bytes[footer_offset..])?;

    let (entries, directory_parsed) = match read_directory(bytes, &footer) {
        Some(entries) => (entries, true),
        None => (Vec::new(), false),
    };

    let name_index = if footer.name_index.is_empty() {
        None
    } else {
        span(bytes, footer.name_index.offset, footer.name_index.size).and_then(parse_name_index)
    };

    let computed_checksum = checksum_bytes(bytes);

    Ok(PakInfo {
        file_size,
        header,
        footer,
        entries,
        directory_parsed,
        name_index,
        computed_checksum,
        checksum_matches: computed_checksum == footer.checksum,
    })
}

fn span(bytes: &[u8], offset: u64, size: u64) -> Option<&[u8]> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(usize::try_from(size).ok()?)?;
    bytes.get(start..end)
}

fn read_directory(bytes: &[u8], footer: &FooterRecord) -> Option<Vec<AssetEntryInfo>> {
    let directory = footer.directory;
    if directory.size != footer.asset_count.checked_mul(DIRECTORY_ENTRY_SIZE as u64)? {
        return None;
    }
    let raw = span(bytes, directory.offset, directory.size)?;

    raw.chunks_exact(DIRECTORY_ENTRY_SIZE)
        .map(|chunk| {
            let entry = DirectoryEntryRecord::parse(chunk).ok()?;
            Some(AssetEntryInfo {
                name: read_asset_name(bytes, &entry),
                measured_size: AssetType::from_u8(entry.asset_type)
                    .and_then(|ty| measure_descriptor(bytes, entry.descriptor_offset, ty)),
                entry,
            })
        })
        .collect()
}

fn read_asset_name(bytes: &[u8], entry: &DirectoryEntryRecord) -> Option<String> {
    let header = span(bytes, entry.descriptor_offset, ASSET_HEADER_SIZE as u64)?;
    Some(decode_name(&header[1..1 + NAME_SIZE]))
}

fn read_u8(bytes: &[u8], at: u64) -> Option<u8> {
    span(bytes, at, 1).map(|b| b[0])
}

fn read_u32(bytes: &[u8], at: u64) -> Option<u32> {
    span(bytes, at, 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Size of an asset descriptor plus trailer, derived from its own fields.
fn measure_descriptor(bytes: &[u8], offset: u64, asset_type: AssetType) -> Option<u64> {
    let fixed = asset_descriptor_size(asset_type) as u64;
    span(bytes, offset, fixed)?;

    match asset_type {
        AssetType::Material => {
            let stages = read_u32(bytes, offset + 100)?;
            Some(fixed + u64::from(stages.count_ones()) * SHADER_REFERENCE_SIZE as u64)
        }
        AssetType::Geometry => {
            let lod_count = read_u32(bytes, offset + 95)?;
            let mut cursor = offset + fixed;
            for _ in 0..lod_count {
                let mesh_type = read_u8(bytes, cursor + 64)?;
                let submeshes = read_u32(bytes, cursor + 65)?;
                cursor += if mesh_type == MeshType::Standard as u8 {
                    STANDARD_MESH_DESCRIPTOR_SIZE as u64
                } else if mesh_type == MeshType::Procedural as u8 {
                    let params = read_u32(bytes, cursor + 73)?;
                    PROCEDURAL_MESH_DESCRIPTOR_SIZE as u64 + u64::from(params)
                } else {
                    return None;
                };
                for _ in 0..submeshes {
                    let views = read_u32(bytes, cursor + 80)?;
                    cursor +=
                        SUBMESH_DESCRIPTOR_SIZE as u64 + u64::from(views) * MESH_VIEW_SIZE as u64;
                    // Stop walking once the chain runs off the end of the file
                    span(bytes, cursor, 0)?;
                }
            }
            Some(cursor - offset)
        }
        AssetType::Scene => {
            let field = |at: u64| read_u32(bytes, offset + at).map(u64::from);
            let nodes_end = field(95)? + field(99)? * field(103)?;
            let strings_end = field(107)? + field(111)?;
            let directory_offset = field(115)?;
            let table_count = field(119)?;

            let mut end = fixed.max(nodes_end).max(strings_end);
            if table_count > 0 {
                let directory_end =
                    directory_offset + table_count * COMPONENT_DIRECTORY_ENTRY_SIZE as u64;
                end = end.max(directory_end);
                for table in 0..table_count {
                    let at = directory_offset + table * COMPONENT_DIRECTORY_ENTRY_SIZE as u64;
                    let records = field(at + 4)?;
                    let count = field(at + 8)?;
                    let entry_size = field(at + 12)?;
                    end = end.max(records + count * entry_size);
                }
            }
            Some(end)
        }
    }
}

/// Check a parsed pack for structural problems.
///
/// Returns one message per problem; an empty list means the pack passed.
#[must_use]
pub fn validate(info: &PakInfo) -> Vec<String> {
    let mut issues = Vec::new();
    let footer_offset = info.footer_offset();
    let data_start = HEADER_SIZE as u64;

    if info.header.format_version != FORMAT_VERSION {
        issues.push(format!(
            "unsupported format version {} (expected {FORMAT_VERSION})",
            info.header.format_version
        ));
    }
    if info.header.guid == [0; 16] {
        issues.push("build GUID is zero".to_string());
    }

    let check_span = |label: &str, record: RegionRecord, alignment: u64, issues: &mut Vec<String>| {
        if record.is_empty() {
            return;
        }
        if record.offset < data_start || record.end() > footer_offset {
            issues.push(format!(
                "{label} [{}, {}) lies outside the file body [{data_start}, {footer_offset})",
                record.offset,
                record.end()
            ));
        }
        if record.offset % alignment != 0 {
            issues.push(format!(
                "{label} offset {} is not {alignment}-byte aligned",
                record.offset
            ));
        }
    };

    for resource_type in ResourceType::ALL {
        let region = info.footer.regions[resource_type.index()];
        check_span(&format!("{resource_type} region"), region, DATA_ALIGNMENT, &mut issues);

        let table = info.footer.tables[resource_type.index()];
        if table.count > 0 {
            let expected = resource_descriptor_size(resource_type) as u32;
            if table.entry_size != expected {
                issues.push(format!(
                    "{resource_type} table entry size {} (expected {expected})",
                    table.entry_size
                ));
            }
            let record = RegionRecord {
                offset: table.offset,
                size: table.size(),
            };
            check_span(&format!("{resource_type} table"), record, TABLE_ALIGNMENT, &mut issues);
        }
    }

    let directory = info.footer.directory;
    check_span("directory", directory, TABLE_ALIGNMENT, &mut issues);
    match info.footer.asset_count.checked_mul(DIRECTORY_ENTRY_SIZE as u64) {
        Some(expected) if expected == directory.size => {}
        Some(_) => issues.push(format!(
            "directory size {} does not hold {} entries",
            directory.size, info.footer.asset_count
        )),
        None => issues.push(format!(
            "asset count {} overflows the directory size",
            info.footer.asset_count
        )),
    }
    if !info.directory_parsed {
        issues.push("directory could not be parsed".to_string());
    }

    for (i, asset) in info.entries.iter().enumerate() {
        let entry = &asset.entry;
        let label = format!("asset {} ({})", entry.key, asset.name.as_deref().unwrap_or("?"));

        let expected_offset = directory.offset + (i * DIRECTORY_ENTRY_SIZE) as u64;
        if entry.entry_offset != expected_offset {
            issues.push(format!(
                "{label}: entry offset {} (expected {expected_offset})",
                entry.entry_offset
            ));
        }

        let Some(asset_type) = asset.asset_type() else {
            issues.push(format!("{label}: unknown asset type {}", entry.asset_type));
            continue;
        };

        let size = u64::from(entry.descriptor_size);
        let end = entry.descriptor_offset.saturating_add(size);
        if entry.descriptor_offset < data_start || end > footer_offset {
            issues.push(format!(
                "{label}: descriptor [{}, {end}) lies outside the file body",
                entry.descriptor_offset
            ));
        }
        let fixed = asset_descriptor_size(asset_type) as u64;
        if size < fixed {
            issues.push(format!(
                "{label}: descriptor size {size} is below the {fixed}-byte {asset_type} minimum"
            ));
        }
        match asset.measured_size {
            Some(measured) if measured != size => issues.push(format!(
                "{label}: descriptor size {size} does not match encoded size {measured}"
            )),
            None => issues.push(format!("{label}: descriptor could not be measured")),
            _ => {}
        }
    }

    let name_index = info.footer.name_index;
    if !name_index.is_empty() {
        check_span("name index", name_index, TABLE_ALIGNMENT, &mut issues);
        match &info.name_index {
            None => issues.push("name index is malformed".to_string()),
            Some(entries) => {
                if entries.len() as u64 != info.footer.asset_count {
                    issues.push(format!(
                        "name index has {} entries for {} assets",
                        entries.len(),
                        info.footer.asset_count
                    ));
                }
                for entry in entries {
                    if info.directory_parsed && info.find_entry(&entry.key).is_none() {
                        issues.push(format!(
                            "name index path {} names unknown key {}",
                            entry.path, entry.key
                        ));
                    }
                }
            }
        }
    }

    if !info.checksum_matches {
        issues.push(format!(
            "checksum mismatch: stored {:#010x}, computed {:#010x}",
            info.footer.checksum, info.computed_checksum
        ));
    }

    issues
}
