//! Whole-file CRC-32 that skips the footer's own checksum field

use std::io::{self, Read, Seek, SeekFrom};

use super::packer::{FOOTER_CHECKSUM_OFFSET, FOOTER_SIZE};

const CHUNK_SIZE: usize = 64 * 1024;

/// Absolute offset of the checksum field in a file of `file_size` bytes.
///
/// `None` when the file cannot hold a footer.
#[must_use]
pub fn checksum_field_offset(file_size: u64) -> Option<u64> {
    file_size
        .checked_sub(FOOTER_SIZE as u64)
        .map(|footer| footer + FOOTER_CHECKSUM_OFFSET as u64)
}

/// Checksum of an in-memory pack image.
#[must_use]
pub fn checksum_bytes(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    match checksum_field_offset(bytes.len() as u64) {
        Some(field) => {
            let field = field as usize;
            hasher.update(&bytes[..field]);
            hasher.update(&bytes[field + 4..]);
        }
        None => hasher.update(bytes),
    }
    hasher.finalize()
}

/// Checksum of a pack file read from `reader`, whose total length is
/// `file_size`. Leaves the reader positioned at the end.
pub fn checksum_reader<R: Read + Seek>(reader: &mut R, file_size: u64) -> io::Result<u32> {
    let skip = checksum_field_offset(file_size);
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut position = 0u64;

    reader.seek(SeekFrom::Start(0))?;
    while position < file_size {
        let want = (file_size - position).min(CHUNK_SIZE as u64) as usize;
        reader.read_exact(&mut buf[..want])?;
        let chunk = &buf[..want];

        match skip {
            Some(field) if field + 4 > position && field < position + want as u64 => {
                // Hash around the part of the field that falls in this chunk
                let start = field.saturating_sub(position) as usize;
                let end = ((field + 4 - position) as usize).min(want);
                hasher.update(&chunk[..start]);
                hasher.update(&chunk[end..]);
            }
            _ => hasher.update(chunk),
        }
        position += want as u64;
    }

    Ok(hasher.finalize())
}
