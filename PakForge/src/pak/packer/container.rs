//! Header, footer and directory entry records

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use super::{ensure_size, put_zeros};
use crate::error::{Error, Result};
use crate::model::AssetKey;
use crate::pak::format::{FOOTER_MAGIC, FORMAT_VERSION, HEADER_MAGIC};

pub const HEADER_SIZE: usize = 64;
pub const FOOTER_SIZE: usize = 256;
pub const DIRECTORY_ENTRY_SIZE: usize = 64;

/// Offset of the checksum field inside the footer.
pub const FOOTER_CHECKSUM_OFFSET: usize = 244;

const HEADER_RESERVED: usize = 36;
const FOOTER_RESERVED: usize = 108;
const DIRECTORY_ENTRY_RESERVED: usize = 27;

/// Fields of the 64-byte file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderRecord {
    pub format_version: u16,
    pub content_version: u16,
    pub guid: [u8; 16],
}

impl HeaderRecord {
    /// Header for the current format version
    #[must_use]
    pub fn new(content_version: u16, guid: [u8; 16]) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            content_version,
            guid,
        }
    }

    /// Parse a header, rejecting a wrong magic.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::TruncatedPak {
                size: bytes.len() as u64,
            });
        }
        let mut cursor = Cursor::new(bytes);
        let mut magic = [0u8; 8];
        cursor.read_exact(&mut magic)?;
        if magic != HEADER_MAGIC {
            return Err(Error::InvalidPakMagic);
        }
        let format_version = cursor.read_u16::<LittleEndian>()?;
        let content_version = cursor.read_u16::<LittleEndian>()?;
        let mut guid = [0u8; 16];
        cursor.read_exact(&mut guid)?;
        Ok(Self {
            format_version,
            content_version,
            guid,
        })
    }
}

/// Offset and size of a contiguous span (region, directory, name index).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionRecord {
    pub offset: u64,
    pub size: u64,
}

impl RegionRecord {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offset == 0 && self.size == 0
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// Location of a fixed-entry descriptor table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableRecord {
    pub offset: u64,
    pub count: u32,
    pub entry_size: u32,
}

impl TableRecord {
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.count) * u64::from(self.entry_size)
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size())
    }
}

/// Fields of the 256-byte footer. Regions and tables are indexed by
/// [`ResourceType::index`](crate::pak::format::ResourceType::index).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FooterRecord {
    pub directory: RegionRecord,
    pub asset_count: u64,
    pub regions: [RegionRecord; 3],
    pub tables: [TableRecord; 3],
    pub name_index: RegionRecord,
    pub checksum: u32,
}

impl FooterRecord {
    /// Parse a footer, rejecting a wrong trailing magic.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FOOTER_SIZE {
            return Err(Error::TruncatedPak {
                size: bytes.len() as u64,
            });
        }
        if bytes[FOOTER_SIZE - 8..FOOTER_SIZE] != FOOTER_MAGIC {
            return Err(Error::InvalidFooterMagic);
        }

        let mut cursor = Cursor::new(bytes);
        let directory = read_region(&mut cursor)?;
        let asset_count = cursor.read_u64::<LittleEndian>()?;

        let mut regions = [RegionRecord::default(); 3];
        for region in &mut regions {
            *region = read_region(&mut cursor)?;
        }

        let mut tables = [TableRecord::default(); 3];
        for table in &mut tables {
            *table = TableRecord {
                offset: cursor.read_u64::<LittleEndian>()?,
                count: cursor.read_u32::<LittleEndian>()?,
                entry_size: cursor.read_u32::<LittleEndian>()?,
            };
        }

        let name_index = read_region(&mut cursor)?;
        cursor.set_position(FOOTER_CHECKSUM_OFFSET as u64);
        let checksum = cursor.read_u32::<LittleEndian>()?;

        Ok(Self {
            directory,
            asset_count,
            regions,
            tables,
            name_index,
            checksum,
        })
    }
}

fn read_region(cursor: &mut Cursor<&[u8]>) -> Result<RegionRecord> {
    Ok(RegionRecord {
        offset: cursor.read_u64::<LittleEndian>()?,
        size: cursor.read_u64::<LittleEndian>()?,
    })
}

/// One 64-byte directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirectoryEntryRecord {
    pub key: AssetKey,
    /// Raw asset type tag; unknown tags are kept for validation to report.
    pub asset_type: u8,
    /// Absolute offset of this entry.
    pub entry_offset: u64,
    pub descriptor_offset: u64,
    /// Fixed descriptor plus trailer.
    pub descriptor_size: u32,
}

impl DirectoryEntryRecord {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DIRECTORY_ENTRY_SIZE {
            return Err(Error::TruncatedPak {
                size: bytes.len() as u64,
            });
        }
        let mut cursor = Cursor::new(bytes);
        let mut key = [0u8; 16];
        cursor.read_exact(&mut key)?;
        Ok(Self {
            key: AssetKey(key),
            asset_type: cursor.read_u8()?,
            entry_offset: cursor.read_u64::<LittleEndian>()?,
            descriptor_offset: cursor.read_u64::<LittleEndian>()?,
            descriptor_size: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// Pack the file header.
pub fn pack_header(header: &HeaderRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_SIZE);
    buf.extend_from_slice(&HEADER_MAGIC);
    buf.write_u16::<LittleEndian>(header.format_version)?;
    buf.write_u16::<LittleEndian>(header.content_version)?;
    buf.extend_from_slice(&header.guid);
    put_zeros(&mut buf, HEADER_RESERVED);
    ensure_size("header", buf, HEADER_SIZE)
}

/// Pack the footer, including its checksum field as given.
pub fn pack_footer(footer: &FooterRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(FOOTER_SIZE);
    buf.write_u64::<LittleEndian>(footer.directory.offset)?;
    buf.write_u64::<LittleEndian>(footer.directory.size)?;
    buf.write_u64::<LittleEndian>(footer.asset_count)?;
    for region in &footer.regions {
        buf.write_u64::<LittleEndian>(region.offset)?;
        buf.write_u64::<LittleEndian>(region.size)?;
    }
    for table in &footer.tables {
        buf.write_u64::<LittleEndian>(table.offset)?;
        buf.write_u32::<LittleEndian>(table.count)?;
        buf.write_u32::<LittleEndian>(table.entry_size)?;
    }
    buf.write_u64::<LittleEndian>(footer.name_index.offset)?;
    buf.write_u64::<LittleEndian>(footer.name_index.size)?;
    put_zeros(&mut buf, FOOTER_RESERVED);
    debug_assert_eq!(buf.len(), FOOTER_CHECKSUM_OFFSET);
    buf.write_u32::<LittleEndian>(footer.checksum)?;
    buf.extend_from_slice(&FOOTER_MAGIC);
    ensure_size("footer", buf, FOOTER_SIZE)
}

/// Pack one directory entry.
pub fn pack_directory_entry(entry: &DirectoryEntryRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(DIRECTORY_ENTRY_SIZE);
    buf.extend_from_slice(entry.key.as_bytes());
    buf.write_u8(entry.asset_type)?;
    buf.write_u64::<LittleEndian>(entry.entry_offset)?;
    buf.write_u64::<LittleEndian>(entry.descriptor_offset)?;
    buf.write_u32::<LittleEndian>(entry.descriptor_size)?;
    put_zeros(&mut buf, DIRECTORY_ENTRY_RESERVED);
    ensure_size("directory entry", buf, DIRECTORY_ENTRY_SIZE)
}
