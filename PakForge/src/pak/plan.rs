//! Immutable layout plan produced by the planner and consumed by the writer

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::format::{AssetType, ResourceType};
use super::packer::{FOOTER_SIZE, NameIndexEntry, RegionRecord, TableRecord};
use crate::model::AssetKey;

/// Sections that can absorb alignment padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    TextureRegion,
    TextureTable,
    BufferRegion,
    BufferTable,
    AudioRegion,
    AudioTable,
    Assets,
    Directory,
    NameIndex,
}

impl Section {
    #[must_use]
    pub fn region(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Texture => Self::TextureRegion,
            ResourceType::Buffer => Self::BufferRegion,
            ResourceType::Audio => Self::AudioRegion,
        }
    }

    #[must_use]
    pub fn table(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Texture => Self::TextureTable,
            ResourceType::Buffer => Self::BufferTable,
            ResourceType::Audio => Self::AudioTable,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextureRegion => "texture region",
            Self::TextureTable => "texture table",
            Self::BufferRegion => "buffer region",
            Self::BufferTable => "buffer table",
            Self::AudioRegion => "audio region",
            Self::AudioTable => "audio table",
            Self::Assets => "assets",
            Self::Directory => "directory",
            Self::NameIndex => "name index",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw payload region of one resource type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionPlan {
    pub offset: u64,
    /// From the first blob to the end of the last blob.
    pub size: u64,
    pub alignment: u64,
    /// Zero bytes between the previous section and the region.
    pub padding_before: u64,
    /// Zero bytes between blobs inside the region.
    pub padding_internal: u64,
}

impl RegionPlan {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.offset == 0 && self.size == 0
    }

    #[must_use]
    pub fn record(&self) -> RegionRecord {
        RegionRecord {
            offset: self.offset,
            size: self.size,
        }
    }
}

/// Descriptor table of one resource type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TablePlan {
    pub offset: u64,
    pub count: u32,
    pub entry_size: u32,
    pub alignment: u64,
    pub padding_before: u64,
}

impl TablePlan {
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.count) * u64::from(self.entry_size)
    }

    #[must_use]
    pub fn record(&self) -> TableRecord {
        TableRecord {
            offset: self.offset,
            count: self.count,
            entry_size: self.entry_size,
        }
    }
}

/// Placement of one resource blob, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceEntryPlan {
    pub name: String,
    /// Position of the resource in the model's list.
    pub source_index: usize,
    pub data_offset: u64,
    pub size: u64,
}

/// Region, table and entry order for one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcePlan {
    pub resource_type: ResourceType,
    pub region: RegionPlan,
    pub table: TablePlan,
    pub entries: Vec<ResourceEntryPlan>,
}

impl ResourcePlan {
    /// Table index of the named resource.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .position(|e| e.name == name)
            .and_then(|i| u32::try_from(i).ok())
    }
}

/// Placement of one asset descriptor and its trailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetPlan {
    pub asset_type: AssetType,
    pub key: AssetKey,
    pub name: String,
    /// Position of the asset in the model's list.
    pub source_index: usize,
    pub descriptor_offset: u64,
    /// Fixed descriptor width.
    pub descriptor_size: u64,
    pub alignment: u64,
    pub trailer_size: u64,
    pub padding_before: u64,
}

impl AssetPlan {
    /// Descriptor plus trailer.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.descriptor_size + self.trailer_size
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.descriptor_offset + self.total_size()
    }

    /// Path under which the name index publishes this asset.
    #[must_use]
    pub fn virtual_path(&self) -> String {
        format!("/{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryPlan {
    pub offset: u64,
    pub size: u64,
    pub asset_count: u64,
    pub padding_before: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameIndexPlan {
    pub offset: u64,
    pub size: u64,
    pub padding_before: u64,
    /// Entries sorted by path, exactly as they are encoded.
    pub entries: Vec<NameIndexEntry>,
}

impl NameIndexPlan {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.offset == 0 && self.size == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FooterPlan {
    pub offset: u64,
    pub size: u64,
}

impl Default for FooterPlan {
    fn default() -> Self {
        Self {
            offset: 0,
            size: FOOTER_SIZE as u64,
        }
    }
}

/// Alignment padding per section and in total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaddingStats {
    pub total: u64,
    pub by_section: BTreeMap<Section, u64>,
}

impl PaddingStats {
    pub(crate) fn add(&mut self, section: Section, bytes: u64) {
        if bytes == 0 {
            return;
        }
        *self.by_section.entry(section).or_default() += bytes;
        self.total += bytes;
    }

    /// Padding attributed to one section.
    #[must_use]
    pub fn section(&self, section: Section) -> u64 {
        self.by_section.get(&section).copied().unwrap_or(0)
    }
}

/// The complete layout of one pack file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PakPlan {
    pub header_size: u64,
    /// Indexed by [`ResourceType::index`].
    pub resources: [ResourcePlan; 3],
    /// Emission order: materials, then geometries, then scenes.
    pub assets: Vec<AssetPlan>,
    pub directory: DirectoryPlan,
    pub name_index: NameIndexPlan,
    pub footer: FooterPlan,
    pub padding: PaddingStats,
    pub file_size: u64,
    pub deterministic: bool,
}

impl PakPlan {
    #[must_use]
    pub fn resource(&self, resource_type: ResourceType) -> &ResourcePlan {
        &self.resources[resource_type.index()]
    }

    /// Assets of one type, in emission order.
    pub fn assets_of(&self, asset_type: AssetType) -> impl Iterator<Item = &AssetPlan> {
        self.assets.iter().filter(move |a| a.asset_type == asset_type)
    }

    /// Key of the named asset of the given type.
    #[must_use]
    pub fn asset_key(&self, name: &str, asset_type: AssetType) -> Option<AssetKey> {
        self.assets_of(asset_type).find(|a| a.name == name).map(|a| a.key)
    }
}
