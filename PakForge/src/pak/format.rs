//! Pack file format constants and type tags
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! header (64)
//! texture region | texture table
//! buffer region  | buffer table
//! audio region   | audio table
//! material, geometry, scene descriptors (+ variable trailers)
//! directory (64 per asset)
//! name index (optional)
//! footer (256)
//! ```

use std::fmt;

use serde::Serialize;

/// Header magic.
pub const HEADER_MAGIC: [u8; 8] = *b"PAKFORGE";

/// Footer magic, the last eight bytes of every pack.
pub const FOOTER_MAGIC: [u8; 8] = *b"PFENDPAK";

/// Name index payload magic.
pub const NAME_INDEX_MAGIC: [u8; 8] = *b"PFNAMEIX";

/// The only format version this crate emits.
pub const FORMAT_VERSION: u16 = 1;

/// Name index payload version.
pub const NAME_INDEX_VERSION: u32 = 1;

/// Alignment of every raw resource blob (and therefore of each region).
pub const DATA_ALIGNMENT: u64 = 256;

/// Alignment of descriptor tables, the directory and the name index.
pub const TABLE_ALIGNMENT: u64 = 16;

/// Marker for an absent texture or buffer reference.
pub const NO_RESOURCE_INDEX: u32 = u32::MAX;

/// Raw resource kinds, in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Texture,
    Buffer,
    Audio,
}

impl ResourceType {
    /// Layout order of resource regions and tables.
    pub const ALL: [ResourceType; 3] = [
        ResourceType::Texture,
        ResourceType::Buffer,
        ResourceType::Audio,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Texture => "texture",
            Self::Buffer => "buffer",
            Self::Audio => "audio",
        }
    }

    /// Slot of this type in the footer's region/table arrays
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Texture => 0,
            Self::Buffer => 1,
            Self::Audio => 2,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset kinds as stored in directory entries and asset headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AssetType {
    Material = 1,
    Geometry = 2,
    Scene = 3,
}

impl AssetType {
    /// Layout order of asset descriptors.
    pub const ALL: [AssetType; 3] = [AssetType::Material, AssetType::Geometry, AssetType::Scene];

    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Material),
            2 => Some(Self::Geometry),
            3 => Some(Self::Scene),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::Geometry => "geometry",
            Self::Scene => "scene",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed component tables stored in a scene trailer, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Renderable,
    PerspectiveCamera,
    OrthographicCamera,
}

impl ComponentType {
    pub const ALL: [ComponentType; 3] = [
        ComponentType::Renderable,
        ComponentType::PerspectiveCamera,
        ComponentType::OrthographicCamera,
    ];

    /// Four-character tag stored as a little-endian u32.
    #[must_use]
    pub fn fourcc(self) -> u32 {
        let tag = match self {
            Self::Renderable => b"REND",
            Self::PerspectiveCamera => b"PCAM",
            Self::OrthographicCamera => b"OCAM",
        };
        u32::from_le_bytes(*tag)
    }
}

/// Mesh descriptor variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MeshType {
    Standard = 1,
    Procedural = 2,
}

/// Round `value` up to the next multiple of `alignment` (0 and 1 are no-ops).
#[must_use]
pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 16), 272);
        assert_eq!(align_up(13, 1), 13);
        assert_eq!(align_up(13, 0), 13);
        assert_eq!(align_up(10, 12), 12);
    }

    #[test]
    fn test_asset_type_tags() {
        for ty in AssetType::ALL {
            assert_eq!(AssetType::from_u8(ty as u8), Some(ty));
        }
        assert_eq!(AssetType::from_u8(0), None);
        assert_eq!(AssetType::from_u8(9), None);
    }

    #[test]
    fn test_component_fourcc() {
        assert_eq!(ComponentType::Renderable.fourcc().to_le_bytes(), *b"REND");
        assert_eq!(ComponentType::OrthographicCamera.fourcc().to_le_bytes(), *b"OCAM");
    }
}
