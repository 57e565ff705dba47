//! Descriptor packer
//!
//! Pure encoders that turn one logical record into its exact on-disk bytes.
//! Every structure width lives here; the planner and writer ask these modules
//! for sizes instead of re-deriving them.

mod container;
mod geometry;
mod material;
mod name_index;
mod resources;
mod scene;

pub use container::{
    DIRECTORY_ENTRY_SIZE, DirectoryEntryRecord, FOOTER_CHECKSUM_OFFSET, FOOTER_SIZE, FooterRecord,
    HEADER_SIZE, HeaderRecord, RegionRecord, TableRecord, pack_directory_entry, pack_footer,
    pack_header,
};
pub use geometry::{
    GEOMETRY_DESCRIPTOR_SIZE, MESH_VIEW_SIZE, PROCEDURAL_MESH_DESCRIPTOR_SIZE,
    STANDARD_MESH_DESCRIPTOR_SIZE, SUBMESH_DESCRIPTOR_SIZE, geometry_trailer_size,
    mesh_descriptor_size, pack_geometry,
};
pub use material::{
    MATERIAL_DESCRIPTOR_SIZE, SHADER_REFERENCE_SIZE, material_trailer_size, pack_material,
    pack_shader_reference,
};
pub use name_index::{
    NAME_INDEX_ENTRY_SIZE, NAME_INDEX_HEADER_SIZE, NameIndexEntry, name_index_size,
    pack_name_index, parse_name_index, validate_virtual_path,
};
pub use resources::{
    AUDIO_DESCRIPTOR_SIZE, BUFFER_DESCRIPTOR_SIZE, TEXTURE_DESCRIPTOR_SIZE,
    pack_audio_descriptor, pack_buffer_descriptor, pack_texture_descriptor,
    resource_descriptor_size,
};
pub use scene::{
    CAMERA_RECORD_SIZE, COMPONENT_DIRECTORY_ENTRY_SIZE, NODE_RECORD_SIZE,
    RENDERABLE_RECORD_SIZE, SCENE_DESCRIPTOR_SIZE, pack_scene, scene_string_table_size,
    scene_trailer_size,
};

use byteorder::{LittleEndian, WriteBytesExt};
use glam::Vec3;

use crate::error::{Error, Result};
use crate::model::{Asset, AssetKey, AssetKind};
use crate::pak::format::AssetType;

/// Width of fixed name fields (asset, mesh, submesh names).
pub const NAME_SIZE: usize = 64;

/// Width of the common asset header at the start of every asset descriptor.
pub const ASSET_HEADER_SIZE: usize = 95;

/// Resolves names referenced by assets into on-disk indices and keys.
///
/// The writer implements this against the plan, so indices follow the final
/// (possibly name-sorted) table order.
pub trait ReferenceResolver {
    /// Index of a texture in the texture table.
    fn texture_index(&self, name: &str) -> Option<u32>;

    /// Index of a buffer in the buffer table.
    fn buffer_index(&self, name: &str) -> Option<u32>;

    /// Key of an asset with the given name and type.
    fn asset_key(&self, name: &str, asset_type: AssetType) -> Option<AssetKey>;
}

/// Fixed descriptor width for an asset type.
#[must_use]
pub fn asset_descriptor_size(asset_type: AssetType) -> usize {
    match asset_type {
        AssetType::Material => MATERIAL_DESCRIPTOR_SIZE,
        AssetType::Geometry => GEOMETRY_DESCRIPTOR_SIZE,
        AssetType::Scene => SCENE_DESCRIPTOR_SIZE,
    }
}

/// Size of the variable trailer that follows an asset's fixed descriptor.
#[must_use]
pub fn asset_trailer_size(kind: &AssetKind) -> usize {
    match kind {
        AssetKind::Material(material) => material_trailer_size(material),
        AssetKind::Geometry(geometry) => geometry_trailer_size(geometry),
        AssetKind::Scene(scene) => scene_trailer_size(scene),
    }
}

/// Pack an asset's fixed descriptor and trailer.
pub fn pack_asset(asset: &Asset, resolver: &dyn ReferenceResolver) -> Result<Vec<u8>> {
    match &asset.kind {
        AssetKind::Material(material) => pack_material(asset, material, resolver),
        AssetKind::Geometry(geometry) => pack_geometry(asset, geometry, resolver),
        AssetKind::Scene(scene) => pack_scene(asset, scene, resolver),
    }
}

/// Quantize a `[0, 1]` scalar to an unsigned 16-bit normalized integer.
#[must_use]
pub fn quantize_unorm16(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * 65535.0).round() as u16
}

/// Inverse of [`quantize_unorm16`]; exact only up to quantization error.
#[must_use]
pub fn dequantize_unorm16(value: u16) -> f32 {
    f32::from(value) / 65535.0
}

/// Encode a name into a fixed-width, NUL-padded UTF-8 field.
///
/// The name is truncated on a character boundary so that at least one NUL
/// terminator always remains.
#[must_use]
pub fn encode_name<const N: usize>(name: &str) -> [u8; N] {
    let mut field = [0u8; N];
    let truncated = truncate_utf8(name, N.saturating_sub(1));
    field[..truncated.len()].copy_from_slice(truncated.as_bytes());
    field
}

/// Decode a NUL-padded name field.
#[must_use]
pub fn decode_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn truncate_utf8(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Fail with a size mismatch unless `bytes` has exactly the declared width.
pub(crate) fn ensure_size(
    structure: &'static str,
    bytes: Vec<u8>,
    expected: usize,
) -> Result<Vec<u8>> {
    if bytes.len() == expected {
        Ok(bytes)
    } else {
        Err(Error::StructSizeMismatch {
            structure,
            expected,
            actual: bytes.len(),
        })
    }
}

/// Narrow a count or offset to a u32 field.
pub(crate) fn to_u32(field: &'static str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::ValueOutOfRange {
        field,
        value: value as u64,
        bits: 32,
    })
}

pub(crate) fn put_zeros(buf: &mut Vec<u8>, count: usize) {
    buf.resize(buf.len() + count, 0);
}

pub(crate) fn put_vec3(buf: &mut Vec<u8>, v: Vec3) -> Result<()> {
    buf.write_f32::<LittleEndian>(v.x)?;
    buf.write_f32::<LittleEndian>(v.y)?;
    buf.write_f32::<LittleEndian>(v.z)?;
    Ok(())
}

/// Common 95-byte header shared by every asset descriptor.
pub(crate) fn put_asset_header(buf: &mut Vec<u8>, asset: &Asset) -> Result<()> {
    let start = buf.len();
    buf.write_u8(asset.asset_type() as u8)?;
    buf.extend_from_slice(&encode_name::<NAME_SIZE>(&asset.name));
    buf.write_u8(asset.version)?;
    buf.write_u8(asset.streaming_priority)?;
    // Content hash is reserved; readers treat zero as "not computed"
    buf.write_u64::<LittleEndian>(0)?;
    buf.write_u32::<LittleEndian>(asset.variant_flags)?;
    put_zeros(buf, 16);
    debug_assert_eq!(buf.len() - start, ASSET_HEADER_SIZE);
    Ok(())
}
