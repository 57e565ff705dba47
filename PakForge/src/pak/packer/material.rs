//! Material descriptor and shader reference records

use byteorder::{LittleEndian, WriteBytesExt};

use super::{
    ReferenceResolver, encode_name, ensure_size, put_asset_header, put_zeros, quantize_unorm16,
};
use crate::error::{Error, Result};
use crate::model::{Asset, MaterialAsset, ShaderReference};
use crate::pak::format::NO_RESOURCE_INDEX;

pub const MATERIAL_DESCRIPTOR_SIZE: usize = 256;
pub const SHADER_REFERENCE_SIZE: usize = 216;

/// Width of the shader identifier field.
const SHADER_ID_SIZE: usize = 192;

const MATERIAL_RESERVED: usize = 88;

/// One shader reference per set bit of the stage mask.
#[must_use]
pub fn material_trailer_size(material: &MaterialAsset) -> usize {
    material.shader_stage_mask().count_ones() as usize * SHADER_REFERENCE_SIZE
}

/// Pack a single 216-byte shader reference.
pub fn pack_shader_reference(shader: &ShaderReference) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(SHADER_REFERENCE_SIZE);
    buf.extend_from_slice(&encode_name::<SHADER_ID_SIZE>(&shader.id));
    buf.write_u64::<LittleEndian>(shader.hash)?;
    put_zeros(&mut buf, 16);
    ensure_size("shader reference", buf, SHADER_REFERENCE_SIZE)
}

/// Pack a material descriptor followed by its shader references, in
/// ascending stage-bit order.
pub fn pack_material(
    asset: &Asset,
    material: &MaterialAsset,
    resolver: &dyn ReferenceResolver,
) -> Result<Vec<u8>> {
    let stage_mask = material.shader_stage_mask();
    if stage_mask.count_ones() as usize != material.shaders.len() {
        return Err(Error::InvalidModel(format!(
            "material '{}' has more than one shader for a stage",
            asset.name
        )));
    }

    let mut buf = Vec::with_capacity(MATERIAL_DESCRIPTOR_SIZE + material_trailer_size(material));
    put_asset_header(&mut buf, asset)?;
    buf.write_u8(material.domain as u8)?;
    buf.write_u32::<LittleEndian>(material.flags)?;
    buf.write_u32::<LittleEndian>(stage_mask)?;
    for channel in material.base_color {
        buf.write_f32::<LittleEndian>(channel)?;
    }
    buf.write_f32::<LittleEndian>(material.normal_scale)?;
    buf.write_u16::<LittleEndian>(quantize_unorm16(material.metalness))?;
    buf.write_u16::<LittleEndian>(quantize_unorm16(material.roughness))?;
    buf.write_u16::<LittleEndian>(quantize_unorm16(material.ambient_occlusion))?;
    buf.write_u16::<LittleEndian>(quantize_unorm16(material.alpha_cutoff))?;

    for slot in material.textures.slots() {
        let index = match slot {
            Some(name) => resolver
                .texture_index(name)
                .ok_or_else(|| Error::unresolved(&asset.name, "texture", name))?,
            None => NO_RESOURCE_INDEX,
        };
        buf.write_u32::<LittleEndian>(index)?;
    }
    for channel in material.emissive_factor {
        buf.write_f32::<LittleEndian>(channel)?;
    }
    put_zeros(&mut buf, MATERIAL_RESERVED);
    let mut buf = ensure_size("material descriptor", buf, MATERIAL_DESCRIPTOR_SIZE)?;

    let mut shaders: Vec<&ShaderReference> = material.shaders.iter().collect();
    shaders.sort_by_key(|s| s.stage);
    for shader in shaders {
        buf.extend_from_slice(&pack_shader_reference(shader)?);
    }

    ensure_size(
        "material asset",
        buf,
        MATERIAL_DESCRIPTOR_SIZE + material_trailer_size(material),
    )
}
