//! Texture, buffer and audio descriptor records

use byteorder::{LittleEndian, WriteBytesExt};

use super::{ensure_size, put_zeros, to_u32};
use crate::error::Result;
use crate::model::{AudioResource, BufferResource, TextureResource};
use crate::pak::format::ResourceType;

pub const TEXTURE_DESCRIPTOR_SIZE: usize = 40;
pub const BUFFER_DESCRIPTOR_SIZE: usize = 32;
pub const AUDIO_DESCRIPTOR_SIZE: usize = 32;

/// Table entry width for a resource type.
#[must_use]
pub fn resource_descriptor_size(resource_type: ResourceType) -> usize {
    match resource_type {
        ResourceType::Texture => TEXTURE_DESCRIPTOR_SIZE,
        ResourceType::Buffer => BUFFER_DESCRIPTOR_SIZE,
        ResourceType::Audio => AUDIO_DESCRIPTOR_SIZE,
    }
}

/// Pack a texture descriptor pointing at `data_offset`.
pub fn pack_texture_descriptor(texture: &TextureResource, data_offset: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(TEXTURE_DESCRIPTOR_SIZE);
    buf.write_u64::<LittleEndian>(data_offset)?;
    buf.write_u32::<LittleEndian>(to_u32("texture size", texture.data.len())?)?;
    buf.write_u8(texture.texture_type)?;
    buf.write_u8(texture.compression)?;
    buf.write_u32::<LittleEndian>(texture.width)?;
    buf.write_u32::<LittleEndian>(texture.height)?;
    buf.write_u16::<LittleEndian>(texture.depth)?;
    buf.write_u16::<LittleEndian>(texture.array_layers)?;
    buf.write_u16::<LittleEndian>(texture.mip_levels)?;
    buf.write_u8(texture.format)?;
    buf.write_u16::<LittleEndian>(texture.alignment)?;
    put_zeros(&mut buf, 9);
    ensure_size("texture descriptor", buf, TEXTURE_DESCRIPTOR_SIZE)
}

/// Pack a buffer descriptor pointing at `data_offset`.
pub fn pack_buffer_descriptor(buffer: &BufferResource, data_offset: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(BUFFER_DESCRIPTOR_SIZE);
    buf.write_u64::<LittleEndian>(data_offset)?;
    buf.write_u32::<LittleEndian>(to_u32("buffer size", buffer.data.len())?)?;
    buf.write_u32::<LittleEndian>(buffer.usage_flags)?;
    buf.write_u32::<LittleEndian>(buffer.element_stride)?;
    buf.write_u8(buffer.element_format)?;
    put_zeros(&mut buf, 11);
    ensure_size("buffer descriptor", buf, BUFFER_DESCRIPTOR_SIZE)
}

/// Pack an audio descriptor pointing at `data_offset`.
pub fn pack_audio_descriptor(audio: &AudioResource, data_offset: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(AUDIO_DESCRIPTOR_SIZE);
    buf.write_u64::<LittleEndian>(data_offset)?;
    buf.write_u32::<LittleEndian>(to_u32("audio size", audio.data.len())?)?;
    buf.write_u32::<LittleEndian>(audio.sample_rate)?;
    buf.write_u16::<LittleEndian>(audio.channels)?;
    buf.write_u16::<LittleEndian>(audio.bits_per_sample)?;
    buf.write_u8(audio.format)?;
    put_zeros(&mut buf, 11);
    ensure_size("audio descriptor", buf, AUDIO_DESCRIPTOR_SIZE)
}
