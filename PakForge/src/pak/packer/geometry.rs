//! Geometry descriptor and its LOD/submesh/mesh-view trailer

use byteorder::{LittleEndian, WriteBytesExt};

use super::{
    NAME_SIZE, ReferenceResolver, encode_name, ensure_size, put_asset_header, put_vec3,
    put_zeros, to_u32,
};
use crate::error::{Error, Result};
use crate::model::{Asset, GeometryAsset, MeshKind, MeshLod, MeshView, Submesh};
use crate::pak::format::{AssetType, MeshType, NO_RESOURCE_INDEX};

pub const GEOMETRY_DESCRIPTOR_SIZE: usize = 256;
pub const STANDARD_MESH_DESCRIPTOR_SIZE: usize = 105;
pub const PROCEDURAL_MESH_DESCRIPTOR_SIZE: usize = 104;
pub const SUBMESH_DESCRIPTOR_SIZE: usize = 108;
pub const MESH_VIEW_SIZE: usize = 16;

const GEOMETRY_RESERVED: usize = 133;
const PROCEDURAL_RESERVED: usize = 27;

/// Fixed mesh descriptor width for a LOD's mesh variant.
#[must_use]
pub fn mesh_descriptor_size(kind: &MeshKind) -> usize {
    match kind {
        MeshKind::Standard { .. } => STANDARD_MESH_DESCRIPTOR_SIZE,
        MeshKind::Procedural { .. } => PROCEDURAL_MESH_DESCRIPTOR_SIZE,
    }
}

fn lod_size(lod: &MeshLod) -> usize {
    let params = match &lod.kind {
        MeshKind::Standard { .. } => 0,
        MeshKind::Procedural { params } => params.len(),
    };
    let submeshes: usize = lod
        .submeshes
        .iter()
        .map(|s| SUBMESH_DESCRIPTOR_SIZE + s.mesh_views.len() * MESH_VIEW_SIZE)
        .sum();
    mesh_descriptor_size(&lod.kind) + params + submeshes
}

/// Bytes following the fixed geometry descriptor.
#[must_use]
pub fn geometry_trailer_size(geometry: &GeometryAsset) -> usize {
    geometry.lods.iter().map(lod_size).sum()
}

/// Pack a geometry descriptor and its full LOD chain.
pub fn pack_geometry(
    asset: &Asset,
    geometry: &GeometryAsset,
    resolver: &dyn ReferenceResolver,
) -> Result<Vec<u8>> {
    let total = GEOMETRY_DESCRIPTOR_SIZE + geometry_trailer_size(geometry);
    let mut buf = Vec::with_capacity(total);

    put_asset_header(&mut buf, asset)?;
    buf.write_u32::<LittleEndian>(to_u32("lod count", geometry.lods.len())?)?;
    put_vec3(&mut buf, geometry.bounding_box.min)?;
    put_vec3(&mut buf, geometry.bounding_box.max)?;
    put_zeros(&mut buf, GEOMETRY_RESERVED);
    let mut buf = ensure_size("geometry descriptor", buf, GEOMETRY_DESCRIPTOR_SIZE)?;

    for lod in &geometry.lods {
        buf.extend_from_slice(&pack_mesh_descriptor(asset, lod, resolver)?);
        if let MeshKind::Procedural { params } = &lod.kind {
            buf.extend_from_slice(params);
        }
        for submesh in &lod.submeshes {
            buf.extend_from_slice(&pack_submesh_descriptor(asset, submesh, resolver)?);
            for view in &submesh.mesh_views {
                buf.extend_from_slice(&pack_mesh_view(view)?);
            }
        }
    }

    ensure_size("geometry asset", buf, total)
}

fn pack_mesh_descriptor(
    asset: &Asset,
    lod: &MeshLod,
    resolver: &dyn ReferenceResolver,
) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(STANDARD_MESH_DESCRIPTOR_SIZE);
    buf.extend_from_slice(&encode_name::<NAME_SIZE>(&lod.name));

    let mesh_type = match lod.kind {
        MeshKind::Standard { .. } => MeshType::Standard,
        MeshKind::Procedural { .. } => MeshType::Procedural,
    };
    buf.write_u8(mesh_type as u8)?;
    buf.write_u32::<LittleEndian>(to_u32("submesh count", lod.submeshes.len())?)?;
    buf.write_u32::<LittleEndian>(to_u32("mesh view count", lod.mesh_view_count())?)?;

    match &lod.kind {
        MeshKind::Standard {
            vertex_buffer,
            index_buffer,
            bounding_box,
        } => {
            let vertex = resolver
                .buffer_index(vertex_buffer)
                .ok_or_else(|| Error::unresolved(&asset.name, "buffer", vertex_buffer.as_str()))?;
            let index = match index_buffer {
                Some(name) => resolver
                    .buffer_index(name)
                    .ok_or_else(|| Error::unresolved(&asset.name, "buffer", name.as_str()))?,
                None => NO_RESOURCE_INDEX,
            };
            buf.write_u32::<LittleEndian>(vertex)?;
            buf.write_u32::<LittleEndian>(index)?;
            put_vec3(&mut buf, bounding_box.min)?;
            put_vec3(&mut buf, bounding_box.max)?;
        }
        MeshKind::Procedural { params } => {
            buf.write_u32::<LittleEndian>(to_u32("procedural params size", params.len())?)?;
            put_zeros(&mut buf, PROCEDURAL_RESERVED);
        }
    }

    ensure_size("mesh descriptor", buf, mesh_descriptor_size(&lod.kind))
}

fn pack_submesh_descriptor(
    asset: &Asset,
    submesh: &Submesh,
    resolver: &dyn ReferenceResolver,
) -> Result<Vec<u8>> {
    let material_key = resolver
        .asset_key(&submesh.material, AssetType::Material)
        .ok_or_else(|| Error::unresolved(&asset.name, "material", submesh.material.as_str()))?;

    let mut buf = Vec::with_capacity(SUBMESH_DESCRIPTOR_SIZE);
    buf.extend_from_slice(&encode_name::<NAME_SIZE>(&submesh.name));
    buf.extend_from_slice(material_key.as_bytes());
    buf.write_u32::<LittleEndian>(to_u32("mesh view count", submesh.mesh_views.len())?)?;
    put_vec3(&mut buf, submesh.bounding_box.min)?;
    put_vec3(&mut buf, submesh.bounding_box.max)?;
    ensure_size("submesh descriptor", buf, SUBMESH_DESCRIPTOR_SIZE)
}

fn pack_mesh_view(view: &MeshView) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(MESH_VIEW_SIZE);
    buf.write_u32::<LittleEndian>(view.first_index)?;
    buf.write_u32::<LittleEndian>(view.index_count)?;
    buf.write_u32::<LittleEndian>(view.first_vertex)?;
    buf.write_u32::<LittleEndian>(view.vertex_count)?;
    ensure_size("mesh view", buf, MESH_VIEW_SIZE)
}
