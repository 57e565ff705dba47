//! Scene descriptor and its node/string/component trailer
//!
//! Trailer layout, offsets relative to the descriptor start:
//!
//! ```text
//! [node records][string table][component directory][component records...]
//! ```

use byteorder::{LittleEndian, WriteBytesExt};

use super::{ReferenceResolver, ensure_size, put_asset_header, put_vec3, put_zeros, to_u32};
use crate::error::{Error, Result};
use crate::model::{Asset, Camera, Projection, Renderable, SceneAsset, SceneNode};
use crate::pak::format::{AssetType, ComponentType};

pub const SCENE_DESCRIPTOR_SIZE: usize = 256;
pub const NODE_RECORD_SIZE: usize = 68;
pub const COMPONENT_DIRECTORY_ENTRY_SIZE: usize = 16;
pub const RENDERABLE_RECORD_SIZE: usize = 24;
pub const CAMERA_RECORD_SIZE: usize = 32;

const SCENE_RESERVED: usize = 133;

fn component_entry_size(component: ComponentType) -> usize {
    match component {
        ComponentType::Renderable => RENDERABLE_RECORD_SIZE,
        ComponentType::PerspectiveCamera | ComponentType::OrthographicCamera => CAMERA_RECORD_SIZE,
    }
}

fn component_count(scene: &SceneAsset, component: ComponentType) -> usize {
    match component {
        ComponentType::Renderable => scene.renderables.len(),
        ComponentType::PerspectiveCamera => scene.perspective_cameras().count(),
        ComponentType::OrthographicCamera => scene.orthographic_cameras().count(),
    }
}

/// Non-empty component tables in emission order, with their entry counts.
fn component_tables(scene: &SceneAsset) -> Vec<(ComponentType, usize)> {
    ComponentType::ALL
        .into_iter()
        .map(|component| (component, component_count(scene, component)))
        .filter(|&(_, count)| count > 0)
        .collect()
}

/// Leading NUL plus every node name NUL-terminated.
#[must_use]
pub fn scene_string_table_size(scene: &SceneAsset) -> usize {
    1 + scene.nodes.iter().map(|n| n.name.len() + 1).sum::<usize>()
}

/// Bytes following the fixed scene descriptor.
#[must_use]
pub fn scene_trailer_size(scene: &SceneAsset) -> usize {
    let tables = component_tables(scene);
    let components = if tables.is_empty() {
        0
    } else {
        tables.len() * COMPONENT_DIRECTORY_ENTRY_SIZE
            + tables
                .iter()
                .map(|&(component, count)| count * component_entry_size(component))
                .sum::<usize>()
    };
    scene.nodes.len() * NODE_RECORD_SIZE + scene_string_table_size(scene) + components
}

/// Pack a scene descriptor and its trailer.
pub fn pack_scene(
    asset: &Asset,
    scene: &SceneAsset,
    resolver: &dyn ReferenceResolver,
) -> Result<Vec<u8>> {
    let total = SCENE_DESCRIPTOR_SIZE + scene_trailer_size(scene);
    let node_count = scene.nodes.len();

    let (strings, name_offsets) = build_string_table(&scene.nodes)?;
    let tables = component_tables(scene);

    let nodes_offset = SCENE_DESCRIPTOR_SIZE;
    let strings_offset = nodes_offset + node_count * NODE_RECORD_SIZE;
    let directory_offset = strings_offset + strings.len();

    let mut buf = Vec::with_capacity(total);
    put_asset_header(&mut buf, asset)?;
    // Node table
    let node_table_offset = if node_count == 0 {
        0
    } else {
        to_u32("node table offset", nodes_offset)?
    };
    buf.write_u32::<LittleEndian>(node_table_offset)?;
    buf.write_u32::<LittleEndian>(to_u32("node count", node_count)?)?;
    buf.write_u32::<LittleEndian>(NODE_RECORD_SIZE as u32)?;
    // String table
    buf.write_u32::<LittleEndian>(to_u32("string table offset", strings_offset)?)?;
    buf.write_u32::<LittleEndian>(to_u32("string table size", strings.len())?)?;
    // Component directory
    if tables.is_empty() {
        buf.write_u32::<LittleEndian>(0)?;
        buf.write_u32::<LittleEndian>(0)?;
    } else {
        buf.write_u32::<LittleEndian>(to_u32("component directory offset", directory_offset)?)?;
        buf.write_u32::<LittleEndian>(to_u32("component table count", tables.len())?)?;
    }
    put_zeros(&mut buf, SCENE_RESERVED);
    let mut buf = ensure_size("scene descriptor", buf, SCENE_DESCRIPTOR_SIZE)?;

    for (index, node) in scene.nodes.iter().enumerate() {
        pack_node(&mut buf, asset, node, index, node_count, name_offsets[index])?;
    }
    buf.extend_from_slice(&strings);

    if !tables.is_empty() {
        let mut record_offset = directory_offset + tables.len() * COMPONENT_DIRECTORY_ENTRY_SIZE;
        for &(component, count) in &tables {
            buf.write_u32::<LittleEndian>(component.fourcc())?;
            buf.write_u32::<LittleEndian>(to_u32("component table offset", record_offset)?)?;
            buf.write_u32::<LittleEndian>(to_u32("component count", count)?)?;
            buf.write_u32::<LittleEndian>(component_entry_size(component) as u32)?;
            record_offset += count * component_entry_size(component);
        }

        for renderable in &scene.renderables {
            pack_renderable(&mut buf, asset, renderable, node_count, resolver)?;
        }
        for camera in scene.perspective_cameras() {
            pack_camera(&mut buf, asset, camera, node_count)?;
        }
        for camera in scene.orthographic_cameras() {
            pack_camera(&mut buf, asset, camera, node_count)?;
        }
    }

    ensure_size("scene asset", buf, total)
}

fn build_string_table(nodes: &[SceneNode]) -> Result<(Vec<u8>, Vec<u32>)> {
    let mut strings = vec![0u8];
    let mut offsets = Vec::with_capacity(nodes.len());
    for node in nodes {
        offsets.push(to_u32("node name offset", strings.len())?);
        strings.extend_from_slice(node.name.as_bytes());
        strings.push(0);
    }
    Ok((strings, offsets))
}

fn check_node(asset: &Asset, node: u32, node_count: usize) -> Result<u32> {
    if (node as usize) < node_count {
        Ok(node)
    } else {
        Err(Error::unresolved(&asset.name, "node", node.to_string()))
    }
}

fn pack_node(
    buf: &mut Vec<u8>,
    asset: &Asset,
    node: &SceneNode,
    index: usize,
    node_count: usize,
    name_offset: u32,
) -> Result<()> {
    let own_index = to_u32("node index", index)?;
    let parent = check_node(asset, node.parent.unwrap_or(own_index), node_count)?;

    let start = buf.len();
    buf.extend_from_slice(node.key.as_bytes());
    buf.write_u32::<LittleEndian>(name_offset)?;
    buf.write_u32::<LittleEndian>(parent)?;
    buf.write_u32::<LittleEndian>(node.flags)?;
    put_vec3(buf, node.translation)?;
    for component in node.rotation.to_array() {
        buf.write_f32::<LittleEndian>(component)?;
    }
    put_vec3(buf, node.scale)?;
    check_record("node record", buf.len() - start, NODE_RECORD_SIZE)
}

fn pack_renderable(
    buf: &mut Vec<u8>,
    asset: &Asset,
    renderable: &Renderable,
    node_count: usize,
    resolver: &dyn ReferenceResolver,
) -> Result<()> {
    let node = check_node(asset, renderable.node, node_count)?;
    let geometry = resolver
        .asset_key(&renderable.geometry, AssetType::Geometry)
        .ok_or_else(|| Error::unresolved(&asset.name, "geometry", renderable.geometry.as_str()))?;

    let start = buf.len();
    buf.write_u32::<LittleEndian>(node)?;
    buf.extend_from_slice(geometry.as_bytes());
    buf.write_u32::<LittleEndian>(u32::from(renderable.visible))?;
    check_record("renderable record", buf.len() - start, RENDERABLE_RECORD_SIZE)
}

fn pack_camera(buf: &mut Vec<u8>, asset: &Asset, camera: &Camera, node_count: usize) -> Result<()> {
    let node = check_node(asset, camera.node, node_count)?;

    let start = buf.len();
    buf.write_u32::<LittleEndian>(node)?;
    match camera.projection {
        Projection::Perspective { fov_y, aspect, near, far } => {
            for value in [fov_y, aspect, near, far] {
                buf.write_f32::<LittleEndian>(value)?;
            }
            put_zeros(buf, 12);
        }
        Projection::Orthographic { left, right, bottom, top, near, far } => {
            for value in [left, right, bottom, top, near, far] {
                buf.write_f32::<LittleEndian>(value)?;
            }
            put_zeros(buf, 4);
        }
    }
    check_record("camera record", buf.len() - start, CAMERA_RECORD_SIZE)
}

fn check_record(structure: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::StructSizeMismatch {
            structure,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use crate::model::{AssetKey, AssetKind};
    use crate::pak::packer::tests::MapResolver;

    fn scene_asset(scene: SceneAsset) -> Asset {
        Asset::new("Level", AssetKey([5; 16]), AssetKind::Scene(scene))
    }

    fn pack(asset: &Asset, resolver: &MapResolver) -> Result<Vec<u8>> {
        let AssetKind::Scene(scene) = &asset.kind else {
            unreachable!()
        };
        pack_scene(asset, scene, resolver)
    }

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn test_nodes_only_scene() {
        let mut child = SceneNode::new("child", Some(0));
        child.translation = Vec3::new(1.0, 2.0, 3.0);
        child.rotation = Quat::from_xyzw(0.0, 0.0, 0.0, 1.0);
        let scene = SceneAsset {
            nodes: vec![SceneNode::new("root", None), child],
            ..SceneAsset::default()
        };
        let asset = scene_asset(scene);
        let bytes = pack(&asset, &MapResolver::default()).unwrap();

        // 2 nodes + "\0root\0child\0"
        let strings = 1 + 5 + 6;
        assert_eq!(bytes.len(), SCENE_DESCRIPTOR_SIZE + 2 * NODE_RECORD_SIZE + strings);

        assert_eq!(read_u32(&bytes, 95), SCENE_DESCRIPTOR_SIZE as u32);
        assert_eq!(read_u32(&bytes, 99), 2);
        assert_eq!(read_u32(&bytes, 103), NODE_RECORD_SIZE as u32);
        assert_eq!(read_u32(&bytes, 107), (SCENE_DESCRIPTOR_SIZE + 2 * NODE_RECORD_SIZE) as u32);
        assert_eq!(read_u32(&bytes, 111), strings as u32);
        // No component tables
        assert_eq!(read_u32(&bytes, 115), 0);
        assert_eq!(read_u32(&bytes, 119), 0);

        let root = &bytes[SCENE_DESCRIPTOR_SIZE..];
        assert_eq!(read_u32(root, 16), 1);
        assert_eq!(read_u32(root, 20), 0, "root is its own parent");
        let child = &root[NODE_RECORD_SIZE..];
        assert_eq!(read_u32(child, 16), 6);
        assert_eq!(read_u32(child, 20), 0);
        assert_eq!(f32::from_le_bytes(child[32..36].try_into().unwrap()), 2.0);
    }

    #[test]
    fn test_component_tables_layout() {
        let mut resolver = MapResolver::default();
        resolver
            .assets
            .insert(("Crate".into(), AssetType::Geometry), AssetKey([8; 16]));

        let scene = SceneAsset {
            nodes: vec![SceneNode::new("root", None), SceneNode::new("cam", Some(0))],
            renderables: vec![Renderable {
                node: 0,
                geometry: "Crate".into(),
                visible: true,
            }],
            cameras: vec![Camera {
                node: 1,
                projection: Projection::Perspective {
                    fov_y: 1.2,
                    aspect: 1.7,
                    near: 0.1,
                    far: 500.0,
                },
            }],
        };
        let expected = SCENE_DESCRIPTOR_SIZE + scene_trailer_size(&scene);
        let asset = scene_asset(scene);
        let bytes = pack(&asset, &resolver).unwrap();
        assert_eq!(bytes.len(), expected);

        let dir_offset = read_u32(&bytes, 115) as usize;
        assert_eq!(read_u32(&bytes, 119), 2);

        let rend = &bytes[dir_offset..];
        assert_eq!(read_u32(rend, 0), ComponentType::Renderable.fourcc());
        assert_eq!(read_u32(rend, 8), 1);
        assert_eq!(read_u32(rend, 12), RENDERABLE_RECORD_SIZE as u32);
        let records = read_u32(rend, 4) as usize;
        assert_eq!(records, dir_offset + 2 * COMPONENT_DIRECTORY_ENTRY_SIZE);
        assert_eq!(&bytes[records + 4..records + 20], &[8; 16]);

        let cam = &bytes[dir_offset + COMPONENT_DIRECTORY_ENTRY_SIZE..];
        assert_eq!(read_u32(cam, 0), ComponentType::PerspectiveCamera.fourcc());
        let cam_records = read_u32(cam, 4) as usize;
        assert_eq!(cam_records, records + RENDERABLE_RECORD_SIZE);
        assert_eq!(read_u32(&bytes, cam_records), 1);
    }

    #[test]
    fn test_out_of_range_node_reference() {
        let scene = SceneAsset {
            nodes: vec![SceneNode::new("root", Some(4))],
            ..SceneAsset::default()
        };
        let err = pack(&scene_asset(scene), &MapResolver::default()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { kind: "node", .. }));
    }

    #[test]
    fn test_unknown_geometry_reference() {
        let scene = SceneAsset {
            nodes: vec![SceneNode::new("root", None)],
            renderables: vec![Renderable { node: 0, geometry: "Ghost".into(), visible: false }],
            cameras: Vec::new(),
        };
        let err = pack(&scene_asset(scene), &MapResolver::default()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { kind: "geometry", .. }));
    }
}
