//! Integration tests for `PakForge`
//!
//! These build real pack files in temporary directories and read them back.

use std::path::Path;

use pakforge::model::{
    Camera, MaterialTextures, MeshKind, MeshLod, MeshView, Projection, Renderable, SceneNode,
    ShaderReference, ShaderStage, Submesh,
};
use pakforge::pak::format::{AssetType, DATA_ALIGNMENT, ResourceType, TABLE_ALIGNMENT};
use pakforge::pak::inspect_bytes;
use pakforge::pak::packer::{DIRECTORY_ENTRY_SIZE, FOOTER_SIZE, HEADER_SIZE};
use pakforge::prelude::*;
use pretty_assertions::assert_eq;
use uuid::Uuid;

const BUILD_GUID: &str = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";

fn guid() -> Uuid {
    Uuid::parse_str(BUILD_GUID).unwrap()
}

fn key(byte: u8) -> AssetKey {
    AssetKey([byte; 16])
}

fn texture(name: &str, data: &[u8]) -> TextureResource {
    TextureResource {
        name: name.into(),
        data: data.to_vec(),
        texture_type: 0,
        compression: 0,
        width: 4,
        height: 4,
        depth: 1,
        array_layers: 1,
        mip_levels: 1,
        format: 0,
        alignment: 256,
    }
}

fn buffer(name: &str, data: &[u8]) -> BufferResource {
    BufferResource {
        name: name.into(),
        data: data.to_vec(),
        usage_flags: 0,
        element_stride: 4,
        element_format: 0,
    }
}

fn material(name: &str, key: AssetKey, albedo: Option<&str>) -> Asset {
    Asset::new(
        name,
        key,
        AssetKind::Material(MaterialAsset {
            textures: MaterialTextures {
                base_color: albedo.map(String::from),
                ..MaterialTextures::default()
            },
            shaders: vec![
                ShaderReference {
                    stage: ShaderStage::Vertex,
                    id: "std_vs".into(),
                    hash: 1,
                },
                ShaderReference {
                    stage: ShaderStage::Pixel,
                    id: "std_ps".into(),
                    hash: 2,
                },
            ],
            ..MaterialAsset::default()
        }),
    )
}

fn geometry(name: &str, key: AssetKey, material: &str) -> Asset {
    Asset::new(
        name,
        key,
        AssetKind::Geometry(GeometryAsset {
            bounding_box: Default::default(),
            lods: vec![MeshLod {
                name: "lod0".into(),
                kind: MeshKind::Standard {
                    vertex_buffer: "crate_vb".into(),
                    index_buffer: Some("crate_ib".into()),
                    bounding_box: Default::default(),
                },
                submeshes: vec![Submesh {
                    name: "body".into(),
                    material: material.into(),
                    bounding_box: Default::default(),
                    mesh_views: vec![MeshView {
                        first_index: 0,
                        index_count: 6,
                        first_vertex: 0,
                        vertex_count: 4,
                    }],
                }],
            }],
        }),
    )
}

fn scene(name: &str, key: AssetKey, geometry: &str) -> Asset {
    Asset::new(
        name,
        key,
        AssetKind::Scene(SceneAsset {
            nodes: vec![SceneNode::new("root", None), SceneNode::new("camera", Some(0))],
            renderables: vec![Renderable {
                node: 0,
                geometry: geometry.into(),
                visible: true,
            }],
            cameras: vec![Camera {
                node: 1,
                projection: Projection::Perspective {
                    fov_y: 1.0,
                    aspect: 1.5,
                    near: 0.1,
                    far: 100.0,
                },
            }],
        }),
    )
}

/// A model touching every resource and asset type.
fn full_model() -> PakModel {
    let mut model = PakModel::new(guid());
    model.content_version = 7;
    model.resources.textures = vec![texture("brick_albedo", &[0xAA; 300])];
    model.resources.buffers = vec![buffer("crate_vb", &[1; 48]), buffer("crate_ib", &[2; 12])];
    model.resources.audio = vec![AudioResource {
        name: "ambience".into(),
        data: vec![3; 100],
        sample_rate: 48_000,
        channels: 2,
        bits_per_sample: 16,
        format: 0,
    }];
    model.assets = vec![
        scene("Level", key(3), "Crate"),
        geometry("Crate", key(2), "Brick"),
        material("Brick", key(1), Some("brick_albedo")).with_alignment(64),
    ];
    model
}

fn build(model: &PakModel, deterministic: bool, output: &Path) -> BuildReport {
    PakBuilder::new(model)
        .with_deterministic(deterministic)
        .build(output)
        .unwrap()
}

#[test]
fn test_empty_model_builds_minimal_pack() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("empty.pak");
    let model = PakModel::new(guid());

    let report = build(&model, true, &output);
    assert_eq!(report.bytes_written, (HEADER_SIZE + FOOTER_SIZE) as u64);

    let info = inspect(&output).unwrap();
    assert_eq!(info.file_size, 320);
    assert_eq!(info.footer.asset_count, 0);
    assert!(info.footer.directory.is_empty());
    assert!(info.footer.name_index.is_empty());
    for resource_type in ResourceType::ALL {
        assert!(info.footer.regions[resource_type.index()].is_empty());
        assert_eq!(info.footer.tables[resource_type.index()].count, 0);
    }
    assert!(info.checksum_matches);
    assert!(validate(&info).is_empty());
}

#[test]
fn test_material_and_geometry_pack() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("mesh.pak");
    let mut model = full_model();
    model.resources.audio.clear();
    model.assets.retain(|a| a.asset_type() != AssetType::Scene);

    build(&model, true, &output);
    let info = inspect(&output).unwrap();

    assert_eq!(info.entries.len(), 2);
    let brick = info.find_entry(&key(1)).unwrap();
    let crate_entry = info.find_entry(&key(2)).unwrap();
    assert_eq!(brick.asset_type(), Some(AssetType::Material));
    assert_eq!(crate_entry.asset_type(), Some(AssetType::Geometry));
    assert_eq!(brick.name.as_deref(), Some("Brick"));

    // Materials are laid out before geometry.
    assert!(brick.entry.descriptor_offset < crate_entry.entry.descriptor_offset);
    assert_eq!(brick.entry.descriptor_offset % 64, 0);
    assert!(crate_entry.entry.descriptor_size > 256);
    assert_eq!(brick.measured_size, Some(u64::from(brick.entry.descriptor_size)));
    assert_eq!(crate_entry.measured_size, Some(u64::from(crate_entry.entry.descriptor_size)));
    assert!(validate(&info).is_empty());
}

#[test]
fn test_deterministic_texture_ordering_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("textures.pak");
    let mut model = PakModel::new(guid());
    model.resources.textures = vec![texture("zebra", &[0x5A; 10]), texture("apple", &[0x41; 20])];
    model.resources.buffers = vec![buffer("second", &[2; 8]), buffer("first", &[1; 8])];

    let report = build(&model, true, &output);
    let textures = report.plan.resource(ResourceType::Texture);
    let names: Vec<_> = textures.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["apple", "zebra"]);

    let bytes = std::fs::read(&output).unwrap();
    let apple = &textures.entries[0];
    assert_eq!(apple.data_offset, textures.region.offset);
    let start = apple.data_offset as usize;
    assert_eq!(&bytes[start..start + 20], &[0x41; 20]);

    // Without determinism the model order is kept.
    let unsorted = PakBuilder::new(&model).with_deterministic(false).plan().unwrap();
    let names: Vec<_> = unsorted
        .resource(ResourceType::Buffer)
        .entries
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(names, ["second", "first"]);
}

#[test]
fn test_tampered_descriptor_size_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("tampered.pak");
    let mut model = PakModel::new(guid());
    model.assets = vec![material("Plain", key(9), None)];
    build(&model, true, &output);

    let mut bytes = std::fs::read(&output).unwrap();
    let info = inspect_bytes(&bytes).unwrap();
    let size_field = info.footer.directory.offset as usize + 33;
    let size = u32::from_le_bytes(bytes[size_field..size_field + 4].try_into().unwrap());
    bytes[size_field..size_field + 4].copy_from_slice(&(size + 16).to_le_bytes());

    let info = inspect_bytes(&bytes).unwrap();
    let issues = validate(&info);
    assert!(
        issues.iter().any(|i| i.contains("descriptor size")),
        "unexpected issues: {issues:?}"
    );
}

#[test]
fn test_deterministic_builds_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.pak");
    let second = dir.path().join("b.pak");
    let model = full_model();

    build(&model, true, &first);
    build(&model, true, &second);
    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
}

#[test]
fn test_plan_matches_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("full.pak");
    let model = full_model();

    let report = build(&model, true, &output);
    let plan = &report.plan;
    let file_size = std::fs::metadata(&output).unwrap().len();
    assert_eq!(file_size, plan.file_size);
    assert_eq!(report.bytes_written, plan.file_size);

    let info = inspect(&output).unwrap();
    assert_eq!(info.footer_offset() + FOOTER_SIZE as u64, file_size);
    assert_eq!(info.footer_offset(), plan.footer.offset);
    assert_eq!(info.header.content_version, 7);
    assert_eq!(info.header.guid, *guid().as_bytes());

    for resource_type in ResourceType::ALL {
        let planned = plan.resource(resource_type);
        let region = info.footer.regions[resource_type.index()];
        let table = info.footer.tables[resource_type.index()];
        assert_eq!(region.offset, planned.region.offset);
        assert_eq!(region.size, planned.region.size);
        assert_eq!(region.offset % DATA_ALIGNMENT, 0);
        assert_eq!(table.offset, planned.table.offset);
        assert_eq!(table.offset % TABLE_ALIGNMENT, 0);
        assert_eq!(u64::from(table.count), planned.entries.len() as u64);
    }

    // Every byte is accounted for: sections plus padding fill the file.
    let mut used = HEADER_SIZE as u64 + FOOTER_SIZE as u64;
    for resource in &plan.resources {
        let payload: u64 = resource.entries.iter().map(|e| e.size).sum();
        assert_eq!(resource.region.size, payload + resource.region.padding_internal);
        used += payload + resource.table.size();
    }
    used += plan.assets.iter().map(|a| a.total_size()).sum::<u64>();
    used += plan.directory.size + plan.name_index.size;
    assert_eq!(used + plan.padding.total, file_size);
}

#[test]
fn test_directory_integrity() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("full.pak");
    let report = build(&full_model(), true, &output);
    let info = inspect(&output).unwrap();

    assert!(info.directory_parsed);
    assert_eq!(info.footer.asset_count, 3);
    assert_eq!(info.footer.directory.size, 3 * DIRECTORY_ENTRY_SIZE as u64);

    for (i, (asset, planned)) in info.entries.iter().zip(&report.plan.assets).enumerate() {
        let expected_entry = info.footer.directory.offset + (i * DIRECTORY_ENTRY_SIZE) as u64;
        assert_eq!(asset.entry.entry_offset, expected_entry);
        assert_eq!(asset.entry.key, planned.key);
        assert_eq!(asset.entry.descriptor_offset, planned.descriptor_offset);
        assert_eq!(u64::from(asset.entry.descriptor_size), planned.total_size());
        let descriptor_end = asset.entry.descriptor_offset + u64::from(asset.entry.descriptor_size);
        assert!(descriptor_end <= info.footer.directory.offset);
    }

    // Grouped by type in material, geometry, scene order.
    let types: Vec<_> = info.entries.iter().map(|e| e.asset_type().unwrap()).collect();
    assert_eq!(types, [AssetType::Material, AssetType::Geometry, AssetType::Scene]);
    assert!(validate(&info).is_empty());
}

#[test]
fn test_checksum_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("full.pak");
    build(&full_model(), true, &output);

    let mut bytes = std::fs::read(&output).unwrap();
    let info = inspect_bytes(&bytes).unwrap();
    assert!(info.checksum_matches);
    assert_eq!(info.computed_checksum, info.footer.checksum);

    // Flip one payload byte inside the texture region.
    let texture_region = info.footer.regions[ResourceType::Texture.index()];
    bytes[texture_region.offset as usize] ^= 0xFF;
    let tampered = inspect_bytes(&bytes).unwrap();
    assert!(!tampered.checksum_matches);
    assert!(validate(&tampered).iter().any(|i| i.contains("checksum")));
}

#[test]
fn test_asset_ordering() {
    let mut model = PakModel::new(guid());
    model.assets = vec![
        material("Zinc", key(1), None),
        material("Brass", key(2), None),
        material("Iron", key(3), None),
    ];

    let sorted = compute_plan(&model.resources, &model.assets, true).unwrap();
    let names: Vec<_> = sorted.assets.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Brass", "Iron", "Zinc"]);

    let kept = compute_plan(&model.resources, &model.assets, false).unwrap();
    let names: Vec<_> = kept.assets.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Zinc", "Brass", "Iron"]);
}

#[test]
fn test_failed_build_leaves_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("level.pak");
    std::fs::write(&output, b"previous build").unwrap();

    let mut model = PakModel::new(guid());
    model.assets = vec![material("Broken", key(4), Some("missing_texture"))];

    let result = PakBuilder::new(&model).build(&output);
    assert!(result.is_err());
    assert_eq!(std::fs::read(&output).unwrap(), b"previous build");

    let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn test_successful_build_replaces_destination() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("level.pak");
    std::fs::write(&output, b"previous build").unwrap();

    build(&full_model(), true, &output);
    let info = inspect(&output).unwrap();
    assert!(info.checksum_matches);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_name_index_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("full.pak");
    build(&full_model(), true, &output);
    let info = inspect(&output).unwrap();

    let entries = info.name_index.as_ref().unwrap();
    let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["/Brick", "/Crate", "/Level"]);

    let brick = info.lookup_path("/Brick").unwrap();
    assert_eq!(brick, key(1));
    let entry = info.find_entry(&brick).unwrap();
    assert_eq!(entry.asset_type(), Some(AssetType::Material));
    assert!(info.lookup_path("/Missing").is_none());
}

#[test]
fn test_invalid_asset_name_is_rejected() {
    let mut model = PakModel::new(guid());
    model.assets = vec![material("bad//name", key(5), None)];

    let err = compute_plan(&model.resources, &model.assets, true).unwrap_err();
    assert!(matches!(err, Error::NameIndexPath { .. }), "unexpected error: {err}");
}

#[test]
fn test_plan_then_write() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("manual.pak");
    let model = full_model();

    let plan = compute_plan(&model.resources, &model.assets, true).unwrap();
    let written = write_pak(&model, &plan, &output).unwrap();
    assert_eq!(written, plan.file_size);

    // A plan computed for a different model is refused before anything is written.
    let mut grown = model.clone();
    grown.resources.textures.push(texture("extra", &[7; 4]));
    let mismatch = dir.path().join("mismatch.pak");
    let err = write_pak(&grown, &plan, &mismatch).unwrap_err();
    assert!(matches!(err, Error::PlanMismatch(_)), "unexpected error: {err}");
    assert!(!mismatch.exists());
}

#[test]
fn test_json_model_builds() {
    let json = format!(
        r#"{{
            "content_version": 2,
            "guid": "{BUILD_GUID}",
            "resources": {{
                "textures": [{{
                    "name": "albedo",
                    "data": "AAECAwQFBgc=",
                    "width": 2,
                    "height": 1
                }}],
                "buffers": [
                    {{ "name": "crate_vb", "data": "AQIDBAUGBwg=", "element_stride": 4 }},
                    {{ "name": "crate_ib", "data": "AAABAAIA", "element_stride": 2 }}
                ]
            }},
            "assets": [
                {{
                    "type": "material",
                    "name": "Brick",
                    "key": "01010101-0101-0101-0101-010101010101",
                    "textures": {{ "base_color": "albedo" }},
                    "shaders": [{{ "stage": "pixel", "id": "ps" }}]
                }},
                {{
                    "type": "geometry",
                    "name": "Crate",
                    "key": "02020202-0202-0202-0202-020202020202",
                    "lods": [{{
                        "name": "lod0",
                        "mesh_type": "standard",
                        "vertex_buffer": "crate_vb",
                        "index_buffer": "crate_ib",
                        "submeshes": [{{ "name": "body", "material": "Brick" }}]
                    }}]
                }}
            ]
        }}"#
    );
    let model = PakModel::from_json_str(&json).unwrap();
    assert_eq!(model.resources.textures[0].data, [0, 1, 2, 3, 4, 5, 6, 7]);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("json.pak");
    build(&model, true, &output);

    let info = inspect(&output).unwrap();
    assert_eq!(info.header.content_version, 2);
    assert_eq!(info.lookup_path("/Crate"), Some(key(2)));
    assert!(validate(&info).is_empty());
}
