//! Layout planner
//!
//! Computes every offset, size and padding run of a pack file without
//! encoding anything. Structure widths come from [`super::packer`].

use std::collections::HashSet;

use super::format::{AssetType, DATA_ALIGNMENT, TABLE_ALIGNMENT, align_up};
use super::packer::{
    DIRECTORY_ENTRY_SIZE, FOOTER_SIZE, HEADER_SIZE, NameIndexEntry, asset_descriptor_size,
    asset_trailer_size, name_index_size, resource_descriptor_size, validate_virtual_path,
};
use super::plan::{
    AssetPlan, DirectoryPlan, FooterPlan, NameIndexPlan, PaddingStats, PakPlan, RegionPlan,
    ResourceEntryPlan, ResourcePlan, Section, TablePlan,
};
use crate::error::{Error, Result};
use crate::model::{Asset, Resource, ResourceCollection};

/// Compute the layout of a pack file.
///
/// With `deterministic`, resources and assets are stable-sorted by name
/// within their own type; otherwise model order is kept. The same inputs
/// always yield the same plan.
pub fn compute_plan(
    resources: &ResourceCollection,
    assets: &[Asset],
    deterministic: bool,
) -> Result<PakPlan> {
    let mut padding = PaddingStats::default();
    let mut cursor = HEADER_SIZE as u64;

    let textures = plan_resources(&resources.textures, deterministic, &mut cursor, &mut padding)?;
    let buffers = plan_resources(&resources.buffers, deterministic, &mut cursor, &mut padding)?;
    let audio = plan_resources(&resources.audio, deterministic, &mut cursor, &mut padding)?;

    let asset_plans = plan_assets(assets, deterministic, &mut cursor, &mut padding)?;

    let directory = if asset_plans.is_empty() {
        DirectoryPlan::default()
    } else {
        let offset = align_up(cursor, TABLE_ALIGNMENT);
        let padding_before = offset - cursor;
        padding.add(Section::Directory, padding_before);
        let asset_count = asset_plans.len() as u64;
        let size = asset_count * DIRECTORY_ENTRY_SIZE as u64;
        cursor = offset + size;
        DirectoryPlan {
            offset,
            size,
            asset_count,
            padding_before,
        }
    };
    tracing::debug!(
        "Directory at {} ({} entries)",
        directory.offset,
        directory.asset_count
    );

    let name_index = plan_name_index(&asset_plans, &mut cursor, &mut padding)?;

    let footer = FooterPlan {
        offset: cursor,
        size: FOOTER_SIZE as u64,
    };
    let file_size = footer.offset + footer.size;

    tracing::info!(
        "Planned pack: {} assets, {} bytes ({} bytes padding)",
        asset_plans.len(),
        file_size,
        padding.total
    );

    Ok(PakPlan {
        header_size: HEADER_SIZE as u64,
        resources: [textures, buffers, audio],
        assets: asset_plans,
        directory,
        name_index,
        footer,
        padding,
        file_size,
        deterministic,
    })
}

/// Source indices in emission order, optionally stable-sorted by name.
fn emission_order<'a, T>(
    items: &'a [T],
    deterministic: bool,
    name: impl Fn(&'a T) -> &'a str,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    if deterministic {
        order.sort_by(|&a, &b| name(&items[a]).cmp(name(&items[b])));
    }
    order
}

fn plan_resources<R: Resource>(
    items: &[R],
    deterministic: bool,
    cursor: &mut u64,
    padding: &mut PaddingStats,
) -> Result<ResourcePlan> {
    let resource_type = R::TYPE;
    if items.is_empty() {
        return Ok(ResourcePlan {
            resource_type,
            region: RegionPlan::default(),
            table: TablePlan::default(),
            entries: Vec::new(),
        });
    }

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.name()) {
            return Err(Error::InvalidModel(format!(
                "duplicate {resource_type} name '{}'",
                item.name()
            )));
        }
        if u32::try_from(item.data().len()).is_err() {
            return Err(Error::InvalidModel(format!(
                "{resource_type} '{}' payload exceeds 4 GiB",
                item.name()
            )));
        }
    }

    let region_offset = align_up(*cursor, DATA_ALIGNMENT);
    let padding_before = region_offset - *cursor;

    let mut position = region_offset;
    let mut padding_internal = 0;
    let mut entries = Vec::with_capacity(items.len());
    for source_index in emission_order(items, deterministic, |r| r.name()) {
        let item = &items[source_index];
        let data_offset = align_up(position, DATA_ALIGNMENT);
        padding_internal += data_offset - position;
        let size = item.data().len() as u64;
        position = data_offset + size;
        entries.push(ResourceEntryPlan {
            name: item.name().to_string(),
            source_index,
            data_offset,
            size,
        });
    }

    let region = RegionPlan {
        offset: region_offset,
        size: position - region_offset,
        alignment: DATA_ALIGNMENT,
        padding_before,
        padding_internal,
    };
    padding.add(Section::region(resource_type), padding_before + padding_internal);

    let table_offset = align_up(position, TABLE_ALIGNMENT);
    let table = TablePlan {
        offset: table_offset,
        count: entries.len() as u32,
        entry_size: resource_descriptor_size(resource_type) as u32,
        alignment: TABLE_ALIGNMENT,
        padding_before: table_offset - position,
    };
    padding.add(Section::table(resource_type), table.padding_before);
    *cursor = table.offset + table.size();

    tracing::debug!(
        "{} region at {} ({} bytes), table at {} ({} entries)",
        resource_type,
        region.offset,
        region.size,
        table.offset,
        table.count
    );

    Ok(ResourcePlan {
        resource_type,
        region,
        table,
        entries,
    })
}

fn plan_assets(
    assets: &[Asset],
    deterministic: bool,
    cursor: &mut u64,
    padding: &mut PaddingStats,
) -> Result<Vec<AssetPlan>> {
    let mut plans = Vec::with_capacity(assets.len());

    for asset_type in AssetType::ALL {
        let of_type: Vec<usize> = (0..assets.len())
            .filter(|&i| assets[i].asset_type() == asset_type)
            .collect();
        let order = emission_order(&of_type, deterministic, |&i| assets[i].name.as_str());

        for source_index in order.into_iter().map(|i| of_type[i]) {
            let asset = &assets[source_index];
            let alignment = asset.effective_alignment();
            if u32::try_from(alignment).is_err() {
                return Err(Error::ValueOutOfRange {
                    field: "asset alignment",
                    value: alignment,
                    bits: 32,
                });
            }
            let descriptor_offset = cursor
                .checked_next_multiple_of(alignment)
                .ok_or(Error::ValueOutOfRange {
                    field: "asset descriptor offset",
                    value: *cursor,
                    bits: 64,
                })?;
            let padding_before = descriptor_offset - *cursor;
            padding.add(Section::Assets, padding_before);

            let descriptor_size = asset_descriptor_size(asset_type) as u64;
            let trailer_size = asset_trailer_size(&asset.kind) as u64;
            if u32::try_from(descriptor_size + trailer_size).is_err() {
                return Err(Error::ValueOutOfRange {
                    field: "asset descriptor size",
                    value: descriptor_size + trailer_size,
                    bits: 32,
                });
            }

            let plan = AssetPlan {
                asset_type,
                key: asset.key,
                name: asset.name.clone(),
                source_index,
                descriptor_offset,
                descriptor_size,
                alignment,
                trailer_size,
                padding_before,
            };
            *cursor = plan.end();
            tracing::debug!(
                "{} '{}' at {} ({} + {} bytes)",
                asset_type,
                plan.name,
                descriptor_offset,
                descriptor_size,
                trailer_size
            );
            plans.push(plan);
        }
    }

    Ok(plans)
}

fn plan_name_index(
    assets: &[AssetPlan],
    cursor: &mut u64,
    padding: &mut PaddingStats,
) -> Result<NameIndexPlan> {
    if assets.is_empty() {
        return Ok(NameIndexPlan::default());
    }

    let mut entries = Vec::with_capacity(assets.len());
    let mut seen = HashSet::with_capacity(assets.len());
    for asset in assets {
        let path = asset.virtual_path();
        validate_virtual_path(&path)?;
        if !seen.insert(path.clone()) {
            return Err(Error::NameIndexPath {
                path,
                reason: "duplicate path",
            });
        }
        entries.push(NameIndexEntry {
            path,
            key: asset.key,
        });
    }
    entries.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));

    let offset = align_up(*cursor, TABLE_ALIGNMENT);
    let padding_before = offset - *cursor;
    padding.add(Section::NameIndex, padding_before);
    let size = name_index_size(&entries) as u64;
    *cursor = offset + size;

    Ok(NameIndexPlan {
        offset,
        size,
        padding_before,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{
        AssetKey, AssetKind, BufferResource, GeometryAsset, MaterialAsset, SceneAsset,
        TextureResource,
    };
    use crate::pak::format::ResourceType;

    fn texture(name: &str, len: usize) -> TextureResource {
        TextureResource {
            name: name.into(),
            data: vec![1; len],
            texture_type: 1,
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

    fn buffer(name: &str, len: usize) -> BufferResource {
        BufferResource {
            name: name.into(),
            data: vec![2; len],
            usage_flags: 0,
            element_stride: 4,
            element_format: 0,
        }
    }

    fn material(name: &str) -> Asset {
        Asset::new(name, AssetKey::ZERO, AssetKind::Material(MaterialAsset::default()))
    }

    fn entry_names(plan: &PakPlan, resource_type: ResourceType) -> Vec<&str> {
        plan.resource(resource_type).entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_empty_model_is_header_plus_footer() {
        let plan = compute_plan(&ResourceCollection::default(), &[], true).unwrap();

        for resource in &plan.resources {
            assert!(resource.region.is_absent());
            assert_eq!(resource.table, TablePlan::default());
        }
        assert_eq!(plan.directory, DirectoryPlan::default());
        assert!(plan.name_index.is_absent());
        assert_eq!(plan.footer.offset, HEADER_SIZE as u64);
        assert_eq!(plan.file_size, (HEADER_SIZE + FOOTER_SIZE) as u64);
        assert_eq!(plan.padding.total, 0);
    }

    #[test]
    fn test_deterministic_sorts_textures_but_keeps_buffer_order() {
        let resources = ResourceCollection {
            textures: vec![texture("zebra", 10), texture("apple", 300)],
            buffers: vec![buffer("second", 8), buffer("first", 8)],
            audio: Vec::new(),
        };

        let plan = compute_plan(&resources, &[], true).unwrap();
        assert_eq!(entry_names(&plan, ResourceType::Texture), vec!["apple", "zebra"]);
        // Stable sort applies to buffers too, by name
        assert_eq!(entry_names(&plan, ResourceType::Buffer), vec!["first", "second"]);

        let plan = compute_plan(&resources, &[], false).unwrap();
        let names = entry_names(&plan, ResourceType::Buffer);
        assert_eq!(names, vec!["second", "first"]);
        let textures = plan.resource(ResourceType::Texture);
        assert_eq!(textures.entries[0].source_index, 0);
    }

    #[test]
    fn test_blobs_and_tables_are_aligned() {
        let resources = ResourceCollection {
            textures: vec![texture("a", 300), texture("b", 10)],
            buffers: vec![buffer("vb", 12)],
            audio: Vec::new(),
        };
        let plan = compute_plan(&resources, &[], true).unwrap();

        let textures = plan.resource(ResourceType::Texture);
        assert_eq!(textures.region.offset, 256);
        assert_eq!(textures.region.padding_before, 256 - HEADER_SIZE as u64);
        assert_eq!(textures.entries[0].data_offset, 256);
        assert_eq!(textures.entries[1].data_offset, 768);
        assert_eq!(textures.region.padding_internal, 768 - 556);
        assert_eq!(textures.region.size, 768 + 10 - 256);
        assert_eq!(textures.table.offset % TABLE_ALIGNMENT, 0);
        assert_eq!(textures.table.entry_size, 40);

        let buffers = plan.resource(ResourceType::Buffer);
        assert_eq!(buffers.region.offset % DATA_ALIGNMENT, 0);
        assert!(buffers.region.offset >= textures.table.offset + textures.table.size());
        assert!(plan.resource(ResourceType::Audio).region.is_absent());
    }

    #[test]
    fn test_assets_grouped_by_type_and_sorted_within_type() {
        let assets = vec![
            Asset::new("Zed", AssetKey([1; 16]), AssetKind::Scene(SceneAsset::default())),
            material("Moss"),
            Asset::new("Box", AssetKey([2; 16]), AssetKind::Geometry(GeometryAsset::default())),
            material("Brick"),
        ];

        let plan = compute_plan(&ResourceCollection::default(), &assets, true).unwrap();
        let order: Vec<&str> = plan.assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(order, vec!["Brick", "Moss", "Box", "Zed"]);

        let plan = compute_plan(&ResourceCollection::default(), &assets, false).unwrap();
        let order: Vec<&str> = plan.assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(order, vec!["Moss", "Brick", "Box", "Zed"]);

        for pair in plan.assets.windows(2) {
            assert!(pair[0].end() <= pair[1].descriptor_offset);
        }
    }

    #[test]
    fn test_asset_alignment_and_padding_sum() {
        let assets = vec![
            material("A"),
            material("B").with_alignment(512),
            material("C").with_alignment(0),
        ];
        let resources = ResourceCollection {
            textures: vec![texture("t", 5)],
            ..ResourceCollection::default()
        };
        let plan = compute_plan(&resources, &assets, false).unwrap();

        assert_eq!(plan.assets[1].descriptor_offset % 512, 0);
        assert_eq!(plan.assets[2].alignment, 1);
        assert_eq!(plan.assets[2].descriptor_offset, plan.assets[1].end());

        assert_eq!(plan.padding.by_section.values().sum::<u64>(), plan.padding.total);
        assert_eq!(plan.padding.section(Section::Assets), plan.assets[1].padding_before);
        assert_eq!(plan.directory.offset % TABLE_ALIGNMENT, 0);
        assert_eq!(plan.directory.size, 3 * DIRECTORY_ENTRY_SIZE as u64);
        assert_eq!(plan.footer.offset + FOOTER_SIZE as u64, plan.file_size);
    }

    #[test]
    fn test_oversized_alignment_is_rejected() {
        let assets = vec![material("A"), material("B").with_alignment(1 << 63)];
        let err = compute_plan(&ResourceCollection::default(), &assets, false).unwrap_err();
        assert!(matches!(err, Error::ValueOutOfRange { field: "asset alignment", .. }));

        let assets = vec![material("A").with_alignment(u64::from(u32::MAX) + 1)];
        let err = compute_plan(&ResourceCollection::default(), &assets, false).unwrap_err();
        assert!(matches!(err, Error::ValueOutOfRange { bits: 32, .. }));
    }

    #[test]
    fn test_name_index_sorted_and_sized() {
        let assets = vec![material("b"), material("a")];
        let plan = compute_plan(&ResourceCollection::default(), &assets, false).unwrap();

        let paths: Vec<&str> = plan.name_index.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
        assert_eq!(plan.name_index.offset % TABLE_ALIGNMENT, 0);
        assert_eq!(plan.name_index.offset, plan.directory.offset + plan.directory.size);
        assert_eq!(plan.footer.offset, plan.name_index.offset + plan.name_index.size);
    }

    #[test]
    fn test_duplicate_asset_names_fail_name_index() {
        let assets = vec![
            material("Rock"),
            Asset::new("Rock", AssetKey::ZERO, AssetKind::Geometry(GeometryAsset::default())),
        ];
        let err = compute_plan(&ResourceCollection::default(), &assets, true).unwrap_err();
        assert!(matches!(err, Error::NameIndexPath { reason: "duplicate path", .. }));

        let err =
            compute_plan(&ResourceCollection::default(), &[material("a/")], true).unwrap_err();
        assert!(matches!(err, Error::NameIndexPath { .. }));
    }

    #[test]
    fn test_plan_is_reproducible() {
        let resources = ResourceCollection {
            textures: vec![texture("b", 9), texture("a", 700)],
            buffers: vec![buffer("vb", 64)],
            audio: Vec::new(),
        };
        let assets = vec![material("x"), material("w").with_alignment(64)];
        let first = compute_plan(&resources, &assets, true).unwrap();
        let second = compute_plan(&resources, &assets, true).unwrap();
        assert_eq!(first, second);
        assert!(first.deterministic);
    }
}
