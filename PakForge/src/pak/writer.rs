//! Pack writer
//!
//! Emits every section strictly in plan order, checking each section's
//! offset and length against the plan as it goes. The file is assembled in
//! a temporary file next to the destination, checksummed, and only then
//! renamed into place.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tempfile::NamedTempFile;

use super::checksum::{checksum_field_offset, checksum_reader};
use super::format::{AssetType, ResourceType};
use super::packer::{
    DIRECTORY_ENTRY_SIZE, DirectoryEntryRecord, FOOTER_SIZE, FooterRecord, HEADER_SIZE,
    HeaderRecord, ReferenceResolver, RegionRecord, asset_descriptor_size, asset_trailer_size,
    pack_asset, pack_audio_descriptor, pack_buffer_descriptor, pack_directory_entry, pack_footer,
    pack_header, pack_name_index, pack_texture_descriptor,
};
use super::plan::{PakPlan, ResourcePlan};
use super::types::{PakPhase, PakProgress, ProgressCallback};
use crate::error::{Error, Result};
use crate::model::{AssetKey, PakModel, Resource};

/// Write `model` laid out by `plan` to `destination`.
///
/// Returns the number of bytes written. On any error the destination is
/// left untouched.
pub fn write_pak(model: &PakModel, plan: &PakPlan, destination: impl AsRef<Path>) -> Result<u64> {
    write_pak_with_progress(model, plan, destination, &|_| {})
}

/// Write a pack with a progress callback
pub fn write_pak_with_progress(
    model: &PakModel,
    plan: &PakPlan,
    destination: impl AsRef<Path>,
    progress: ProgressCallback,
) -> Result<u64> {
    let destination = destination.as_ref();
    check_plan(model, plan)?;

    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(parent)?;
    tracing::debug!("Writing pack to temporary file {}", temp.path().display());

    let written = {
        let mut stream = PakStream::new(BufWriter::new(temp.as_file_mut()));
        write_sections(&mut stream, model, plan, progress)?;
        stream.finish()?
    };
    if written != plan.file_size {
        return Err(Error::SectionSizeMismatch {
            section: "file".to_string(),
            expected: plan.file_size,
            actual: written,
        });
    }

    progress(&PakProgress::new(PakPhase::Checksumming, 0, 1));
    let checksum = patch_checksum(temp.as_file_mut(), written)?;
    tracing::debug!("Checksum {:#010x}", checksum);

    progress(&PakProgress::with_file(
        PakPhase::Publishing,
        0,
        1,
        destination.display().to_string(),
    ));
    temp.persist(destination).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Wrote {} bytes to {}", written, destination.display());
    progress(&PakProgress::new(PakPhase::Complete, 1, 1));
    Ok(written)
}

/// Output stream that knows its position and refuses to move backwards.
struct PakStream<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> PakStream<W> {
    fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Zero-pad up to `offset`.
    fn pad_to(&mut self, section: &str, offset: u64) -> Result<()> {
        if offset < self.position {
            return Err(Error::SectionOffsetMismatch {
                section: section.to_string(),
                expected: offset,
                actual: self.position,
            });
        }
        let gap = offset - self.position;
        std::io::copy(&mut std::io::repeat(0).take(gap), &mut self.inner)?;
        self.position = offset;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    /// Write one whole section at its planned offset with its planned size.
    fn write_section(&mut self, section: &str, offset: u64, bytes: &[u8], size: u64) -> Result<()> {
        self.pad_to(section, offset)?;
        if bytes.len() as u64 != size {
            return Err(Error::SectionSizeMismatch {
                section: section.to_string(),
                expected: size,
                actual: bytes.len() as u64,
            });
        }
        self.write_bytes(bytes)
    }

    /// Check that everything written since `start` adds up to `size`.
    fn check_span(&self, section: &str, start: u64, size: u64) -> Result<()> {
        let actual = self.position - start;
        if actual == size {
            Ok(())
        } else {
            Err(Error::SectionSizeMismatch {
                section: section.to_string(),
                expected: size,
                actual,
            })
        }
    }

    fn finish(mut self) -> Result<u64> {
        self.inner.flush()?;
        Ok(self.position)
    }
}

fn write_sections<W: Write>(
    stream: &mut PakStream<W>,
    model: &PakModel,
    plan: &PakPlan,
    progress: ProgressCallback,
) -> Result<()> {
    progress(&PakProgress::new(PakPhase::WritingHeader, 0, 1));
    let header = pack_header(&HeaderRecord::new(model.content_version, *model.guid.as_bytes()))?;
    stream.write_section("header", 0, &header, plan.header_size)?;

    let resource_total: usize = plan.resources.iter().map(|r| r.entries.len()).sum();
    let mut resource_done = 0;
    for resource_type in ResourceType::ALL {
        let resource_plan = plan.resource(resource_type);
        if resource_plan.entries.is_empty() {
            continue;
        }
        write_region(stream, model, resource_plan)?;
        write_table(stream, model, resource_plan)?;
        resource_done += resource_plan.entries.len();
        progress(&PakProgress::with_file(
            PakPhase::WritingResources,
            resource_done,
            resource_total,
            resource_type.as_str(),
        ));
    }

    let resolver = PlanResolver { plan };
    let asset_total = plan.assets.len();
    for (i, asset_plan) in plan.assets.iter().enumerate() {
        progress(&PakProgress::with_file(
            PakPhase::WritingAssets,
            i + 1,
            asset_total,
            asset_plan.name.as_str(),
        ));
        let asset = &model.assets[asset_plan.source_index];
        let bytes = pack_asset(asset, &resolver)?;
        stream.write_section(
            &format!("{} '{}'", asset_plan.asset_type, asset_plan.name),
            asset_plan.descriptor_offset,
            &bytes,
            asset_plan.total_size(),
        )?;
    }

    if plan.directory.size > 0 {
        progress(&PakProgress::new(PakPhase::WritingDirectory, 0, asset_total));
        let mut directory = Vec::with_capacity(plan.directory.size as usize);
        for (i, asset_plan) in plan.assets.iter().enumerate() {
            let entry = DirectoryEntryRecord {
                key: asset_plan.key,
                asset_type: asset_plan.asset_type as u8,
                entry_offset: plan.directory.offset + (i * DIRECTORY_ENTRY_SIZE) as u64,
                descriptor_offset: asset_plan.descriptor_offset,
                descriptor_size: u32::try_from(asset_plan.total_size()).map_err(|_| {
                    Error::ValueOutOfRange {
                        field: "descriptor size",
                        value: asset_plan.total_size(),
                        bits: 32,
                    }
                })?,
            };
            directory.extend_from_slice(&pack_directory_entry(&entry)?);
        }
        stream.write_section("directory", plan.directory.offset, &directory, plan.directory.size)?;
    }

    if !plan.name_index.is_absent() {
        progress(&PakProgress::new(PakPhase::WritingNameIndex, 0, 1));
        let index = pack_name_index(&plan.name_index.entries)?;
        stream.write_section("name index", plan.name_index.offset, &index, plan.name_index.size)?;
    }

    progress(&PakProgress::new(PakPhase::WritingFooter, 0, 1));
    let footer = FooterRecord {
        directory: RegionRecord {
            offset: plan.directory.offset,
            size: plan.directory.size,
        },
        asset_count: plan.directory.asset_count,
        regions: plan.resources.each_ref().map(|r| r.region.record()),
        tables: plan.resources.each_ref().map(|r| r.table.record()),
        name_index: RegionRecord {
            offset: plan.name_index.offset,
            size: plan.name_index.size,
        },
        // Patched once the whole file has been hashed
        checksum: 0,
    };
    stream.write_section("footer", plan.footer.offset, &pack_footer(&footer)?, plan.footer.size)
}

fn write_region<W: Write>(
    stream: &mut PakStream<W>,
    model: &PakModel,
    resource_plan: &ResourcePlan,
) -> Result<()> {
    let section = format!("{} region", resource_plan.resource_type);
    let region = &resource_plan.region;
    stream.pad_to(&section, region.offset)?;
    let start = stream.position;

    for entry in &resource_plan.entries {
        let data = resource_data(model, resource_plan.resource_type, entry.source_index);
        stream.pad_to(&section, entry.data_offset)?;
        stream.write_bytes(data)?;
    }

    stream.check_span(&section, start, region.size)
}

fn write_table<W: Write>(
    stream: &mut PakStream<W>,
    model: &PakModel,
    resource_plan: &ResourcePlan,
) -> Result<()> {
    let table = &resource_plan.table;
    let mut bytes = Vec::with_capacity(table.size() as usize);
    for entry in &resource_plan.entries {
        let index = entry.source_index;
        let descriptor = match resource_plan.resource_type {
            ResourceType::Texture => {
                pack_texture_descriptor(&model.resources.textures[index], entry.data_offset)?
            }
            ResourceType::Buffer => {
                pack_buffer_descriptor(&model.resources.buffers[index], entry.data_offset)?
            }
            ResourceType::Audio => {
                pack_audio_descriptor(&model.resources.audio[index], entry.data_offset)?
            }
        };
        bytes.extend_from_slice(&descriptor);
    }
    stream.write_section(
        &format!("{} table", resource_plan.resource_type),
        table.offset,
        &bytes,
        table.size(),
    )
}

fn resource_data(model: &PakModel, resource_type: ResourceType, index: usize) -> &[u8] {
    match resource_type {
        ResourceType::Texture => model.resources.textures[index].data(),
        ResourceType::Buffer => model.resources.buffers[index].data(),
        ResourceType::Audio => model.resources.audio[index].data(),
    }
}

/// Hash the finished file and write the checksum into the footer.
fn patch_checksum(file: &mut File, file_size: u64) -> Result<u32> {
    let checksum = checksum_reader(file, file_size)?;
    let field = checksum_field_offset(file_size).ok_or(Error::TruncatedPak { size: file_size })?;
    file.seek(SeekFrom::Start(field))?;
    file.write_u32::<LittleEndian>(checksum)?;
    file.sync_all()?;
    Ok(checksum)
}

/// Resolves references against the planned table order.
struct PlanResolver<'a> {
    plan: &'a PakPlan,
}

impl ReferenceResolver for PlanResolver<'_> {
    fn texture_index(&self, name: &str) -> Option<u32> {
        self.plan.resource(ResourceType::Texture).index_of(name)
    }

    fn buffer_index(&self, name: &str) -> Option<u32> {
        self.plan.resource(ResourceType::Buffer).index_of(name)
    }

    fn asset_key(&self, name: &str, asset_type: AssetType) -> Option<AssetKey> {
        self.plan.asset_key(name, asset_type)
    }
}

/// Reject a plan that was not computed from this model.
fn check_plan(model: &PakModel, plan: &PakPlan) -> Result<()> {
    if model.guid.is_nil() {
        return Err(Error::InvalidModel("build GUID must be non-zero".to_string()));
    }
    if plan.header_size != HEADER_SIZE as u64 || plan.footer.size != FOOTER_SIZE as u64 {
        return Err(Error::PlanMismatch(
            "header or footer size differs from the format".to_string(),
        ));
    }

    check_resources(&model.resources.textures, plan.resource(ResourceType::Texture))?;
    check_resources(&model.resources.buffers, plan.resource(ResourceType::Buffer))?;
    check_resources(&model.resources.audio, plan.resource(ResourceType::Audio))?;

    if plan.assets.len() != model.assets.len() {
        return Err(Error::PlanMismatch(format!(
            "plan has {} assets, model has {}",
            plan.assets.len(),
            model.assets.len()
        )));
    }
    for asset_plan in &plan.assets {
        let matches = model.assets.get(asset_plan.source_index).is_some_and(|asset| {
            asset.name == asset_plan.name
                && asset.key == asset_plan.key
                && asset.asset_type() == asset_plan.asset_type
                && asset_descriptor_size(asset_plan.asset_type) as u64 == asset_plan.descriptor_size
                && asset_trailer_size(&asset.kind) as u64 == asset_plan.trailer_size
        });
        if !matches {
            return Err(Error::PlanMismatch(format!(
                "{} '{}' does not match the model",
                asset_plan.asset_type, asset_plan.name
            )));
        }
    }
    Ok(())
}

fn check_resources<R: Resource>(items: &[R], resource_plan: &ResourcePlan) -> Result<()> {
    if items.len() != resource_plan.entries.len() {
        return Err(Error::PlanMismatch(format!(
            "plan has {} {} entries, model has {}",
            resource_plan.entries.len(),
            R::TYPE,
            items.len()
        )));
    }
    for entry in &resource_plan.entries {
        let matches = items.get(entry.source_index).is_some_and(|item| {
            item.name() == entry.name && item.data().len() as u64 == entry.size
        });
        if !matches {
            return Err(Error::PlanMismatch(format!(
                "{} '{}' does not match the model",
                R::TYPE,
                entry.name
            )));
        }
    }
    Ok(())
}
