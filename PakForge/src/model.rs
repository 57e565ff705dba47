//! In-memory pack model
//!
//! The model is what the content pipeline hands to the pack engine after the
//! authored asset files have been parsed and validated. Every resource and asset kind is
//! its own type, so missing fields fail at deserialization time rather than
//! falling back to silent defaults in the packer.

use std::fmt;
use std::path::Path;

use glam::{Quat, Vec3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::Result;
use crate::pak::format::{AssetType, ResourceType};

// =============================================================================
// Keys
// =============================================================================

/// 16-byte asset key. Zero-filled when the model does not provide one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetKey(pub [u8; 16]);

impl AssetKey {
    /// The all-zero key.
    pub const ZERO: AssetKey = AssetKey([0; 16]);

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 16]
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<Uuid> for AssetKey {
    fn from(uuid: Uuid) -> Self {
        AssetKey(*uuid.as_bytes())
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0).hyphenated())
    }
}

impl Serialize for AssetKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AssetKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Uuid::parse_str(&text)
            .map(AssetKey::from)
            .map_err(serde::de::Error::custom)
    }
}

/// Base64 encoding for raw payloads in JSON snapshots
mod payload {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}

fn one_u8() -> u8 {
    1
}

fn one_u16() -> u16 {
    1
}

fn one_f32() -> f32 {
    1.0
}

fn default_alignment() -> u64 {
    1
}

// =============================================================================
// Resources
// =============================================================================

/// Common view over the three raw resource kinds.
pub trait Resource {
    /// Which region/table this resource lives in.
    const TYPE: ResourceType;

    fn name(&self) -> &str;

    fn data(&self) -> &[u8];
}

/// A texture payload plus its surface description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureResource {
    pub name: String,
    #[serde(with = "payload")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub texture_type: u8,
    #[serde(default)]
    pub compression: u8,
    pub width: u32,
    pub height: u32,
    #[serde(default = "one_u16")]
    pub depth: u16,
    #[serde(default = "one_u16")]
    pub array_layers: u16,
    #[serde(default = "one_u16")]
    pub mip_levels: u16,
    #[serde(default)]
    pub format: u8,
    #[serde(default = "default_texture_alignment")]
    pub alignment: u16,
}

fn default_texture_alignment() -> u16 {
    256
}

/// A GPU buffer payload (vertices, indices, constants).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferResource {
    pub name: String,
    #[serde(with = "payload")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub usage_flags: u32,
    #[serde(default)]
    pub element_stride: u32,
    #[serde(default)]
    pub element_format: u8,
}

/// An audio clip payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioResource {
    pub name: String,
    #[serde(with = "payload")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub sample_rate: u32,
    #[serde(default)]
    pub channels: u16,
    #[serde(default)]
    pub bits_per_sample: u16,
    #[serde(default)]
    pub format: u8,
}

impl Resource for TextureResource {
    const TYPE: ResourceType = ResourceType::Texture;

    fn name(&self) -> &str {
        &self.name
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Resource for BufferResource {
    const TYPE: ResourceType = ResourceType::Buffer;

    fn name(&self) -> &str {
        &self.name
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Resource for AudioResource {
    const TYPE: ResourceType = ResourceType::Audio;

    fn name(&self) -> &str {
        &self.name
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

/// All raw resources of a build, grouped by type in model order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceCollection {
    #[serde(default)]
    pub textures: Vec<TextureResource>,
    #[serde(default)]
    pub buffers: Vec<BufferResource>,
    #[serde(default)]
    pub audio: Vec<AudioResource>,
}

// =============================================================================
// Assets
// =============================================================================

/// A typed asset with its directory-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    #[serde(default)]
    pub key: AssetKey,
    /// Required alignment of the descriptor offset (0 is treated as 1).
    #[serde(default = "default_alignment")]
    pub alignment: u64,
    #[serde(default = "one_u8")]
    pub version: u8,
    #[serde(default)]
    pub streaming_priority: u8,
    #[serde(default)]
    pub variant_flags: u32,
    #[serde(flatten)]
    pub kind: AssetKind,
}

/// The closed set of asset kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetKind {
    Material(MaterialAsset),
    Geometry(GeometryAsset),
    Scene(SceneAsset),
}

impl Asset {
    /// Create an asset with default header fields.
    pub fn new(name: impl Into<String>, key: AssetKey, kind: AssetKind) -> Self {
        Self {
            name: name.into(),
            key,
            alignment: 1,
            version: 1,
            streaming_priority: 0,
            variant_flags: 0,
            kind,
        }
    }

    /// Set the descriptor alignment
    #[must_use]
    pub fn with_alignment(mut self, alignment: u64) -> Self {
        self.alignment = alignment;
        self
    }

    #[must_use]
    pub fn asset_type(&self) -> AssetType {
        match self.kind {
            AssetKind::Material(_) => AssetType::Material,
            AssetKind::Geometry(_) => AssetType::Geometry,
            AssetKind::Scene(_) => AssetType::Scene,
        }
    }

    /// Effective alignment, never zero.
    #[must_use]
    pub fn effective_alignment(&self) -> u64 {
        self.alignment.max(1)
    }

    /// Virtual path used by the name index.
    #[must_use]
    pub fn virtual_path(&self) -> String {
        format!("/{}", self.name)
    }
}

// ------------------------------ Material -------------------------------------

/// Rendering domain of a material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MaterialDomain {
    #[default]
    Opaque = 1,
    AlphaBlended = 2,
    Masked = 3,
    Decal = 4,
    UserInterface = 5,
    PostProcess = 6,
}

/// Pipeline stage a shader reference binds to. The discriminant is the bit
/// index in the material's stage mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ShaderStage {
    Amplification = 0,
    Mesh = 1,
    Vertex = 2,
    Hull = 3,
    Domain = 4,
    Geometry = 5,
    Pixel = 6,
    Compute = 7,
}

impl ShaderStage {
    #[must_use]
    pub fn bit(self) -> u32 {
        1 << (self as u8)
    }
}

/// A shader used by a material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderReference {
    pub stage: ShaderStage,
    pub id: String,
    #[serde(default)]
    pub hash: u64,
}

/// Named texture slots of a material, each referencing a texture resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialTextures {
    #[serde(default)]
    pub base_color: Option<String>,
    #[serde(default)]
    pub normal: Option<String>,
    #[serde(default)]
    pub metallic: Option<String>,
    #[serde(default)]
    pub roughness: Option<String>,
    #[serde(default)]
    pub ambient_occlusion: Option<String>,
    #[serde(default)]
    pub emissive: Option<String>,
}

impl MaterialTextures {
    /// Slots in on-disk order.
    #[must_use]
    pub fn slots(&self) -> [Option<&str>; 6] {
        [
            self.base_color.as_deref(),
            self.normal.as_deref(),
            self.metallic.as_deref(),
            self.roughness.as_deref(),
            self.ambient_occlusion.as_deref(),
            self.emissive.as_deref(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialAsset {
    #[serde(default)]
    pub domain: MaterialDomain,
    #[serde(default)]
    pub flags: u32,
    #[serde(default = "white")]
    pub base_color: [f32; 4],
    #[serde(default = "one_f32")]
    pub normal_scale: f32,
    #[serde(default)]
    pub metalness: f32,
    #[serde(default = "one_f32")]
    pub roughness: f32,
    #[serde(default = "one_f32")]
    pub ambient_occlusion: f32,
    #[serde(default = "half")]
    pub alpha_cutoff: f32,
    #[serde(default)]
    pub textures: MaterialTextures,
    #[serde(default)]
    pub emissive_factor: [f32; 3],
    #[serde(default)]
    pub shaders: Vec<ShaderReference>,
}

fn white() -> [f32; 4] {
    [1.0; 4]
}

fn half() -> f32 {
    0.5
}

impl Default for MaterialAsset {
    fn default() -> Self {
        Self {
            domain: MaterialDomain::Opaque,
            flags: 0,
            base_color: white(),
            normal_scale: 1.0,
            metalness: 0.0,
            roughness: 1.0,
            ambient_occlusion: 1.0,
            alpha_cutoff: half(),
            textures: MaterialTextures::default(),
            emissive_factor: [0.0; 3],
            shaders: Vec::new(),
        }
    }
}

impl MaterialAsset {
    /// Stage mask derived from the shader references.
    #[must_use]
    pub fn shader_stage_mask(&self) -> u32 {
        self.shaders.iter().fold(0, |mask, shader| mask | shader.stage.bit())
    }
}

// ------------------------------ Geometry -------------------------------------

/// Axis-aligned bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

/// Index/vertex range drawn by a submesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshView {
    pub first_index: u32,
    pub index_count: u32,
    pub first_vertex: u32,
    pub vertex_count: u32,
}

/// Part of a mesh rendered with one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submesh {
    pub name: String,
    /// Name of a material asset.
    pub material: String,
    #[serde(default)]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub mesh_views: Vec<MeshView>,
}

/// Mesh variant stored in a LOD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mesh_type", rename_all = "snake_case")]
pub enum MeshKind {
    /// Mesh backed by buffer resources.
    Standard {
        vertex_buffer: String,
        #[serde(default)]
        index_buffer: Option<String>,
        #[serde(default)]
        bounding_box: BoundingBox,
    },
    /// Mesh generated at load time from an opaque parameter blob.
    Procedural {
        #[serde(with = "payload", default)]
        params: Vec<u8>,
    },
}

/// One level of detail of a geometry asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshLod {
    pub name: String,
    #[serde(flatten)]
    pub kind: MeshKind,
    #[serde(default)]
    pub submeshes: Vec<Submesh>,
}

impl MeshLod {
    /// Mesh views across all submeshes.
    #[must_use]
    pub fn mesh_view_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.mesh_views.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryAsset {
    #[serde(default)]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub lods: Vec<MeshLod>,
}

// ------------------------------ Scene ----------------------------------------

/// Node visibility flag.
pub const NODE_FLAG_VISIBLE: u32 = 0x1;

fn default_node_flags() -> u32 {
    NODE_FLAG_VISIBLE
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default)]
    pub key: AssetKey,
    /// Parent node index; `None` marks a root.
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default = "default_node_flags")]
    pub flags: u32,
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

impl SceneNode {
    /// A visible node at the identity transform.
    pub fn new(name: impl Into<String>, parent: Option<u32>) -> Self {
        Self {
            name: name.into(),
            key: AssetKey::ZERO,
            parent,
            flags: NODE_FLAG_VISIBLE,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

fn visible() -> bool {
    true
}

/// Attaches a geometry asset to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renderable {
    pub node: u32,
    /// Name of a geometry asset.
    pub geometry: String,
    #[serde(default = "visible")]
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "projection", rename_all = "snake_case")]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub node: u32,
    #[serde(flatten)]
    pub projection: Projection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneAsset {
    #[serde(default)]
    pub nodes: Vec<SceneNode>,
    #[serde(default)]
    pub renderables: Vec<Renderable>,
    #[serde(default)]
    pub cameras: Vec<Camera>,
}

impl SceneAsset {
    pub fn perspective_cameras(&self) -> impl Iterator<Item = &Camera> {
        self.cameras
            .iter()
            .filter(|c| matches!(c.projection, Projection::Perspective { .. }))
    }

    pub fn orthographic_cameras(&self) -> impl Iterator<Item = &Camera> {
        self.cameras
            .iter()
            .filter(|c| matches!(c.projection, Projection::Orthographic { .. }))
    }
}

// =============================================================================
// Model
// =============================================================================

/// A validated build model: everything that goes into one pack file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PakModel {
    #[serde(default)]
    pub content_version: u16,
    /// Build GUID written to the header. Must be non-zero; a missing GUID
    /// deserializes as nil.
    #[serde(default)]
    pub guid: Uuid,
    #[serde(default)]
    pub resources: ResourceCollection,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl PakModel {
    /// An empty model with the given build GUID
    #[must_use]
    pub fn new(guid: Uuid) -> Self {
        Self {
            content_version: 0,
            guid,
            resources: ResourceCollection::default(),
            assets: Vec::new(),
        }
    }

    /// Parse a model snapshot from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a model snapshot from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
