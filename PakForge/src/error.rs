//! Error types for `PakForge`

use thiserror::Error;

/// The error type for `PakForge` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations (temp file creation, write, rename).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Size Mismatch Errors ====================
    /// A packed structure does not have its declared byte width.
    #[error("packed {structure} is {actual} bytes, expected {expected}")]
    StructSizeMismatch {
        /// Name of the structure being packed.
        structure: &'static str,
        /// Declared size in bytes.
        expected: usize,
        /// Size actually produced.
        actual: usize,
    },

    /// A section was about to be written at a different offset than planned.
    #[error("section {section} starts at offset {actual}, planned {expected}")]
    SectionOffsetMismatch {
        /// Section label.
        section: String,
        /// Planned offset.
        expected: u64,
        /// Current stream position.
        actual: u64,
    },

    /// A section emitted a different number of bytes than planned.
    #[error("section {section} wrote {actual} bytes, planned {expected}")]
    SectionSizeMismatch {
        /// Section label.
        section: String,
        /// Planned size in bytes.
        expected: u64,
        /// Bytes actually written.
        actual: u64,
    },

    // ==================== Model / Reference Errors ====================
    /// An asset references a resource, asset or node that does not exist.
    #[error("{asset}: unresolved {kind} reference '{target}'")]
    UnresolvedReference {
        /// Name of the asset holding the reference.
        asset: String,
        /// What kind of thing was referenced (buffer, texture, material, ...).
        kind: &'static str,
        /// The reference that could not be resolved.
        target: String,
    },

    /// A derived virtual path cannot be placed in the name index.
    #[error("invalid virtual path '{path}': {reason}")]
    NameIndexPath {
        /// The offending virtual path.
        path: String,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// The model violates a structural rule the format depends on.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// A value does not fit the on-disk field that stores it.
    #[error("{field} value {value} does not fit in {bits} bits")]
    ValueOutOfRange {
        /// Field being encoded.
        field: &'static str,
        /// The value that overflowed.
        value: u64,
        /// Width of the on-disk field.
        bits: u32,
    },

    /// The plan handed to the writer does not describe the model.
    #[error("plan does not match model: {0}")]
    PlanMismatch(String),

    // ==================== Read-back Errors ====================
    /// The file does not start with the pack header magic.
    #[error("invalid pack magic: expected PAKFORGE")]
    InvalidPakMagic,

    /// The footer does not end with the footer magic.
    #[error("invalid footer magic: expected PFENDPAK")]
    InvalidFooterMagic,

    /// The file is smaller than a header plus a footer.
    #[error("file too small to be a pack: {size} bytes")]
    TruncatedPak {
        /// Actual file size.
        size: u64,
    },

    // ==================== Parsing Errors ====================
    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn unresolved(asset: &str, kind: &'static str, target: impl Into<String>) -> Self {
        Error::UnresolvedReference {
            asset: asset.to_string(),
            kind,
            target: target.into(),
        }
    }
}

/// A specialized Result type for `PakForge` operations.
pub type Result<T> = std::result::Result<T, Error>;
