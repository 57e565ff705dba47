//! # PakForge
//!
//! Builds single-file binary asset containers ("packs") for a game engine's
//! content pipeline, and reads them back.
//!
//! A build has two steps. The planner computes where every byte goes
//! (resource regions, descriptor tables, asset descriptors, directory, name
//! index, footer). The writer then encodes each structure in plan order,
//! checks it against the plan, checksums the result, and publishes the file
//! atomically.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pakforge::prelude::*;
//!
//! let model = PakModel::from_json_file("level.json")?;
//! let report = PakBuilder::new(&model)
//!     .with_deterministic(true)
//!     .build("level.pak")?;
//! println!("Wrote {} bytes", report.bytes_written);
//!
//! let info = inspect("level.pak")?;
//! assert!(info.checksum_matches);
//! assert!(validate(&info).is_empty());
//! # Ok::<(), pakforge::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `pakforge` command-line binary

pub mod error;
pub mod model;
pub mod pak;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::model::{
        Asset, AssetKey, AssetKind, AudioResource, BufferResource, GeometryAsset, MaterialAsset,
        PakModel, ResourceCollection, SceneAsset, TextureResource,
    };
    pub use crate::pak::{
        BuildReport, PakBuilder, PakInfo, PakPhase, PakPlan, PakProgress, compute_plan, inspect,
        validate, write_pak,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
