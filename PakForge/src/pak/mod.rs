//! Pack file planning, encoding, writing and read-back

mod builder;
pub mod checksum;
pub mod format;
mod inspector;
pub mod packer;
pub mod plan;
mod planner;
mod types;
mod writer;

// Primary public API
pub use builder::{BuildReport, PakBuilder};
pub use inspector::{AssetEntryInfo, PakInfo, inspect, inspect_bytes, validate};
pub use planner::compute_plan;
pub use writer::{write_pak, write_pak_with_progress};

// Re-export plan and progress types
pub use plan::{PakPlan, Section};
pub use types::{PakPhase, PakProgress, ProgressCallback};
