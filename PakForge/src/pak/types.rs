//! Progress reporting types for pack builds

/// Progress callback invoked at coarse section boundaries.
///
/// Purely observational: nothing a callback does can change the output bytes.
pub type ProgressCallback<'a> = &'a (dyn Fn(&PakProgress) + Sync + Send);

/// Progress information during a build
#[derive(Debug, Clone)]
pub struct PakProgress {
    /// Current build phase
    pub phase: PakPhase,
    /// Current item number (1-indexed)
    pub current: usize,
    /// Total number of items
    pub total: usize,
    /// Item being processed (asset name, output path)
    pub current_file: Option<String>,
}

impl PakProgress {
    /// Create a new progress update
    #[must_use]
    pub fn new(phase: PakPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: None,
        }
    }

    /// Create a progress update with an item name
    #[must_use]
    pub fn with_file(
        phase: PakPhase,
        current: usize,
        total: usize,
        file: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            current,
            total,
            current_file: Some(file.into()),
        }
    }

    /// Get the progress percentage (0.0 - 1.0)
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f32 / self.total as f32
        }
    }
}

/// Phase of a pack build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PakPhase {
    /// Computing the layout plan
    Planning,
    /// Writing the file header
    WritingHeader,
    /// Writing resource regions and descriptor tables
    WritingResources,
    /// Writing asset descriptors and trailers
    WritingAssets,
    /// Writing the asset directory
    WritingDirectory,
    /// Writing the name index
    WritingNameIndex,
    /// Writing the footer
    WritingFooter,
    /// Hashing the file and patching the footer checksum
    Checksumming,
    /// Moving the finished file into place
    Publishing,
    /// Build complete
    Complete,
}

impl PakPhase {
    /// Get a human-readable description of this phase
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "Planning layout",
            Self::WritingHeader => "Writing header",
            Self::WritingResources => "Writing resources",
            Self::WritingAssets => "Writing assets",
            Self::WritingDirectory => "Writing directory",
            Self::WritingNameIndex => "Writing name index",
            Self::WritingFooter => "Writing footer",
            Self::Checksumming => "Computing checksum",
            Self::Publishing => "Publishing",
            Self::Complete => "Complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(PakProgress::new(PakPhase::WritingAssets, 1, 4).percentage(), 0.25);
        assert_eq!(PakProgress::new(PakPhase::Complete, 0, 0).percentage(), 1.0);
    }

    #[test]
    fn test_with_file() {
        let progress = PakProgress::with_file(PakPhase::WritingAssets, 2, 3, "Brick");
        assert_eq!(progress.current_file.as_deref(), Some("Brick"));
        assert_eq!(progress.phase.as_str(), "Writing assets");
    }
}
