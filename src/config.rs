//! Configuration for the versioned index.

/// Configuration for [`MvccArt`](crate::MvccArt).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of versions kept per key. Older versions are dropped
    /// once a chain grows past this; `None` keeps every version.
    pub max_version_depth: Option<usize>,
}

impl Config {
    /// Keep at most `depth` versions per key (at least one is always kept).
    pub fn with_max_version_depth(mut self, depth: usize) -> Self {
        self.max_version_depth = Some(depth.max(1));
        self
    }
}
