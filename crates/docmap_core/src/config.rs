//! Change tracking configuration.

use std::time::Duration;

/// How the diff engine treats a path that is an array on one side and a
/// document on the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeConflictPolicy {
    /// Fail with [`crate::CoreError::ShapeConflict`].
    #[default]
    Error,
    /// Replace the whole subtree with a `set` of the new value.
    Replace,
}

/// Configuration for change tracking.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a snapshot stays valid after it was saved (`None` = forever).
    pub snapshot_ttl: Option<Duration>,

    /// Treatment of array/document shape changes.
    pub shape_conflict: ShapeConflictPolicy,

    /// Maximum nesting depth the diff engine will descend.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_ttl: Some(Duration::from_secs(120)),
            shape_conflict: ShapeConflictPolicy::Error,
            max_depth: 100,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the snapshot lifetime.
    #[must_use]
    pub const fn snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl = Some(ttl);
        self
    }

    /// Keeps snapshots until they are explicitly dropped.
    #[must_use]
    pub const fn without_snapshot_ttl(mut self) -> Self {
        self.snapshot_ttl = None;
        self
    }

    /// Sets the shape conflict policy.
    #[must_use]
    pub const fn shape_conflict(mut self, policy: ShapeConflictPolicy) -> Self {
        self.shape_conflict = policy;
        self
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.snapshot_ttl, Some(Duration::from_secs(120)));
        assert_eq!(config.shape_conflict, ShapeConflictPolicy::Error);
        assert_eq!(config.max_depth, 100);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .without_snapshot_ttl()
            .shape_conflict(ShapeConflictPolicy::Replace)
            .max_depth(8);

        assert!(config.snapshot_ttl.is_none());
        assert_eq!(config.shape_conflict, ShapeConflictPolicy::Replace);
        assert_eq!(config.max_depth, 8);
    }
}
