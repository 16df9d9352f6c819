//! Dispatcher configuration.

/// Hard upper bound on nesting depth, counting the root frame.
pub const MAX_NESTING: usize = 64;

/// Smallest usable limit: the root frame plus one nested level.
pub const MIN_NESTING: usize = 2;

/// Configuration for a [`Dispatcher`](super::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Maximum number of frames, root included.
    ///
    /// Clamped to `MIN_NESTING..=MAX_NESTING`.
    pub max_nesting: usize,
}

impl DispatcherConfig {
    /// Create a configuration with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nesting limit.
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// The limit actually enforced.
    pub fn effective_max_nesting(&self) -> usize {
        self.max_nesting.clamp(MIN_NESTING, MAX_NESTING)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_nesting: MAX_NESTING,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limit() {
        assert_eq!(DispatcherConfig::default().effective_max_nesting(), MAX_NESTING);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(DispatcherConfig::new().with_max_nesting(0).effective_max_nesting(), MIN_NESTING);
        assert_eq!(
            DispatcherConfig::new().with_max_nesting(10_000).effective_max_nesting(),
            MAX_NESTING
        );
        assert_eq!(DispatcherConfig::new().with_max_nesting(8).effective_max_nesting(), 8);
    }
}
