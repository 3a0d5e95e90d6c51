//! Cache configuration.

use std::time::Duration;

use crate::error::{CacheError, Result};

/// Configuration for a [`GrantCache`](crate::GrantCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How often the sweeper purges fully-expired entries.
    pub sweep_period: Duration,
    /// Optional bound on the number of cached keys. `None` means unbounded.
    ///
    /// The bound is approximate: concurrent registrations of new keys may
    /// briefly overshoot it.
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    /// Default sweep period: one hour.
    pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(60 * 60);

    /// Set the sweep period.
    pub fn with_sweep_period(mut self, period: Duration) -> Self {
        self.sweep_period = period;
        self
    }

    /// Bound the number of cached keys.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_period.is_zero() {
            return Err(CacheError::InvalidArgument(
                "sweep period must be non-zero".into(),
            ));
        }
        if self.max_entries == Some(0) {
            return Err(CacheError::InvalidArgument(
                "max entries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_period: Self::DEFAULT_SWEEP_PERIOD,
            max_entries: None,
        }
    }
}
