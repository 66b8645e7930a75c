//! Pool configuration.

use std::time::Duration;

use crate::error::PoolError;

/// Default stagger between connection-establishment tasks, and the starting
/// value for reconnection backoff.
pub const DEFAULT_SPAWN_FREQUENCY: Duration = Duration::from_millis(100);

/// Default upper bound for reconnection backoff.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(400);

/// Default delay before a discarded connection's replacement is attempted.
pub const DEFAULT_REPLACE_DELAY: Duration = Duration::from_secs(1);

/// What to do with a connection whose borrower failed with an error that is
/// not classified as a disconnect.
///
/// The pool cannot tell whether such a connection is still usable, so the
/// choice is explicit rather than baked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnclassifiedPolicy {
    /// Return the connection to the pool unchanged (optimistic default).
    #[default]
    Reuse,
    /// Discard the connection and schedule a replacement, as if the error
    /// had been classified.
    Replace,
}

/// Configuration for [`Pool`](crate::Pool).
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields in
/// future minor versions without breaking changes. Use [`PoolConfig::new`]
/// and the builder methods to construct instances.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Fixed pool size. After initial population the pool holds exactly
    /// this many connections across {idle, borrowed, being established}.
    pub capacity: usize,

    /// Interval of the keepalive loop; `None` disables probing.
    ///
    /// When set, one connection is drawn and probed every
    /// `keepalive / capacity`, spreading probe load evenly over the cycle.
    pub keepalive: Option<Duration>,

    /// Stagger between the initial population tasks, and the first backoff
    /// step when connection establishment is not ready.
    pub spawn_frequency: Duration,

    /// Cap on the exponential reconnection backoff.
    pub max_backoff: Duration,

    /// Delay before the replacement for a discarded connection is attempted.
    pub replace_delay: Duration,

    /// Policy for unclassified borrower failures.
    pub on_unclassified: UnclassifiedPolicy,
}

impl PoolConfig {
    /// Create a configuration for a pool of `capacity` connections.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            keepalive: None,
            spawn_frequency: DEFAULT_SPAWN_FREQUENCY,
            max_backoff: DEFAULT_MAX_BACKOFF,
            replace_delay: DEFAULT_REPLACE_DELAY,
            on_unclassified: UnclassifiedPolicy::default(),
        }
    }

    /// Enable periodic keepalive probing with the given cycle interval.
    #[must_use]
    pub fn keepalive(mut self, interval: Duration) -> Self {
        self.keepalive = Some(interval);
        self
    }

    /// Set the population stagger / initial backoff step.
    #[must_use]
    pub fn spawn_frequency(mut self, frequency: Duration) -> Self {
        self.spawn_frequency = frequency;
        self
    }

    /// Set the backoff cap.
    #[must_use]
    pub fn max_backoff(mut self, cap: Duration) -> Self {
        self.max_backoff = cap;
        self
    }

    /// Set the delay before a discarded connection is replaced.
    #[must_use]
    pub fn replace_delay(mut self, delay: Duration) -> Self {
        self.replace_delay = delay;
        self
    }

    /// Set the policy for unclassified borrower failures.
    #[must_use]
    pub fn on_unclassified(mut self, policy: UnclassifiedPolicy) -> Self {
        self.on_unclassified = policy;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Configuration`] when a field is out of range.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.capacity == 0 {
            return Err(PoolError::Configuration(
                "capacity must be greater than 0".into(),
            ));
        }
        if self.spawn_frequency.is_zero() {
            return Err(PoolError::Configuration(
                "spawn_frequency must be non-zero".into(),
            ));
        }
        if self.max_backoff < self.spawn_frequency {
            return Err(PoolError::Configuration(
                "max_backoff cannot be smaller than spawn_frequency".into(),
            ));
        }
        if let Some(interval) = self.keepalive {
            if interval.is_zero() {
                return Err(PoolError::Configuration(
                    "keepalive interval must be non-zero".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::new(8);
        assert_eq!(config.capacity, 8);
        assert_eq!(config.keepalive, None);
        assert_eq!(config.spawn_frequency, Duration::from_millis(100));
        assert_eq!(config.max_backoff, Duration::from_secs(400));
        assert_eq!(config.replace_delay, Duration::from_secs(1));
        assert_eq!(config.on_unclassified, UnclassifiedPolicy::Reuse);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = PoolConfig::new(4)
            .keepalive(Duration::from_secs(30))
            .spawn_frequency(Duration::from_millis(50))
            .max_backoff(Duration::from_secs(60))
            .replace_delay(Duration::from_millis(500))
            .on_unclassified(UnclassifiedPolicy::Replace);

        assert_eq!(config.keepalive, Some(Duration::from_secs(30)));
        assert_eq!(config.spawn_frequency, Duration::from_millis(50));
        assert_eq!(config.max_backoff, Duration::from_secs(60));
        assert_eq!(config.replace_delay, Duration::from_millis(500));
        assert_eq!(config.on_unclassified, UnclassifiedPolicy::Replace);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_capacity() {
        let result = PoolConfig::new(0).validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("capacity"));
    }

    #[test]
    fn test_validation_zero_spawn_frequency() {
        let result = PoolConfig::new(1)
            .spawn_frequency(Duration::ZERO)
            .validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_backoff_cap_below_start() {
        let result = PoolConfig::new(1)
            .spawn_frequency(Duration::from_secs(1))
            .max_backoff(Duration::from_millis(10))
            .validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_zero_keepalive() {
        let result = PoolConfig::new(1).keepalive(Duration::ZERO).validate();
        assert!(result.is_err());
    }
}
