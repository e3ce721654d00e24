//! SerialManagerBuilder -- fluent builder for constructing [`SerialManager`]
//! instances.
//!
//! Separates configuration from construction so callers can adjust the log
//! capacity (and inject a mock provider in tests) before the manager exists.
//!
//! # Example
//!
//! ```ignore
//! let manager = SerialManagerBuilder::new(Box::new(NativePortProvider::first_available()))
//!     .max_log_entries(1000)
//!     .build();
//! ```

use glowlink_core::PortProvider;

use crate::manager::SerialManager;

/// Default capacity of the transport log.
pub const DEFAULT_MAX_LOG_ENTRIES: usize = 500;

/// Fluent builder for [`SerialManager`].
///
/// The only required input is the port provider; everything else has a
/// sensible default, so the simplest usage is
/// [`SerialManager::new`](crate::SerialManager::new).
pub struct SerialManagerBuilder {
    provider: Box<dyn PortProvider>,
    max_log_entries: usize,
}

impl SerialManagerBuilder {
    /// Create a builder over the given port provider.
    pub fn new(provider: Box<dyn PortProvider>) -> Self {
        SerialManagerBuilder {
            provider,
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
        }
    }

    /// Cap the transport log at `n` entries (default: 500). Oldest entries
    /// drop first once the cap is reached.
    pub fn max_log_entries(mut self, n: usize) -> Self {
        self.max_log_entries = n;
        self
    }

    /// Build the manager.
    pub fn build(self) -> SerialManager {
        SerialManager::from_parts(self.provider, self.max_log_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowlink_core::ConnectionStatus;
    use glowlink_test_harness::MockPortProvider;

    #[test]
    fn builder_defaults() {
        let manager = SerialManagerBuilder::new(Box::new(MockPortProvider::new())).build();
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
        assert!(manager.is_supported());
        assert!(manager.log().is_empty());
    }

    #[test]
    fn builder_fluent_chain() {
        let manager = SerialManagerBuilder::new(Box::new(MockPortProvider::new()))
            .max_log_entries(10)
            .build();
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
    }
}
