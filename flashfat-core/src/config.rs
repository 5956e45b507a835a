//! Engine configuration
//!
//! Timing and geometry knobs for [`crate::engine::FlashFat`]. The defaults
//! match a Winbond W25Q64FV (8MB) polled every 10us with a one second
//! busy timeout.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::address::{FIRST_FILE_ADDRESS, SECTOR_SIZE};

/// Default busy-wait bound (1 second)
pub const DEFAULT_BUSY_TIMEOUT_US: u32 = 1_000_000;

/// Default delay between status polls
pub const DEFAULT_POLL_INTERVAL_US: u32 = 10;

/// Default device size (W25Q64: 64Mbit)
pub const DEFAULT_DEVICE_SIZE: u32 = 8 * 1024 * 1024;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Device size is not a whole number of sectors
    UnalignedDeviceSize,
    /// Device cannot hold the table plus at least one file sector
    DeviceTooSmall,
    /// Poll interval must be non-zero
    ZeroPollInterval,
}

/// Storage engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Maximum time to wait for the busy flag to clear (microseconds)
    pub busy_timeout_us: u32,
    /// Delay between busy flag polls (microseconds)
    pub poll_interval_us: u32,
    /// Total device size in bytes
    pub device_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create a configuration with default values
    pub const fn new() -> Self {
        Self {
            busy_timeout_us: DEFAULT_BUSY_TIMEOUT_US,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            device_size: DEFAULT_DEVICE_SIZE,
        }
    }

    /// Set the busy-wait bound
    pub const fn with_busy_timeout_us(mut self, timeout_us: u32) -> Self {
        self.busy_timeout_us = timeout_us;
        self
    }

    /// Set the poll interval
    pub const fn with_poll_interval_us(mut self, interval_us: u32) -> Self {
        self.poll_interval_us = interval_us;
        self
    }

    /// Set the device size
    pub const fn with_device_size(mut self, size: u32) -> Self {
        self.device_size = size;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_size % SECTOR_SIZE != 0 {
            return Err(ConfigError::UnalignedDeviceSize);
        }
        if self.device_size < FIRST_FILE_ADDRESS + SECTOR_SIZE {
            return Err(ConfigError::DeviceTooSmall);
        }
        if self.poll_interval_us == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}
