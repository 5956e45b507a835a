//! Engine error type

use core::fmt;

use flashfat_hal::FlashError;

use crate::config::ConfigError;
use crate::table::TableError;

/// Errors returned by the storage engine
///
/// None of these are retried internally. After a `FlashTimeout` or
/// `Flash` error in the middle of a write the session cursor and cache may
/// be partially advanced; re-open or re-initialize before trusting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashFatError {
    /// No "FAT" identifier at address 0; the table is treated as absent
    NoTableFound,
    /// Identifier present but the table contents are invalid
    CorruptTable(TableError),
    /// Device stayed busy past the configured bound
    FlashTimeout,
    /// Read requested for a file index past the end of the table
    BadFileDescriptor,
    /// Read/write called without a matching open session
    ModeMismatch,
    /// Table is full, or the device has no room left
    NoMoreSpace,
    /// Engine configuration rejected
    InvalidConfig(ConfigError),
    /// Raw device operation failed
    Flash(FlashError),
}

impl From<FlashError> for FlashFatError {
    fn from(e: FlashError) -> Self {
        FlashFatError::Flash(e)
    }
}

impl From<TableError> for FlashFatError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::BadMagic => FlashFatError::NoTableFound,
            other => FlashFatError::CorruptTable(other),
        }
    }
}

impl From<ConfigError> for FlashFatError {
    fn from(e: ConfigError) -> Self {
        FlashFatError::InvalidConfig(e)
    }
}

impl fmt::Display for FlashFatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashFatError::NoTableFound => write!(f, "no allocation table found"),
            FlashFatError::CorruptTable(e) => write!(f, "corrupt allocation table: {:?}", e),
            FlashFatError::FlashTimeout => write!(f, "flash busy timeout"),
            FlashFatError::BadFileDescriptor => write!(f, "bad file descriptor"),
            FlashFatError::ModeMismatch => write!(f, "session mode mismatch"),
            FlashFatError::NoMoreSpace => write!(f, "no more space"),
            FlashFatError::InvalidConfig(e) => write!(f, "invalid config: {:?}", e),
            FlashFatError::Flash(e) => write!(f, "flash error: {:?}", e),
        }
    }
}
