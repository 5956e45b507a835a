//! Append-only file allocation table for NOR flash
//!
//! This crate contains the storage engine that sits on top of a raw
//! [`flashfat_hal::FlashDevice`]:
//!
//! - Address translation between linear addresses and page/offset pairs
//! - The on-device allocation table (codec, validation, persistence)
//! - A page-sized write cache that pre-erases sectors ahead of the cursor
//! - The single-session open/read/write/close state machine
//! - Engine configuration and diagnostic observer hooks
//!
//! # Layout
//!
//! ```text
//! 0x0000 ┌──────────────────────┐
//!        │ allocation table     │  "FAT" + count + 7 bytes per file
//! 0x1000 ├──────────────────────┤
//!        │ file 0               │  each file starts on a sector boundary
//!        ├──────────────────────┤
//!        │ file 1               │
//!        ├──────────────────────┤
//!        │ ...                  │
//!        └──────────────────────┘
//! ```
//!
//! Files are written sequentially and only the most recently created file
//! can be appended to. Deleting files only edits the table; flash space is
//! never reclaimed until [`engine::FlashFat::erase_all_files`] resets
//! placement back to the first data sector.

#![no_std]
#![deny(unsafe_code)]

pub mod address;
pub mod cache;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod observer;
pub mod session;
pub mod table;

pub use config::EngineConfig;
pub use engine::FlashFat;
pub use error::FlashFatError;
pub use observer::{NoopObserver, Observer};
pub use session::Mode;
pub use table::{AllocationTable, FileEntry, TableError, MAX_FILES};

#[cfg(feature = "defmt")]
pub use observer::DefmtObserver;
