//! FlashFAT Hardware Abstraction Layer
//!
//! This crate defines the flash device trait that chip drivers implement
//! so the same storage engine can run on any SPI NOR part (or a RAM
//! simulator on the host).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application                            │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  flashfat-core (table, cache, sessions) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  flashfat-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  SPI NOR chip │       │   RamFlash    │
//! │    driver     │       │  (simulator)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::FlashDevice`] - Raw NOR flash access (read, page program,
//!   sector erase, busy status)

#![no_std]
#![deny(unsafe_code)]

pub mod flash;

// Re-export key items at crate root for convenience
pub use flash::{FlashDevice, FlashError};
