//! Flash device implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in flashfat-hal:
//!
//! - RAM-backed NOR flash simulator with erase/program/busy semantics
//! - Virtual-time delay provider for driving the simulator on the host

#![no_std]
#![deny(unsafe_code)]

pub mod ram;

pub use ram::{FlashStats, RamFlash, RamFlashTiming, SimDelay};
