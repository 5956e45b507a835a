//! RAM-backed NOR flash simulator
//!
//! Behaves like a small SPI NOR chip:
//! - erased bytes read back as 0xFF
//! - programs must stay inside one 256-byte page and may only touch erased bytes
//! - erase and program leave the chip busy for a configurable number of
//!   status polls, and any command issued while busy is rejected
//!
//! The strict checks make erase-before-write and idle-wait mistakes in the
//! storage engine show up as errors instead of silently corrupted data.

use embedded_hal::delay::DelayNs;
use flashfat_hal::{FlashDevice, FlashError};

/// Program page size in bytes
pub const PAGE_SIZE: usize = 256;

/// Erase sector size in bytes
pub const SECTOR_SIZE: usize = 4096;

/// Value of an erased byte
pub const ERASED: u8 = 0xFF;

/// How long (in status polls) each operation keeps the chip busy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamFlashTiming {
    /// Busy polls after a sector erase
    pub erase_polls: u32,
    /// Busy polls after a page program
    pub program_polls: u32,
}

impl Default for RamFlashTiming {
    fn default() -> Self {
        Self {
            erase_polls: 3,
            program_polls: 1,
        }
    }
}

/// Operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashStats {
    /// Sector erases issued
    pub erases: u32,
    /// Page programs issued
    pub programs: u32,
    /// Reads issued
    pub reads: u32,
    /// Status polls that reported busy
    pub busy_polls: u32,
}

/// Simulated NOR flash of `SIZE` bytes
pub struct RamFlash<const SIZE: usize> {
    memory: [u8; SIZE],
    timing: RamFlashTiming,
    busy_remaining: u32,
    stuck_busy: bool,
    initialized: bool,
    stats: FlashStats,
}

impl<const SIZE: usize> Default for RamFlash<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> RamFlash<SIZE> {
    /// Create a fully erased device with default timing
    pub const fn new() -> Self {
        Self {
            memory: [ERASED; SIZE],
            timing: RamFlashTiming {
                erase_polls: 3,
                program_polls: 1,
            },
            busy_remaining: 0,
            stuck_busy: false,
            initialized: false,
            stats: FlashStats {
                erases: 0,
                programs: 0,
                reads: 0,
                busy_polls: 0,
            },
        }
    }

    /// Create a fully erased device with custom timing
    pub fn with_timing(timing: RamFlashTiming) -> Self {
        let mut flash = Self::new();
        flash.timing = timing;
        flash
    }

    /// Device size in bytes
    pub const fn size(&self) -> usize {
        SIZE
    }

    /// Raw view of the memory array
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Operation counters since creation
    pub fn stats(&self) -> FlashStats {
        self.stats
    }

    /// Whether `init` has been called
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Force the busy flag on (or release it)
    ///
    /// Simulates a hung chip so timeout handling can be exercised.
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Overwrite memory directly, bypassing NOR programming rules
    ///
    /// Handy for planting corrupt control blocks in tests.
    pub fn preload(&mut self, address: usize, data: &[u8]) -> Result<(), FlashError> {
        let end = address
            .checked_add(data.len())
            .ok_or(FlashError::OutOfBounds)?;
        if end > SIZE {
            return Err(FlashError::OutOfBounds);
        }
        self.memory[address..end].copy_from_slice(data);
        Ok(())
    }

    fn check_idle(&self) -> Result<(), FlashError> {
        if self.stuck_busy || self.busy_remaining > 0 {
            Err(FlashError::Busy)
        } else {
            Ok(())
        }
    }

    fn range(address: u32, len: usize) -> Result<core::ops::Range<usize>, FlashError> {
        let start = address as usize;
        let end = start.checked_add(len).ok_or(FlashError::OutOfBounds)?;
        if end > SIZE {
            return Err(FlashError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl<const SIZE: usize> FlashDevice for RamFlash<SIZE> {
    fn init(&mut self) -> Result<(), FlashError> {
        self.initialized = true;
        Ok(())
    }

    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashError> {
        self.check_idle()?;
        let range = Self::range(address, buffer.len())?;
        buffer.copy_from_slice(&self.memory[range]);
        self.stats.reads += 1;
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        self.check_idle()?;
        let range = Self::range(address, data.len())?;

        // Programs wrap inside a page on real parts; treat crossing as a bug
        if (range.start % PAGE_SIZE) + data.len() > PAGE_SIZE {
            return Err(FlashError::PageOverflow);
        }

        if self.memory[range.clone()].iter().any(|&b| b != ERASED) {
            return Err(FlashError::NotErased);
        }

        self.memory[range].copy_from_slice(data);
        self.stats.programs += 1;
        self.busy_remaining = self.timing.program_polls;
        Ok(())
    }

    fn erase_sector(&mut self, address: u32) -> Result<(), FlashError> {
        self.check_idle()?;
        let start = (address as usize / SECTOR_SIZE) * SECTOR_SIZE;
        let range = Self::range(start as u32, SECTOR_SIZE)?;

        self.memory[range].fill(ERASED);
        self.stats.erases += 1;
        self.busy_remaining = self.timing.erase_polls;
        Ok(())
    }

    fn is_busy(&mut self) -> bool {
        if self.stuck_busy {
            self.stats.busy_polls += 1;
            return true;
        }
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            self.stats.busy_polls += 1;
            true
        } else {
            false
        }
    }
}

/// Delay provider that only advances a virtual clock
///
/// Lets busy-wait loops run at full speed on the host while still
/// accounting for the time they would have spent on hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    /// Create a delay with the clock at zero
    pub const fn new() -> Self {
        Self { elapsed_ns: 0 }
    }

    /// Total virtual time spent waiting, in nanoseconds
    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed_ns
    }

    /// Total virtual time spent waiting, in microseconds
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns / 1_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Flash = RamFlash<{ 4 * SECTOR_SIZE }>;

    fn wait(flash: &mut Flash) {
        while flash.is_busy() {}
    }

    #[test]
    fn test_fresh_device_is_erased() {
        let mut flash = Flash::new();
        let mut buf = [0u8; 16];
        flash.read(100, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == ERASED));
    }

    #[test]
    fn test_program_then_read() {
        let mut flash = Flash::new();
        flash.write(0x10, &[1, 2, 3]).unwrap();
        wait(&mut flash);

        let mut buf = [0u8; 3];
        flash.read(0x10, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(flash.stats().programs, 1);
    }

    #[test]
    fn test_program_requires_erase() {
        let mut flash = Flash::new();
        flash.write(0, &[0x00]).unwrap();
        wait(&mut flash);

        assert_eq!(flash.write(0, &[0x01]), Err(FlashError::NotErased));

        flash.erase_sector(0).unwrap();
        wait(&mut flash);
        flash.write(0, &[0x01]).unwrap();
    }

    #[test]
    fn test_program_cannot_cross_page() {
        let mut flash = Flash::new();
        let data = [0u8; 4];
        assert_eq!(flash.write(254, &data), Err(FlashError::PageOverflow));
        assert!(flash.write(252, &data).is_ok());
    }

    #[test]
    fn test_commands_rejected_while_busy() {
        let mut flash = Flash::with_timing(RamFlashTiming {
            erase_polls: 2,
            program_polls: 0,
        });
        flash.erase_sector(SECTOR_SIZE as u32).unwrap();

        assert_eq!(flash.write(0, &[1]), Err(FlashError::Busy));
        let mut buf = [0u8; 1];
        assert_eq!(flash.read(0, &mut buf), Err(FlashError::Busy));

        assert!(flash.is_busy());
        assert!(flash.is_busy());
        assert!(!flash.is_busy());
        assert!(flash.write(0, &[1]).is_ok());
    }

    #[test]
    fn test_erase_clears_whole_sector() {
        let mut flash = Flash::new();
        flash.preload(SECTOR_SIZE, &[0u8; SECTOR_SIZE]).unwrap();

        // Any address inside the sector selects it
        flash.erase_sector(SECTOR_SIZE as u32 + 1234).unwrap();
        wait(&mut flash);

        let mem = flash.memory();
        assert!(mem[SECTOR_SIZE..2 * SECTOR_SIZE].iter().all(|&b| b == ERASED));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut flash = Flash::new();
        let mut buf = [0u8; 8];
        let end = flash.size() as u32;
        assert_eq!(flash.read(end - 4, &mut buf), Err(FlashError::OutOfBounds));
        assert_eq!(flash.erase_sector(end), Err(FlashError::OutOfBounds));
    }

    #[test]
    fn test_stuck_busy() {
        let mut flash = Flash::new();
        flash.set_stuck_busy(true);
        for _ in 0..100 {
            assert!(flash.is_busy());
        }
        flash.set_stuck_busy(false);
        assert!(!flash.is_busy());
    }

    #[test]
    fn test_sim_delay_accumulates() {
        let mut delay = SimDelay::new();
        delay.delay_us(10);
        delay.delay_ms(1);
        assert_eq!(delay.elapsed_us(), 1_010);
    }
}
