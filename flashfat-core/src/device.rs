//! Flash device capability
//!
//! Bundles the raw flash, a delay provider and the observer. Every erase,
//! program and read in the engine goes through here, and each one first
//! waits for the chip to report idle.

use embedded_hal::delay::DelayNs;
use flashfat_hal::FlashDevice;

use crate::address::PAGE_SIZE;
use crate::config::EngineConfig;
use crate::error::FlashFatError;
use crate::observer::Observer;

/// Flash access with bounded busy-waiting
pub struct Device<F, D, O> {
    flash: F,
    delay: D,
    observer: O,
    config: EngineConfig,
}

impl<F, D, O> Device<F, D, O> {
    /// Wrap a flash chip
    pub fn new(flash: F, delay: D, observer: O, config: EngineConfig) -> Self {
        Self {
            flash,
            delay,
            observer,
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Usable device size in bytes
    pub fn capacity(&self) -> u32 {
        self.config.device_size
    }

    /// Get access to the underlying flash
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Get mutable access to the underlying flash
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Get access to the observer
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Get mutable access to the observer
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Split back into flash, delay and observer
    pub fn into_parts(self) -> (F, D, O) {
        (self.flash, self.delay, self.observer)
    }
}

impl<F: FlashDevice, D: DelayNs, O: Observer> Device<F, D, O> {
    /// Initialize the chip
    pub fn init(&mut self) -> Result<(), FlashFatError> {
        self.flash.init()?;
        Ok(())
    }

    /// Spin until the busy flag clears or the timeout expires
    pub fn wait_idle(&mut self) -> Result<(), FlashFatError> {
        let timeout = self.config.busy_timeout_us;
        let interval = self.config.poll_interval_us.max(1);
        let mut waited: u32 = 0;

        while self.flash.is_busy() {
            if waited >= timeout {
                self.observer.busy_timeout(waited);
                return Err(FlashFatError::FlashTimeout);
            }
            self.delay.delay_us(interval);
            waited = waited.saturating_add(interval);
        }

        Ok(())
    }

    /// Start erasing the sector containing `address`
    ///
    /// Returns once the command is issued; the chip is busy afterwards.
    pub fn erase_sector(&mut self, address: u32) -> Result<(), FlashFatError> {
        self.wait_idle()?;
        self.flash.erase_sector(address)?;
        self.observer.sector_erased(address);
        Ok(())
    }

    /// Program up to one page of data at `address`
    pub fn program(&mut self, address: u32, data: &[u8]) -> Result<(), FlashFatError> {
        debug_assert!(data.len() <= PAGE_SIZE as usize);
        self.wait_idle()?;
        self.flash.write(address, data)?;
        self.observer.page_programmed(address, data.len());
        Ok(())
    }

    /// Read `buffer.len()` bytes at `address`
    pub fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashFatError> {
        self.wait_idle()?;
        self.flash.read(address, buffer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use flashfat_drivers::{RamFlash, RamFlashTiming, SimDelay};
    use flashfat_hal::FlashError;

    type Flash = RamFlash<{ 4 * 4096 }>;

    #[test]
    fn test_commands_wait_for_idle() {
        let flash = Flash::with_timing(RamFlashTiming {
            erase_polls: 50,
            program_polls: 5,
        });
        let config = EngineConfig::new().with_device_size(4 * 4096);
        let mut dev = Device::new(flash, SimDelay::new(), NoopObserver, config);

        // Without the idle wait the simulator would reject the program
        dev.erase_sector(0x1000).unwrap();
        dev.program(0x1000, &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 3];
        dev.read(0x1000, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);

        let (flash, delay, _) = dev.into_parts();
        assert_eq!(flash.stats().busy_polls, 55);
        assert_eq!(delay.elapsed_us(), 55 * 10);
    }

    #[test]
    fn test_timeout() {
        let mut flash = Flash::new();
        flash.set_stuck_busy(true);
        let config = EngineConfig::new()
            .with_device_size(4 * 4096)
            .with_busy_timeout_us(1_000)
            .with_poll_interval_us(100);
        let mut dev = Device::new(flash, SimDelay::new(), NoopObserver, config);

        assert_eq!(dev.erase_sector(0x1000), Err(FlashFatError::FlashTimeout));

        let (flash, delay, _) = dev.into_parts();
        assert_eq!(flash.stats().erases, 0);
        assert_eq!(delay.elapsed_us(), 1_000);
    }

    #[test]
    fn test_flash_errors_propagate() {
        let config = EngineConfig::new().with_device_size(4 * 4096);
        let mut dev = Device::new(Flash::new(), SimDelay::new(), NoopObserver, config);

        dev.program(0x1000, &[0]).unwrap();
        assert_eq!(
            dev.program(0x1000, &[0]),
            Err(FlashFatError::Flash(FlashError::NotErased))
        );
    }
}
