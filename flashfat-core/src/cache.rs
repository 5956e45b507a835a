//! Write coalescing cache
//!
//! NOR chips program at most one page per command, so small writes are
//! collected here until a whole cache's worth can go out in page-sized
//! programs. Large writes bypass the cache for their page-aligned part.
//!
//! Before any program the sectors ahead of the cursor are erased, moving
//! the session's erase mark forward one sector at a time.

use embedded_hal::delay::DelayNs;
use flashfat_hal::FlashDevice;

use crate::address::PAGE_SIZE;
use crate::device::Device;
use crate::error::FlashFatError;
use crate::observer::Observer;
use crate::session::Session;

/// Cache capacity in bytes
pub const WRITE_CACHE_SIZE: usize = 256;

const _: () = assert!(WRITE_CACHE_SIZE > 0 && WRITE_CACHE_SIZE % PAGE_SIZE as usize == 0);

/// Pending bytes not yet programmed
pub struct WriteCache {
    buffer: [u8; WRITE_CACHE_SIZE],
    fill: usize,
}

impl Default for WriteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteCache {
    /// Create an empty cache
    pub const fn new() -> Self {
        Self {
            buffer: [0; WRITE_CACHE_SIZE],
            fill: 0,
        }
    }

    /// Number of buffered bytes
    pub fn fill(&self) -> usize {
        self.fill
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }

    /// Buffered bytes
    pub fn pending(&self) -> &[u8] {
        &self.buffer[..self.fill]
    }

    /// Drop buffered bytes without writing them
    pub fn clear(&mut self) {
        self.fill = 0;
    }

    /// Append `data` to the file open in `session`
    ///
    /// Programs every complete cache's worth and keeps the tail buffered.
    /// Errors abort immediately; pages already programmed stay programmed
    /// and the cursor reflects them.
    pub fn feed<F, D, O>(
        &mut self,
        device: &mut Device<F, D, O>,
        session: &mut Session,
        data: &[u8],
    ) -> Result<(), FlashFatError>
    where
        F: FlashDevice,
        D: DelayNs,
        O: Observer,
    {
        let capacity = u64::from(device.capacity());
        let cursor = u64::from(session.cursor());
        let len = data.len() as u64;

        if cursor + self.fill as u64 + len > capacity {
            return Err(FlashFatError::NoMoreSpace);
        }

        let limit = (cursor + len).min(capacity - 1) as u32;
        erase_ahead(device, session, limit)?;

        let mut data = data;

        if self.fill != 0 {
            if self.fill + data.len() < WRITE_CACHE_SIZE {
                self.buffer[self.fill..self.fill + data.len()].copy_from_slice(data);
                self.fill += data.len();
                return Ok(());
            }

            // Top off and flush the full cache
            let take = WRITE_CACHE_SIZE - self.fill;
            self.buffer[self.fill..].copy_from_slice(&data[..take]);
            self.fill = WRITE_CACHE_SIZE;
            program_pages(device, session, &self.buffer)?;
            self.fill = 0;
            data = &data[take..];
        }

        let bulk = (data.len() / WRITE_CACHE_SIZE) * WRITE_CACHE_SIZE;
        program_pages(device, session, &data[..bulk])?;

        let rest = &data[bulk..];
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.fill = rest.len();
        Ok(())
    }

    /// Program whatever is buffered, ending with a short page if needed
    pub fn flush<F, D, O>(
        &mut self,
        device: &mut Device<F, D, O>,
        session: &mut Session,
    ) -> Result<(), FlashFatError>
    where
        F: FlashDevice,
        D: DelayNs,
        O: Observer,
    {
        if self.fill == 0 {
            return Ok(());
        }

        let last = u64::from(session.cursor()) + self.fill as u64 - 1;
        if last >= u64::from(device.capacity()) {
            return Err(FlashFatError::NoMoreSpace);
        }

        erase_ahead(device, session, last as u32)?;
        program_pages(device, session, &self.buffer[..self.fill])?;
        self.fill = 0;
        Ok(())
    }
}

/// Erase sectors until the erase mark is past `limit`
fn erase_ahead<F, D, O>(
    device: &mut Device<F, D, O>,
    session: &mut Session,
    limit: u32,
) -> Result<(), FlashFatError>
where
    F: FlashDevice,
    D: DelayNs,
    O: Observer,
{
    while session.bound() <= limit {
        device.erase_sector(session.bound())?;
        device.wait_idle()?;
        session.extend_bound();
    }
    Ok(())
}

/// Program `data` at the cursor one page at a time
fn program_pages<F, D, O>(
    device: &mut Device<F, D, O>,
    session: &mut Session,
    data: &[u8],
) -> Result<(), FlashFatError>
where
    F: FlashDevice,
    D: DelayNs,
    O: Observer,
{
    for page in data.chunks(PAGE_SIZE as usize) {
        device.program(session.cursor(), page)?;
        session.advance(page.len() as u32);
    }
    Ok(())
}
