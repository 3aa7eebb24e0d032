//! Fixed host-side programming contract
//!
//! The external host (debugger, in-system programmer, bootloader tool)
//! drives the flash algorithm through five entry points that report success
//! as 0 and failure as 1. [`FlashAlgo`] adapts [`FlashDriver`]'s typed
//! results onto that contract; retry policy stays with the host.

use crate::bus::RegisterBus;
use crate::driver::FlashDriver;

/// Host return code: operation completed.
pub const STATUS_OK: u32 = 0;
/// Host return code: operation failed.
pub const STATUS_FAILED: u32 = 1;

/// Intent code passed by the host to Init/UnInit.
///
/// Distinguishes what the host is about to do but does not change driver
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Function {
    Erase = 1,
    Program = 2,
    Verify = 3,
}

impl Function {
    /// Decode a raw host function code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Erase),
            2 => Some(Self::Program),
            3 => Some(Self::Verify),
            _ => None,
        }
    }
}

/// Status-code adapter around a [`FlashDriver`].
pub struct FlashAlgo<B: RegisterBus> {
    driver: FlashDriver<B>,
}

impl<B: RegisterBus> FlashAlgo<B> {
    pub fn new(driver: FlashDriver<B>) -> Self {
        Self { driver }
    }

    /// Access the underlying driver.
    pub fn driver(&self) -> &FlashDriver<B> {
        &self.driver
    }

    /// `Init(address, clockHz, functionCode)`
    pub fn init(&self, address: u32, clock_hz: u32, function: Function) -> u32 {
        log::debug!("host init, function {:?}", function);
        status(self.driver.init(address, clock_hz))
    }

    /// `UnInit(functionCode)`
    pub fn uninit(&self, function: Function) -> u32 {
        log::debug!("host uninit, function {:?}", function);
        status(self.driver.uninit())
    }

    /// `EraseChip()`
    pub fn erase_chip(&self) -> u32 {
        status(self.driver.erase_chip())
    }

    /// `EraseSector(address)` — `address` must be the start of an erase unit.
    pub fn erase_sector(&self, address: u32) -> u32 {
        status(self.driver.erase_sector(address))
    }

    /// `ProgramPage(address, size, buffer)` — the size is carried by the
    /// slice; the buffer must be 32-bit aligned.
    pub fn program_page(&self, address: u32, data: &[u8]) -> u32 {
        status(self.driver.program_page(address, data))
    }
}

fn status(result: crate::Result<()>) -> u32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(err) => {
            log::warn!("flash operation failed: {}", err);
            STATUS_FAILED
        }
    }
}
