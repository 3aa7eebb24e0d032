//! Register-access abstraction for the flash controller block
//!
//! The protocol code in [`crate::controller`] only ever touches controller
//! registers through the [`RegisterBus`] trait, so the same sequencing logic
//! runs against the real memory-mapped block ([`Mmio`]) and against the
//! simulated bank used by the test suite ([`crate::sim::SimBank`]).

/// 32-bit register access over one controller register block.
///
/// Offsets are byte offsets from the controller base, always word-aligned
/// (see [`crate::flc_regs`]). Implementations may use interior mutability;
/// the driver is single-threaded and never issues concurrent accesses.
pub trait RegisterBus {
    /// Read a 32-bit register at `offset`.
    fn read32(&self, offset: usize) -> u32;

    /// Write a 32-bit register at `offset`.
    fn write32(&self, offset: usize, value: u32);
}

impl<B: RegisterBus + ?Sized> RegisterBus for &B {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }
}

#[cfg(feature = "alloc")]
impl<B: RegisterBus + ?Sized> RegisterBus for alloc::rc::Rc<B> {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }
}

#[cfg(feature = "alloc")]
impl<B: RegisterBus + ?Sized> RegisterBus for alloc::sync::Arc<B> {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }
}

/// Memory-mapped register block at a fixed base address.
///
/// This is the production implementation: volatile 32-bit accesses straight
/// to the controller's register window.
pub struct Mmio {
    base: *mut u32,
}

impl Mmio {
    /// Span of the register block in bytes (DATA3 is the last register).
    pub const WINDOW_SIZE: usize = crate::flc_regs::FLC_REG_DATA3 + 4;

    /// Create a register bus over the controller block at `base`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `base` is the word-aligned base address of a flash controller
    ///   register block that stays mapped for the lifetime of this value
    /// - no other code is accessing the same register block
    pub unsafe fn new(base: u32) -> Self {
        debug_assert!(base & 3 == 0, "unaligned controller base");
        Self {
            base: base as *mut u32,
        }
    }
}

impl RegisterBus for Mmio {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        debug_assert!(offset + 4 <= Self::WINDOW_SIZE);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit read");
        unsafe { core::ptr::read_volatile(self.base.add(offset / 4)) }
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= Self::WINDOW_SIZE);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit write");
        unsafe { core::ptr::write_volatile(self.base.add(offset / 4), value) }
    }
}

// Send + Sync are safe because we're accessing MMIO registers which
// don't have the usual memory aliasing concerns
unsafe impl Send for Mmio {}
unsafe impl Sync for Mmio {}
