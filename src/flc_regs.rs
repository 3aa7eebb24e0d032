//! Flash controller (FLC) register definitions
//!
//! Register offsets and bit definitions for the MAX326xx-style flash
//! controller. Every configured bank carries one instance of this register
//! block at its controller base address.
//!
//! # Register Layout
//!
//! | Offset | Register | Description                  |
//! |--------|----------|------------------------------|
//! | 0x00   | ADDR     | Target address               |
//! | 0x04   | CLKDIV   | Clock divide                 |
//! | 0x08   | CN       | Control                      |
//! | 0x24   | INTR     | Interrupt / status           |
//! | 0x30   | DATA0    | Write data, word 0           |
//! | 0x34   | DATA1    | Write data, word 1           |
//! | 0x38   | DATA2    | Write data, word 2           |
//! | 0x3C   | DATA3    | Write data, word 3           |

use bitflags::bitflags;

/// Flash Address register (32 bits)
pub const FLC_REG_ADDR: usize = 0x00;
/// Clock Divide register (32 bits)
pub const FLC_REG_CLKDIV: usize = 0x04;
/// Control register (32 bits)
pub const FLC_REG_CN: usize = 0x08;
/// Interrupt register (32 bits)
pub const FLC_REG_INTR: usize = 0x24;
/// Data register 0 (32 bits)
pub const FLC_REG_DATA0: usize = 0x30;
/// Data register 1 (32 bits)
pub const FLC_REG_DATA1: usize = 0x34;
/// Data register 2 (32 bits)
pub const FLC_REG_DATA2: usize = 0x38;
/// Data register 3 (32 bits)
pub const FLC_REG_DATA3: usize = 0x3C;

// CN bits

/// Write trigger / write-in-progress
pub const CN_WR_OFF: u32 = 0;
pub const CN_WR: u32 = 1 << CN_WR_OFF;
/// Mass-erase trigger / mass-erase-in-progress
pub const CN_ME_OFF: u32 = 1;
pub const CN_ME: u32 = 1 << CN_ME_OFF;
/// Page-erase trigger / page-erase-in-progress
pub const CN_PGE_OFF: u32 = 2;
pub const CN_PGE: u32 = 1 << CN_PGE_OFF;
/// Data width select
pub const CN_WDTH_OFF: u32 = 4;
pub const CN_WDTH: u32 = 1 << CN_WDTH_OFF;
/// Erase code field
pub const CN_ERASE_CODE_OFF: u32 = 8;
pub const CN_ERASE_CODE: u32 = 0xFF << CN_ERASE_CODE_OFF;
/// Erase code: page erase
pub const CN_CODE_PAGE_ERASE: u32 = 0x55 << CN_ERASE_CODE_OFF;
/// Erase code: mass erase
pub const CN_CODE_MASS_ERASE: u32 = 0xAA << CN_ERASE_CODE_OFF;
/// Access-violation pending
pub const CN_PEND_OFF: u32 = 24;
pub const CN_PEND: u32 = 1 << CN_PEND_OFF;
/// Burst-mode enable
pub const CN_BRST_OFF: u32 = 27;
pub const CN_BRST: u32 = 1 << CN_BRST_OFF;
/// Unlock key field
pub const CN_UNLOCK_OFF: u32 = 28;
pub const CN_UNLOCK: u32 = 0xF << CN_UNLOCK_OFF;
/// Magic value that must sit in the unlock field while an operation runs
pub const CN_UNLOCK_VALUE: u32 = 0x2 << CN_UNLOCK_OFF;

// INTR bits

/// Operation done
pub const INTR_DONE_OFF: u32 = 0;
pub const INTR_DONE: u32 = 1 << INTR_DONE_OFF;
/// Access violation
pub const INTR_AF_OFF: u32 = 1;
pub const INTR_AF: u32 = 1 << INTR_AF_OFF;

bitflags! {
    /// The in-progress bits of the CN register.
    ///
    /// In practice the hardware asserts at most one of these at a time, but
    /// the driver treats any set bit as "busy".
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BusyFlags: u32 {
        /// Write in progress
        const WRITE = CN_WR;
        /// Mass erase in progress
        const MASS_ERASE = CN_ME;
        /// Page erase in progress
        const PAGE_ERASE = CN_PGE;
    }
}

impl BusyFlags {
    /// Extract the busy bits from a raw CN value.
    pub fn from_cn(cn: u32) -> Self {
        Self::from_bits_truncate(cn)
    }
}
