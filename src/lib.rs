//! maxflc - flash programming driver for MAX326xx-style flash controllers
//!
//! This crate sequences the register protocol of the on-chip flash
//! controller (FLC) found on MAX326xx-family microcontrollers so an
//! external programming host can treat the whole flash array as one
//! linear, erasable, programmable byte range.
//!
//! # Overview
//!
//! Dual-bank devices expose two independent controllers covering two
//! contiguous address ranges; [`FlashDriver`] resolves every operation to
//! the right bank and runs the fixed command sequence: unlock, clear stale
//! status, select the operation, trigger, busy-wait, re-lock, check for an
//! access violation. Page programming honors three write granularities -
//! single 32-bit words, 16-byte bursts on capable devices, and a masked
//! partial word for the final 1-3 bytes.
//!
//! The host-facing contract (Init / UnInit / EraseChip / EraseSector /
//! ProgramPage returning 0 on success, 1 on failure) lives in [`algo`].
//!
//! # Testing without hardware
//!
//! All register access goes through the [`bus::RegisterBus`] seam. The
//! production implementation is a volatile memory-mapped window
//! ([`bus::Mmio`]); the [`sim`] module provides an in-memory controller
//! emulation whose busy bits self-clear, so the protocol logic is fully
//! testable on a host machine.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod algo;
pub mod bus;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod flc_regs;
#[cfg(feature = "alloc")]
pub mod sim;

pub use algo::{FlashAlgo, Function, STATUS_FAILED, STATUS_OK};
pub use bus::{Mmio, RegisterBus};
pub use config::{clkdiv_for, BankConfig, DeviceConfig, WriteBurst};
pub use controller::FlcController;
pub use driver::{BankIndex, FlashDriver};
pub use error::FlcError;
pub use flc_regs::BusyFlags;

/// Result type for flash driver operations
pub type Result<T> = core::result::Result<T, FlcError>;
