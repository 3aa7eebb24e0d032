//! Device configuration
//!
//! A [`DeviceConfig`] describes the physical flash layout of one chip
//! variant: one or two controller/bank pairs, the clock divider for the
//! controller's timing reference, and the write-burst capability. The
//! driver logic is family-generic; everything variant-specific lives here
//! and is fixed at integration time.

use crate::error::FlcError;
use crate::Result;

/// Target frequency of the controller's internal timing reference.
pub const FLC_CLOCK_HZ: u32 = 1_000_000;

/// One physical flash bank and its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankConfig {
    /// Base address of the controller register block
    pub controller_base: u32,
    /// Start of the bank in the logical flash address space
    pub flash_base: u32,
    /// Bank size in bytes
    pub flash_size: u32,
}

/// Write-burst capability of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteBurst {
    /// Single 32-bit word per write trigger
    #[default]
    Single,
    /// 16 bytes (DATA0..DATA3) per write trigger
    Wide16,
}

/// Static description of a chip variant's flash layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Primary bank, always present
    pub primary: BankConfig,
    /// Secondary bank on dual-bank devices
    pub secondary: Option<BankConfig>,
    /// Value for the CLKDIV register, see [`clkdiv_for`]
    pub clkdiv: u32,
    /// Write-burst capability
    pub burst: WriteBurst,
}

impl DeviceConfig {
    /// Build and validate a configuration.
    ///
    /// Address translation relies on the secondary bank starting exactly
    /// where the primary bank ends, so a gapped or overlapping layout is
    /// rejected here rather than misprogramming flash later.
    pub fn new(
        primary: BankConfig,
        secondary: Option<BankConfig>,
        clkdiv: u32,
        burst: WriteBurst,
    ) -> Result<Self> {
        if primary.flash_size == 0 {
            return Err(FlcError::InvalidConfig {
                reason: "primary bank size is zero",
            });
        }
        if let Some(sec) = secondary {
            if sec.flash_size == 0 {
                return Err(FlcError::InvalidConfig {
                    reason: "secondary bank size is zero",
                });
            }
            let expected = primary.flash_base.wrapping_add(primary.flash_size);
            if sec.flash_base != expected {
                return Err(FlcError::InvalidConfig {
                    reason: "secondary bank is not contiguous with the primary bank",
                });
            }
        }
        Ok(Self {
            primary,
            secondary,
            clkdiv,
            burst,
        })
    }

    /// Total flash size across all configured banks.
    pub fn total_size(&self) -> u32 {
        self.primary.flash_size + self.secondary.map_or(0, |s| s.flash_size)
    }
}

/// Compute the CLKDIV value that derives the controller's 1 MHz timing
/// reference from the system clock.
pub const fn clkdiv_for(sys_clk_hz: u32) -> u32 {
    sys_clk_hz / FLC_CLOCK_HZ
}

/// Preset profiles for representative chip variants.
///
/// Integrators targeting other variants use these as templates; nothing in
/// the driver depends on the concrete values.
pub mod profiles {
    use super::*;

    /// Single-bank device: 512 KiB, word writes only, 96 MHz system clock.
    pub const SINGLE_BANK_512K: DeviceConfig = DeviceConfig {
        primary: BankConfig {
            controller_base: 0x4002_9000,
            flash_base: 0x1000_0000,
            flash_size: 512 * 1024,
        },
        secondary: None,
        clkdiv: clkdiv_for(96_000_000),
        burst: WriteBurst::Single,
    };

    /// Dual-bank device: 2 x 512 KiB contiguous, 16-byte burst writes,
    /// 96 MHz system clock.
    pub const DUAL_BANK_1M: DeviceConfig = DeviceConfig {
        primary: BankConfig {
            controller_base: 0x4002_9000,
            flash_base: 0x1000_0000,
            flash_size: 512 * 1024,
        },
        secondary: Some(BankConfig {
            controller_base: 0x4002_9400,
            flash_base: 0x1008_0000,
            flash_size: 512 * 1024,
        }),
        clkdiv: clkdiv_for(96_000_000),
        burst: WriteBurst::Wide16,
    };
}
