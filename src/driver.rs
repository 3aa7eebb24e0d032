//! Linear-range flash driver over one or two banks
//!
//! [`FlashDriver`] presents the configured banks as one contiguous
//! erasable, programmable byte range. Each operation resolves the target
//! bank from the address, runs the per-bank protocol from
//! [`crate::controller`], and surfaces the result; nothing is retried and
//! no state is carried between calls beyond the immutable configuration.

use crate::bus::{Mmio, RegisterBus};
use crate::config::{DeviceConfig, WriteBurst};
use crate::controller::FlcController;
use crate::error::FlcError;
use crate::Result;

/// Which physical bank an address resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankIndex {
    Primary,
    Secondary,
}

/// Driver for the whole logical flash range of one device.
pub struct FlashDriver<B: RegisterBus> {
    config: DeviceConfig,
    primary: FlcController<B>,
    secondary: Option<FlcController<B>>,
}

impl FlashDriver<Mmio> {
    /// Map the configured controller bases and build a driver over them.
    ///
    /// # Safety
    ///
    /// The controller base addresses in `config` must point at live flash
    /// controller register blocks that no other code is accessing.
    pub unsafe fn from_mmio(config: DeviceConfig) -> Self {
        let primary = FlcController::new(Mmio::new(config.primary.controller_base));
        let secondary = config
            .secondary
            .map(|bank| FlcController::new(Mmio::new(bank.controller_base)));
        Self {
            config,
            primary,
            secondary,
        }
    }
}

impl<B: RegisterBus> FlashDriver<B> {
    /// Build a driver from explicit register buses.
    ///
    /// The secondary bus must be present exactly when the configuration
    /// describes a secondary bank.
    pub fn new(config: DeviceConfig, primary_bus: B, secondary_bus: Option<B>) -> Result<Self> {
        if config.secondary.is_some() != secondary_bus.is_some() {
            return Err(FlcError::BankMismatch);
        }
        Ok(Self {
            config,
            primary: FlcController::new(primary_bus),
            secondary: secondary_bus.map(FlcController::new),
        })
    }

    /// The device configuration this driver was built for.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Resolve a logical address to a bank and its controller-local address.
    ///
    /// Addresses at or above the secondary bank's start are rebased by
    /// subtracting the primary bank's size; the banks are contiguous, so
    /// everything below stays on the primary controller unchanged.
    pub fn resolve(&self, address: u32) -> (BankIndex, u32) {
        match self.config.secondary {
            Some(bank) if address >= bank.flash_base => {
                (BankIndex::Secondary, address - self.config.primary.flash_size)
            }
            _ => (BankIndex::Primary, address),
        }
    }

    fn controller(&self, bank: BankIndex) -> &FlcController<B> {
        match bank {
            BankIndex::Primary => &self.primary,
            // Resolution never yields Secondary unless the bank exists.
            BankIndex::Secondary => self.secondary.as_ref().unwrap_or(&self.primary),
        }
    }

    /// Prepare every configured bank for a batch of operations.
    ///
    /// Programs the clock divider so the controller timing reference runs
    /// correctly relative to the system clock. A busy primary bank fails
    /// the call without touching the secondary.
    pub fn init(&self, address: u32, clock_hz: u32) -> Result<()> {
        log::debug!(
            "init: base {:#010x}, system clock {} Hz, clkdiv {}",
            address,
            clock_hz,
            self.config.clkdiv
        );

        if self.primary.is_busy() {
            return Err(FlcError::ControllerBusy);
        }
        self.primary.set_clkdiv(self.config.clkdiv);

        if let Some(secondary) = &self.secondary {
            if secondary.is_busy() {
                return Err(FlcError::ControllerBusy);
            }
            secondary.set_clkdiv(self.config.clkdiv);
        }
        Ok(())
    }

    /// Force every configured bank into the locked, safe-at-rest state.
    ///
    /// Safe to call whether or not any operation ran before it.
    pub fn uninit(&self) -> Result<()> {
        log::debug!("uninit: locking all banks");
        self.primary.lock();
        if let Some(secondary) = &self.secondary {
            secondary.lock();
        }
        Ok(())
    }

    /// Mass-erase every configured bank.
    ///
    /// A failing primary erase returns immediately without touching the
    /// secondary bank.
    pub fn erase_chip(&self) -> Result<()> {
        log::debug!("erase chip");
        self.primary.mass_erase()?;
        if let Some(secondary) = &self.secondary {
            secondary.mass_erase()?;
        }
        Ok(())
    }

    /// Erase the single erase unit containing `address`.
    ///
    /// The host issues one call per unit; `address` is expected to be
    /// unit-aligned.
    pub fn erase_sector(&self, address: u32) -> Result<()> {
        let (bank, local) = self.resolve(address);
        log::debug!("erase sector {:#010x} ({:?} local {:#010x})", address, bank, local);
        self.controller(bank).page_erase(local)
    }

    /// Program `data` starting at `address`.
    ///
    /// The source buffer must be 32-bit aligned (hardware requirement for
    /// word-level programming). Writes proceed in up to four phases: single
    /// words until the target is 16-byte aligned, 16-byte bursts on
    /// wide-burst devices, single-word tail, and a final masked partial
    /// word for the last 1-3 bytes. Unwritten lanes of the partial word
    /// stay all-ones, the erased state, so they are a no-op in flash.
    pub fn program_page(&self, address: u32, data: &[u8]) -> Result<()> {
        if data.as_ptr() as usize & 0x3 != 0 {
            return Err(FlcError::UnalignedBuffer);
        }

        let (bank, mut addr) = self.resolve(address);
        log::debug!(
            "program {} bytes at {:#010x} ({:?} local {:#010x})",
            data.len(),
            address,
            bank,
            addr
        );
        let flc = self.controller(bank);

        flc.prepare()?;

        let mut offset = 0;
        let mut remaining = data.len();

        // Single words until the target reaches a burst boundary.
        while remaining >= 4 && addr & 0x1F != 0 {
            flc.write_word(addr, word_at(data, offset));
            addr += 4;
            offset += 4;
            remaining -= 4;
        }

        if self.config.burst == WriteBurst::Wide16 {
            while remaining >= 16 {
                flc.write_burst16(
                    addr,
                    [
                        word_at(data, offset),
                        word_at(data, offset + 4),
                        word_at(data, offset + 8),
                        word_at(data, offset + 12),
                    ],
                );
                addr += 16;
                offset += 16;
                remaining -= 16;
            }
        }

        while remaining >= 4 {
            flc.write_word(addr, word_at(data, offset));
            addr += 4;
            offset += 4;
            remaining -= 4;
        }

        if remaining > 0 {
            let mut word = u32::MAX;
            for (lane, &byte) in data[offset..].iter().enumerate() {
                word &= !(0xFF << (lane * 8));
                word |= (byte as u32) << (lane * 8);
            }
            flc.write_word(addr, word);
        }

        flc.lock();
        flc.check_access_violation()
    }
}

/// Load one little-endian word from the source buffer.
fn word_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[cfg(all(test, feature = "alloc"))]
mod tests {
    use super::*;
    use crate::config::BankConfig;
    use crate::flc_regs::*;
    use crate::sim::SimBank;
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;

    const PAGE: u32 = 0x2000;
    const BANK: u32 = 4 * PAGE;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn single_bank(burst: WriteBurst) -> (Rc<SimBank>, FlashDriver<Rc<SimBank>>) {
        init_logging();
        let bank = SimBank::new(BANK as usize, PAGE);
        let config = DeviceConfig::new(
            BankConfig {
                controller_base: 0,
                flash_base: 0,
                flash_size: BANK,
            },
            None,
            96,
            burst,
        )
        .unwrap();
        let driver = FlashDriver::new(config, Rc::clone(&bank), None).unwrap();
        (bank, driver)
    }

    fn dual_bank() -> (Rc<SimBank>, Rc<SimBank>, FlashDriver<Rc<SimBank>>) {
        init_logging();
        let primary = SimBank::new(BANK as usize, PAGE);
        let secondary = SimBank::new(BANK as usize, PAGE);
        let config = DeviceConfig::new(
            BankConfig {
                controller_base: 0,
                flash_base: 0,
                flash_size: BANK,
            },
            Some(BankConfig {
                controller_base: 0x400,
                flash_base: BANK,
                flash_size: BANK,
            }),
            96,
            WriteBurst::Wide16,
        )
        .unwrap();
        let driver =
            FlashDriver::new(config, Rc::clone(&primary), Some(Rc::clone(&secondary))).unwrap();
        (primary, secondary, driver)
    }

    fn assert_locked(bank: &SimBank) {
        assert_eq!(bank.cn() & CN_UNLOCK, 0, "bank left unlocked");
    }

    #[test]
    fn test_single_bank_resolution_is_identity() {
        let (_, driver) = single_bank(WriteBurst::Single);
        for addr in [0, 4, PAGE, BANK - 4, BANK + 0x1000] {
            assert_eq!(driver.resolve(addr), (BankIndex::Primary, addr));
        }
    }

    #[test]
    fn test_dual_bank_resolution_rebases_secondary() {
        let (_, _, driver) = dual_bank();
        assert_eq!(driver.resolve(BANK - 4), (BankIndex::Primary, BANK - 4));
        assert_eq!(driver.resolve(BANK), (BankIndex::Secondary, 0));
        assert_eq!(driver.resolve(BANK + 0x123), (BankIndex::Secondary, 0x123));
    }

    #[test]
    fn test_init_programs_clkdiv_on_all_banks() {
        let (primary, secondary, driver) = dual_bank();
        driver.init(0, 96_000_000).unwrap();
        assert_eq!(primary.clkdiv(), 96);
        assert_eq!(secondary.clkdiv(), 96);
    }

    #[test]
    fn test_init_busy_primary_short_circuits() {
        let (primary, secondary, driver) = dual_bank();
        primary.force_cn(CN_ME);
        assert_eq!(driver.init(0, 96_000_000), Err(FlcError::ControllerBusy));
        assert_eq!(secondary.write_count(), 0);
        assert_eq!(secondary.clkdiv(), 0);
    }

    #[test]
    fn test_uninit_locks_all_banks() {
        let (primary, secondary, driver) = dual_bank();
        primary.force_cn(CN_UNLOCK_VALUE);
        secondary.force_cn(CN_UNLOCK_VALUE);
        driver.uninit().unwrap();
        assert_locked(&primary);
        assert_locked(&secondary);
    }

    #[test]
    fn test_erase_chip_blanks_both_banks() {
        let (primary, secondary, driver) = dual_bank();
        primary.flash_mut(|m| m.fill(0x00));
        secondary.flash_mut(|m| m.fill(0x00));
        driver.erase_chip().unwrap();
        assert!(primary.flash(|m| m.iter().all(|&b| b == 0xFF)));
        assert!(secondary.flash(|m| m.iter().all(|&b| b == 0xFF)));
        assert_locked(&primary);
        assert_locked(&secondary);
    }

    #[test]
    fn test_erase_chip_failure_never_touches_secondary() {
        let (primary, secondary, driver) = dual_bank();
        primary.force_cn(CN_WR);
        assert_eq!(driver.erase_chip(), Err(FlcError::ControllerBusy));
        assert_eq!(secondary.write_count(), 0);
        assert_eq!(secondary.cn(), 0);
    }

    #[test]
    fn test_erase_sector_in_secondary_range() {
        let (primary, secondary, driver) = dual_bank();
        primary.flash_mut(|m| m.fill(0x00));
        secondary.flash_mut(|m| m.fill(0x00));
        driver.erase_sector(BANK + PAGE).unwrap();
        assert!(primary.flash(|m| m.iter().all(|&b| b == 0x00)));
        assert!(secondary.flash(|m| m[..PAGE as usize].iter().all(|&b| b == 0x00)));
        assert!(secondary
            .flash(|m| m[PAGE as usize..2 * PAGE as usize].iter().all(|&b| b == 0xFF)));
        assert_locked(&secondary);
    }

    /// Source buffer with guaranteed 32-bit alignment (the `u32` backing
    /// store mirrors the word-aligned transfer buffer a real host uses).
    struct SrcBuf {
        words: Vec<u32>,
        len: usize,
    }

    impl SrcBuf {
        fn pattern(len: usize) -> Self {
            let mut words = vec![0u32; len.div_ceil(4).max(1)];
            for i in 0..len {
                let byte = (i as u8).wrapping_mul(31).wrapping_add(7);
                words[i / 4] |= (byte as u32) << ((i % 4) * 8);
            }
            Self { words, len }
        }

        fn bytes(&self) -> &[u8] {
            unsafe { core::slice::from_raw_parts(self.words.as_ptr().cast(), self.len) }
        }
    }

    fn check_roundtrip(burst: WriteBurst, start: u32, len: usize) {
        let (bank, driver) = single_bank(burst);
        let src = SrcBuf::pattern(len);
        driver.program_page(start, src.bytes()).unwrap();
        bank.flash(|m| {
            let start = start as usize;
            assert_eq!(&m[start..start + len], src.bytes(), "payload mismatch");
            // Bytes beyond the payload within the final word stay erased.
            let tail_end = (start + len + 3) & !3;
            assert!(m[start + len..tail_end].iter().all(|&b| b == 0xFF));
        });
        assert_locked(&bank);
    }

    #[test]
    fn test_program_sizes_across_all_phases() {
        for burst in [WriteBurst::Single, WriteBurst::Wide16] {
            for len in [0, 1, 3, 4, 7, 15, 16, 17, 31, 32, 57, 64] {
                check_roundtrip(burst, 0x40, len);
            }
        }
    }

    #[test]
    fn test_program_from_unaligned_start_address() {
        // 0x14 is word-aligned but not burst-aligned, so the alignment
        // phase runs before any burst.
        check_roundtrip(WriteBurst::Wide16, 0x14, 44);
        check_roundtrip(WriteBurst::Wide16, 0x14, 9);
    }

    #[test]
    fn test_program_empty_slice_only_locks() {
        let (bank, driver) = single_bank(WriteBurst::Wide16);
        let src = SrcBuf::pattern(0);
        driver.program_page(0x40, src.bytes()).unwrap();
        assert!(bank.flash(|m| m.iter().all(|&b| b == 0xFF)));
        assert_locked(&bank);
    }

    #[test]
    fn test_program_three_byte_tail_masks_high_lane() {
        let (bank, driver) = single_bank(WriteBurst::Single);
        let src = SrcBuf {
            words: vec![0x0033_2211],
            len: 3,
        };
        driver.program_page(0x80, src.bytes()).unwrap();
        // Little-endian lanes: stored word is 0xFF332211.
        assert_eq!(bank.flash(|m| m[0x80..0x84].to_vec()), [0x11, 0x22, 0x33, 0xFF]);
    }

    #[test]
    fn test_program_rejects_unaligned_buffer_without_register_writes() {
        let (bank, driver) = single_bank(WriteBurst::Wide16);
        let backing = vec![0xA5u8; 16];
        let skew = (4 - (backing.as_ptr() as usize % 4) + 1) % 4;
        let data = &backing[skew..skew + 8];
        assert_eq!(data.as_ptr() as usize % 4, 1);
        assert_eq!(driver.program_page(0x40, data), Err(FlcError::UnalignedBuffer));
        assert_eq!(bank.write_count(), 0);
    }

    #[test]
    fn test_program_narrow_burst_never_loads_wide_data_regs() {
        let (bank, driver) = single_bank(WriteBurst::Single);
        let src = SrcBuf::pattern(64);
        driver.program_page(0x0, src.bytes()).unwrap();
        assert_ne!(bank.read32(FLC_REG_DATA0), 0);
        assert_eq!(bank.read32(FLC_REG_DATA1), 0);
        assert_eq!(bank.read32(FLC_REG_DATA2), 0);
        assert_eq!(bank.read32(FLC_REG_DATA3), 0);
    }

    #[test]
    fn test_program_reports_access_violation_and_locks() {
        let (bank, driver) = single_bank(WriteBurst::Single);
        bank.fault_next_op();
        let src = SrcBuf::pattern(8);
        assert_eq!(
            driver.program_page(0x40, src.bytes()),
            Err(FlcError::AccessViolation)
        );
        assert_locked(&bank);
    }

    #[test]
    fn test_program_busy_controller_fails_before_writes() {
        let (bank, driver) = single_bank(WriteBurst::Single);
        bank.force_cn(CN_PGE);
        let src = SrcBuf::pattern(8);
        assert_eq!(
            driver.program_page(0x40, src.bytes()),
            Err(FlcError::ControllerBusy)
        );
        assert_locked(&bank);
    }

    #[test]
    fn test_program_into_secondary_bank() {
        let (primary, secondary, driver) = dual_bank();
        let src = SrcBuf::pattern(40);
        driver.program_page(BANK + 0x20, src.bytes()).unwrap();
        assert!(primary.flash(|m| m.iter().all(|&b| b == 0xFF)));
        assert_eq!(secondary.flash(|m| m[0x20..0x48].to_vec()), src.bytes());
        assert_locked(&primary);
        assert_locked(&secondary);
    }

    #[test]
    fn test_nonzero_flash_base_addressing() {
        init_logging();
        let base = 0x1000_0000u32;
        let primary = SimBank::with_base(base, BANK as usize, PAGE);
        let secondary = SimBank::with_base(base, BANK as usize, PAGE);
        let config = DeviceConfig::new(
            BankConfig {
                controller_base: 0x4002_9000,
                flash_base: base,
                flash_size: BANK,
            },
            Some(BankConfig {
                controller_base: 0x4002_9400,
                flash_base: base + BANK,
                flash_size: BANK,
            }),
            96,
            WriteBurst::Wide16,
        )
        .unwrap();
        let driver =
            FlashDriver::new(config, Rc::clone(&primary), Some(Rc::clone(&secondary))).unwrap();

        // The secondary controller sees the logical address minus the
        // primary bank size, which lands back at the shared flash base.
        assert_eq!(driver.resolve(base + BANK), (BankIndex::Secondary, base));

        let src = SrcBuf::pattern(20);
        driver.program_page(base + BANK + 0x10, src.bytes()).unwrap();
        assert_eq!(secondary.flash(|m| m[0x10..0x24].to_vec()), src.bytes());
    }

    #[test]
    fn test_new_rejects_mismatched_buses() {
        init_logging();
        let bank = SimBank::new(BANK as usize, PAGE);
        let config = DeviceConfig::new(
            BankConfig {
                controller_base: 0,
                flash_base: 0,
                flash_size: BANK,
            },
            None,
            96,
            WriteBurst::Single,
        )
        .unwrap();
        let extra = SimBank::new(BANK as usize, PAGE);
        assert!(matches!(
            FlashDriver::new(config, Rc::clone(&bank), Some(extra)),
            Err(FlcError::BankMismatch)
        ));
    }
}
