//! In-memory flash controller emulator for testing
//!
//! [`SimBank`] emulates one controller register block plus its backing
//! flash array so the protocol code can be exercised without hardware.
//! The emulation keeps the semantics the driver depends on:
//!
//! - triggered operations latch their in-progress bit and self-clear it
//!   after a bounded number of CN reads, so busy-polls terminate;
//! - programming can only clear bits (1 -> 0), erasing sets 0xFF;
//! - operations attempted while the bank is locked, out of range, or under
//!   an injected fault raise the access-violation flag instead of touching
//!   the array;
//! - the harness can make the interrupt register refuse to clear.

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::bus::RegisterBus;
use crate::flc_regs::*;

/// How many CN reads an in-progress bit stays asserted after a trigger.
const BUSY_READS: u32 = 2;

struct SimState {
    addr: u32,
    clkdiv: u32,
    cn: u32,
    intr: u32,
    data: [u32; 4],
    /// Data registers written since the last commit
    data_dirty: [bool; 4],
    flash: Vec<u8>,
    busy_countdown: u32,
    write_count: usize,
    /// Raise AF on the next triggered operation
    fault_next: bool,
    /// INTR ignores all clear attempts
    sticky_fault: bool,
    /// AF only yields to the targeted AF clear, not a plain clear
    refuse_plain_clear: bool,
}

/// Emulated flash bank behind the [`RegisterBus`] seam.
pub struct SimBank {
    base: u32,
    page_size: u32,
    state: RefCell<SimState>,
}

impl SimBank {
    /// Create a bank of `size` bytes with bank-local addressing.
    pub fn new(size: usize, page_size: u32) -> Rc<Self> {
        Self::with_base(0, size, page_size)
    }

    /// Create a bank whose address register expects `base`-relative
    /// addresses, as a controller mapped at a nonzero flash base does.
    pub fn with_base(base: u32, size: usize, page_size: u32) -> Rc<Self> {
        assert!(page_size.is_power_of_two());
        Rc::new(Self {
            base,
            page_size,
            state: RefCell::new(SimState {
                addr: 0,
                clkdiv: 0,
                cn: 0,
                intr: 0,
                data: [0; 4],
                data_dirty: [false; 4],
                flash: vec![0xFF; size],
                busy_countdown: 0,
                write_count: 0,
                fault_next: false,
                sticky_fault: false,
                refuse_plain_clear: false,
            }),
        })
    }

    // Harness accessors

    /// Current CN value, without the busy-countdown side effect of a bus read.
    pub fn cn(&self) -> u32 {
        self.state.borrow().cn
    }

    /// Force a raw CN value (e.g. to present a busy controller).
    pub fn force_cn(&self, cn: u32) {
        let mut st = self.state.borrow_mut();
        st.cn = cn;
        // A forced busy bit stays until forced away again.
        st.busy_countdown = u32::MAX;
    }

    /// Current INTR value.
    pub fn intr(&self) -> u32 {
        self.state.borrow().intr
    }

    /// Seed the INTR register with stale status.
    pub fn set_intr(&self, intr: u32) {
        self.state.borrow_mut().intr = intr;
    }

    /// Last value written to CLKDIV.
    pub fn clkdiv(&self) -> u32 {
        self.state.borrow().clkdiv
    }

    /// Number of register writes seen so far.
    pub fn write_count(&self) -> usize {
        self.state.borrow().write_count
    }

    /// Make the next triggered operation complete with an access violation.
    pub fn fault_next_op(&self) {
        self.state.borrow_mut().fault_next = true;
    }

    /// Make INTR ignore every clear attempt.
    pub fn set_sticky_fault(&self, sticky: bool) {
        self.state.borrow_mut().sticky_fault = sticky;
    }

    /// Make a latched AF yield only to the targeted AF clear.
    pub fn set_refuse_plain_clear(&self, refuse: bool) {
        self.state.borrow_mut().refuse_plain_clear = refuse;
    }

    /// Inspect the flash array.
    pub fn flash<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.state.borrow().flash)
    }

    /// Mutate the flash array (e.g. pre-program a pattern).
    pub fn flash_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.state.borrow_mut().flash)
    }

    fn raise_af(st: &mut SimState) {
        st.intr |= INTR_AF;
    }

    /// Translate the ADDR register into a flash array index, raising AF on
    /// out-of-range targets.
    fn target(st: &mut SimState, base: u32, len: usize) -> Option<usize> {
        let local = st.addr.wrapping_sub(base) as usize;
        if st.addr < base || local + len > st.flash.len() {
            Self::raise_af(st);
            return None;
        }
        Some(local)
    }

    fn start_op(st: &mut SimState, busy_bit: u32) {
        st.cn |= busy_bit;
        st.busy_countdown = BUSY_READS;
    }

    /// Check lock state and injected faults before touching the array.
    fn op_allowed(st: &mut SimState) -> bool {
        if st.cn & CN_UNLOCK != CN_UNLOCK_VALUE || core::mem::take(&mut st.fault_next) {
            Self::raise_af(st);
            return false;
        }
        true
    }

    fn commit_write(&self, st: &mut SimState) {
        let wide = st.data_dirty[1] || st.data_dirty[2] || st.data_dirty[3];
        let len = if wide { 16 } else { 4 };
        st.data_dirty = [false; 4];

        if !Self::op_allowed(st) {
            return;
        }
        if wide && st.addr & 0xF != 0 {
            Self::raise_af(st);
            return;
        }
        let Some(index) = Self::target(st, self.base, len) else {
            return;
        };
        let data = st.data;
        for (i, byte) in data[..len / 4]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .enumerate()
        {
            // Flash programming: can only change 1 -> 0
            st.flash[index + i] &= byte;
        }
    }

    fn commit_mass_erase(&self, st: &mut SimState) {
        if !Self::op_allowed(st) {
            return;
        }
        if st.cn & CN_ERASE_CODE != CN_CODE_MASS_ERASE {
            Self::raise_af(st);
            return;
        }
        st.flash.fill(0xFF);
    }

    fn commit_page_erase(&self, st: &mut SimState) {
        if !Self::op_allowed(st) {
            return;
        }
        if st.cn & CN_ERASE_CODE != CN_CODE_PAGE_ERASE {
            Self::raise_af(st);
            return;
        }
        let page_mask = self.page_size - 1;
        let page = st.addr & !page_mask;
        let saved = st.addr;
        st.addr = page;
        if let Some(index) = Self::target(st, self.base, self.page_size as usize) {
            st.flash[index..index + self.page_size as usize].fill(0xFF);
        }
        st.addr = saved;
    }
}

impl RegisterBus for SimBank {
    fn read32(&self, offset: usize) -> u32 {
        let mut st = self.state.borrow_mut();
        match offset {
            FLC_REG_ADDR => st.addr,
            FLC_REG_CLKDIV => st.clkdiv,
            FLC_REG_CN => {
                let value = st.cn;
                // In-progress bits self-clear once the countdown runs out.
                if st.cn & (CN_WR | CN_ME | CN_PGE) != 0 && st.busy_countdown != u32::MAX {
                    if st.busy_countdown == 0 {
                        st.cn &= !(CN_WR | CN_ME | CN_PGE);
                    } else {
                        st.busy_countdown -= 1;
                    }
                }
                value
            }
            FLC_REG_INTR => st.intr,
            FLC_REG_DATA0 => st.data[0],
            FLC_REG_DATA1 => st.data[1],
            FLC_REG_DATA2 => st.data[2],
            FLC_REG_DATA3 => st.data[3],
            _ => 0,
        }
    }

    fn write32(&self, offset: usize, value: u32) {
        let mut st = self.state.borrow_mut();
        st.write_count += 1;
        match offset {
            FLC_REG_ADDR => st.addr = value,
            FLC_REG_CLKDIV => st.clkdiv = value,
            FLC_REG_CN => {
                let was = st.cn;
                st.cn = value;
                let triggered = value & !was;
                if triggered & CN_WR != 0 {
                    self.commit_write(&mut st);
                    Self::start_op(&mut st, CN_WR);
                }
                if triggered & CN_ME != 0 {
                    self.commit_mass_erase(&mut st);
                    Self::start_op(&mut st, CN_ME);
                }
                if triggered & CN_PGE != 0 {
                    self.commit_page_erase(&mut st);
                    Self::start_op(&mut st, CN_PGE);
                }
            }
            FLC_REG_INTR => {
                if st.sticky_fault {
                    // Fault condition: status refuses to clear.
                } else if st.refuse_plain_clear && value != INTR_AF {
                    st.intr &= INTR_AF;
                } else if value == INTR_AF {
                    st.intr &= !INTR_AF;
                } else {
                    st.intr = value;
                }
            }
            FLC_REG_DATA0 => {
                st.data[0] = value;
                st.data_dirty[0] = true;
            }
            FLC_REG_DATA1 => {
                st.data[1] = value;
                st.data_dirty[1] = true;
            }
            FLC_REG_DATA2 => {
                st.data[2] = value;
                st.data_dirty[2] = true;
            }
            FLC_REG_DATA3 => {
                st.data[3] = value;
                st.data_dirty[3] = true;
            }
            _ => {}
        }
    }
}
