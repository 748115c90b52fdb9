//! A fake register window for unit tests
//!
//! Records every register access and answers status polls. Each transfer
//! trigger latches the next byte of a counter into the incoming-data
//! register, so streamed data is predictable. To keep the tests honest about
//! chip selection, a trigger without CE asserted is counted separately.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use crate::address::ChipIndex;
use crate::error::{Error, Result};
use crate::regs::{Ctrl1, Status, REG_CTRL1, REG_RD_DATA, REG_STATUS, REG_WR_DATA};
use crate::window::{RegisterWindow, WindowMapper};

/// One observed register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read32(usize, u32),
    Write32(usize, u32),
    Read8(usize, u8),
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub ctrl: u32,
    pub wr_data: u32,
    pub rd_data: u8,
    pub next_byte: u8,
    pub accesses: Vec<Access>,
    /// Never report idle
    pub stuck: bool,
    /// Status reads answered busy before each transfer completes
    pub busy_polls: u32,
    pub busy_left: u32,
    pub triggers_without_ce: u32,
}

/// Lifecycle events shared between a mapper and its windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    Mapped(usize),
    Unmapped(usize),
}

#[derive(Clone)]
pub struct FakeWindow {
    pub chip: usize,
    pub base: u64,
    pub state: Rc<RefCell<FakeState>>,
    events: Option<Rc<RefCell<Vec<MapEvent>>>>,
}

impl FakeWindow {
    pub fn new(chip: usize) -> Self {
        Self {
            chip,
            base: 0,
            state: Rc::new(RefCell::new(FakeState::default())),
            events: None,
        }
    }

    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.state
            .borrow()
            .accesses
            .iter()
            .filter_map(|a| match a {
                Access::Write32(o, v) if *o == offset => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn ce_active(&self) -> bool {
        self.state.borrow().ctrl & Ctrl1::ACTIVATE_CE.bits() != 0
    }
}

impl RegisterWindow for FakeWindow {
    fn read32(&self, offset: usize) -> u32 {
        let mut s = self.state.borrow_mut();
        let value = match offset {
            REG_CTRL1 => s.ctrl,
            REG_WR_DATA => s.wr_data,
            REG_STATUS => {
                if s.stuck {
                    0
                } else if s.busy_left > 0 {
                    s.busy_left -= 1;
                    0
                } else {
                    Status::IDLE.bits()
                }
            }
            _ => 0,
        };
        s.accesses.push(Access::Read32(offset, value));
        value
    }

    fn write32(&self, offset: usize, value: u32) {
        let mut s = self.state.borrow_mut();
        s.accesses.push(Access::Write32(offset, value));
        match offset {
            REG_CTRL1 => {
                let ctrl = Ctrl1::from_bits_retain(value);
                if ctrl.contains(Ctrl1::START_OP) {
                    if !ctrl.contains(Ctrl1::ACTIVATE_CE) {
                        s.triggers_without_ce += 1;
                    }
                    s.rd_data = s.next_byte;
                    s.next_byte = s.next_byte.wrapping_add(1);
                    s.busy_left = s.busy_polls;
                }
                s.ctrl = value & !Ctrl1::START_OP.bits();
            }
            REG_WR_DATA => s.wr_data = value,
            _ => {}
        }
    }

    fn read8(&self, offset: usize) -> u8 {
        let mut s = self.state.borrow_mut();
        let value = if offset == REG_RD_DATA { s.rd_data } else { 0 };
        s.accesses.push(Access::Read8(offset, value));
        value
    }

    fn delay_us(&self, _us: u32) {}

    fn base_address(&self) -> u64 {
        self.base
    }
}

impl Drop for FakeWindow {
    fn drop(&mut self) {
        // Only the mapper-owned original reports unmapping
        if let Some(events) = self.events.take() {
            events.borrow_mut().push(MapEvent::Unmapped(self.chip));
        }
    }
}

/// Mapper that can be told to fail on a given chip
#[derive(Default)]
pub struct FakeMapper {
    pub fail_at: Option<usize>,
    pub events: Rc<RefCell<Vec<MapEvent>>>,
    /// Handles sharing state with every window handed out
    pub handles: Vec<FakeWindow>,
}

impl FakeMapper {
    pub fn failing_at(chip: usize) -> Self {
        Self {
            fail_at: Some(chip),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<MapEvent> {
        self.events.borrow().clone()
    }
}

impl WindowMapper for FakeMapper {
    type Window = FakeWindow;

    fn map(&mut self, chip: ChipIndex, base: u64, _len: usize) -> Result<FakeWindow> {
        if self.fail_at == Some(chip.get()) {
            return Err(Error::MapFailed { chip: chip.raw() });
        }
        self.events.borrow_mut().push(MapEvent::Mapped(chip.get()));

        let mut handle = FakeWindow::new(chip.get());
        handle.base = base;
        self.handles.push(handle.clone());

        handle.events = Some(self.events.clone());
        Ok(handle)
    }
}
