//! Emulation of one controller window and the SPI NAND chip behind it
//!
//! The chip follows the SPI NAND read flow: a page read (`0x13`) loads a
//! page into the cache register, a read from cache (`0x03`) starts streaming
//! the cache out one byte per transfer until CE is released. Releasing CE
//! always returns the chip to its idle state.

use std::collections::BTreeMap;

use scai_nand_core::regs::{
    Ctrl1, Status, NAND_READ_CACHE, NAND_READ_PAGE, REG_CTRL1, REG_RD_DATA, REG_STATUS,
    REG_WR_DATA,
};
use scai_nand_core::FlashGeometry;

/// Something the emulated chip observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipEvent {
    /// CE went active
    Selected,
    /// CE went inactive
    Deselected,
    /// A command byte and its address word were received
    Command {
        /// Command byte
        opcode: u8,
        /// Address word as written to the outgoing data register
        address: u32,
    },
}

/// Where the chip is in the SPI NAND protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for a command byte
    Idle,
    /// Command byte received, waiting for the address
    Address(u8),
    /// Clocking the cache register out
    Streaming { pos: usize },
}

/// One emulated chip and its register window
#[derive(Debug)]
pub struct DummyChip {
    geometry: FlashGeometry,
    fill: u8,
    pattern: bool,
    /// Programmed pages (main followed by OOB), keyed by page within the chip
    pages: BTreeMap<u32, Vec<u8>>,
    cache: Vec<u8>,
    state: State,

    ctrl: u32,
    wr_data: u32,
    rd_data: u8,
    busy_polls: u32,
    busy_left: u32,
    stuck: bool,

    events: Vec<ChipEvent>,
    bytes_out: usize,
    stray_triggers: usize,
    quad_triggers: usize,
    protocol_errors: usize,
    mapped: bool,
    index: usize,
}

impl DummyChip {
    pub(crate) fn new(
        index: usize,
        geometry: FlashGeometry,
        fill: u8,
        pattern: bool,
        busy_polls: u32,
    ) -> Self {
        let page_len = (geometry.page_size + geometry.oob_size) as usize;
        Self {
            geometry,
            fill,
            pattern,
            pages: BTreeMap::new(),
            cache: vec![fill; page_len],
            state: State::Idle,
            ctrl: 0,
            wr_data: 0,
            rd_data: 0,
            busy_polls,
            busy_left: 0,
            stuck: false,
            events: Vec::new(),
            bytes_out: 0,
            stray_triggers: 0,
            quad_triggers: 0,
            protocol_errors: 0,
            mapped: false,
            index,
        }
    }

    fn page_len(&self) -> usize {
        (self.geometry.page_size + self.geometry.oob_size) as usize
    }

    /// Content of an unprogrammed page
    fn blank_page(&self, page: u32) -> Vec<u8> {
        if !self.pattern {
            return vec![self.fill; self.page_len()];
        }
        let chip_base = self.index as u64 * self.geometry.chip_size;
        let page_base = chip_base + page as u64 * self.geometry.page_size as u64;
        let main = self.geometry.page_size as u64;
        (0..self.page_len() as u64)
            .map(|i| {
                if i < main {
                    pattern_byte(page_base + i)
                } else {
                    self.fill
                }
            })
            .collect()
    }

    /// Store a page as if it had been programmed
    pub fn program_page(&mut self, page: u32, main: &[u8], oob: &[u8]) {
        let page_size = self.geometry.page_size as usize;
        let mut data = self
            .pages
            .remove(&page)
            .unwrap_or_else(|| self.blank_page(page));
        let main_len = main.len().min(page_size);
        data[..main_len].copy_from_slice(&main[..main_len]);
        let oob_len = oob.len().min(self.geometry.oob_size as usize);
        data[page_size..page_size + oob_len].copy_from_slice(&oob[..oob_len]);
        self.pages.insert(page, data);
    }

    /// Store bytes at an offset inside the chip's main areas
    pub fn program(&mut self, offset: u64, data: &[u8]) {
        let page_size = self.geometry.page_size as u64;
        let mut offset = offset;
        let mut data = data;
        while !data.is_empty() {
            let page = (offset / page_size) as u32;
            let column = (offset % page_size) as usize;
            let len = data.len().min(page_size as usize - column);

            let mut buf = self
                .pages
                .remove(&page)
                .unwrap_or_else(|| self.blank_page(page));
            buf[column..column + len].copy_from_slice(&data[..len]);
            self.pages.insert(page, buf);

            offset += len as u64;
            data = &data[len..];
        }
    }

    /// Never report idle again (or recover)
    pub fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }

    /// Everything observed since the last [`clear_events`](Self::clear_events)
    pub fn events(&self) -> &[ChipEvent] {
        &self.events
    }

    /// Forget recorded events and counters
    pub fn clear_events(&mut self) {
        self.events.clear();
        self.bytes_out = 0;
    }

    /// Bytes clocked out of the cache register
    pub fn bytes_out(&self) -> usize {
        self.bytes_out
    }

    /// Transfers started without CE asserted
    pub fn stray_triggers(&self) -> usize {
        self.stray_triggers
    }

    /// Transfers started with the quad-wire bit set
    pub fn quad_triggers(&self) -> usize {
        self.quad_triggers
    }

    /// Commands the chip did not understand or could not serve
    pub fn protocol_errors(&self) -> usize {
        self.protocol_errors
    }

    /// Whether CE is asserted
    pub fn is_selected(&self) -> bool {
        Ctrl1::from_bits_retain(self.ctrl).contains(Ctrl1::ACTIVATE_CE)
    }

    /// Whether the window is currently mapped
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub(crate) fn set_mapped(&mut self, mapped: bool) {
        self.mapped = mapped;
    }

    pub(crate) fn read32(&mut self, offset: usize) -> u32 {
        match offset {
            REG_CTRL1 => self.ctrl,
            REG_WR_DATA => self.wr_data,
            REG_STATUS => {
                if self.stuck {
                    0
                } else if self.busy_left > 0 {
                    self.busy_left -= 1;
                    0
                } else {
                    Status::IDLE.bits()
                }
            }
            _ => 0,
        }
    }

    pub(crate) fn read8(&mut self, offset: usize) -> u8 {
        if offset == REG_RD_DATA {
            self.rd_data
        } else {
            0
        }
    }

    pub(crate) fn write32(&mut self, offset: usize, value: u32) {
        match offset {
            REG_CTRL1 => self.write_ctrl(value),
            REG_WR_DATA => self.wr_data = value,
            _ => log::debug!("M{}: write to read-only register {:#x}", self.index, offset),
        }
    }

    fn write_ctrl(&mut self, value: u32) {
        let new = Ctrl1::from_bits_retain(value);
        let was_selected = self.is_selected();
        self.ctrl = (new - Ctrl1::START_OP).bits();

        match (was_selected, new.contains(Ctrl1::ACTIVATE_CE)) {
            (false, true) => self.events.push(ChipEvent::Selected),
            (true, false) => {
                self.events.push(ChipEvent::Deselected);
                self.state = State::Idle;
            }
            _ => {}
        }

        if new.contains(Ctrl1::START_OP) {
            self.trigger(new);
        }
    }

    /// One 8-bit transfer on the SPI bus
    fn trigger(&mut self, ctrl: Ctrl1) {
        if self.stuck {
            return;
        }
        self.busy_left = self.busy_polls;

        if !ctrl.contains(Ctrl1::ACTIVATE_CE) {
            self.stray_triggers += 1;
            return;
        }
        if ctrl.contains(Ctrl1::SET_X4NX1) {
            self.quad_triggers += 1;
        }

        self.state = match self.state {
            State::Idle => State::Address(self.wr_data as u8),
            State::Address(opcode) => self.execute(opcode, self.wr_data),
            State::Streaming { pos } => {
                self.rd_data = self.cache.get(pos).copied().unwrap_or(self.fill);
                self.bytes_out += 1;
                State::Streaming { pos: pos + 1 }
            }
        };
    }

    fn execute(&mut self, opcode: u8, address: u32) -> State {
        self.events.push(ChipEvent::Command { opcode, address });
        let offset = (address as u64) << 8;

        match opcode {
            NAND_READ_PAGE => {
                if offset >= self.geometry.chip_size {
                    log::warn!("M{}: page read beyond chip at {:#x}", self.index, offset);
                    self.protocol_errors += 1;
                    return State::Idle;
                }
                let page = (offset / self.geometry.page_size as u64) as u32;
                self.cache = match self.pages.get(&page) {
                    Some(data) => data.clone(),
                    None => self.blank_page(page),
                };
                State::Idle
            }
            NAND_READ_CACHE => State::Streaming {
                pos: offset as usize,
            },
            _ => {
                log::warn!("M{}: unsupported command {:#04x}", self.index, opcode);
                self.protocol_errors += 1;
                State::Idle
            }
        }
    }
}

/// Deterministic content of an unprogrammed byte in pattern mode
pub fn pattern_byte(addr: u64) -> u8 {
    (addr ^ (addr >> 8) ^ (addr >> 16) ^ (addr >> 24)) as u8
}
