//! scai-nand-dummy - Emulated SCAI NAND bank for testing
//!
//! This crate provides a register-level emulator of the SCAI controller and
//! the SPI NAND chips behind it. The driver core runs against it unchanged,
//! so every register access of a page read can be checked without hardware.
//!
//! # Example
//!
//! ```ignore
//! use scai_nand_dummy::{DummyBoard, DummyConfig};
//!
//! let mut board = DummyBoard::new(DummyConfig::default());
//! board.program(0, b"hello");
//! let mut bank = board.open()?;
//! let mut buf = [0u8; 5];
//! bank.read(0, &mut buf)?;
//! assert_eq!(&buf, b"hello");
//! ```

mod chip;

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use scai_nand_core::regs::{SCAI_BASE_ADDRESSES, WINDOW_SIZE};
use scai_nand_core::{
    BankConfig, ChipIndex, Error, FlashGeometry, PollConfig, RegisterWindow, Result, ScaiNand,
    WindowMapper, SCAI_CHIP_COUNT,
};

pub use chip::{pattern_byte, ChipEvent, DummyChip};

/// Configuration for the emulated board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyConfig {
    /// Geometry of the emulated bank
    pub geometry: FlashGeometry,
    /// Value of erased bytes
    pub fill: u8,
    /// Fill unprogrammed main areas with an address-derived pattern
    pub pattern: bool,
    /// Busy status reads after every transfer
    pub busy_polls: u32,
    /// Status reads the driver may spend before giving up
    pub max_polls: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            geometry: FlashGeometry::MT29F8G01,
            fill: 0xFF,
            pattern: false,
            busy_polls: 0,
            max_polls: 1000,
        }
    }
}

impl DummyConfig {
    /// Parse `key=value` backend options
    pub fn from_options(options: &[(&str, &str)]) -> std::result::Result<Self, String> {
        let mut config = Self::default();

        for (key, value) in options {
            match *key {
                "fill" => config.fill = parse_u8(value).ok_or_else(|| invalid(key, value))?,
                "pattern" => {
                    config.pattern = match *value {
                        "1" | "true" | "yes" => true,
                        "0" | "false" | "no" => false,
                        _ => return Err(invalid(key, value)),
                    }
                }
                "busy" => config.busy_polls = value.parse().map_err(|_| invalid(key, value))?,
                "max_polls" => config.max_polls = value.parse().map_err(|_| invalid(key, value))?,
                _ => {
                    log::warn!("Unknown dummy option: {}={}", key, value);
                }
            }
        }

        Ok(config)
    }
}

fn parse_u8(s: &str) -> Option<u8> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn invalid(key: &str, value: &str) -> String {
    format!("Invalid value for dummy option '{}': {}", key, value)
}

/// Mapping lifecycle of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    /// Window of the chip was mapped
    Mapped(usize),
    /// Window of the chip was released
    Unmapped(usize),
}

/// A register window onto one emulated chip
pub struct DummyWindow {
    index: usize,
    base: u64,
    chip: Rc<RefCell<DummyChip>>,
    events: Rc<RefCell<Vec<MapEvent>>>,
}

impl RegisterWindow for DummyWindow {
    fn read32(&self, offset: usize) -> u32 {
        self.chip.borrow_mut().read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        self.chip.borrow_mut().write32(offset, value)
    }

    fn read8(&self, offset: usize) -> u8 {
        self.chip.borrow_mut().read8(offset)
    }

    fn delay_us(&self, _us: u32) {
        // No delay needed for emulated hardware
    }

    fn base_address(&self) -> u64 {
        self.base
    }
}

impl Drop for DummyWindow {
    fn drop(&mut self) {
        self.chip.borrow_mut().set_mapped(false);
        self.events.borrow_mut().push(MapEvent::Unmapped(self.index));
    }
}

/// The emulated board: eight chips and the mapper that exposes them
///
/// The board keeps a handle on every chip, so tests can program data before
/// the bank is opened and inspect the chips while the bank is in use.
pub struct DummyBoard {
    config: DummyConfig,
    chips: Vec<Rc<RefCell<DummyChip>>>,
    events: Rc<RefCell<Vec<MapEvent>>>,
    fail_at: Option<usize>,
}

impl DummyBoard {
    /// Create a board with every page erased
    pub fn new(config: DummyConfig) -> Self {
        let chips = (0..SCAI_CHIP_COUNT)
            .map(|i| {
                Rc::new(RefCell::new(DummyChip::new(
                    i,
                    config.geometry,
                    config.fill,
                    config.pattern,
                    config.busy_polls,
                )))
            })
            .collect();

        Self {
            config,
            chips,
            events: Rc::new(RefCell::new(Vec::new())),
            fail_at: None,
        }
    }

    /// Create a board with the default configuration (8 x 1 GiB)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Make mapping the given chip's window fail
    pub fn fail_map_at(&mut self, chip: usize) {
        self.fail_at = Some(chip);
    }

    /// Bank configuration matching this board
    pub fn bank_config(&self) -> BankConfig<SCAI_CHIP_COUNT> {
        BankConfig {
            base_addresses: SCAI_BASE_ADDRESSES,
            window_size: WINDOW_SIZE,
            geometry: self.config.geometry,
            poll: PollConfig {
                max_polls: self.config.max_polls,
                interval_us: 0,
            },
        }
    }

    /// Bring up a bank on this board
    pub fn open(&mut self) -> Result<ScaiNand<DummyWindow>> {
        let config = self.bank_config();
        ScaiNand::init(config, self)
    }

    /// Inspect a chip
    pub fn chip(&self, index: usize) -> Ref<'_, DummyChip> {
        self.chips[index].borrow()
    }

    /// Modify a chip
    pub fn chip_mut(&self, index: usize) -> RefMut<'_, DummyChip> {
        self.chips[index].borrow_mut()
    }

    /// Store bytes at a linear address, across pages and chips
    pub fn program(&self, addr: u64, data: &[u8]) {
        let chip_size = self.config.geometry.chip_size;
        let mut addr = addr;
        let mut data = data;
        while !data.is_empty() {
            let chip = (addr / chip_size) as usize;
            let offset = addr % chip_size;
            let len = data.len().min((chip_size - offset) as usize);
            self.chip_mut(chip).program(offset, &data[..len]);
            addr += len as u64;
            data = &data[len..];
        }
    }

    /// Store a page and its OOB area by global page number
    pub fn program_page(&self, page: u32, main: &[u8], oob: &[u8]) {
        let per_chip = self.config.geometry.pages_per_chip();
        self.chip_mut((page / per_chip) as usize)
            .program_page(page % per_chip, main, oob);
    }

    /// Mapping events so far
    pub fn map_events(&self) -> Vec<MapEvent> {
        self.events.borrow().clone()
    }

    /// Forget chip events on every chip
    pub fn clear_events(&self) {
        for chip in &self.chips {
            chip.borrow_mut().clear_events();
        }
    }
}

impl WindowMapper for DummyBoard {
    type Window = DummyWindow;

    fn map(&mut self, chip: ChipIndex, base: u64, _len: usize) -> Result<DummyWindow> {
        if self.fail_at == Some(chip.get()) {
            log::debug!("{}: refusing to map {:#010x}", chip, base);
            return Err(Error::MapFailed { chip: chip.raw() });
        }

        let handle = self.chips.get(chip.get()).ok_or(Error::InvalidChip)?;
        handle.borrow_mut().set_mapped(true);
        self.events.borrow_mut().push(MapEvent::Mapped(chip.get()));

        Ok(DummyWindow {
            index: chip.get(),
            base,
            chip: Rc::clone(handle),
            events: Rc::clone(&self.events),
        })
    }
}
