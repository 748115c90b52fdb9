//! Per-chip register protocol
//!
//! A [`ChipContext`] owns one register window and implements the three
//! register-level primitives of the protocol:
//!
//! - chip selection (read-modify-write of the CE bit)
//! - the command sequencer (command byte, then address, each followed by an
//!   idle poll)
//! - the buffer transfer (one trigger and poll per byte clocked out)
//!
//! Every status poll is bounded by a [`PollConfig`]; running out of polls is
//! reported as [`Error::HardwareTimeout`] instead of spinning forever.

use core::ops::Deref;

use crate::address::ChipIndex;
use crate::config::PollConfig;
use crate::error::{Error, Phase, Result};
use crate::regs::{
    encode_address, transfer_word, Ctrl1, Status, REG_CTRL1, REG_RD_DATA, REG_STATUS,
    REG_WR_DATA,
};
use crate::window::RegisterWindow;

/// One chip of the bank and its mapped register window
pub struct ChipContext<W> {
    index: ChipIndex,
    base_address: u64,
    window: W,
}

impl<W: RegisterWindow> ChipContext<W> {
    pub(crate) fn new(index: ChipIndex, base_address: u64, window: W) -> Self {
        Self {
            index,
            base_address,
            window,
        }
    }

    /// Position of this chip in the bank
    pub fn index(&self) -> ChipIndex {
        self.index
    }

    /// Bus address of this chip's register window
    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    /// The mapped register window
    pub fn window(&self) -> &W {
        &self.window
    }

    pub(crate) fn into_window(self) -> W {
        self.window
    }

    /// Set or clear this chip's CE bit
    ///
    /// Only the CE bit of this chip's control register changes; every other
    /// bit is written back as read.
    pub(crate) fn select(&self, activate: bool) {
        let mut ctrl = Ctrl1::from_bits_retain(self.window.read32(REG_CTRL1));
        ctrl.set(Ctrl1::ACTIVATE_CE, activate);
        self.window.write32(REG_CTRL1, ctrl.bits());
        log::trace!(
            "{}: CE {}",
            self.index,
            if activate { "asserted" } else { "released" }
        );
    }

    /// Whether the CE bit is currently set
    pub fn is_selected(&self) -> bool {
        Ctrl1::from_bits_retain(self.window.read32(REG_CTRL1)).contains(Ctrl1::ACTIVATE_CE)
    }

    /// Assert CE and return a guard that releases it when dropped
    pub(crate) fn activate(&self) -> Selected<'_, W> {
        self.select(true);
        Selected { chip: self }
    }

    /// Poll the status register until the idle bit is set
    pub fn wait_idle(&self, poll: &PollConfig, phase: Phase) -> Result<()> {
        for _ in 0..poll.max_polls {
            let status = Status::from_bits_retain(self.window.read32(REG_STATUS));
            if status.contains(Status::IDLE) {
                return Ok(());
            }
            self.window.delay_us(poll.interval_us);
        }

        log::warn!(
            "{}: no idle after {} polls ({} phase)",
            self.index,
            poll.max_polls,
            phase
        );
        Err(Error::HardwareTimeout {
            chip: self.index.raw(),
            phase,
        })
    }

    /// Start one transfer and wait for it to finish
    fn transfer(&self, poll: &PollConfig, phase: Phase) -> Result<()> {
        self.window.write32(REG_CTRL1, transfer_word().bits());
        self.wait_idle(poll, phase)
    }

    /// Send a command byte followed by an intra-chip byte offset
    ///
    /// The chip must be selected. The offset goes out in 256-byte units,
    /// see [`encode_address`].
    pub fn send_command(&self, command: u8, offset: u64, poll: &PollConfig) -> Result<()> {
        log::trace!("{}: command {:#04x} offset {:#x}", self.index, command, offset);

        self.window.write32(REG_WR_DATA, command as u32);
        self.transfer(poll, Phase::Command)?;

        self.window.write32(REG_WR_DATA, encode_address(offset));
        self.transfer(poll, Phase::Address)
    }

    /// Clock `buf.len()` bytes out of the chip into `buf`
    pub fn read_bytes(&self, buf: &mut [u8], poll: &PollConfig) -> Result<()> {
        for byte in buf.iter_mut() {
            self.transfer(poll, Phase::Data)?;
            *byte = self.window.read8(REG_RD_DATA);
        }
        Ok(())
    }

    /// Clock `count` bytes out of the chip and drop them
    pub fn skip_bytes(&self, count: usize, poll: &PollConfig) -> Result<()> {
        for _ in 0..count {
            self.transfer(poll, Phase::Data)?;
            let _ = self.window.read8(REG_RD_DATA);
        }
        Ok(())
    }
}

/// A chip with CE asserted
///
/// Dropping the guard releases CE, so a chip is deselected on every exit
/// path of a transaction, including timeouts.
pub struct Selected<'a, W: RegisterWindow> {
    chip: &'a ChipContext<W>,
}

impl<W: RegisterWindow> Deref for Selected<'_, W> {
    type Target = ChipContext<W>;

    fn deref(&self) -> &ChipContext<W> {
        self.chip
    }
}

impl<W: RegisterWindow> Drop for Selected<'_, W> {
    fn drop(&mut self) {
        self.chip.select(false);
    }
}
