//! Page reads
//!
//! A page read runs one SPI NAND transaction on the chip holding the page:
//!
//! ```text
//! select -> page read to cache (intra-chip offset) -> read from cache (0)
//!        -> main area -> OOB area (optional) -> deselect
//! ```
//!
//! The chip is deselected when the [`Selected`](super::Selected) guard drops,
//! so a timeout anywhere in the sequence still leaves CE released.

use super::NandBank;
use crate::address::{translate, translate_page};
use crate::error::{Error, Result};
use crate::regs::{NAND_READ_CACHE, NAND_READ_PAGE};
use crate::window::RegisterWindow;

impl<W: RegisterWindow, const N: usize> NandBank<W, N> {
    /// Read one page, and its OOB area if a buffer for it is given
    ///
    /// Exactly `page_size` bytes are written to `main`; `oob` is only
    /// touched when it is `Some`, and then receives `oob_size` bytes from the
    /// same transaction. Nothing beyond those lengths is modified.
    ///
    /// # Errors
    /// * `AddressOutOfBounds` - If `page` is beyond the last page
    /// * `BufferTooSmall` - If a buffer is shorter than its area
    /// * `ChipActive` - If a chip was left selected through `select`
    /// * `HardwareTimeout` - If the chip stops answering
    pub fn read_page(&mut self, page: u32, main: &mut [u8], oob: Option<&mut [u8]>) -> Result<()> {
        let page_size = self.geometry.page_size as usize;
        let oob_size = self.geometry.oob_size as usize;

        if main.len() < page_size {
            return Err(Error::BufferTooSmall);
        }
        if oob.as_ref().is_some_and(|oob| oob.len() < oob_size) {
            return Err(Error::BufferTooSmall);
        }
        self.check_deselected()?;

        let target = translate_page(&self.geometry, page)?;
        log::trace!(
            "read page {} ({} offset {:#x}){}",
            page,
            target.chip,
            target.offset,
            if oob.is_some() { " with OOB" } else { "" }
        );

        let poll = self.poll;
        let chip = self.chip_at(target.chip).activate();
        chip.send_command(NAND_READ_PAGE, target.offset, &poll)?;
        chip.send_command(NAND_READ_CACHE, 0, &poll)?;
        chip.read_bytes(&mut main[..page_size], &poll)?;
        if let Some(oob) = oob {
            chip.read_bytes(&mut oob[..oob_size], &poll)?;
        }
        Ok(())
    }

    /// Read only the OOB area of a page
    ///
    /// The main area is still clocked out of the cache register, then dropped.
    pub fn read_oob(&mut self, page: u32, oob: &mut [u8]) -> Result<()> {
        let page_size = self.geometry.page_size as usize;
        let oob_size = self.geometry.oob_size as usize;

        if oob.len() < oob_size {
            return Err(Error::BufferTooSmall);
        }
        self.check_deselected()?;

        let target = translate_page(&self.geometry, page)?;
        log::trace!("read OOB of page {} ({})", page, target.chip);

        let poll = self.poll;
        let chip = self.chip_at(target.chip).activate();
        chip.send_command(NAND_READ_PAGE, target.offset, &poll)?;
        chip.send_command(NAND_READ_CACHE, 0, &poll)?;
        chip.skip_bytes(page_size, &poll)?;
        chip.read_bytes(&mut oob[..oob_size], &poll)
    }

    /// Read an arbitrary byte range of the linear device
    ///
    /// The range is split at page boundaries; each piece is one page
    /// transaction that skips the leading bytes of the page. Ranges may
    /// cross chip boundaries.
    ///
    /// # Errors
    /// * `AddressOutOfBounds` - If any part of the range is beyond the bank
    /// * `HardwareTimeout` - If a chip stops answering
    pub fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let end = addr
            .checked_add(buf.len() as u64)
            .ok_or(Error::AddressOutOfBounds)?;
        if end > self.geometry.total_size() {
            return Err(Error::AddressOutOfBounds);
        }
        self.check_deselected()?;

        let page_size = self.geometry.page_size as u64;
        let poll = self.poll;
        let mut addr = addr;
        let mut remaining = buf;

        while !remaining.is_empty() {
            let target = translate(&self.geometry, addr)?;
            let column = target.offset % page_size;
            let page_offset = target.offset - column;
            let len = core::cmp::min(remaining.len() as u64, page_size - column) as usize;

            let (head, tail) = core::mem::take(&mut remaining).split_at_mut(len);
            {
                let chip = self.chip_at(target.chip).activate();
                chip.send_command(NAND_READ_PAGE, page_offset, &poll)?;
                chip.send_command(NAND_READ_CACHE, 0, &poll)?;
                chip.skip_bytes(column as usize, &poll)?;
                chip.read_bytes(head, &poll)?;
            }

            addr += len as u64;
            remaining = tail;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BankConfig, PollConfig};
    use crate::error::Phase;
    use crate::geometry::FlashGeometry;
    use crate::regs::{REG_CTRL1, REG_WR_DATA};
    use crate::window::fake::{Access, FakeMapper, FakeWindow};
    use crate::ScaiNand;
    use std::vec;
    use std::vec::Vec;

    /// Two chips of four 256-byte pages with 4 OOB bytes each
    fn small_bank(mapper: &mut FakeMapper) -> NandBank<FakeWindow, 2> {
        let config = BankConfig::<2> {
            base_addresses: [0x1000, 0x2000],
            window_size: 0x100,
            geometry: FlashGeometry {
                page_size: 256,
                oob_size: 4,
                block_size: 512,
                chip_size: 1024,
                chip_count: 2,
            },
            poll: PollConfig {
                max_polls: 8,
                interval_us: 0,
            },
        };
        NandBank::init(config, mapper).unwrap()
    }

    /// Bytes the fake window latches for triggers `from..to`
    fn counter(from: u32, to: u32) -> Vec<u8> {
        (from..to).map(|v| v as u8).collect()
    }

    fn data_reads(window: &FakeWindow) -> usize {
        window
            .state
            .borrow()
            .accesses
            .iter()
            .filter(|a| matches!(a, Access::Read8(..)))
            .count()
    }

    #[test]
    fn test_read_page_without_oob() {
        let mut mapper = FakeMapper::default();
        let mut bank = ScaiNand::init(BankConfig::scai(), &mut mapper).unwrap();

        let mut main = vec![0xFFu8; 4096 + 8];
        bank.read_page(262_144 + 3, &mut main, None).unwrap();

        let chip = &mapper.handles[1];
        // Page-to-cache at offset 3 * 4096, then read-from-cache at 0
        assert_eq!(chip.writes_to(REG_WR_DATA), [0x13, 0x30, 0x03, 0x00]);
        assert_eq!(data_reads(chip), 4096);
        // Only the page area was written
        assert_eq!(main[0], 4);
        assert!(main[4096..].iter().all(|&b| b == 0xFF));
        assert!(!chip.ce_active());

        for (i, other) in mapper.handles.iter().enumerate() {
            if i != 1 {
                assert_eq!(data_reads(other), 0);
            }
        }
    }

    #[test]
    fn test_read_page_with_oob_is_one_transaction() {
        let mut mapper = FakeMapper::default();
        let mut bank = small_bank(&mut mapper);

        let mut main = [0u8; 256];
        let mut oob = [0u8; 6];
        bank.read_page(1, &mut main, Some(&mut oob[..])).unwrap();

        // Triggers 0..4 went to the command and address phases
        assert_eq!(main.to_vec(), counter(4, 260));
        assert_eq!(oob, [4, 5, 6, 7, 0, 0]);
        assert_eq!(mapper.handles[0].writes_to(REG_WR_DATA), [0x13, 0x01, 0x03, 0x00]);

        // One select, one deselect (enable bit kept), no CE change in between
        let ctrl = mapper.handles[0].writes_to(REG_CTRL1);
        let selects: Vec<_> = ctrl.iter().filter(|&&v| v & 0x800 == 0).collect();
        assert_eq!(selects, [&0, &2, &1]);
        assert_eq!(mapper.handles[0].state.borrow().triggers_without_ce, 0);
    }

    #[test]
    fn test_read_page_routes_to_second_chip() {
        let mut mapper = FakeMapper::default();
        let mut bank = small_bank(&mut mapper);

        let mut main = [0u8; 256];
        bank.read_page(5, &mut main, None).unwrap();

        assert_eq!(data_reads(&mapper.handles[0]), 0);
        assert_eq!(data_reads(&mapper.handles[1]), 256);
        // Page 5 is the second page of chip 1: offset 256, one address unit
        assert_eq!(mapper.handles[1].writes_to(REG_WR_DATA), [0x13, 0x01, 0x03, 0x00]);
    }

    #[test]
    fn test_read_page_checks_arguments() {
        let mut mapper = FakeMapper::default();
        let mut bank = small_bank(&mut mapper);
        let mut main = [0u8; 256];
        let mut short = [0u8; 255];
        let mut oob = [0u8; 3];

        assert_eq!(
            bank.read_page(0, &mut short, None),
            Err(Error::BufferTooSmall)
        );
        assert_eq!(
            bank.read_page(0, &mut main, Some(&mut oob[..])),
            Err(Error::BufferTooSmall)
        );
        assert_eq!(
            bank.read_page(8, &mut main, None),
            Err(Error::AddressOutOfBounds)
        );
        // Nothing reached the hardware
        assert!(mapper.handles.iter().all(|h| h.writes_to(REG_WR_DATA).is_empty()));
    }

    #[test]
    fn test_read_page_timeout_deselects() {
        let mut mapper = FakeMapper::default();
        let mut bank = small_bank(&mut mapper);
        mapper.handles[0].state.borrow_mut().stuck = true;

        let mut main = [0u8; 256];
        assert_eq!(
            bank.read_page(0, &mut main, None),
            Err(Error::HardwareTimeout {
                chip: 0,
                phase: Phase::Command
            })
        );
        assert!(!mapper.handles[0].ce_active());
    }

    #[test]
    fn test_read_oob_skips_main_area() {
        let mut mapper = FakeMapper::default();
        let mut bank = small_bank(&mut mapper);

        let mut oob = [0u8; 4];
        bank.read_oob(2, &mut oob).unwrap();

        assert_eq!(oob.to_vec(), counter(260, 264));
        assert_eq!(data_reads(&mapper.handles[0]), 256 + 4);
        assert_eq!(mapper.handles[0].writes_to(REG_WR_DATA), [0x13, 0x02, 0x03, 0x00]);
        assert!(!mapper.handles[0].ce_active());
    }

    #[test]
    fn test_linear_read_crosses_chip_boundary() {
        let mut mapper = FakeMapper::default();
        let mut bank = small_bank(&mut mapper);

        // Last 10 bytes of chip 0, first 6 bytes of chip 1
        let mut buf = [0u8; 16];
        bank.read(1014, &mut buf).unwrap();

        // Chip 0: page at offset 768, 246 bytes skipped after the 4 setup triggers
        assert_eq!(buf[..10].to_vec(), counter(250, 260));
        assert_eq!(mapper.handles[0].writes_to(REG_WR_DATA), [0x13, 0x03, 0x03, 0x00]);
        // Chip 1: page at offset 0, no skip
        assert_eq!(&buf[10..], &[4, 5, 6, 7, 8, 9]);

        assert_eq!(data_reads(&mapper.handles[0]), 256);
        assert_eq!(data_reads(&mapper.handles[1]), 6);
    }

    #[test]
    fn test_linear_read_bounds() {
        let mut mapper = FakeMapper::default();
        let mut bank = small_bank(&mut mapper);
        let mut buf = [0u8; 8];

        assert_eq!(bank.read(2044, &mut buf), Err(Error::AddressOutOfBounds));
        assert_eq!(bank.read(u64::MAX, &mut buf), Err(Error::AddressOutOfBounds));
        assert!(bank.read(2040, &mut buf).is_ok());
        assert!(bank.read(2048, &mut []).is_ok());
    }
}
