//! The chip bank
//!
//! [`NandBank`] owns one [`ChipContext`] per chip in a fixed-length array.
//! It is only ever constructed complete: if any window fails to map during
//! [`NandBank::init`], the windows mapped so far are released in reverse
//! order and no bank is returned.

mod chip;
mod page;

pub use chip::{ChipContext, Selected};

use crate::address::ChipIndex;
use crate::config::{BankConfig, PollConfig};
use crate::error::{Error, Result};
use crate::geometry::FlashGeometry;
use crate::window::{RegisterWindow, WindowMapper};
use crate::SCAI_CHIP_COUNT;

/// A bank of `N` SPI NAND chips presented as one linear device
pub struct NandBank<W, const N: usize> {
    chips: [ChipContext<W>; N],
    geometry: FlashGeometry,
    poll: PollConfig,
    /// Chip left selected through [`NandBank::select`]
    active: Option<ChipIndex>,
}

/// The eight-chip SCAI bank
pub type ScaiNand<W> = NandBank<W, SCAI_CHIP_COUNT>;

impl<W: RegisterWindow, const N: usize> NandBank<W, N> {
    /// Map every chip's register window and build the bank
    ///
    /// Chips are mapped in index order. If chip `k` fails, chips `0..k` are
    /// unmapped again (highest first) and the mapper's error is returned;
    /// chips after `k` are never touched. On success every chip starts
    /// deselected.
    ///
    /// # Errors
    /// * `InvalidGeometry` - If the configuration is inconsistent
    /// * `MapFailed` - If a window could not be mapped
    pub fn init<M>(config: BankConfig<N>, mapper: &mut M) -> Result<Self>
    where
        M: WindowMapper<Window = W>,
    {
        if let Err(e) = config.validate() {
            log::error!("Invalid bank configuration: {}", e);
            return Err(Error::InvalidGeometry);
        }

        let mut chips: heapless::Vec<ChipContext<W>, N> = heapless::Vec::new();

        for (i, &base) in config.base_addresses.iter().enumerate() {
            let index = ChipIndex::new(i, N).ok_or(Error::InvalidChip)?;

            match mapper.map(index, base, config.window_size) {
                Ok(window) => {
                    log::debug!(
                        "{}: mapped {:#x} bytes at {:#010x}",
                        index,
                        config.window_size,
                        base
                    );
                    if chips.push(ChipContext::new(index, base, window)).is_err() {
                        release(chips);
                        return Err(Error::InvalidChip);
                    }
                }
                Err(e) => {
                    log::error!("{}: failed to map register window at {:#010x}", index, base);
                    release(chips);
                    return Err(e);
                }
            }
        }

        let chips: [ChipContext<W>; N] = chips.into_array().map_err(|_| Error::InvalidChip)?;

        for chip in &chips {
            chip.select(false);
        }

        log::info!(
            "SCAI NAND: {} chips, {} MiB, page {} + {} OOB, block {} KiB",
            N,
            config.geometry.total_size() >> 20,
            config.geometry.page_size,
            config.geometry.oob_size,
            config.geometry.block_size / 1024
        );

        Ok(Self {
            chips,
            geometry: config.geometry,
            poll: config.poll,
            active: None,
        })
    }

    /// Geometry of the bank
    pub fn geometry(&self) -> &FlashGeometry {
        &self.geometry
    }

    /// Status polling budget
    pub fn poll(&self) -> &PollConfig {
        &self.poll
    }

    /// Number of chips in the bank
    pub const fn chip_count(&self) -> usize {
        N
    }

    /// Look up a chip by index
    ///
    /// # Errors
    /// * `InvalidChip` - If `index` is not below the chip count
    pub fn chip(&self, index: usize) -> Result<&ChipContext<W>> {
        let index = ChipIndex::new(index, N).ok_or(Error::InvalidChip)?;
        Ok(self.chip_at(index))
    }

    /// All chips in index order
    pub fn chips(&self) -> &[ChipContext<W>] {
        &self.chips
    }

    pub(crate) fn chip_at(&self, index: ChipIndex) -> &ChipContext<W> {
        &self.chips[index.get()]
    }

    /// Set or clear the CE bit of one chip
    ///
    /// At most one chip is selected at a time. Selecting a chip while another
    /// one is still selected fails with `ChipActive` and touches no register.
    pub fn select(&mut self, chip: usize, activate: bool) -> Result<()> {
        let index = ChipIndex::new(chip, N).ok_or(Error::InvalidChip)?;
        if activate {
            if let Some(other) = self.active.filter(|&a| a != index) {
                return Err(Error::ChipActive { chip: other.raw() });
            }
        }

        self.chip_at(index).select(activate);
        if activate {
            self.active = Some(index);
        } else if self.active == Some(index) {
            self.active = None;
        }
        Ok(())
    }

    /// Fail if a chip was left selected through [`NandBank::select`]
    pub(crate) fn check_deselected(&self) -> Result<()> {
        match self.active {
            Some(chip) => Err(Error::ChipActive { chip: chip.raw() }),
            None => Ok(()),
        }
    }

    /// Send a command byte and intra-chip offset to a selected chip
    pub fn send_command(&mut self, chip: usize, command: u8, offset: u64) -> Result<()> {
        let poll = self.poll;
        self.chip(chip)?.send_command(command, offset, &poll)
    }

    /// Clock `buf.len()` bytes out of a selected chip
    pub fn read_bytes(&mut self, chip: usize, buf: &mut [u8]) -> Result<()> {
        let poll = self.poll;
        self.chip(chip)?.read_bytes(buf, &poll)
    }

    /// Tear the bank down and hand back the register windows in chip order
    pub fn into_windows(self) -> [W; N] {
        self.chips.map(ChipContext::into_window)
    }
}

/// Drop partially mapped chips, last mapped first
fn release<W: RegisterWindow, const N: usize>(mut chips: heapless::Vec<ChipContext<W>, N>) {
    while let Some(chip) = chips.pop() {
        log::debug!("{}: unmapping {:#010x}", chip.index(), chip.base_address());
        drop(chip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::{NAND_READ_CACHE, REG_CTRL1, REG_WR_DATA};
    use crate::window::fake::{FakeMapper, MapEvent};
    use std::vec;
    use std::vec::Vec;

    fn selected_chips(mapper: &FakeMapper) -> Vec<usize> {
        mapper
            .handles
            .iter()
            .filter(|h| h.ce_active())
            .map(|h| h.chip)
            .collect()
    }

    #[test]
    fn test_init_maps_every_chip_in_order() {
        let mut mapper = FakeMapper::default();
        let bank = ScaiNand::init(BankConfig::scai(), &mut mapper).unwrap();

        let mapped: Vec<_> = (0..8).map(MapEvent::Mapped).collect();
        assert_eq!(mapper.events(), mapped);
        assert_eq!(bank.chip_count(), 8);
        assert_eq!(bank.chip(5).unwrap().base_address(), 0x7000_0510);
        assert_eq!(mapper.handles[5].base, 0x7000_0510);
        assert_eq!(bank.geometry().total_size(), 1 << 33);
    }

    #[test]
    fn test_init_leaves_every_chip_deselected() {
        let mut mapper = FakeMapper::default();
        let bank = ScaiNand::init(BankConfig::scai(), &mut mapper).unwrap();
        for (chip, handle) in bank.chips().iter().zip(&mapper.handles) {
            assert!(!chip.is_selected());
            assert!(!handle.ce_active());
            assert_eq!(handle.writes_to(REG_CTRL1), [0]);
        }
    }

    #[test]
    fn test_init_failure_unwinds_mapped_chips() {
        let mut mapper = FakeMapper::failing_at(3);
        let result = ScaiNand::init(BankConfig::scai(), &mut mapper);

        assert!(matches!(result, Err(Error::MapFailed { chip: 3 })));
        assert_eq!(
            mapper.events(),
            [
                MapEvent::Mapped(0),
                MapEvent::Mapped(1),
                MapEvent::Mapped(2),
                MapEvent::Unmapped(2),
                MapEvent::Unmapped(1),
                MapEvent::Unmapped(0),
            ]
        );
        // Chips 3..8 were never mapped
        assert_eq!(mapper.handles.len(), 3);
    }

    #[test]
    fn test_init_rejects_bad_config() {
        let mut mapper = FakeMapper::default();
        let mut config = BankConfig::scai();
        config.geometry.page_size = 0;

        assert!(matches!(
            ScaiNand::init(config, &mut mapper),
            Err(Error::InvalidGeometry)
        ));
        assert!(mapper.events().is_empty());
    }

    #[test]
    fn test_drop_unmaps_every_chip() {
        let mut mapper = FakeMapper::default();
        let bank = ScaiNand::init(BankConfig::scai(), &mut mapper).unwrap();
        drop(bank);

        let unmapped = mapper
            .events()
            .into_iter()
            .filter(|e| matches!(e, MapEvent::Unmapped(_)))
            .count();
        assert_eq!(unmapped, 8);
    }

    #[test]
    fn test_into_windows_keeps_mappings() {
        let mut mapper = FakeMapper::default();
        let bank = ScaiNand::init(BankConfig::scai(), &mut mapper).unwrap();
        let windows = bank.into_windows();

        assert_eq!(windows[7].base, 0x7000_0530);
        assert!(!mapper
            .events()
            .iter()
            .any(|e| matches!(e, MapEvent::Unmapped(_))));
    }

    #[test]
    fn test_select_touches_only_named_chip() {
        let mut mapper = FakeMapper::default();
        let mut bank = ScaiNand::init(BankConfig::scai(), &mut mapper).unwrap();
        let before: Vec<usize> = mapper
            .handles
            .iter()
            .map(|h| h.state.borrow().accesses.len())
            .collect();

        bank.select(4, true).unwrap();

        for (i, handle) in mapper.handles.iter().enumerate() {
            let after = handle.state.borrow().accesses.len();
            if i == 4 {
                assert!(handle.ce_active());
                assert!(after > before[i]);
            } else {
                assert!(!handle.ce_active());
                assert_eq!(after, before[i]);
            }
        }
    }

    #[test]
    fn test_primitives_check_chip_index() {
        let mut mapper = FakeMapper::default();
        let mut bank = ScaiNand::init(BankConfig::scai(), &mut mapper).unwrap();
        let mut buf = [0u8; 4];

        assert_eq!(bank.select(8, true), Err(Error::InvalidChip));
        assert_eq!(
            bank.send_command(9, NAND_READ_CACHE, 0),
            Err(Error::InvalidChip)
        );
        assert_eq!(bank.read_bytes(8, &mut buf), Err(Error::InvalidChip));

        bank.select(1, true).unwrap();
        bank.send_command(1, NAND_READ_CACHE, 0x2_0000).unwrap();
        bank.read_bytes(1, &mut buf).unwrap();
        bank.select(1, false).unwrap();

        assert_eq!(
            mapper.handles[1].writes_to(REG_WR_DATA),
            [NAND_READ_CACHE as u32, 0x200]
        );
        assert_eq!(mapper.handles[1].writes_to(REG_CTRL1).len(), 1 + 2 + 2 + 4 + 1);
    }

    #[test]
    fn test_select_allows_one_chip_at_a_time() {
        let mut mapper = FakeMapper::default();
        let mut bank = ScaiNand::init(BankConfig::scai(), &mut mapper).unwrap();

        bank.select(1, true).unwrap();
        let ctrl_writes = mapper.handles[2].writes_to(REG_CTRL1).len();
        assert_eq!(bank.select(2, true), Err(Error::ChipActive { chip: 1 }));
        assert_eq!(mapper.handles[2].writes_to(REG_CTRL1).len(), ctrl_writes);
        assert_eq!(selected_chips(&mapper), [1]);

        // Reselecting the active chip is fine
        bank.select(1, true).unwrap();
        assert_eq!(selected_chips(&mapper), [1]);

        // Deselecting another chip leaves the active one alone
        bank.select(5, false).unwrap();
        assert_eq!(selected_chips(&mapper), [1]);

        bank.select(1, false).unwrap();
        bank.select(2, true).unwrap();
        assert_eq!(selected_chips(&mapper), [2]);
    }

    #[test]
    fn test_reads_refused_while_chip_selected() {
        let mut mapper = FakeMapper::default();
        let mut bank = ScaiNand::init(BankConfig::scai(), &mut mapper).unwrap();
        let mut main = vec![0u8; 4096];
        let mut oob = vec![0u8; 256];

        bank.select(3, true).unwrap();
        assert_eq!(
            bank.read_page(0, &mut main, None),
            Err(Error::ChipActive { chip: 3 })
        );
        assert_eq!(bank.read_oob(0, &mut oob), Err(Error::ChipActive { chip: 3 }));
        assert_eq!(bank.read(0, &mut main), Err(Error::ChipActive { chip: 3 }));
        assert!(mapper.handles[0].writes_to(REG_WR_DATA).is_empty());
        assert_eq!(selected_chips(&mapper), [3]);

        bank.select(3, false).unwrap();
        bank.read_page(0, &mut main, None).unwrap();
        assert!(selected_chips(&mapper).is_empty());
    }
}
