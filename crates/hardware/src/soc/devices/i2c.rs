//! Aspeed I2C controller.
//!
//! Fourteen I2C buses behind one register window and one interrupt output. The
//! controller keeps the slave topology: which component sits at which address on which
//! bus. Transfers are not modelled; slaves are reached through their typed APIs.
//!
//! # Memory Map
//!
//! * `0x00`: Global interrupt status (bit per bus)
//! * `0x40 * (n + 1)`: Bus `n` register block
//!
//! Within a bus block: `+0x00` function control, `+0x04` AC timing 1, `+0x08` AC
//! timing 2, `+0x0C` interrupt control, `+0x10` interrupt status (write 1 to clear),
//! `+0x14` command, `+0x18` device address, `+0x20` byte buffer.

use std::any::Any;
use std::collections::BTreeMap;

use crate::common::{AccessSize, ConfigError};
use crate::soc::interrupt::IrqLine;
use crate::soc::registry::ComponentId;
use crate::soc::traits::{Component, RegisterWindow};

/// Number of buses on the AST2400 controller.
pub const I2C_BUSES: usize = 14;

const WINDOW_SIZE: u64 = 0x1000;
const BUS_BLOCK: u64 = 0x40;
const BUS_REGS: usize = (BUS_BLOCK / 4) as usize;

const REG_GLOBAL_STATUS: u64 = 0x00;
const BUS_INTR_CTRL: usize = 0x0C / 4;
const BUS_INTR_STATUS: usize = 0x10 / 4;

/// I2C controller device structure.
#[derive(Debug)]
pub struct AspeedI2c {
    regs: Vec<[u32; BUS_REGS]>,
    children: Vec<BTreeMap<u8, ComponentId>>,
    irq: Option<IrqLine>,
}

impl Default for AspeedI2c {
    fn default() -> Self {
        Self::new()
    }
}

impl AspeedI2c {
    /// Creates a controller with empty buses.
    pub fn new() -> Self {
        Self {
            regs: vec![[0; BUS_REGS]; I2C_BUSES],
            children: vec![BTreeMap::new(); I2C_BUSES],
            irq: None,
        }
    }

    /// Returns the component attached at `address` on `bus`.
    pub fn child(&self, bus: usize, address: u8) -> Option<ComponentId> {
        self.children.get(bus)?.get(&address).copied()
    }

    /// Returns `(address, component)` for every slave on `bus`, by address.
    pub fn children(&self, bus: usize) -> Vec<(u8, ComponentId)> {
        self.children
            .get(bus)
            .map(|c| c.iter().map(|(&a, &id)| (a, id)).collect())
            .unwrap_or_default()
    }

    /// Raises interrupt causes on one bus.
    pub fn raise_bus_status(&mut self, bus: usize, bits: u32) {
        if let Some(regs) = self.regs.get_mut(bus) {
            regs[BUS_INTR_STATUS] |= bits;
            self.update();
        }
    }

    fn global_status(&self) -> u32 {
        self.regs
            .iter()
            .enumerate()
            .filter(|(_, r)| r[BUS_INTR_STATUS] & r[BUS_INTR_CTRL] != 0)
            .fold(0, |acc, (bus, _)| acc | (1 << bus))
    }

    fn update(&self) {
        if let Some(irq) = &self.irq {
            irq.set_level(self.global_status() != 0);
        }
    }

    fn decode(offset: u64) -> Option<(usize, usize)> {
        let block = usize::try_from(offset / BUS_BLOCK).ok()?;
        let bus = block.checked_sub(1).filter(|&b| b < I2C_BUSES)?;
        let reg = usize::try_from((offset % BUS_BLOCK) / 4).ok()?;
        Some((bus, reg))
    }
}

impl Component for AspeedI2c {
    fn kind(&self) -> &'static str {
        "aspeed.i2c"
    }

    fn register_windows(&self) -> Vec<RegisterWindow> {
        vec![RegisterWindow::new(WINDOW_SIZE)]
    }

    fn interrupt_outputs(&self) -> usize {
        1
    }

    fn connect_output(&mut self, output: usize, line: IrqLine) {
        if output == 0 {
            self.irq = Some(line);
        }
    }

    fn bus_count(&self) -> usize {
        I2C_BUSES
    }

    fn attach_child(&mut self, bus: usize, address: u8, child: ComponentId) -> Result<(), ConfigError> {
        let slaves = self
            .children
            .get_mut(bus)
            .ok_or(ConfigError::NoSuchBus { bus, buses: I2C_BUSES })?;
        if slaves.contains_key(&address) {
            return Err(ConfigError::AddressInUse { bus, address });
        }
        let _ = slaves.insert(address, child);
        Ok(())
    }

    fn read(&mut self, offset: u64, size: AccessSize) -> u64 {
        let word = offset & !3;
        let value = if word == REG_GLOBAL_STATUS {
            self.global_status()
        } else {
            Self::decode(word).map_or(0, |(bus, reg)| self.regs[bus][reg])
        };
        (u64::from(value) >> ((offset & 3) * 8)) & size.mask()
    }

    fn write(&mut self, offset: u64, value: u64, size: AccessSize) {
        let Some((bus, reg)) = Self::decode(offset & !3) else {
            return;
        };
        let (bits, lane) = size.word_lane(offset, value);
        let slot = &mut self.regs[bus][reg];
        if reg == BUS_INTR_STATUS {
            *slot &= !bits;
        } else {
            *slot = (*slot & !lane) | bits;
        }
        self.update();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
