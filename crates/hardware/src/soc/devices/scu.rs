//! Aspeed System Control Unit (SCU).
//!
//! Clock, reset and hardware-strap registers. The board supplies the reset values of
//! four registers as settings; everything else resets to zero. Writes are ignored
//! until the protection key has been written.
//!
//! # Memory Map
//!
//! * `0x00`: Protection key (write `0x1688A8A8` to unlock; reads 1 while unlocked)
//! * `0x0C`: Clock stop control (`scu0c`)
//! * `0x7C`: Silicon revision (read only)
//! * `0x88`: Multi-function pin control 5 (`scu88`)
//! * `0x8C`: Multi-function pin control 6 (`scu8c`)
//! * `0x9C`: Watchdog reset selection (`scu9c`)

use std::any::Any;

use crate::common::{AccessSize, ConfigError, Value};
use crate::soc::traits::{Component, RegisterWindow};

/// Value that unlocks the register file.
pub const PROTECTION_KEY: u32 = 0x1688_A8A8;

/// AST2400 A1 silicon revision.
pub const AST2400_A1_SILICON_REV: u32 = 0x0201_0303;

const WINDOW_SIZE: u64 = 0x1000;
const REG_COUNT: usize = 0x1A8 / 4;

const REG_PROT_KEY: usize = 0x00 / 4;
const REG_SILICON_REV: usize = 0x7C / 4;

/// Settings accepted by the SCU and the register each one seeds.
const RESET_SETTINGS: [(&str, usize); 4] = [
    ("scu0c", 0x0C / 4),
    ("scu88", 0x88 / 4),
    ("scu8c", 0x8C / 4),
    ("scu9c", 0x9C / 4),
];

/// SCU device structure.
#[derive(Debug)]
pub struct AspeedScu {
    regs: [u32; REG_COUNT],
    silicon_rev: u32,
    unlocked: bool,
}

impl Default for AspeedScu {
    fn default() -> Self {
        Self { regs: [0; REG_COUNT], silicon_rev: AST2400_A1_SILICON_REV, unlocked: false }
    }
}

impl AspeedScu {
    /// Creates a locked SCU with zeroed registers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value of the 32-bit register at a byte offset.
    pub fn register(&self, offset: u64) -> Option<u32> {
        let idx = usize::try_from(offset / 4).ok()?;
        match idx {
            REG_PROT_KEY => Some(u32::from(self.unlocked)),
            REG_SILICON_REV => Some(self.silicon_rev),
            _ => self.regs.get(idx).copied(),
        }
    }

    /// Returns whether the protection key has been written.
    pub const fn is_unlocked(&self) -> bool {
        self.unlocked
    }
}

impl Component for AspeedScu {
    fn kind(&self) -> &'static str {
        "aspeed.scu"
    }

    fn set_config(&mut self, name: &str, value: &Value) -> Result<(), ConfigError> {
        if name == "silicon-rev" {
            self.silicon_rev = value.as_u32(name)?;
            return Ok(());
        }
        let (_, idx) = RESET_SETTINGS
            .iter()
            .find(|(setting, _)| *setting == name)
            .ok_or_else(|| ConfigError::unknown(name))?;
        self.regs[*idx] = value.as_u32(name)?;
        Ok(())
    }

    fn register_windows(&self) -> Vec<RegisterWindow> {
        vec![RegisterWindow::new(WINDOW_SIZE)]
    }

    fn read(&mut self, offset: u64, size: AccessSize) -> u64 {
        let value = self.register(offset & !3).unwrap_or(0);
        (u64::from(value) >> ((offset & 3) * 8)) & size.mask()
    }

    fn write(&mut self, offset: u64, value: u64, size: AccessSize) {
        let Ok(idx) = usize::try_from(offset / 4) else {
            return;
        };
        let (bits, lane) = size.word_lane(offset, value);
        if idx == REG_PROT_KEY {
            self.unlocked = bits == PROTECTION_KEY;
            return;
        }
        if !self.unlocked || idx == REG_SILICON_REV {
            return;
        }
        if let Some(reg) = self.regs.get_mut(idx) {
            *reg = (*reg & !lane) | bits;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
