//! Cadence Gigabit Ethernet MAC (GEM).
//!
//! Only the station address and the interrupt registers are modelled; frames are never
//! exchanged.
//!
//! # Memory Map
//!
//! * `0x000`: Network control
//! * `0x004`: Network configuration
//! * `0x008`: Network status (link up)
//! * `0x024`: Interrupt status (read clears)
//! * `0x028`: Interrupt enable (write)
//! * `0x02C`: Interrupt disable (write)
//! * `0x030`: Interrupt mask (read)
//! * `0x088`: Specific address 1, bottom
//! * `0x08C`: Specific address 1, top

use std::any::Any;
use std::fmt::Write as _;

use crate::common::{AccessSize, ConfigError, Value};
use crate::soc::interrupt::IrqLine;
use crate::soc::traits::{Component, RegisterWindow};

/// Model name accepted in the `model` setting.
pub const GEM_MODEL: &str = "cadence_gem";

/// MAC address used when no network backend supplies one.
pub const DEFAULT_MAC: [u8; 6] = [0x52, 0x54, 0x00, 0x12, 0x34, 0x56];

const WINDOW_SIZE: u64 = 0x1000;

const REG_NWCTRL: u64 = 0x000;
const REG_NWCFG: u64 = 0x004;
const REG_NWSTATUS: u64 = 0x008;
const REG_ISR: u64 = 0x024;
const REG_IER: u64 = 0x028;
const REG_IDR: u64 = 0x02C;
const REG_IMR: u64 = 0x030;
const REG_SPADDR1LO: u64 = 0x088;
const REG_SPADDR1HI: u64 = 0x08C;

const NWSTATUS_LINK: u32 = 1 << 0;

/// Parses `aa:bb:cc:dd:ee:ff`.
///
/// # Returns
///
/// The six address bytes, or `None` if the string is not six colon-separated hex octets.
pub fn parse_mac(text: &str) -> Option<[u8; 6]> {
    let mut mac = [0u8; 6];
    let mut parts = text.split(':');
    for byte in &mut mac {
        let part = parts.next()?;
        if part.len() != 2 {
            return None;
        }
        *byte = u8::from_str_radix(part, 16).ok()?;
    }
    parts.next().is_none().then_some(mac)
}

/// Formats a MAC address as `aa:bb:cc:dd:ee:ff`.
pub fn format_mac(mac: &[u8; 6]) -> String {
    let mut out = String::with_capacity(17);
    for (i, b) in mac.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// GEM device structure.
#[derive(Debug)]
pub struct CadenceGem {
    mac: [u8; 6],
    nwctrl: u32,
    nwcfg: u32,
    isr: u32,
    imr: u32,
    irq: Option<IrqLine>,
}

impl Default for CadenceGem {
    fn default() -> Self {
        Self { mac: DEFAULT_MAC, nwctrl: 0, nwcfg: 0, isr: 0, imr: u32::MAX, irq: None }
    }
}

impl CadenceGem {
    /// Creates a controller with the default MAC and every interrupt masked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the station MAC address.
    pub const fn mac(&self) -> [u8; 6] {
        self.mac
    }

    /// Latches interrupt causes and updates the output line.
    pub fn raise_status(&mut self, bits: u32) {
        self.isr |= bits;
        self.update();
    }

    fn update(&self) {
        if let Some(irq) = &self.irq {
            irq.set_level(self.isr & !self.imr != 0);
        }
    }

    fn read_reg(&mut self, reg: u64) -> u32 {
        match reg {
            REG_NWCTRL => self.nwctrl,
            REG_NWCFG => self.nwcfg,
            REG_NWSTATUS => NWSTATUS_LINK,
            REG_ISR => {
                let isr = self.isr;
                self.isr = 0;
                self.update();
                isr
            }
            REG_IMR => self.imr,
            REG_SPADDR1LO => u32::from_le_bytes([self.mac[0], self.mac[1], self.mac[2], self.mac[3]]),
            REG_SPADDR1HI => u32::from(u16::from_le_bytes([self.mac[4], self.mac[5]])),
            _ => 0,
        }
    }

    fn write_reg(&mut self, reg: u64, bits: u32, lane: u32) {
        let merge = |old: u32| (old & !lane) | bits;
        match reg {
            REG_NWCTRL => self.nwctrl = merge(self.nwctrl),
            REG_NWCFG => self.nwcfg = merge(self.nwcfg),
            REG_IER => self.imr &= !bits,
            REG_IDR => self.imr |= bits,
            REG_SPADDR1LO => {
                let old = u32::from_le_bytes([self.mac[0], self.mac[1], self.mac[2], self.mac[3]]);
                self.mac[..4].copy_from_slice(&merge(old).to_le_bytes());
            }
            REG_SPADDR1HI => {
                let old = u32::from(u16::from_le_bytes([self.mac[4], self.mac[5]]));
                self.mac[4..].copy_from_slice(&merge(old).to_le_bytes()[..2]);
            }
            _ => return,
        }
        self.update();
    }
}

impl Component for CadenceGem {
    fn kind(&self) -> &'static str {
        GEM_MODEL
    }

    fn set_config(&mut self, name: &str, value: &Value) -> Result<(), ConfigError> {
        match name {
            "model" => {
                let model = value.as_str(name)?;
                if model != GEM_MODEL {
                    return Err(ConfigError::invalid(
                        name,
                        format!("NIC model `{model}` is not supported, only `{GEM_MODEL}`"),
                    ));
                }
            }
            "mac" => {
                let text = value.as_str(name)?;
                self.mac = parse_mac(text)
                    .ok_or_else(|| ConfigError::invalid(name, format!("`{text}` is not a MAC address")))?;
            }
            _ => return Err(ConfigError::unknown(name)),
        }
        Ok(())
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

    fn read(&mut self, offset: u64, size: AccessSize) -> u64 {
        let value = self.read_reg(offset & !3);
        (u64::from(value) >> ((offset & 3) * 8)) & size.mask()
    }

    fn write(&mut self, offset: u64, value: u64, size: AccessSize) {
        let (bits, lane) = size.word_lane(offset, value);
        self.write_reg(offset & !3, bits, lane);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
