//! TI TMP423 temperature sensor.
//!
//! One local and three remote channels. Temperatures are set in millidegrees Celsius
//! through the `temperature0` .. `temperature3` settings and read back through the
//! SMBus register file: high byte at `0x00 + n`, low byte at `0x10 + n`, in the
//! sensor's standard (non-extended) format.

use std::any::Any;

use crate::common::{ConfigError, Value};
use crate::soc::traits::Component;

/// Number of temperature channels.
pub const TMP423_CHANNELS: usize = 4;

/// Lowest temperature the standard range represents, in millidegrees.
pub const MIN_MILLIDEGREES: i64 = -40_000;
/// Highest temperature the standard range represents, in millidegrees.
pub const MAX_MILLIDEGREES: i64 = 127_000;

const REG_TEMP_HIGH: u8 = 0x00;
const REG_TEMP_LOW: u8 = 0x10;
const REG_MANUFACTURER_ID: u8 = 0xFE;
const REG_DEVICE_ID: u8 = 0xFF;

const MANUFACTURER_TI: u8 = 0x55;
const DEVICE_TMP423: u8 = 0x23;

/// TMP423 device structure.
#[derive(Debug, Default)]
pub struct Tmp423 {
    temperatures: [i64; TMP423_CHANNELS],
}

impl Tmp423 {
    /// Creates a sensor reading 0 °C on every channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns one channel's temperature in millidegrees.
    pub fn temperature(&self, channel: usize) -> Option<i64> {
        self.temperatures.get(channel).copied()
    }

    /// Reads one SMBus register.
    pub fn read_register(&self, reg: u8) -> u8 {
        let channel = usize::from(reg & 0x0F);
        match reg {
            REG_MANUFACTURER_ID => MANUFACTURER_TI,
            REG_DEVICE_ID => DEVICE_TMP423,
            _ if channel >= TMP423_CHANNELS => 0,
            r if r & 0xF0 == REG_TEMP_HIGH => encode(self.temperatures[channel]).0,
            r if r & 0xF0 == REG_TEMP_LOW => encode(self.temperatures[channel]).1,
            _ => 0,
        }
    }
}

/// Splits millidegrees into the high (whole degrees) and low (sixteenths in bits 7:4)
/// register bytes.
fn encode(millidegrees: i64) -> (u8, u8) {
    let sixteenths = millidegrees * 16 / 1000;
    let high = (sixteenths >> 4) as i8 as u8;
    let low = ((sixteenths & 0xF) << 4) as u8;
    (high, low)
}

impl Component for Tmp423 {
    fn kind(&self) -> &'static str {
        "tmp423"
    }

    fn set_config(&mut self, name: &str, value: &Value) -> Result<(), ConfigError> {
        let channel = name
            .strip_prefix("temperature")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n < TMP423_CHANNELS)
            .ok_or_else(|| ConfigError::unknown(name))?;
        let millidegrees = value.as_i64(name)?;
        if !(MIN_MILLIDEGREES..=MAX_MILLIDEGREES).contains(&millidegrees) {
            return Err(ConfigError::invalid(
                name,
                format!("{millidegrees} m°C outside [{MIN_MILLIDEGREES}, {MAX_MILLIDEGREES}]"),
            ));
        }
        self.temperatures[channel] = millidegrees;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
