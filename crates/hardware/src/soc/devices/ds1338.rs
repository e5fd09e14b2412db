//! Maxim DS1338 real-time clock.
//!
//! The clock follows host time plus an offset set by writing the time registers.
//!
//! # Register Map
//!
//! * `0x00`..`0x06`: Seconds, minutes, hours (24-hour), weekday (1-7), date, month,
//!   year, all BCD
//! * `0x07`: Control
//! * `0x08`..`0x3F`: Battery-backed NVRAM

use std::any::Any;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::soc::traits::Component;

const REG_CONTROL: u8 = 0x07;
const NVRAM_START: u8 = 0x08;
const REG_COUNT: usize = 0x40;

const SECS_PER_DAY: i64 = 86_400;

/// DS1338 device structure.
#[derive(Debug)]
pub struct Ds1338 {
    offset_secs: i64,
    control: u8,
    nvram: [u8; REG_COUNT - NVRAM_START as usize],
    pointer: u8,
}

impl Default for Ds1338 {
    fn default() -> Self {
        Self {
            offset_secs: 0,
            control: 0,
            nvram: [0; REG_COUNT - NVRAM_START as usize],
            pointer: 0,
        }
    }
}

impl Ds1338 {
    /// Creates a clock tracking host time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns host time in seconds since the epoch.
    fn host_secs() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
    }

    /// Returns guest time in seconds since the epoch.
    pub fn now_secs(&self) -> i64 {
        Self::host_secs() + self.offset_secs
    }

    /// Sets guest time to the given seconds since the epoch.
    pub fn set_secs(&mut self, secs: i64) {
        self.offset_secs = secs - Self::host_secs();
    }

    /// Reads one register.
    pub fn read_register(&self, reg: u8) -> u8 {
        match reg {
            0x00..=0x06 => clock_registers(self.now_secs())[usize::from(reg)],
            REG_CONTROL => self.control,
            r if usize::from(r) < REG_COUNT => self.nvram[usize::from(r - NVRAM_START)],
            _ => 0,
        }
    }

    /// Writes one register.
    pub fn write_register(&mut self, reg: u8, value: u8) {
        match reg {
            0x00..=0x06 => {
                let mut regs = clock_registers(self.now_secs());
                regs[usize::from(reg)] = value;
                if let Some(secs) = secs_from_registers(&regs) {
                    self.set_secs(secs);
                }
            }
            REG_CONTROL => self.control = value,
            r if usize::from(r) < REG_COUNT => self.nvram[usize::from(r - NVRAM_START)] = value,
            _ => {}
        }
    }

    /// Receives one byte of an I2C write transfer; the first byte sets the pointer.
    pub fn send(&mut self, byte: u8, first: bool) {
        if first {
            self.pointer = byte % REG_COUNT as u8;
        } else {
            self.write_register(self.pointer, byte);
            self.advance();
        }
    }

    /// Produces one byte of an I2C read transfer from the current pointer.
    pub fn recv(&mut self) -> u8 {
        let byte = self.read_register(self.pointer);
        self.advance();
        byte
    }

    fn advance(&mut self) {
        self.pointer = (self.pointer + 1) % REG_COUNT as u8;
    }
}

const fn to_bcd(v: u8) -> u8 {
    ((v / 10) << 4) | (v % 10)
}

const fn from_bcd(v: u8) -> u8 {
    (v >> 4) * 10 + (v & 0x0F)
}

/// Converts days since the epoch into a proleptic Gregorian `(year, month, day)`.
const fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + (month <= 2) as i64;
    (year, month, day)
}

/// Converts a proleptic Gregorian date into days since the epoch.
const fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let yoe = year.rem_euclid(400);
    let m = month as i64;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn clock_registers(secs: i64) -> [u8; 7] {
    let days = secs.div_euclid(SECS_PER_DAY);
    let tod = secs.rem_euclid(SECS_PER_DAY);
    let (year, month, day) = civil_from_days(days);
    // 1970-01-01 was a Thursday; the register counts Sunday as 1.
    let weekday = (days + 4).rem_euclid(7) as u8 + 1;
    [
        to_bcd((tod % 60) as u8),
        to_bcd((tod / 60 % 60) as u8),
        to_bcd((tod / 3600) as u8),
        weekday,
        to_bcd(day),
        to_bcd(month),
        to_bcd(year.rem_euclid(100) as u8),
    ]
}

fn secs_from_registers(regs: &[u8; 7]) -> Option<i64> {
    let sec = i64::from(from_bcd(regs[0] & 0x7F));
    let min = i64::from(from_bcd(regs[1] & 0x7F));
    let hour = i64::from(from_bcd(regs[2] & 0x3F));
    let day = from_bcd(regs[4] & 0x3F);
    let month = from_bcd(regs[5] & 0x1F);
    let year = 2000 + i64::from(from_bcd(regs[6]));
    if sec > 59 || min > 59 || hour > 23 || !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    Some(days_from_civil(year, month, day) * SECS_PER_DAY + hour * 3600 + min * 60 + sec)
}

impl Component for Ds1338 {
    fn kind(&self) -> &'static str {
        "ds1338"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
