//! Aspeed timer controller.
//!
//! Eight down-counting timers sharing one control register. Each timer drives its own
//! interrupt output, pulsed when the counter expires with its interrupt enabled.
//!
//! # Memory Map
//!
//! * `0x00`, `0x10`, `0x20`: Timers 0-2
//! * `0x30`: Control (4 bits per timer: enable, external clock, interrupt, pulse)
//! * `0x40` .. `0x80`: Timers 3-7, every `0x10`
//!
//! Within a timer block: `+0x0` counter, `+0x4` reload, `+0x8` match 1, `+0xC` match 2.

use std::any::Any;

use crate::common::AccessSize;
use crate::soc::interrupt::IrqLine;
use crate::soc::traits::{Component, RegisterWindow};

/// Number of timers.
pub const TIMER_COUNT: usize = 8;

const WINDOW_SIZE: u64 = 0x1000;
const REG_CONTROL: u64 = 0x30;

const CTRL_ENABLE: u32 = 1 << 0;
const CTRL_INTERRUPT: u32 = 1 << 2;

#[derive(Clone, Copy, Debug, Default)]
struct Channel {
    counter: u32,
    reload: u32,
    match1: u32,
    match2: u32,
}

/// Timer controller device structure.
#[derive(Debug, Default)]
pub struct AspeedTimer {
    control: u32,
    channels: [Channel; TIMER_COUNT],
    outputs: [Option<IrqLine>; TIMER_COUNT],
    expirations: [u64; TIMER_COUNT],
}

impl AspeedTimer {
    /// Creates a controller with every timer stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the timer block index and register offset for a window offset.
    const fn decode(offset: u64) -> Option<(usize, u64)> {
        let block = offset >> 4;
        let reg = offset & 0xC;
        match block {
            0..=2 => Some((block as usize, reg)),
            4..=8 => Some((block as usize - 1, reg)),
            _ => None,
        }
    }

    const fn enabled(&self, channel: usize) -> bool {
        (self.control >> (channel * 4)) & CTRL_ENABLE != 0
    }

    const fn interrupt_enabled(&self, channel: usize) -> bool {
        (self.control >> (channel * 4)) & CTRL_INTERRUPT != 0
    }

    /// Returns the current counter of one timer.
    pub fn counter(&self, channel: usize) -> Option<u32> {
        self.channels.get(channel).map(|c| c.counter)
    }

    /// Returns how many times one timer has expired.
    pub fn expirations(&self, channel: usize) -> u64 {
        self.expirations.get(channel).copied().unwrap_or(0)
    }

    /// Expires one timer now, as if its counter had reached zero.
    pub fn force_expire(&mut self, channel: usize) {
        if channel >= TIMER_COUNT {
            return;
        }
        self.expire(channel);
    }

    fn expire(&mut self, channel: usize) {
        self.channels[channel].counter = self.channels[channel].reload;
        self.expirations[channel] += 1;
        if self.interrupt_enabled(channel) {
            if let Some(line) = &self.outputs[channel] {
                line.pulse();
            }
        }
    }
}

impl Component for AspeedTimer {
    fn kind(&self) -> &'static str {
        "aspeed.timer"
    }

    fn register_windows(&self) -> Vec<RegisterWindow> {
        vec![RegisterWindow::new(WINDOW_SIZE)]
    }

    fn interrupt_outputs(&self) -> usize {
        TIMER_COUNT
    }

    fn connect_output(&mut self, output: usize, line: IrqLine) {
        if let Some(slot) = self.outputs.get_mut(output) {
            *slot = Some(line);
        }
    }

    fn read(&mut self, offset: u64, size: AccessSize) -> u64 {
        let value = if offset & !3 == REG_CONTROL {
            self.control
        } else {
            match Self::decode(offset & !3) {
                Some((ch, reg)) => {
                    let c = &self.channels[ch];
                    match reg {
                        0x0 => c.counter,
                        0x4 => c.reload,
                        0x8 => c.match1,
                        _ => c.match2,
                    }
                }
                None => 0,
            }
        };
        (u64::from(value) >> ((offset & 3) * 8)) & size.mask()
    }

    fn write(&mut self, offset: u64, value: u64, size: AccessSize) {
        let (bits, lane) = size.word_lane(offset, value);
        let merge = |old: u32| (old & !lane) | bits;
        if offset & !3 == REG_CONTROL {
            let control = merge(self.control);
            let started = control & !self.control;
            self.control = control;
            for ch in 0..TIMER_COUNT {
                if (started >> (ch * 4)) & CTRL_ENABLE != 0 {
                    self.channels[ch].counter = self.channels[ch].reload;
                }
            }
            return;
        }
        if let Some((ch, reg)) = Self::decode(offset & !3) {
            let c = &mut self.channels[ch];
            let field = match reg {
                0x0 => &mut c.counter,
                0x4 => &mut c.reload,
                0x8 => &mut c.match1,
                _ => &mut c.match2,
            };
            *field = merge(*field);
        }
    }

    fn tick(&mut self) {
        for ch in 0..TIMER_COUNT {
            if !self.enabled(ch) {
                continue;
            }
            let counter = self.channels[ch].counter;
            if counter <= 1 {
                self.expire(ch);
            } else {
                self.channels[ch].counter = counter - 1;
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
