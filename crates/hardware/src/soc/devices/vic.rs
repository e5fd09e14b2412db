//! Aspeed Vectored Interrupt Controller (VIC).
//!
//! The VIC collects 64 input lines into two outputs, IRQ and FIQ. Each line's
//! sensitivity comes from three 64-bit masks applied as settings before activation:
//!
//! * `sense`: bit set means level-sensitive, clear means edge-sensitive.
//! * `dual_edge`: for edge lines, bit set means both edges trigger.
//! * `event`: bit set means high level or rising edge, clear means low level or
//!   falling edge. Ignored for dual-edge lines.
//!
//! # Memory Map
//!
//! Every 64-bit register is split into a low word at the listed offset and a high word
//! at offset + 4.
//!
//! * `0x00`: IRQ status (pending, enabled, routed to IRQ)
//! * `0x08`: FIQ status (pending, enabled, routed to FIQ)
//! * `0x10`: Raw status (pending before enable)
//! * `0x18`: Select (bit set routes the line to FIQ)
//! * `0x20`: Enable (read) / enable set (write)
//! * `0x28`: Enable clear (write)
//! * `0x38`: Edge clear (write 1 to drop a latched edge)
//! * `0x40`: Sense mask (read only)
//! * `0x48`: Dual-edge mask (read only)
//! * `0x50`: Event mask (read only)

use std::any::Any;
use std::sync::Arc;

use crate::common::{AccessSize, ActivationError, ConfigError, Value};
use crate::soc::interrupt::{IrqInputBank, IrqLine};
use crate::soc::traits::{Component, RegisterWindow};

/// Number of input lines.
pub const VIC_LINES: usize = 64;
/// Output index driving the CPU IRQ pin.
pub const OUTPUT_IRQ: usize = 0;
/// Output index driving the CPU FIQ pin.
pub const OUTPUT_FIQ: usize = 1;

const WINDOW_SIZE: u64 = 0x2_0000;

const REG_IRQ_STATUS: u64 = 0x00;
const REG_FIQ_STATUS: u64 = 0x08;
const REG_RAW_STATUS: u64 = 0x10;
const REG_SELECT: u64 = 0x18;
const REG_ENABLE: u64 = 0x20;
const REG_ENABLE_CLEAR: u64 = 0x28;
const REG_EDGE_CLEAR: u64 = 0x38;
const REG_SENSE: u64 = 0x40;
const REG_DUAL_EDGE: u64 = 0x48;
const REG_EVENT: u64 = 0x50;

/// Trigger condition of one input line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineSense {
    /// Pending while the line is high.
    LevelHigh,
    /// Pending while the line is low.
    LevelLow,
    /// Latched on a low-to-high transition.
    RisingEdge,
    /// Latched on a high-to-low transition.
    FallingEdge,
    /// Latched on either transition.
    DualEdge,
}

/// VIC device structure.
#[derive(Debug, Default)]
pub struct AspeedVic {
    sense: u64,
    dual_edge: u64,
    event: u64,
    enable: u64,
    select: u64,
    edge_status: u64,
    inputs: Option<Arc<IrqInputBank>>,
    irq: Option<IrqLine>,
    fiq: Option<IrqLine>,
}

impl AspeedVic {
    /// Creates a VIC with all lines edge-triggered on the falling edge and disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the trigger condition the masks give one line.
    pub const fn line_sense(&self, line: usize) -> Option<LineSense> {
        if line >= VIC_LINES {
            return None;
        }
        let bit = 1u64 << line;
        let mode = if self.sense & bit != 0 {
            if self.event & bit != 0 { LineSense::LevelHigh } else { LineSense::LevelLow }
        } else if self.dual_edge & bit != 0 {
            LineSense::DualEdge
        } else if self.event & bit != 0 {
            LineSense::RisingEdge
        } else {
            LineSense::FallingEdge
        };
        Some(mode)
    }

    /// Enables the given lines.
    pub fn enable_lines(&mut self, mask: u64) {
        self.enable |= mask;
        self.update();
    }

    /// Returns the pending lines before enable masking.
    pub fn raw_status(&mut self) -> u64 {
        self.latch_edges();
        self.level_status() | self.edge_status
    }

    fn level_status(&self) -> u64 {
        let levels = self.inputs.as_ref().map_or(0, |b| b.levels(0));
        let high = self.sense & self.event;
        let low = self.sense & !self.event;
        (levels & high) | (!levels & low)
    }

    fn latch_edges(&mut self) {
        let Some(bank) = self.inputs.as_ref() else {
            return;
        };
        let rising = bank.take_rising(0);
        let falling = bank.take_falling(0);
        let edge = !self.sense;
        let dual = edge & self.dual_edge;
        let rise_only = edge & !self.dual_edge & self.event;
        let fall_only = edge & !self.dual_edge & !self.event;
        self.edge_status |= (rising & (rise_only | dual)) | (falling & (fall_only | dual));
    }

    fn update(&mut self) {
        let status = self.raw_status() & self.enable;
        if let Some(irq) = &self.irq {
            irq.set_level(status & !self.select != 0);
        }
        if let Some(fiq) = &self.fiq {
            fiq.set_level(status & self.select != 0);
        }
    }

    fn read_reg(&mut self, reg: u64) -> u64 {
        match reg {
            REG_IRQ_STATUS => self.raw_status() & self.enable & !self.select,
            REG_FIQ_STATUS => self.raw_status() & self.enable & self.select,
            REG_RAW_STATUS => self.raw_status(),
            REG_SELECT => self.select,
            REG_ENABLE => self.enable,
            REG_SENSE => self.sense,
            REG_DUAL_EDGE => self.dual_edge,
            REG_EVENT => self.event,
            _ => 0,
        }
    }

    fn write_reg(&mut self, reg: u64, bits: u64, lane: u64) {
        match reg {
            REG_SELECT => self.select = (self.select & !lane) | bits,
            REG_ENABLE => self.enable |= bits,
            REG_ENABLE_CLEAR => self.enable &= !bits,
            REG_EDGE_CLEAR => self.edge_status &= !bits,
            _ => return,
        }
        self.update();
    }
}

impl Component for AspeedVic {
    fn kind(&self) -> &'static str {
        "aspeed.vic"
    }

    fn set_config(&mut self, name: &str, value: &Value) -> Result<(), ConfigError> {
        match name {
            "sense" => self.sense = value.as_u64(name)?,
            "dual_edge" => self.dual_edge = value.as_u64(name)?,
            "event" => self.event = value.as_u64(name)?,
            _ => return Err(ConfigError::unknown(name)),
        }
        Ok(())
    }

    fn activate(&mut self) -> Result<(), ActivationError> {
        let conflict = self.sense & self.dual_edge;
        if conflict != 0 {
            return Err(ActivationError::new(format!(
                "dual-edge mode requested on level-sensitive lines {conflict:#018x}"
            )));
        }
        Ok(())
    }

    fn register_windows(&self) -> Vec<RegisterWindow> {
        vec![RegisterWindow::new(WINDOW_SIZE)]
    }

    fn interrupt_inputs(&self) -> usize {
        VIC_LINES
    }

    fn interrupt_outputs(&self) -> usize {
        2
    }

    fn attach_inputs(&mut self, bank: Arc<IrqInputBank>) {
        self.inputs = Some(bank);
    }

    fn connect_output(&mut self, output: usize, line: IrqLine) {
        match output {
            OUTPUT_IRQ => self.irq = Some(line),
            OUTPUT_FIQ => self.fiq = Some(line),
            _ => {}
        }
    }

    fn read(&mut self, offset: u64, size: AccessSize) -> u64 {
        let value = self.read_reg(offset & !7);
        let shift = (offset & 7) * 8;
        (value >> shift) & size.mask()
    }

    fn write(&mut self, offset: u64, value: u64, size: AccessSize) {
        let shift = (offset & 7) * 8;
        let lane = size.mask() << shift;
        self.write_reg(offset & !7, (value << shift) & lane, lane);
    }

    fn tick(&mut self) {
        self.update();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
