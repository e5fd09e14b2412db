//! ARM926 interrupt pins.
//!
//! The core itself is outside this crate. What the machine needs from it is the
//! two-line interrupt input vector (IRQ and FIQ) that the VIC drives.

use std::any::Any;
use std::sync::Arc;

use crate::soc::interrupt::IrqInputBank;
use crate::soc::traits::Component;

/// Input index of the IRQ pin.
pub const PIN_IRQ: usize = 0;
/// Input index of the FIQ pin.
pub const PIN_FIQ: usize = 1;

/// CPU core model exposing nothing but its interrupt pins.
#[derive(Debug, Default)]
pub struct Arm926 {
    pins: Option<Arc<IrqInputBank>>,
}

impl Arm926 {
    /// Creates a core with unwired pins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the IRQ pin is asserted.
    pub fn irq_pending(&self) -> bool {
        self.pins.as_ref().is_some_and(|p| p.level(PIN_IRQ))
    }

    /// Returns whether the FIQ pin is asserted.
    pub fn fiq_pending(&self) -> bool {
        self.pins.as_ref().is_some_and(|p| p.level(PIN_FIQ))
    }
}

impl Component for Arm926 {
    fn kind(&self) -> &'static str {
        "arm926"
    }

    fn interrupt_inputs(&self) -> usize {
        2
    }

    fn attach_inputs(&mut self, bank: Arc<IrqInputBank>) {
        self.pins = Some(bank);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
