//! Universal Asynchronous Receiver-Transmitter (UART).
//!
//! Implements a 16550-compatible UART on top of a host `CharBackend`.
//! Handles standard registers (RBR, THR, IER, IIR, LCR, LSR) with register spacing
//! set by `regshift`, and drives one interrupt output from IIR state.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;

use crate::common::{AccessSize, ActivationError, ConfigError, Value};
use crate::soc::backend::CharBackend;
use crate::soc::interrupt::IrqLine;
use crate::soc::traits::{Component, RegisterWindow};

/// Receiver Buffer Register (Read) / Divisor Latch Low (DLAB=1).
const REG_RBR: u64 = 0;
/// Transmitter Holding Register (Write) / Divisor Latch Low (DLAB=1).
const REG_THR: u64 = 0;
/// Interrupt Enable Register / Divisor Latch High (DLAB=1).
const REG_IER: u64 = 1;
/// Interrupt Identity Register (Read).
const REG_IIR: u64 = 2;
/// FIFO Control Register (Write).
const REG_FCR: u64 = 2;
/// Line Control Register.
const REG_LCR: u64 = 3;
/// Modem Control Register.
const REG_MCR: u64 = 4;
/// Line Status Register.
const REG_LSR: u64 = 5;
/// Modem Status Register.
const REG_MSR: u64 = 6;
/// Scratch Register.
const REG_SCR: u64 = 7;

const IIR_NO_INTERRUPT: u8 = 0x01;
const IIR_THRE: u8 = 0x02;
const IIR_RDA: u8 = 0x04;
/// Interrupt Identity Register: FIFOs enabled (bits 7:6).
const IIR_FIFO_ENABLED: u8 = 0xC0;

const LSR_DATA_READY: u8 = 0x01;
const LSR_THRE: u8 = 0x20;
const LSR_TEMT: u8 = 0x40;
const LSR_DEFAULT: u8 = LSR_THRE | LSR_TEMT;

const LCR_DLAB: u8 = 0x80;

const IER_RDA: u8 = 0x01;
const IER_THRE: u8 = 0x02;

/// Largest supported register spacing (registers every 4 bytes).
const MAX_REGSHIFT: u32 = 2;

/// Default input clock divided by 16, in baud.
pub const DEFAULT_BAUDBASE: u32 = 115_200;

/// UART device structure.
pub struct Uart16550 {
    backend: Box<dyn CharBackend>,
    regshift: u32,
    baudbase: u32,
    rx_queue: VecDeque<u8>,
    ier: u8,
    lcr: u8,
    mcr: u8,
    scr: u8,
    div: u16,
    thre_ip: bool,
    irq: Option<IrqLine>,
}

impl fmt::Debug for Uart16550 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uart16550")
            .field("regshift", &self.regshift)
            .field("baudbase", &self.baudbase)
            .field("ier", &self.ier)
            .field("lcr", &self.lcr)
            .field("div", &self.div)
            .finish_non_exhaustive()
    }
}

impl Uart16550 {
    /// Creates a UART attached to the given backend.
    ///
    /// # Arguments
    ///
    /// * `backend` - Host side of the serial line.
    pub fn new(backend: Box<dyn CharBackend>) -> Self {
        Self {
            backend,
            regshift: 0,
            baudbase: DEFAULT_BAUDBASE,
            rx_queue: VecDeque::new(),
            ier: 0,
            lcr: 0,
            mcr: 0,
            scr: 0,
            div: 0,
            thre_ip: true,
            irq: None,
        }
    }

    /// Returns the register spacing as a power of two.
    pub const fn regshift(&self) -> u32 {
        self.regshift
    }

    /// Returns the configured baud base.
    pub const fn baudbase(&self) -> u32 {
        self.baudbase
    }

    /// Returns the current line rate, or `None` while the divisor is zero.
    pub fn baud_rate(&self) -> Option<u32> {
        (self.div != 0).then(|| self.baudbase / u32::from(self.div))
    }

    /// Drains pending host input into the receive queue.
    fn poll_backend(&mut self) {
        while let Some(byte) = self.backend.read_byte() {
            self.rx_queue.push_back(byte);
        }
    }

    /// Calculates the Interrupt Identity Register (IIR) value.
    ///
    /// Determines the highest priority pending interrupt.
    fn pending_interrupt(&self) -> u8 {
        if (self.ier & IER_RDA) != 0 && !self.rx_queue.is_empty() {
            return IIR_RDA;
        }
        if (self.ier & IER_THRE) != 0 && self.thre_ip {
            return IIR_THRE;
        }
        IIR_NO_INTERRUPT
    }

    fn update_irq(&self) {
        if let Some(irq) = &self.irq {
            irq.set_level(self.pending_interrupt() != IIR_NO_INTERRUPT);
        }
    }

    /// Checks if Divisor Latch Access Bit (DLAB) is set in LCR.
    const fn dlab_set(&self) -> bool {
        (self.lcr & LCR_DLAB) != 0
    }

    fn read_rbr_or_dll(&mut self) -> u8 {
        if self.dlab_set() {
            (self.div & 0xFF) as u8
        } else {
            self.rx_queue.pop_front().unwrap_or(0)
        }
    }

    const fn read_ier_or_dlm(&self) -> u8 {
        if self.dlab_set() { (self.div >> 8) as u8 } else { self.ier }
    }

    /// Reads Interrupt Identity Register (IIR).
    ///
    /// Reading this register clears a pending THRE interrupt.
    fn read_iir(&mut self) -> u8 {
        let iir = self.pending_interrupt();
        if iir == IIR_THRE {
            self.thre_ip = false;
        }
        IIR_FIFO_ENABLED | iir
    }

    fn read_lsr(&self) -> u8 {
        let mut lsr = LSR_DEFAULT;
        if !self.rx_queue.is_empty() {
            lsr |= LSR_DATA_READY;
        }
        lsr
    }

    fn write_thr_or_dll(&mut self, val: u8) {
        if self.dlab_set() {
            self.div = (self.div & 0xFF00) | u16::from(val);
        } else {
            self.backend.write_bytes(&[val]);
            self.thre_ip = true;
        }
    }

    fn write_ier_or_dlm(&mut self, val: u8) {
        if self.dlab_set() {
            self.div = (self.div & 0x00FF) | (u16::from(val) << 8);
        } else {
            self.ier = val;
            if (self.ier & IER_THRE) != 0 {
                self.thre_ip = true;
            }
        }
    }

    fn read_u8(&mut self, reg: u64) -> u8 {
        match reg {
            REG_RBR => self.read_rbr_or_dll(),
            REG_IER => self.read_ier_or_dlm(),
            REG_IIR => self.read_iir(),
            REG_LCR => self.lcr,
            REG_MCR => self.mcr,
            REG_LSR => self.read_lsr(),
            REG_MSR => 0,
            REG_SCR => self.scr,
            _ => 0,
        }
    }

    fn write_u8(&mut self, reg: u64, val: u8) {
        match reg {
            REG_THR => self.write_thr_or_dll(val),
            REG_IER => self.write_ier_or_dlm(val),
            REG_FCR => {}
            REG_LCR => self.lcr = val,
            REG_MCR => self.mcr = val,
            REG_SCR => self.scr = val,
            _ => {}
        }
    }
}

impl Component for Uart16550 {
    fn kind(&self) -> &'static str {
        "serial.16550"
    }

    fn set_config(&mut self, name: &str, value: &Value) -> Result<(), ConfigError> {
        match name {
            "regshift" => {
                let shift = value.as_u32(name)?;
                if shift > MAX_REGSHIFT {
                    return Err(ConfigError::invalid(name, format!("{shift} exceeds {MAX_REGSHIFT}")));
                }
                self.regshift = shift;
            }
            "baudbase" => {
                let baud = value.as_u32(name)?;
                if baud == 0 {
                    return Err(ConfigError::invalid(name, "baud base must be non-zero"));
                }
                self.baudbase = baud;
            }
            _ => return Err(ConfigError::unknown(name)),
        }
        Ok(())
    }

    fn activate(&mut self) -> Result<(), ActivationError> {
        if self.baudbase == 0 {
            return Err(ActivationError::new("baud base is zero"));
        }
        Ok(())
    }

    fn register_windows(&self) -> Vec<RegisterWindow> {
        vec![RegisterWindow::new(8 << self.regshift)]
    }

    fn interrupt_outputs(&self) -> usize {
        1
    }

    fn connect_output(&mut self, output: usize, line: IrqLine) {
        if output == 0 {
            self.irq = Some(line);
        }
    }

    fn read(&mut self, offset: u64, _size: AccessSize) -> u64 {
        let val = self.read_u8(offset >> self.regshift);
        self.update_irq();
        u64::from(val)
    }

    fn write(&mut self, offset: u64, value: u64, _size: AccessSize) {
        self.write_u8(offset >> self.regshift, value as u8);
        self.update_irq();
    }

    /// Polls the backend and refreshes the interrupt line.
    fn tick(&mut self) {
        self.poll_backend();
        self.update_irq();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
