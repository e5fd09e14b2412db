//! Memory-mapped device models.
//!
//! This module contains register-level models of the AST2400 peripherals: the
//! vectored interrupt controller (VIC), timers, Ethernet MAC, system control unit,
//! serial port, I2C controller and its slave devices, plus the catch-all placeholder
//! for unimplemented I/O.

/// Unimplemented-device placeholder backing I/O regions.
pub mod catch_all;

/// ARM926 interrupt pins.
pub mod cpu;

/// DS1338 real-time clock (I2C slave).
pub mod ds1338;

/// Cadence GEM Ethernet controller.
pub mod gem;

/// Aspeed I2C controller.
pub mod i2c;

/// Aspeed system control unit.
pub mod scu;

/// Aspeed timer controller.
pub mod timer;

/// TMP423 temperature sensor (I2C slave).
pub mod tmp423;

/// UART 16550-compatible serial port.
pub mod uart;

/// Aspeed vectored interrupt controller.
pub mod vic;

pub use catch_all::CatchAll;
pub use cpu::Arm926;
pub use ds1338::Ds1338;
pub use gem::CadenceGem;
pub use i2c::AspeedI2c;
pub use scu::AspeedScu;
pub use timer::AspeedTimer;
pub use tmp423::Tmp423;
pub use uart::Uart16550;
pub use vic::{AspeedVic, LineSense};

pub use crate::soc::traits::Component;
