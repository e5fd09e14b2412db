//! AST2400 board description.
//!
//! This module declares the AST2400 BMC SoC as a `Blueprint`. It provides:
//! 1. **Names and IRQs:** Component names and the interrupt numbers each peripheral uses
//!    on the VIC.
//! 2. **Model registry:** Symbolic I2C-slave model names mapped to constructors.
//! 3. **Blueprint:** The SRAM and I/O regions plus the ordered component steps, with the
//!    serial port left out when no serial backend is given.
//! 4. **Assembly:** `assemble` builds the blueprint and hands it to the generic engine.

use std::collections::BTreeMap;
use std::fmt;

use tracing::info;

use crate::common::AssemblyError;
use crate::config::{BaseAddresses, StaticConfig};
use crate::soc::backend::HostBackends;
use crate::soc::builder::{Blueprint, Machine};
use crate::soc::devices::cpu::{PIN_FIQ, PIN_IRQ};
use crate::soc::devices::gem::format_mac;
use crate::soc::devices::vic::{OUTPUT_FIQ, OUTPUT_IRQ};
use crate::soc::devices::{
    Arm926, AspeedI2c, AspeedScu, AspeedTimer, AspeedVic, CadenceGem, Ds1338, Tmp423, Uart16550,
};
use crate::soc::sequencer::ComponentStep;
use crate::soc::traits::Component;

/// Name of the root address space.
pub const MACHINE: &str = "ast2400";
/// Name of the SRAM region and its RAM component.
pub const SRAM: &str = "ast2400.sram";
/// Name of the I/O region and its catch-all component.
pub const IOMEM: &str = "ast2400.io";
/// CPU core.
pub const CPU: &str = "cpu";
/// Vectored interrupt controller.
pub const VIC: &str = "vic";
/// Timer controller.
pub const TIMER: &str = "timerctrl";
/// Ethernet MAC.
pub const GEM: &str = "gem";
/// System control unit.
pub const SCU: &str = "scu";
/// Serial port 5, the console.
pub const UART5: &str = "uart5";
/// I2C controller.
pub const I2C: &str = "i2c";
/// Temperature sensor on the I2C controller.
pub const SENSOR: &str = "tmp423";
/// Real-time clock on the I2C controller.
pub const RTC: &str = "rtc";

/// VIC input numbers of the AST2400 peripherals.
pub mod irq {
    /// Ethernet MAC.
    pub const GEM: usize = 3;
    /// UART1 through UART5.
    pub const UARTS: [usize; 5] = [9, 32, 33, 34, 10];
    /// UART5, the console.
    pub const UART5: usize = UARTS[4];
    /// I2C controller.
    pub const I2C: usize = 12;
    /// Timers 1 through 8.
    pub const TIMERS: [usize; 8] = [16, 17, 18, 35, 36, 37, 38, 39];
}

/// Constructor of a dynamically chosen model.
pub type ModelConstructor = fn() -> Box<dyn Component>;

/// Symbolic model names mapped to constructors.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelConstructor>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.models.keys()).finish()
    }
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the I2C slave models the AST2400 boards use.
    pub fn with_defaults() -> Self {
        let mut models = Self::new();
        models.register("tmp423", || Box::new(Tmp423::new()));
        models.register("ds1338", || Box::new(Ds1338::new()));
        models
    }

    /// Registers (or replaces) a model.
    pub fn register(&mut self, name: &str, constructor: ModelConstructor) {
        let _ = self.models.insert(name.to_owned(), constructor);
    }

    /// Looks up a model constructor.
    pub fn get(&self, name: &str) -> Option<ModelConstructor> {
        self.models.get(name).copied()
    }

    /// Returns the registered model names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.models.keys().map(String::as_str)
    }
}

fn model(models: &ModelRegistry, component: &str, name: &str) -> Result<ModelConstructor, AssemblyError> {
    models.get(name).ok_or_else(|| AssemblyError::UnknownModel {
        component: component.to_owned(),
        model: name.to_owned(),
    })
}

/// Builds the AST2400 blueprint.
///
/// # Arguments
///
/// * `bases` - Memory map.
/// * `soc` - Static per-component settings.
/// * `backends` - Host backends; the serial port is only declared when one is present.
/// * `models` - Constructors for the I2C slave models.
///
/// # Errors
///
/// `AssemblyError::UnknownModel` if the sensor or RTC model is not registered. This is
/// checked before any step is declared, so nothing is constructed.
pub fn blueprint(
    bases: &BaseAddresses,
    soc: &StaticConfig,
    backends: HostBackends,
    models: &ModelRegistry,
) -> Result<Blueprint, AssemblyError> {
    let sensor_model = model(models, SENSOR, "tmp423")?;
    let rtc_model = model(models, RTC, &soc.rtc.model)?;
    let HostBackends { serial, nic } = backends;

    let mut bp = Blueprint::new(MACHINE)
        .io(IOMEM, bases.iomem, bases.iomem_size, bases.iomem_priority)
        .ram(SRAM, bases.sram, bases.sram_size, 0)
        .step(ComponentStep::new(CPU, || Box::new(Arm926::new())))
        .step(
            ComponentStep::new(VIC, || Box::new(AspeedVic::new()))
                .setting("sense", soc.vic.sense)
                .setting("dual_edge", soc.vic.dual_edge)
                .setting("event", soc.vic.event)
                .window(0, bases.vic)
                .irq(OUTPUT_IRQ, CPU, PIN_IRQ)
                .irq(OUTPUT_FIQ, CPU, PIN_FIQ),
        );

    let mut timer = ComponentStep::new(TIMER, || Box::new(AspeedTimer::new())).window(0, bases.timer);
    for (output, line) in irq::TIMERS.iter().enumerate() {
        timer = timer.irq(output, VIC, *line);
    }
    bp.push(timer);

    let mut gem = ComponentStep::new(GEM, || Box::new(CadenceGem::new()));
    if let Some(nic) = nic {
        gem = gem.setting("model", nic.model).setting("mac", format_mac(&nic.mac));
    }
    bp.push(gem.window(0, bases.gem).irq(0, VIC, irq::GEM));

    bp.push(
        ComponentStep::new(SCU, || Box::new(AspeedScu::new()))
            .setting("silicon-rev", soc.scu.silicon_rev)
            .setting("scu0c", soc.scu.scu0c)
            .setting("scu88", soc.scu.scu88)
            .setting("scu8c", soc.scu.scu8c)
            .setting("scu9c", soc.scu.scu9c)
            .window(0, bases.scu),
    );

    match serial {
        Some(serial) => bp.push(
            ComponentStep::new(UART5, move || Box::new(Uart16550::new(serial)))
                .setting("regshift", soc.uart.regshift)
                .setting("baudbase", soc.uart.baudbase)
                .window_in(0, IOMEM, bases.uart5_offset)
                .irq(0, VIC, irq::UART5),
        ),
        None => info!(component = UART5, "no serial backend, serial port omitted"),
    }

    bp.push(
        ComponentStep::new(I2C, || Box::new(AspeedI2c::new()))
            .window(0, bases.i2c)
            .irq(0, VIC, irq::I2C),
    );

    let mut sensor = ComponentStep::new(SENSOR, sensor_model).on_bus(I2C, soc.sensor.bus, soc.sensor.address);
    for (channel, millidegrees) in soc.sensor.temperatures.iter().enumerate() {
        sensor = sensor.setting(&format!("temperature{channel}"), *millidegrees);
    }
    bp.push(sensor);

    bp.push(ComponentStep::new(RTC, rtc_model).on_bus(I2C, soc.rtc.bus, soc.rtc.address));
    Ok(bp)
}

/// Assembles an AST2400 machine with the default model registry.
///
/// # Errors
///
/// Returns the first `AssemblyError` raised while building the blueprint or bringing up
/// its components.
pub fn assemble(
    bases: &BaseAddresses,
    soc: &StaticConfig,
    backends: HostBackends,
) -> Result<Machine, AssemblyError> {
    assemble_with_models(bases, soc, backends, &ModelRegistry::with_defaults())
}

/// Assembles an AST2400 machine resolving I2C slave models through `models`.
///
/// # Errors
///
/// See [`assemble`].
pub fn assemble_with_models(
    bases: &BaseAddresses,
    soc: &StaticConfig,
    backends: HostBackends,
    models: &ModelRegistry,
) -> Result<Machine, AssemblyError> {
    Machine::from_blueprint(blueprint(bases, soc, backends, models)?)
}
