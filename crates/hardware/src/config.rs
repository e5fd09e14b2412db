//! Configuration system for the AST2400 machine.
//!
//! This module defines the structures used to parameterize machine assembly. It provides:
//! 1. **Defaults:** The AST2400 memory map, interrupt-controller masks, SCU strap values,
//!    serial parameters and I2C slave placements.
//! 2. **Structures:** Hierarchical config for base addresses and per-component static
//!    settings.
//!
//! Configuration is supplied as JSON (`MachineConfig::from_json`) or taken from
//! `MachineConfig::default()`. Every field is optional in JSON and falls back to the
//! AST2400 value.

use serde::Deserialize;

/// Default configuration constants for the AST2400.
mod defaults {
    /// Base of the catch-all I/O region.
    pub const IOMEM_BASE: u64 = 0x1E60_0000;

    /// Size of the catch-all I/O region (2 MiB).
    pub const IOMEM_SIZE: u64 = 0x0020_0000;

    /// Priority of the I/O region; every peripheral window shadows it.
    pub const IOMEM_PRIORITY: i32 = -1;

    /// Base of the Cadence GEM Ethernet controller.
    pub const GEM_BASE: u64 = 0x1E68_0000;

    /// Base of the vectored interrupt controller.
    pub const VIC_BASE: u64 = 0x1E6C_0000;

    /// Base of the system control unit.
    pub const SCU_BASE: u64 = 0x1E6E_2000;

    /// Base of the on-chip SRAM.
    pub const SRAM_BASE: u64 = 0x1E72_0000;

    /// Size of the on-chip SRAM (32 KiB).
    pub const SRAM_SIZE: u64 = 0x8000;

    /// Base of the timer controller.
    pub const TIMER_BASE: u64 = 0x1E78_2000;

    /// Base of the I2C controller.
    pub const I2C_BASE: u64 = 0x1E78_A000;

    /// Offset of UART5 inside the I/O region.
    pub const UART5_OFFSET: u64 = 0x0018_4000;

    /// VIC sense mask: set bits are level-sensitive lines.
    pub const VIC_SENSE: u64 = 0x0000_1F07_FFF8_FFFF;

    /// VIC dual-edge mask: set bits trigger on both edges (the timer lines).
    pub const VIC_DUAL_EDGE: u64 = 0x0000_00F8_0007_0000;

    /// VIC event mask: set bits are active-high or rising-edge lines.
    pub const VIC_EVENT: u64 = 0x0000_5F07_FFF8_FFFF;

    /// SCU clock-stop control reset value.
    pub const SCU0C: u32 = 0x19FC_3E8B;

    /// SCU multi-function pin control 5 reset value.
    pub const SCU88: u32 = 0x0100_0000;

    /// SCU multi-function pin control 6 reset value.
    pub const SCU8C: u32 = 0x0000_00FF;

    /// SCU watchdog reset selection reset value.
    pub const SCU9C: u32 = 0x003F_FFF3;

    /// AST2400 A1 silicon revision.
    pub const SILICON_REV: u32 = 0x0201_0303;

    /// UART register spacing (registers every 4 bytes).
    pub const UART_REGSHIFT: u32 = 2;

    /// UART baud base.
    pub const UART_BAUDBASE: u32 = 38_400;

    /// Temperature sensor I2C bus.
    pub const SENSOR_BUS: usize = 2;

    /// Temperature sensor I2C address.
    pub const SENSOR_ADDRESS: u8 = 0x4C;

    /// Initial sensor temperatures in millidegrees Celsius.
    pub const SENSOR_TEMPERATURES: [i64; 4] = [31_000, 28_000, 20_000, 110_000];

    /// RTC model.
    pub const RTC_MODEL: &str = "ds1338";

    /// RTC I2C bus.
    pub const RTC_BUS: usize = 0;

    /// RTC I2C address.
    pub const RTC_ADDRESS: u8 = 0x68;
}

/// Top-level machine configuration.
///
/// # Examples
///
/// Loading a configuration from JSON; omitted fields keep their AST2400 values:
///
/// ```
/// use bmcsim_core::config::MachineConfig;
///
/// let json = r#"{
///     "bases": { "sram": 536870912 },
///     "soc": {
///         "sensor": { "temperatures": [25000, 25000, 25000, 25000] },
///         "rtc": { "model": "ds1338" }
///     }
/// }"#;
///
/// let config = MachineConfig::from_json(json).unwrap();
/// assert_eq!(config.bases.sram, 0x2000_0000);
/// assert_eq!(config.bases.vic, 0x1E6C_0000);
/// assert_eq!(config.soc.sensor.temperatures[0], 25_000);
/// assert_eq!(config.soc.uart.baudbase, 38_400);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MachineConfig {
    /// Memory map.
    #[serde(default)]
    pub bases: BaseAddresses,
    /// Per-component static settings.
    #[serde(default)]
    pub soc: StaticConfig,
}

impl MachineConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input or mistyped fields.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Memory map of the SoC.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BaseAddresses {
    /// I/O region base
    #[serde(default = "BaseAddresses::default_iomem")]
    pub iomem: u64,

    /// I/O region size
    #[serde(default = "BaseAddresses::default_iomem_size")]
    pub iomem_size: u64,

    /// I/O region priority
    #[serde(default = "BaseAddresses::default_iomem_priority")]
    pub iomem_priority: i32,

    /// Ethernet MAC base
    #[serde(default = "BaseAddresses::default_gem")]
    pub gem: u64,

    /// Interrupt controller base
    #[serde(default = "BaseAddresses::default_vic")]
    pub vic: u64,

    /// System control unit base
    #[serde(default = "BaseAddresses::default_scu")]
    pub scu: u64,

    /// SRAM base
    #[serde(default = "BaseAddresses::default_sram")]
    pub sram: u64,

    /// SRAM size
    #[serde(default = "BaseAddresses::default_sram_size")]
    pub sram_size: u64,

    /// Timer controller base
    #[serde(default = "BaseAddresses::default_timer")]
    pub timer: u64,

    /// I2C controller base
    #[serde(default = "BaseAddresses::default_i2c")]
    pub i2c: u64,

    /// UART5 offset within the I/O region
    #[serde(default = "BaseAddresses::default_uart5_offset")]
    pub uart5_offset: u64,
}

impl BaseAddresses {
    fn default_iomem() -> u64 {
        defaults::IOMEM_BASE
    }

    fn default_iomem_size() -> u64 {
        defaults::IOMEM_SIZE
    }

    fn default_iomem_priority() -> i32 {
        defaults::IOMEM_PRIORITY
    }

    fn default_gem() -> u64 {
        defaults::GEM_BASE
    }

    fn default_vic() -> u64 {
        defaults::VIC_BASE
    }

    fn default_scu() -> u64 {
        defaults::SCU_BASE
    }

    fn default_sram() -> u64 {
        defaults::SRAM_BASE
    }

    fn default_sram_size() -> u64 {
        defaults::SRAM_SIZE
    }

    fn default_timer() -> u64 {
        defaults::TIMER_BASE
    }

    fn default_i2c() -> u64 {
        defaults::I2C_BASE
    }

    fn default_uart5_offset() -> u64 {
        defaults::UART5_OFFSET
    }

    /// Returns the absolute address of UART5.
    pub const fn uart5(&self) -> u64 {
        self.iomem + self.uart5_offset
    }
}

impl Default for BaseAddresses {
    /// Creates the AST2400 memory map.
    fn default() -> Self {
        Self {
            iomem: defaults::IOMEM_BASE,
            iomem_size: defaults::IOMEM_SIZE,
            iomem_priority: defaults::IOMEM_PRIORITY,
            gem: defaults::GEM_BASE,
            vic: defaults::VIC_BASE,
            scu: defaults::SCU_BASE,
            sram: defaults::SRAM_BASE,
            sram_size: defaults::SRAM_SIZE,
            timer: defaults::TIMER_BASE,
            i2c: defaults::I2C_BASE,
            uart5_offset: defaults::UART5_OFFSET,
        }
    }
}

/// Static per-component settings applied during assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StaticConfig {
    /// Interrupt controller masks
    #[serde(default)]
    pub vic: VicConfig,
    /// System control unit reset values
    #[serde(default)]
    pub scu: ScuConfig,
    /// Serial port parameters
    #[serde(default)]
    pub uart: UartConfig,
    /// Temperature sensor placement and readings
    #[serde(default)]
    pub sensor: SensorConfig,
    /// Real-time clock model and placement
    #[serde(default)]
    pub rtc: RtcConfig,
}

/// Interrupt-controller sensitivity masks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VicConfig {
    /// Level (1) or edge (0) sensitivity per line
    #[serde(default = "VicConfig::default_sense")]
    pub sense: u64,
    /// Both-edge trigger per line
    #[serde(default = "VicConfig::default_dual_edge")]
    pub dual_edge: u64,
    /// High/rising (1) or low/falling (0) polarity per line
    #[serde(default = "VicConfig::default_event")]
    pub event: u64,
}

impl VicConfig {
    fn default_sense() -> u64 {
        defaults::VIC_SENSE
    }

    fn default_dual_edge() -> u64 {
        defaults::VIC_DUAL_EDGE
    }

    fn default_event() -> u64 {
        defaults::VIC_EVENT
    }
}

impl Default for VicConfig {
    fn default() -> Self {
        Self { sense: defaults::VIC_SENSE, dual_edge: defaults::VIC_DUAL_EDGE, event: defaults::VIC_EVENT }
    }
}

/// System control unit reset values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScuConfig {
    /// Clock stop control
    #[serde(default = "ScuConfig::default_scu0c")]
    pub scu0c: u32,
    /// Multi-function pin control 5
    #[serde(default = "ScuConfig::default_scu88")]
    pub scu88: u32,
    /// Multi-function pin control 6
    #[serde(default = "ScuConfig::default_scu8c")]
    pub scu8c: u32,
    /// Watchdog reset selection
    #[serde(default = "ScuConfig::default_scu9c")]
    pub scu9c: u32,
    /// Silicon revision register
    #[serde(default = "ScuConfig::default_silicon_rev")]
    pub silicon_rev: u32,
}

impl ScuConfig {
    fn default_scu0c() -> u32 {
        defaults::SCU0C
    }

    fn default_scu88() -> u32 {
        defaults::SCU88
    }

    fn default_scu8c() -> u32 {
        defaults::SCU8C
    }

    fn default_scu9c() -> u32 {
        defaults::SCU9C
    }

    fn default_silicon_rev() -> u32 {
        defaults::SILICON_REV
    }
}

impl Default for ScuConfig {
    fn default() -> Self {
        Self {
            scu0c: defaults::SCU0C,
            scu88: defaults::SCU88,
            scu8c: defaults::SCU8C,
            scu9c: defaults::SCU9C,
            silicon_rev: defaults::SILICON_REV,
        }
    }
}

/// Serial port parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UartConfig {
    /// Register spacing as a power of two
    #[serde(default = "UartConfig::default_regshift")]
    pub regshift: u32,
    /// Baud base
    #[serde(default = "UartConfig::default_baudbase")]
    pub baudbase: u32,
}

impl UartConfig {
    fn default_regshift() -> u32 {
        defaults::UART_REGSHIFT
    }

    fn default_baudbase() -> u32 {
        defaults::UART_BAUDBASE
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self { regshift: defaults::UART_REGSHIFT, baudbase: defaults::UART_BAUDBASE }
    }
}

/// Temperature sensor placement and initial readings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SensorConfig {
    /// I2C bus index
    #[serde(default = "SensorConfig::default_bus")]
    pub bus: usize,
    /// I2C slave address
    #[serde(default = "SensorConfig::default_address")]
    pub address: u8,
    /// Channel temperatures in millidegrees Celsius
    #[serde(default = "SensorConfig::default_temperatures")]
    pub temperatures: [i64; 4],
}

impl SensorConfig {
    fn default_bus() -> usize {
        defaults::SENSOR_BUS
    }

    fn default_address() -> u8 {
        defaults::SENSOR_ADDRESS
    }

    fn default_temperatures() -> [i64; 4] {
        defaults::SENSOR_TEMPERATURES
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            bus: defaults::SENSOR_BUS,
            address: defaults::SENSOR_ADDRESS,
            temperatures: defaults::SENSOR_TEMPERATURES,
        }
    }
}

/// Real-time clock model and placement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RtcConfig {
    /// Model name, resolved through the model registry
    #[serde(default = "RtcConfig::default_model")]
    pub model: String,
    /// I2C bus index
    #[serde(default = "RtcConfig::default_bus")]
    pub bus: usize,
    /// I2C slave address
    #[serde(default = "RtcConfig::default_address")]
    pub address: u8,
}

impl RtcConfig {
    fn default_model() -> String {
        defaults::RTC_MODEL.to_owned()
    }

    fn default_bus() -> usize {
        defaults::RTC_BUS
    }

    fn default_address() -> u8 {
        defaults::RTC_ADDRESS
    }
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self { model: defaults::RTC_MODEL.to_owned(), bus: defaults::RTC_BUS, address: defaults::RTC_ADDRESS }
    }
}
