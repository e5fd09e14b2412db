//! # AST2400 Topology Tests
//!
//! This module assembles the AST2400 board with real device models and checks the
//! memory map, interrupt wiring, I2C slave placement, optional peripherals, and the
//! failure cases of board assembly.

use bmcsim_core::common::{AccessSize, AssemblyError, ConfigError, ErrorKind};
use bmcsim_core::config::MachineConfig;
use bmcsim_core::soc::ast2400::{self, ModelRegistry, irq};
use bmcsim_core::soc::devices::gem::DEFAULT_MAC;
use bmcsim_core::soc::devices::{
    Arm926, AspeedI2c, AspeedTimer, AspeedVic, CadenceGem, LineSense, Tmp423, Uart16550,
};
use bmcsim_core::soc::{BufferBackend, HostBackends, Machine, NicBackend, Resolution};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::init_tracing;

fn headless() -> Machine {
    init_tracing();
    Machine::assemble(&MachineConfig::default(), HostBackends::none()).unwrap()
}

fn with_console() -> (Machine, BufferBackend) {
    init_tracing();
    let console = BufferBackend::new();
    let machine =
        Machine::assemble(&MachineConfig::default(), HostBackends::none().with_serial(console.clone())).unwrap();
    (machine, console)
}

fn start_of(machine: &Machine, addr: u64) -> Option<&str> {
    let hit = machine.resolve(addr).ok()?;
    (hit.offset == 0).then(|| machine.registry().name(hit.component)).flatten()
}

#[test]
fn test_missing_serial_backend_omits_uart5_without_error() {
    let machine = headless();

    assert!(!machine.contains(ast2400::UART5));
    assert_eq!(
        machine.registry().iter().map(|(_, name, _)| name.to_owned()).collect::<Vec<_>>(),
        [
            ast2400::IOMEM, ast2400::SRAM, ast2400::CPU, ast2400::VIC, ast2400::TIMER,
            ast2400::GEM, ast2400::SCU, ast2400::I2C, ast2400::SENSOR, ast2400::RTC,
        ]
    );
    let vic = machine.component_id(ast2400::VIC).unwrap();
    assert!(machine.fabric().source_of(vic, irq::UART5).is_none());
    let uart_addr = 0x1E60_0000 + 0x18_4000;
    assert_eq!(machine.resolve(uart_addr).map(|r| r.component), Ok(machine.component_id(ast2400::IOMEM).unwrap()));
}

#[rstest]
#[case::vic(0x1E6C_0000, ast2400::VIC)]
#[case::timer(0x1E78_2000, ast2400::TIMER)]
#[case::gem(0x1E68_0000, ast2400::GEM)]
#[case::scu(0x1E6E_2000, ast2400::SCU)]
#[case::i2c(0x1E78_A000, ast2400::I2C)]
#[case::sram(0x1E72_0000, ast2400::SRAM)]
#[case::uart5(0x1E78_4000, ast2400::UART5)]
fn test_peripheral_windows_land_at_their_bases(#[case] base: u64, #[case] name: &str) {
    let (machine, _) = with_console();
    assert_eq!(start_of(&machine, base), Some(name));
}

#[test]
fn test_unmodelled_io_goes_to_the_catch_all() {
    let machine = headless();
    let io = machine.component_id(ast2400::IOMEM).unwrap();

    assert_eq!(machine.resolve(0x1E60_0000), Ok(Resolution { component: io, offset: 0 }));
    assert_eq!(machine.resolve(0x1E78_5000), Ok(Resolution { component: io, offset: 0x18_5000 }));
    assert_eq!(machine.read(0x1E61_0000, AccessSize::Word), 0);
    assert_eq!(machine.read(0x4000_0000, AccessSize::Word), 0);
}

#[test]
fn test_interrupt_wiring_matches_the_board() {
    let (machine, _) = with_console();
    let name = |id| machine.registry().name(id).unwrap().to_owned();

    let wires: Vec<_> = machine
        .connections()
        .iter()
        .map(|c| (name(c.source), c.output, name(c.controller), c.input))
        .collect();

    let mut expected = vec![
        ("vic".to_owned(), 0, "cpu".to_owned(), 0),
        ("vic".to_owned(), 1, "cpu".to_owned(), 1),
    ];
    expected.extend(irq::TIMERS.iter().enumerate().map(|(i, &line)| ("timerctrl".to_owned(), i, "vic".to_owned(), line)));
    expected.push(("gem".to_owned(), 0, "vic".to_owned(), 3));
    expected.push(("uart5".to_owned(), 0, "vic".to_owned(), 10));
    expected.push(("i2c".to_owned(), 0, "vic".to_owned(), 12));
    assert_eq!(wires, expected);
}

#[test]
fn test_i2c_slaves_sit_at_their_addresses() {
    let machine = headless();
    let sensor = machine.component_id(ast2400::SENSOR).unwrap();
    let rtc = machine.component_id(ast2400::RTC).unwrap();

    let placement = machine
        .with_component(ast2400::I2C, |i2c: &mut AspeedI2c| (i2c.child(2, 0x4C), i2c.child(0, 0x68), i2c.children(1)))
        .unwrap();
    assert_eq!(placement, (Some(sensor), Some(rtc), vec![]));

    let temps = machine
        .with_component(ast2400::SENSOR, |t: &mut Tmp423| (0..4).map(|c| t.temperature(c).unwrap()).collect::<Vec<_>>())
        .unwrap();
    assert_eq!(temps, [31_000, 28_000, 20_000, 110_000]);
    assert_eq!(machine.registry().kind(rtc), Some("ds1338"));
}

#[test]
fn test_static_settings_reach_the_devices() {
    let (machine, _) = with_console();

    assert_eq!(machine.read(0x1E6E_207C, AccessSize::Word), 0x0201_0303);
    assert_eq!(machine.read(0x1E6E_200C, AccessSize::Word), 0x19FC_3E8B);

    let modes = machine
        .with_component(ast2400::VIC, |v: &mut AspeedVic| (v.line_sense(16), v.line_sense(3), v.line_sense(38)))
        .unwrap();
    assert_eq!(modes, (Some(LineSense::DualEdge), Some(LineSense::LevelHigh), Some(LineSense::DualEdge)));

    let uart = machine
        .with_component(ast2400::UART5, |u: &mut Uart16550| (u.regshift(), u.baudbase()))
        .unwrap();
    assert_eq!(uart, (2, 38_400));
    assert_eq!(machine.with_component(ast2400::GEM, |g: &mut CadenceGem| g.mac()), Some(DEFAULT_MAC));
}

#[test]
fn test_console_bytes_reach_the_serial_backend() {
    let (machine, console) = with_console();
    for b in *b"ok\n" {
        machine.write(0x1E78_4000, u64::from(b), AccessSize::Word);
    }
    assert_eq!(console.output_string(), "ok\n");

    console.push_input(b"x");
    machine.tick();
    // LSR sits at register 5, spaced four bytes apart.
    assert_eq!(machine.read(0x1E78_4000 + (5 << 2), AccessSize::Word) & 1, 1);
    assert_eq!(machine.read(0x1E78_4000, AccessSize::Word), u64::from(b'x'));
}

#[test]
fn test_timer_expiry_reaches_the_cpu_irq_pin() {
    let machine = headless();
    // Enable VIC line 16 (timer 0) and the timer 0 interrupt.
    machine.write(0x1E6C_0020, 1 << 16, AccessSize::Word);
    machine.write(0x1E78_2030, 1 << 2, AccessSize::Word);

    machine.with_component(ast2400::TIMER, |t: &mut AspeedTimer| t.force_expire(0)).unwrap();
    machine.tick();

    assert_eq!(machine.read(0x1E6C_0000, AccessSize::Word), 1 << 16);
    assert_eq!(machine.with_component(ast2400::CPU, |c: &mut Arm926| c.irq_pending()), Some(true));
    assert_eq!(machine.with_component(ast2400::CPU, |c: &mut Arm926| c.fiq_pending()), Some(false));

    machine.write(0x1E6C_0038, 1 << 16, AccessSize::Word);
    assert_eq!(machine.with_component(ast2400::CPU, |c: &mut Arm926| c.irq_pending()), Some(false));
}

#[test]
fn test_nic_backend_sets_the_mac() {
    let nic = NicBackend { model: "cadence_gem".to_owned(), mac: [0x02, 0, 0, 0xAA, 0xBB, 0xCC] };
    let machine = Machine::assemble(&MachineConfig::default(), HostBackends::none().with_nic(nic)).unwrap();
    assert_eq!(
        machine.with_component(ast2400::GEM, |g: &mut CadenceGem| g.mac()),
        Some([0x02, 0, 0, 0xAA, 0xBB, 0xCC])
    );
    assert_eq!(machine.read(0x1E68_0088, AccessSize::Word), 0xAA00_0002);
}

#[test]
fn test_unsupported_nic_model_fails_on_the_gem() {
    let nic = NicBackend { model: "e1000".to_owned(), mac: DEFAULT_MAC };
    let err = Machine::assemble(&MachineConfig::default(), HostBackends::none().with_nic(nic)).unwrap_err();
    assert_eq!(err.component(), ast2400::GEM);
    assert!(matches!(
        err,
        AssemblyError::Config { source: ConfigError::InvalidValue { ref setting, .. }, .. } if setting == "model"
    ));
}

#[test]
fn test_unknown_rtc_model_fails_before_construction() {
    let mut config = MachineConfig::default();
    config.soc.rtc.model = "pcf8563".to_owned();

    let err = Machine::assemble(&config, HostBackends::none()).unwrap_err();

    assert_eq!(err, AssemblyError::UnknownModel { component: "rtc".to_owned(), model: "pcf8563".to_owned() });
}

#[test]
fn test_registered_models_are_resolved_by_name() {
    let models = ModelRegistry::with_defaults();
    assert_eq!(models.names().collect::<Vec<_>>(), ["ds1338", "tmp423"]);

    let mut config = MachineConfig::default();
    config.soc.rtc.model = "tmp423".to_owned();
    config.soc.rtc.bus = 3;
    let machine = ast2400::assemble_with_models(&config.bases, &config.soc, HostBackends::none(), &models).unwrap();
    assert_eq!(machine.registry().kind(machine.component_id(ast2400::RTC).unwrap()), Some("tmp423"));

    let err = ast2400::assemble_with_models(&config.bases, &config.soc, HostBackends::none(), &ModelRegistry::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownModel);
    assert_eq!(err.component(), ast2400::SENSOR);
}

#[rstest]
#[case::vic_level_and_dual_edge(|c: &mut MachineConfig| c.soc.vic.dual_edge |= 1, ast2400::VIC, ErrorKind::Activation)]
#[case::sensor_too_hot(|c: &mut MachineConfig| c.soc.sensor.temperatures[1] = 200_000, ast2400::SENSOR, ErrorKind::Config)]
#[case::sensor_on_missing_bus(|c: &mut MachineConfig| c.soc.sensor.bus = 14, ast2400::SENSOR, ErrorKind::Config)]
#[case::rtc_address_clash(
    |c: &mut MachineConfig| { c.soc.rtc.bus = 2; c.soc.rtc.address = 0x4C; },
    ast2400::RTC,
    ErrorKind::Config
)]
#[case::uart_regshift(|c: &mut MachineConfig| c.soc.uart.regshift = 3, ast2400::UART5, ErrorKind::Config)]
#[case::vic_over_sram(|c: &mut MachineConfig| c.bases.sram = 0x1E6C_0000, ast2400::VIC, ErrorKind::Map)]
#[case::sram_size_wraps(|c: &mut MachineConfig| c.bases.sram_size = u64::MAX, ast2400::SRAM, ErrorKind::Map)]
#[case::sram_too_large_to_allocate(|c: &mut MachineConfig| c.bases.sram_size = 1 << 62, ast2400::SRAM, ErrorKind::Activation)]
fn test_bad_configuration_names_the_failing_component(
    #[case] tweak: fn(&mut MachineConfig),
    #[case] component: &str,
    #[case] kind: ErrorKind,
) {
    let mut config = MachineConfig::default();
    tweak(&mut config);

    let err = Machine::assemble(&config, HostBackends::none().with_serial(BufferBackend::new())).unwrap_err();

    assert_eq!((err.component(), err.kind()), (component, kind));
}
