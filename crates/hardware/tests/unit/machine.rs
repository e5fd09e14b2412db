//! # Machine Assembly Tests
//!
//! This module tests `Machine::from_blueprint` end to end with mock components:
//! region installation, window mapping, interrupt wiring, abort semantics, runtime
//! access through the frozen topology, and sharing the machine across threads.

use std::sync::Arc;
use std::thread;

use bmcsim_core::common::{AccessSize, AssemblyError, ErrorKind, IrqError, MapError};
use bmcsim_core::soc::devices::CatchAll;
use bmcsim_core::soc::{ActivationState, AddressSpace, Blueprint, ComponentId, Machine, Resolution};
use pretty_assertions::assert_eq;

use crate::common::mocks::component::{MockComponent, Probe};
use crate::common::{init_tracing, mock_step};

const SRAM_BASE: u64 = 0x0;
const INTC_BASE: u64 = 0x1000_0000;
const TIMER_BASE: u64 = 0x1000_2000;
const NET_BASE: u64 = 0x1000_3000;
const IO_BASE: u64 = 0x2000_0000;

/// Controller with 8 inputs, a timer on line 3 and a network component on line 2.
fn small_board(probe: &Probe) -> Blueprint {
    let (a, b, c) = (probe.clone(), probe.clone(), probe.clone());
    Blueprint::new("board")
        .ram("sram", SRAM_BASE, 0x8000, 0)
        .io("io", IO_BASE, 0x1_0000, -1)
        .step(
            mock_step("intc", move || MockComponent::new("intc", &a).kind("intc").inputs(8).window(0x1000))
                .window(0, INTC_BASE),
        )
        .step(
            mock_step("timer", move || MockComponent::new("timer", &b).kind("timer").outputs(1).window(0x100))
                .window(0, TIMER_BASE)
                .irq(0, "intc", 3),
        )
        .step(
            mock_step("net", move || MockComponent::new("net", &c).kind("net").outputs(1).window(0x1000))
                .window(0, NET_BASE)
                .irq(0, "intc", 2),
        )
}

fn id(machine: &Machine, name: &str) -> ComponentId {
    machine.component_id(name).unwrap()
}

#[test]
fn test_timer_resolves_and_its_interrupt_reaches_controller_line_3() {
    init_tracing();
    let probe = Probe::new();
    let machine = Machine::from_blueprint(small_board(&probe)).unwrap();
    let (intc, timer) = (id(&machine, "intc"), id(&machine, "timer"));

    assert_eq!(machine.resolve(TIMER_BASE), Ok(Resolution { component: timer, offset: 0 }));
    assert!(!machine.fabric().input_level(intc, 3));

    machine.with_component("timer", |m: &mut MockComponent| m.raise(0)).unwrap();

    assert!(machine.fabric().input_level(intc, 3));
    assert!(!machine.fabric().input_level(intc, 2));
    let seen = machine
        .with_component("intc", |m: &mut MockComponent| m.bank().map(|b| (b.lines(), b.level(3))))
        .unwrap();
    assert_eq!(seen, Some((8, true)));
}

#[test]
fn test_topology_lists_every_mapping_and_wire() {
    let probe = Probe::new();
    let machine = Machine::from_blueprint(small_board(&probe)).unwrap();
    let (intc, timer, net) = (id(&machine, "intc"), id(&machine, "timer"), id(&machine, "net"));

    let wires: Vec<_> = machine.connections().iter().map(|c| (c.source, c.output, c.controller, c.input)).collect();
    assert_eq!(wires, vec![(timer, 0, intc, 3), (net, 0, intc, 2)]);

    let names: Vec<_> = machine.memory_map().into_iter().map(|e| (e.name, e.base)).collect();
    assert_eq!(
        names,
        vec![
            ("sram".to_owned(), SRAM_BASE),
            ("intc".to_owned(), INTC_BASE),
            ("timer".to_owned(), TIMER_BASE),
            ("net".to_owned(), NET_BASE),
            ("io".to_owned(), IO_BASE),
        ]
    );
    assert!(machine.registry().iter().all(|(_, _, s)| s == ActivationState::Active));
    assert_eq!(machine.registry().kind(net), Some("net"));
}

#[test]
fn test_equal_priority_windows_overlapping_by_one_byte() {
    let mut space = AddressSpace::new("board");
    space.map("timer", TIMER_BASE, 0x100, ComponentId(0), 0).unwrap();

    let err = space.map("net", TIMER_BASE + 0xFF, 0x100, ComponentId(1), 0).unwrap_err();

    assert!(matches!(err, MapError::OverlapConflict { ref existing, .. } if existing == "timer"));
    assert_eq!(space.resolve(TIMER_BASE + 0xFF), Ok(Resolution { component: ComponentId(0), offset: 0xFF }));
}

#[test]
fn test_overlapping_component_window_aborts_assembly() {
    let probe = Probe::new();
    let (a, b, c) = (probe.clone(), probe.clone(), Probe::new());
    let late = c.clone();
    let bp = Blueprint::new("board")
        .step(mock_step("timer", move || MockComponent::new("timer", &a).window(0x100)).window(0, TIMER_BASE))
        .step(mock_step("net", move || MockComponent::new("net", &b).window(0x100)).window(0, TIMER_BASE + 0xFF))
        .step(mock_step("late", move || MockComponent::new("late", &c)));

    let err = Machine::from_blueprint(bp).unwrap_err();

    assert_eq!(err.component(), "net");
    assert_eq!(err.kind(), ErrorKind::Map);
    assert_eq!(late.constructed(), 0);
}

#[test]
fn test_activation_failure_names_the_component_and_constructs_nothing_after() {
    let probe = Probe::new();
    let later = Probe::new();
    let (a, b, c) = (probe.clone(), probe.clone(), later.clone());
    let bp = Blueprint::new("board")
        .step(mock_step("intc", move || MockComponent::new("intc", &a).inputs(8)))
        .step(mock_step("timer", move || MockComponent::new("timer", &b).failing_activation("bad divider")))
        .step(mock_step("net", move || MockComponent::new("net", &c)).irq(0, "intc", 2));

    let err = Machine::from_blueprint(bp).unwrap_err();

    assert_eq!(err.component(), "timer");
    assert_eq!(err.kind(), ErrorKind::Activation);
    assert_eq!(err.to_string(), "activating `timer`: bad divider");
    assert_eq!((later.constructed(), later.configured(), later.activated()), (0, 0, 0));
}

#[test]
fn test_route_from_missing_output_is_a_wiring_error() {
    let probe = Probe::new();
    let (a, b) = (probe.clone(), probe.clone());
    let bp = Blueprint::new("board")
        .step(mock_step("intc", move || MockComponent::new("intc", &a).inputs(8)))
        .step(mock_step("timer", move || MockComponent::new("timer", &b).outputs(1)).irq(1, "intc", 4));

    let err = Machine::from_blueprint(bp).unwrap_err();

    assert_eq!(
        err,
        AssemblyError::Wiring {
            component: "timer".to_owned(),
            source: IrqError::NoSuchOutput { source_id: ComponentId(1), output: 1, outputs: 1 },
        }
    );
}

#[test]
fn test_route_to_undeclared_or_non_controller_target() {
    let probe = Probe::new();
    let a = probe.clone();
    let undeclared = Blueprint::new("board")
        .step(mock_step("timer", move || MockComponent::new("timer", &a).outputs(1)).irq(0, "intc", 3));
    assert_eq!(
        Machine::from_blueprint(undeclared).unwrap_err(),
        AssemblyError::UnknownComponent { component: "timer".to_owned(), missing: "intc".to_owned() }
    );

    let (c, d) = (probe.clone(), probe.clone());
    let not_controller = Blueprint::new("board")
        .step(mock_step("scu", move || MockComponent::new("scu", &c)))
        .step(mock_step("timer", move || MockComponent::new("timer", &d).outputs(1)).irq(0, "scu", 0));
    let err = Machine::from_blueprint(not_controller).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Wiring);
    assert!(matches!(err, AssemblyError::Wiring { source: IrqError::NotAController(_), .. }));
}

#[test]
fn test_bad_window_placements_are_map_errors() {
    let probe = Probe::new();
    let (a, b) = (probe.clone(), probe.clone());
    let missing_window = Blueprint::new("board")
        .step(mock_step("timer", move || MockComponent::new("timer", &a).window(0x100)).window(1, TIMER_BASE));
    assert_eq!(
        Machine::from_blueprint(missing_window).unwrap_err(),
        AssemblyError::Map {
            component: "timer".to_owned(),
            source: MapError::NoSuchWindow { name: "timer".to_owned(), window: 1, windows: 1 },
        }
    );

    let missing_region = Blueprint::new("board")
        .step(mock_step("uart", move || MockComponent::new("uart", &b).window(0x20)).window_in(0, "io", 0x400));
    assert_eq!(
        Machine::from_blueprint(missing_region).unwrap_err(),
        AssemblyError::Map { component: "uart".to_owned(), source: MapError::NoSuchRegion("io".to_owned()) }
    );
}

#[test]
fn test_window_in_region_shadows_the_catch_all() {
    let probe = Probe::new();
    let p = probe.clone();
    let bp = Blueprint::new("board")
        .io("io", IO_BASE, 0x1_0000, -1)
        .step(
            mock_step("uart", move || MockComponent::new("uart", &p).window_at(0x10, 0x20))
                .window_in(0, "io", 0x400),
        );
    let machine = Machine::from_blueprint(bp).unwrap();
    let (uart, io) = (id(&machine, "uart"), id(&machine, "io"));

    assert_eq!(machine.resolve(IO_BASE + 0x404), Ok(Resolution { component: uart, offset: 0x14 }));
    assert_eq!(machine.resolve(IO_BASE + 0x420), Ok(Resolution { component: io, offset: 0x420 }));
}

#[test]
fn test_unmapped_and_catch_all_accesses_read_zero() {
    init_tracing();
    let probe = Probe::new();
    let machine = Machine::from_blueprint(small_board(&probe)).unwrap();

    assert_eq!(machine.read(0xF000_0000, AccessSize::Word), 0);
    machine.write(0xF000_0000, 0xDEAD_BEEF, AccessSize::Word);

    machine.write(IO_BASE + 0x10, 0x1234, AccessSize::Word);
    assert_eq!(machine.read(IO_BASE + 0x10, AccessSize::Word), 0);
    assert_eq!(machine.with_component("io", |c: &mut CatchAll| c.accesses()), Some(2));
}

#[test]
fn test_reads_and_writes_reach_ram_and_components() {
    let probe = Probe::new();
    let machine = Machine::from_blueprint(small_board(&probe)).unwrap();

    machine.write(SRAM_BASE + 0x10, 0x1122_3344, AccessSize::Word);
    assert_eq!(machine.read(SRAM_BASE + 0x12, AccessSize::Half), 0x1122);

    machine.write(NET_BASE + 0x8, 0xAB, AccessSize::Byte);
    assert_eq!(machine.read(NET_BASE + 0x8, AccessSize::Word), 0xAB);
}

#[test]
fn test_tick_advances_every_active_component() {
    let probe = Probe::new();
    let machine = Machine::from_blueprint(small_board(&probe)).unwrap();
    for _ in 0..3 {
        machine.tick();
    }
    for name in ["intc", "timer", "net"] {
        assert_eq!(machine.with_component(name, |m: &mut MockComponent| m.ticks()), Some(3));
    }
    assert_eq!(machine.state("net"), Some(ActivationState::Active));
    assert!(machine.with_component("net", |c: &mut CatchAll| c.accesses()).is_none());
    assert!(!machine.contains("uart"));
}

#[test]
fn test_machine_is_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Machine>();

    let probe = Probe::new();
    let machine = Arc::new(Machine::from_blueprint(small_board(&probe)).unwrap());
    let timer = id(&machine, "timer");
    let expected = machine.resolve(TIMER_BASE + 0x40);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let machine = Arc::clone(&machine);
            thread::spawn(move || {
                for i in 0..100u64 {
                    assert_eq!(machine.resolve(TIMER_BASE + 0x40), expected);
                    machine.write(SRAM_BASE + t * 8, i, AccessSize::Double);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(expected, Ok(Resolution { component: timer, offset: 0x40 }));
    for t in 0..4 {
        assert_eq!(machine.read(SRAM_BASE + t * 8, AccessSize::Double), 99);
    }
}
