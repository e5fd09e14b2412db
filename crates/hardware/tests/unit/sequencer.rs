//! # Activation Sequencer Tests
//!
//! This module tests step ordering, lazy construction, abort-on-first-failure, and
//! bus-parent attachment of the activation sequencer.

use bmcsim_core::common::{AssemblyError, ConfigError, ErrorKind, Value};
use bmcsim_core::soc::{
    ActivationSequencer, ActivationState, ComponentId, ComponentRegistry, ComponentStep,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::mock_step;
use crate::common::mocks::component::{MockComponent, Probe};

fn run(sequencer: ActivationSequencer, registry: &mut ComponentRegistry) -> Result<(), AssemblyError> {
    sequencer.run(registry, |_, _, _| Ok(()))
}

fn with_mock<R>(registry: &ComponentRegistry, name: &str, f: impl FnOnce(&MockComponent) -> R) -> R {
    let id = registry.id(name).unwrap();
    let guard = registry.lock(id).unwrap();
    f(guard.as_any().downcast_ref::<MockComponent>().unwrap())
}

#[test]
fn test_steps_run_in_declaration_order() {
    let probe = Probe::new();
    let mut seq = ActivationSequencer::new();
    for name in ["vic", "timer", "uart"] {
        let p = probe.clone();
        seq.push(mock_step(name, move || MockComponent::new(name, &p)).setting("mode", 1u64));
    }
    assert_eq!(seq.names().collect::<Vec<_>>(), ["vic", "timer", "uart"]);

    let mut registry = ComponentRegistry::new();
    run(seq, &mut registry).unwrap();

    assert_eq!(
        probe.events(),
        [
            "vic:construct", "vic:configure", "vic:activate",
            "timer:construct", "timer:configure", "timer:activate",
            "uart:construct", "uart:configure", "uart:activate",
        ]
    );
    assert!(registry.iter().all(|(_, _, s)| s == ActivationState::Active));
}

#[test]
fn test_settings_are_applied_in_order_before_activation() {
    let probe = Probe::new();
    let p = probe.clone();
    let mut seq = ActivationSequencer::new();
    seq.push(
        mock_step("sensor", move || MockComponent::new("sensor", &p))
            .setting("temperature0", 31_000i64)
            .setting("temperature1", 28_000i64)
            .setting("label", "board"),
    );
    let mut registry = ComponentRegistry::new();
    run(seq, &mut registry).unwrap();

    with_mock(&registry, "sensor", |m| {
        assert_eq!(
            m.settings(),
            [
                ("temperature0".to_owned(), Value::Int(31_000)),
                ("temperature1".to_owned(), Value::Int(28_000)),
                ("label".to_owned(), Value::Str("board".to_owned())),
            ]
        );
    });
}

#[derive(Clone, Copy, Debug)]
enum Fault {
    Config,
    Activation,
    Install,
}

#[rstest]
#[case::config(Fault::Config, ErrorKind::Config)]
#[case::activation(Fault::Activation, ErrorKind::Activation)]
#[case::install(Fault::Install, ErrorKind::Map)]
fn test_failure_stops_before_later_steps_are_constructed(#[case] fault: Fault, #[case] kind: ErrorKind) {
    let (first, bad, last) = (Probe::new(), Probe::new(), Probe::new());
    let mut seq = ActivationSequencer::new();
    let p = first.clone();
    seq.push(mock_step("first", move || MockComponent::new("first", &p)));
    let p = bad.clone();
    seq.push(
        mock_step("bad", move || {
            let m = MockComponent::new("bad", &p);
            match fault {
                Fault::Config => m.rejecting("mask"),
                Fault::Activation => m.failing_activation("clock not running"),
                Fault::Install => m,
            }
        })
        .setting("mask", 3u64),
    );
    let p = last.clone();
    seq.push(mock_step("last", move || MockComponent::new("last", &p)));

    let mut registry = ComponentRegistry::new();
    let bad_install = matches!(fault, Fault::Install);
    let err = seq
        .run(&mut registry, |registry, id, _| {
            if bad_install && registry.name(id) == Some("bad") {
                return Err(AssemblyError::Map {
                    component: "bad".to_owned(),
                    source: bmcsim_core::common::MapError::NoSuchRegion("io".to_owned()),
                });
            }
            Ok(())
        })
        .unwrap_err();

    assert_eq!(err.component(), "bad");
    assert_eq!(err.kind(), kind);
    assert_eq!(registry.state(registry.id("bad").unwrap()), Some(ActivationState::Failed));
    assert_eq!(registry.state(registry.id("first").unwrap()), Some(ActivationState::Active));
    assert_eq!((last.constructed(), last.configured(), last.activated()), (0, 0, 0));
    assert!(!registry.iter().any(|(_, name, _)| name == "last"));
}

#[test]
fn test_duplicate_name_aborts_assembly() {
    let probe = Probe::new();
    let mut seq = ActivationSequencer::new();
    let (a, b) = (probe.clone(), probe.clone());
    seq.push(mock_step("vic", move || MockComponent::new("vic", &a)));
    seq.push(mock_step("vic", move || MockComponent::new("vic", &b)));
    let mut registry = ComponentRegistry::new();

    let err = run(seq, &mut registry).unwrap_err();

    assert_eq!(err, AssemblyError::DuplicateName { component: "vic".to_owned() });
    assert_eq!(registry.len(), 1);
    assert_eq!(probe.activated(), 1);
}

#[test]
fn test_install_receives_the_step_placement() {
    let probe = Probe::new();
    let p = probe.clone();
    let mut seq = ActivationSequencer::new();
    seq.push(
        mock_step("timer", move || MockComponent::new("timer", &p).window(0x100).outputs(2))
            .window(0, 0x1E78_2000)
            .irq(0, "vic", 16)
            .irq(1, "vic", 17),
    );
    let mut seen = Vec::new();
    let mut registry = ComponentRegistry::new();

    seq.run(&mut registry, |registry, id, placement| {
        assert_eq!(registry.state(id), Some(ActivationState::Active));
        seen.push((
            placement.windows.iter().map(|w| (w.window, w.base)).collect::<Vec<_>>(),
            placement.irqs.iter().map(|r| (r.output, r.controller.clone(), r.input)).collect::<Vec<_>>(),
        ));
        Ok(())
    })
    .unwrap();

    assert_eq!(
        seen,
        vec![(vec![(0, 0x1E78_2000)], vec![(0, "vic".to_owned(), 16), (1, "vic".to_owned(), 17)])]
    );
}

#[test]
fn test_bus_slave_is_attached_to_its_parent() {
    let probe = Probe::new();
    let (a, b) = (probe.clone(), probe.clone());
    let mut seq = ActivationSequencer::new();
    seq.push(mock_step("i2c", move || MockComponent::new("i2c", &a).buses(14)));
    seq.push(
        mock_step("tmp423", move || MockComponent::new("tmp423", &b))
            .on_bus("i2c", 2, 0x4C)
            .setting("temperature0", 31_000i64),
    );
    let mut registry = ComponentRegistry::new();
    run(seq, &mut registry).unwrap();

    let sensor = registry.id("tmp423").unwrap();
    let i2c = registry.id("i2c").unwrap();
    assert_eq!(registry.parent(sensor).map(|p| (p.controller, p.bus, p.address)), Some((i2c, 2, 0x4C)));
    with_mock(&registry, "i2c", |m| assert_eq!(m.children(), [(2, 0x4C, sensor)]));
}

#[rstest]
#[case::address_in_use(0, 0x50, ConfigError::AddressInUse { bus: 0, address: 0x50 })]
#[case::no_such_bus(4, 0x51, ConfigError::NoSuchBus { bus: 4, buses: 2 })]
fn test_bus_attachment_errors_fail_the_child(
    #[case] bus: usize,
    #[case] address: u8,
    #[case] expected: ConfigError,
) {
    let probe = Probe::new();
    let (a, b, c) = (probe.clone(), probe.clone(), probe.clone());
    let mut seq = ActivationSequencer::new();
    seq.push(mock_step("i2c", move || MockComponent::new("i2c", &a).buses(2)));
    seq.push(mock_step("eeprom", move || MockComponent::new("eeprom", &b)).on_bus("i2c", 0, 0x50));
    seq.push(mock_step("rtc", move || MockComponent::new("rtc", &c)).on_bus("i2c", bus, address));
    let mut registry = ComponentRegistry::new();

    let err = run(seq, &mut registry).unwrap_err();

    assert_eq!(err, AssemblyError::Config { component: "rtc".to_owned(), source: expected });
    assert_eq!(registry.state(registry.id("rtc").unwrap()), Some(ActivationState::Failed));
}

#[test]
fn test_parent_without_buses_is_rejected() {
    let probe = Probe::new();
    let (a, b) = (probe.clone(), probe.clone());
    let mut seq = ActivationSequencer::new();
    seq.push(mock_step("scu", move || MockComponent::new("scu", &a)));
    seq.push(mock_step("rtc", move || MockComponent::new("rtc", &b)).on_bus("scu", 0, 0x68));
    let mut registry = ComponentRegistry::new();

    let err = run(seq, &mut registry).unwrap_err();

    assert_eq!(err, AssemblyError::Config { component: "rtc".to_owned(), source: ConfigError::NotABus });
}

#[test]
fn test_slave_before_its_controller_is_out_of_order() {
    let probe = Probe::new();
    let mut registry = ComponentRegistry::new();
    let _ = registry
        .insert("i2c", Box::new(MockComponent::new("i2c", &probe).buses(14)), None)
        .unwrap();
    let mut seq = ActivationSequencer::new();
    let child = Probe::new();
    let p = child.clone();
    seq.push(mock_step("rtc", move || MockComponent::new("rtc", &p)).on_bus("i2c", 0, 0x68));

    let err = run(seq, &mut registry).unwrap_err();

    assert_eq!(
        err,
        AssemblyError::OutOfOrder {
            component: "rtc".to_owned(),
            dependency: "i2c".to_owned(),
            state: ActivationState::Constructed,
        }
    );
    assert_eq!(child.constructed(), 0);
}

#[test]
fn test_undeclared_parent_is_reported() {
    let probe = Probe::new();
    let p = probe.clone();
    let mut seq = ActivationSequencer::new();
    seq.push(ComponentStep::new("rtc", move || Box::new(MockComponent::new("rtc", &p))).on_bus("i2c", 0, 0x68));
    let mut registry = ComponentRegistry::new();

    let err = run(seq, &mut registry).unwrap_err();

    assert_eq!(err, AssemblyError::UnknownComponent { component: "rtc".to_owned(), missing: "i2c".to_owned() });
    assert_eq!(probe.constructed(), 0);
    assert!(registry.is_empty());
    assert_eq!(registry.id("rtc"), None::<ComponentId>);
}
