//! # Interrupt Fabric Tests
//!
//! This module tests connection rules, line levels and edge latching of the
//! interrupt fabric, including concurrent signalling on a shared input bank.

use std::sync::Arc;
use std::thread;

use bmcsim_core::common::{IrqError, LineSide};
use bmcsim_core::soc::interrupt::Connection;
use bmcsim_core::soc::{ComponentId, InterruptFabric, IrqInputBank};
use pretty_assertions::assert_eq;
use rstest::rstest;

const VIC: ComponentId = ComponentId(0);
const TIMER: ComponentId = ComponentId(1);
const NET: ComponentId = ComponentId(2);

fn fabric_with_controller(lines: usize) -> InterruptFabric {
    let mut fabric = InterruptFabric::new();
    let _ = fabric.add_controller(VIC, lines);
    fabric
}

#[test]
fn test_driving_a_line_is_seen_at_the_controller_input() {
    let mut fabric = fabric_with_controller(8);
    let line = fabric.connect(TIMER, 0, VIC, 3).unwrap();

    assert_eq!(line.input(), 3);
    assert!(!fabric.input_level(VIC, 3));
    line.raise();
    assert!(fabric.input_level(VIC, 3));
    assert!(line.is_asserted());
    line.lower();
    assert!(!fabric.input_level(VIC, 3));
}

#[test]
fn test_bound_input_rejects_second_source_and_keeps_the_first() {
    let mut fabric = fabric_with_controller(8);
    let first = fabric.connect(TIMER, 0, VIC, 3).unwrap();

    let err = fabric.connect(NET, 0, VIC, 3).unwrap_err();

    assert_eq!(err, IrqError::LineAlreadyBound { component: VIC, line: 3, side: LineSide::Input });
    assert_eq!(
        fabric.source_of(VIC, 3),
        Some(&Connection { source: TIMER, output: 0, controller: VIC, input: 3 })
    );
    assert_eq!(fabric.connections().len(), 1);
    first.raise();
    assert!(fabric.input_level(VIC, 3));
}

#[test]
fn test_bound_output_rejects_second_input() {
    let mut fabric = fabric_with_controller(8);
    let _ = fabric.connect(TIMER, 0, VIC, 3).unwrap();

    let err = fabric.connect(TIMER, 0, VIC, 4).unwrap_err();

    assert_eq!(err, IrqError::LineAlreadyBound { component: TIMER, line: 0, side: LineSide::Output });
    assert!(fabric.source_of(VIC, 4).is_none());
}

#[rstest]
#[case::just_past_the_end(8)]
#[case::far_out(64)]
fn test_input_index_is_bounds_checked(#[case] input: usize) {
    let mut fabric = fabric_with_controller(8);
    assert_eq!(
        fabric.connect(TIMER, 0, VIC, input).unwrap_err(),
        IrqError::LineOutOfRange { controller: VIC, line: input, lines: 8 }
    );
}

#[test]
fn test_target_without_inputs_is_not_a_controller() {
    let mut fabric = fabric_with_controller(8);
    assert_eq!(fabric.connect(TIMER, 0, NET, 0).unwrap_err(), IrqError::NotAController(NET));
}

#[test]
fn test_connections_keep_wiring_order_and_lines_can_be_looked_up() {
    let mut fabric = fabric_with_controller(8);
    let _ = fabric.connect(TIMER, 0, VIC, 3).unwrap();
    let _ = fabric.connect(NET, 0, VIC, 2).unwrap();

    let order: Vec<_> = fabric.connections().iter().map(|c| (c.source, c.input)).collect();
    assert_eq!(order, vec![(TIMER, 3), (NET, 2)]);

    let net = fabric.line_for(NET, 0).unwrap();
    net.raise();
    assert!(fabric.input_level(VIC, 2));
    assert!(!fabric.input_level(VIC, 3));
    assert!(fabric.line_for(NET, 1).is_none());
}

#[test]
fn test_adding_a_controller_twice_returns_the_same_bank() {
    let mut fabric = InterruptFabric::new();
    let a = fabric.add_controller(VIC, 8);
    let b = fabric.add_controller(VIC, 16);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(b.lines(), 8);
}

#[test]
fn test_pulse_latches_both_edges_once() {
    let mut fabric = fabric_with_controller(8);
    let line = fabric.connect(TIMER, 0, VIC, 5).unwrap();
    let bank = Arc::clone(fabric.bank(VIC).unwrap());

    line.pulse();

    assert!(!bank.level(5));
    assert_eq!(bank.take_rising(0), 1 << 5);
    assert_eq!(bank.take_falling(0), 1 << 5);
    assert_eq!(bank.take_rising(0), 0);
    assert_eq!(bank.take_falling(0), 0);
}

#[test]
fn test_concurrent_signalling_on_one_bank() {
    let bank = Arc::new(IrqInputBank::new(64));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let bank = Arc::clone(&bank);
            thread::spawn(move || {
                for line in (t..64).step_by(8) {
                    bank.set_level(line, true);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(bank.levels(0), u64::MAX);
    assert_eq!(bank.take_rising(0), u64::MAX);
}
