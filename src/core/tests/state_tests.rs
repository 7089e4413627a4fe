use crate::core::errors::SimulationError;
use crate::core::execution::engine::Engine;
use crate::core::tests::fixtures::{Brittle, Constant, Counter, Probe, RecordingListener};
use crate::core::values::WireValue;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[test]
fn test_states_evaluate_independently() {
    let mut engine = Engine::default();
    let circuit = engine.create_circuit("shared");
    let top = engine.top_level_state(circuit).unwrap();
    let driver = engine.create_component(Probe::new(8)).unwrap();
    let sink = engine.create_component(Probe::new(8)).unwrap();
    engine.add_component(circuit, driver).unwrap();
    engine.add_component(circuit, sink).unwrap();
    engine.link_ports(driver.port(0), sink.port(0)).unwrap();
    let second = engine.add_state(circuit).unwrap();

    engine.push_value(top, driver.port(0), WireValue::of(0xA5, 8)).unwrap();
    engine.push_value(second, driver.port(0), WireValue::of(0x0F, 8)).unwrap();
    engine.step_all().unwrap();

    assert_eq!(engine.last_received(top, sink.port(0)).unwrap().value().unwrap(), 0xA5);
    assert_eq!(engine.last_received(second, sink.port(0)).unwrap().value().unwrap(), 0x0F);
}

#[test]
fn test_link_then_unlink_restores_floating_input() {
    let mut engine = Engine::default();
    let circuit = engine.create_circuit("split");
    let top = engine.top_level_state(circuit).unwrap();
    let driver = engine.create_component(Constant::new(1, 1)).unwrap();
    let probe = engine.create_component(Probe::new(1)).unwrap();
    engine.add_component(circuit, driver).unwrap();
    engine.add_component(circuit, probe).unwrap();

    engine.link_ports(driver.port(0), probe.port(0)).unwrap();
    engine.step_all().unwrap();
    assert_eq!(engine.last_received(top, probe.port(0)).unwrap(), WireValue::of(1, 1));

    engine.unlink_port(probe.port(0)).unwrap();
    let driver_link = engine.port_link(driver.port(0)).unwrap();
    let probe_link = engine.port_link(probe.port(0)).unwrap();
    assert_ne!(driver_link, probe_link);
    assert_eq!(engine.link_participants(driver_link).unwrap(), vec![driver.port(0)]);
    assert_eq!(engine.link_participants(probe_link).unwrap(), vec![probe.port(0)]);
    // visible before any step
    assert_eq!(engine.last_received(top, probe.port(0)).unwrap(), WireValue::new(1));
    assert_eq!(engine.last_pushed(top, driver.port(0)).unwrap(), WireValue::of(1, 1));

    engine.step_all().unwrap();
    assert_eq!(engine.merged_value(top, driver_link).unwrap(), WireValue::of(1, 1));
}

#[test]
fn test_unlinked_driver_keeps_its_value() {
    let mut engine = Engine::default();
    let circuit = engine.create_circuit("split");
    let top = engine.top_level_state(circuit).unwrap();
    let driver = engine.create_component(Constant::new(1, 1)).unwrap();
    let probe = engine.create_component(Probe::new(1)).unwrap();
    engine.add_component(circuit, driver).unwrap();
    engine.add_component(circuit, probe).unwrap();
    engine.link_ports(probe.port(0), driver.port(0)).unwrap();
    engine.step_all().unwrap();

    engine.unlink_port(driver.port(0)).unwrap();
    engine.step_all().unwrap();

    let driver_link = engine.port_link(driver.port(0)).unwrap();
    assert_eq!(engine.merged_value(top, driver_link).unwrap(), WireValue::of(1, 1));
    assert_eq!(engine.last_received(top, probe.port(0)).unwrap(), WireValue::new(1));
}

#[test]
fn test_snapshot_is_frozen_and_read_only() {
    let mut engine = Engine::default();
    let circuit = engine.create_circuit("frozen");
    let top = engine.top_level_state(circuit).unwrap();
    let driver = engine.create_component(Probe::new(1)).unwrap();
    let sink = engine.create_component(Probe::new(1)).unwrap();
    engine.add_component(circuit, driver).unwrap();
    engine.add_component(circuit, sink).unwrap();
    engine.link_ports(driver.port(0), sink.port(0)).unwrap();
    engine.push_value(top, driver.port(0), WireValue::of(1, 1)).unwrap();
    engine.step_all().unwrap();

    let snapshot = engine.snapshot_state(top).unwrap();
    assert!(engine.circuit_state(snapshot).unwrap().is_read_only());
    assert!(!engine.circuit(circuit).unwrap().contains_state(snapshot));
    assert_eq!(
        engine.push_value(snapshot, driver.port(0), WireValue::of(0, 1)),
        Err(SimulationError::ReadOnly)
    );
    assert_eq!(engine.reset_state(snapshot), Err(SimulationError::ReadOnly));

    engine.push_value(top, driver.port(0), WireValue::of(0, 1)).unwrap();
    engine.step_all().unwrap();
    assert_eq!(engine.last_received(top, sink.port(0)).unwrap(), WireValue::of(0, 1));
    assert_eq!(engine.last_received(snapshot, sink.port(0)).unwrap(), WireValue::of(1, 1));

    assert!(engine.remove_snapshot(top).is_err());
    engine.remove_snapshot(snapshot).unwrap();
    assert!(engine.circuit_state(snapshot).is_err());
}

#[test]
fn test_update_component_carries_properties() {
    let mut engine = Engine::default();
    let circuit = engine.create_circuit("replace");
    let top = engine.top_level_state(circuit).unwrap();
    let old = engine.create_component(Counter::new(1)).unwrap();
    engine.add_component(circuit, old).unwrap();
    let second = engine.add_state(circuit).unwrap();
    let new = engine.create_component(Counter::new(1)).unwrap();

    let mut ran = false;
    engine
        .update_component(circuit, old, new, |engine| {
            ran = true;
            assert_eq!(engine.component_circuit(old).unwrap(), None);
            Ok(())
        })
        .unwrap();

    assert!(ran);
    assert_eq!(Counter::inits(&engine, top, new), 2);
    assert_eq!(Counter::inits(&engine, second, new), 2);
    assert_eq!(Counter::inits(&engine, top, old), 0);
    assert_eq!(engine.component_circuit(new).unwrap(), Some(circuit));
    assert!(!engine.circuit(circuit).unwrap().components().contains(&old));
}

#[test]
fn test_remove_component_requires_unlinked_ports() {
    let mut engine = Engine::default();
    let circuit = engine.create_circuit("edit");
    let listener = Arc::new(RecordingListener::default());
    engine.add_listener(circuit, listener.clone()).unwrap();
    let a = engine.create_component(Probe::new(1)).unwrap();
    let b = engine.create_component(Probe::new(1)).unwrap();
    engine.add_component(circuit, a).unwrap();
    engine.add_component(circuit, b).unwrap();
    engine.link_ports(a.port(0), b.port(0)).unwrap();

    assert!(matches!(
        engine.remove_component(circuit, a),
        Err(SimulationError::PortStillLinked { port: 0, .. })
    ));
    assert!(matches!(
        engine.discard_component(a),
        Err(SimulationError::AlreadyAttached(_))
    ));

    engine.unlink_port(a.port(0)).unwrap();
    engine.remove_component(circuit, a).unwrap();
    engine.remove_component(circuit, a).unwrap();
    assert_eq!(engine.component_circuit(a).unwrap(), None);

    let events = listener.events.lock().clone();
    assert_eq!(events, vec![(circuit, a, true), (circuit, b, true), (circuit, a, false)]);
}

#[test]
fn test_property_removal_and_clear() {
    let mut engine = Engine::default();
    let circuit = engine.create_circuit("props");
    let top = engine.top_level_state(circuit).unwrap();
    let counter = engine.create_component(Counter::new(1)).unwrap();
    engine.add_component(circuit, counter).unwrap();

    let taken = engine.remove_component_property(top, counter).unwrap();
    assert!(taken.is_some());
    assert_eq!(Counter::inits(&engine, top, counter), 0);

    engine.clear_components(circuit).unwrap();
    assert!(engine.circuit(circuit).unwrap().components().is_empty());
}

#[test]
fn test_failing_init_and_uninit_visit_every_state() {
    let mut engine = Engine::default();
    let circuit = engine.create_circuit("brittle");
    engine.add_state(circuit).unwrap();
    engine.add_state(circuit).unwrap();
    let brittle = Arc::new(Brittle::default());
    let id = engine.create_shared_component(brittle.clone()).unwrap();

    assert_eq!(
        engine.add_component(circuit, id),
        Err(SimulationError::component("brittle", "init 1"))
    );
    assert_eq!(brittle.inits.load(Ordering::SeqCst), 3);
    assert_eq!(engine.component_circuit(id).unwrap(), Some(circuit));

    assert_eq!(
        engine.remove_component(circuit, id),
        Err(SimulationError::component("brittle", "uninit 1"))
    );
    assert_eq!(brittle.uninits.load(Ordering::SeqCst), 3);
    assert_eq!(engine.component_circuit(id).unwrap(), None);
}

#[test]
fn test_discarding_replaced_component_drops_its_records() {
    let mut engine = Engine::default();
    let circuit = engine.create_circuit("replace");
    let top = engine.top_level_state(circuit).unwrap();
    let old = engine.create_component(Constant::new(1, 1)).unwrap();
    engine.add_component(circuit, old).unwrap();
    let old_link = engine.port_link(old.port(0)).unwrap();
    let new = engine.create_component(Constant::new(0, 1)).unwrap();

    engine.update_component(circuit, old, new, |_| Ok(())).unwrap();
    assert!(engine.circuit_state(top).unwrap().link_states.contains_key(&old_link));

    engine.discard_component(old).unwrap();
    assert!(!engine.circuit_state(top).unwrap().link_states.contains_key(&old_link));
    assert!(engine.link(old_link).is_err());
    assert!(engine.pending_links().iter().all(|(_, link)| *link != old_link));
}

#[test]
fn test_add_state_rolls_back_past_failing_uninit() {
    let mut engine = Engine::default();
    let circuit = engine.create_circuit("rollback");
    let steady = Arc::new(Brittle::accepting_init());
    let failing = Arc::new(Brittle::default());
    let steady_id = engine.create_shared_component(steady.clone()).unwrap();
    let failing_id = engine.create_shared_component(failing.clone()).unwrap();
    engine.add_component(circuit, steady_id).unwrap();
    assert!(engine.add_component(circuit, failing_id).is_err());

    assert_eq!(
        engine.add_state(circuit),
        Err(SimulationError::component("brittle", "init 2"))
    );
    assert_eq!(steady.inits.load(Ordering::SeqCst), 2);
    assert_eq!(steady.uninits.load(Ordering::SeqCst), 1);
    assert_eq!(engine.circuit(circuit).unwrap().states().len(), 1);
}
