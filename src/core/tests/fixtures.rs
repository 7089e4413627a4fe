//! Small components used by the engine tests

use crate::core::components::context::StateContext;
use crate::core::components::state::{downcast_property, into_property, ComponentProperty};
use crate::core::components::traits::{CircuitChangeListener, Component};
use crate::core::errors::{Result, SimulationError};
use crate::core::execution::engine::Engine;
use crate::core::types::{CircuitId, ComponentId, StateId};
use crate::core::values::{BitState, WireValue};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Passive single-port component
pub(crate) struct Probe {
    width: usize,
}

impl Probe {
    pub(crate) fn new(width: usize) -> Self {
        Self { width }
    }
}

impl Component for Probe {
    fn port_widths(&self) -> Vec<usize> {
        vec![self.width]
    }

    fn name(&self) -> &str {
        "probe"
    }

    fn value_changed(&self, _ctx: &mut StateContext<'_>, _value: &WireValue, _port_index: usize) -> Result<()> {
        Ok(())
    }
}

/// Drives a fixed value from the moment it is initialised
pub(crate) struct Constant {
    value: WireValue,
}

impl Constant {
    pub(crate) fn new(value: u64, width: usize) -> Self {
        Self {
            value: WireValue::of(value, width),
        }
    }
}

impl Component for Constant {
    fn port_widths(&self) -> Vec<usize> {
        vec![self.value.bit_size()]
    }

    fn init(&self, ctx: &mut StateContext<'_>, _last_property: Option<ComponentProperty>) -> Result<()> {
        ctx.push_value(0, self.value.clone())
    }

    fn value_changed(&self, _ctx: &mut StateContext<'_>, _value: &WireValue, _port_index: usize) -> Result<()> {
        Ok(())
    }
}

/// Port 0 in, port 1 out; a floating input reads as low
pub(crate) struct Inverter;

impl Component for Inverter {
    fn port_widths(&self) -> Vec<usize> {
        vec![1, 1]
    }

    fn name(&self) -> &str {
        "not"
    }

    fn init(&self, ctx: &mut StateContext<'_>, _last_property: Option<ComponentProperty>) -> Result<()> {
        ctx.push_value(1, WireValue::filled(1, BitState::One))
    }

    fn value_changed(&self, ctx: &mut StateContext<'_>, value: &WireValue, port_index: usize) -> Result<()> {
        if port_index != 0 {
            return Ok(());
        }
        let out = match value.bit(0) {
            BitState::One => BitState::Zero,
            _ => BitState::One,
        };
        ctx.push_value(1, WireValue::filled(1, out))
    }
}

/// Counts how many times it was initialised in a state, carrying the count
/// across replacement
pub(crate) struct Counter {
    width: usize,
}

impl Counter {
    pub(crate) fn new(width: usize) -> Self {
        Self { width }
    }

    pub(crate) fn inits(engine: &Engine, state: StateId, id: ComponentId) -> usize {
        engine
            .component_property(state, id)
            .unwrap()
            .map_or(0, |property| *downcast_property::<usize>(property).unwrap())
    }
}

impl Component for Counter {
    fn port_widths(&self) -> Vec<usize> {
        vec![self.width]
    }

    fn init(&self, ctx: &mut StateContext<'_>, last_property: Option<ComponentProperty>) -> Result<()> {
        let previous = match last_property {
            Some(property) => into_property::<usize>(property)?,
            None => 0,
        };
        ctx.put_property(previous + 1)
    }

    fn value_changed(&self, _ctx: &mut StateContext<'_>, _value: &WireValue, _port_index: usize) -> Result<()> {
        Ok(())
    }
}

/// Fails on every delivered value
pub(crate) struct Faulty;

impl Component for Faulty {
    fn port_widths(&self) -> Vec<usize> {
        vec![1]
    }

    fn name(&self) -> &str {
        "faulty"
    }

    fn value_changed(&self, _ctx: &mut StateContext<'_>, _value: &WireValue, _port_index: usize) -> Result<()> {
        Err(SimulationError::component("faulty", "rejected value"))
    }
}

/// Drives ONE until it hears any driven value, then lets go of the net
pub(crate) struct Yielding;

impl Component for Yielding {
    fn port_widths(&self) -> Vec<usize> {
        vec![1]
    }

    fn name(&self) -> &str {
        "yielding"
    }

    fn init(&self, ctx: &mut StateContext<'_>, _last_property: Option<ComponentProperty>) -> Result<()> {
        ctx.push_value(0, WireValue::of(1, 1))
    }

    fn value_changed(&self, ctx: &mut StateContext<'_>, value: &WireValue, _port_index: usize) -> Result<()> {
        if value.is_valid_value() {
            ctx.push_value(0, WireValue::new(1))?;
        }
        Ok(())
    }
}

/// Drives ONE and rejects whatever it hears
pub(crate) struct Stubborn;

impl Component for Stubborn {
    fn port_widths(&self) -> Vec<usize> {
        vec![1]
    }

    fn name(&self) -> &str {
        "stubborn"
    }

    fn init(&self, ctx: &mut StateContext<'_>, _last_property: Option<ComponentProperty>) -> Result<()> {
        ctx.push_value(0, WireValue::of(1, 1))
    }

    fn value_changed(&self, _ctx: &mut StateContext<'_>, _value: &WireValue, _port_index: usize) -> Result<()> {
        Err(SimulationError::component("stubborn", "refused"))
    }
}

/// Fails every uninit, and every init unless built with `accepting_init`,
/// numbering the attempts
#[derive(Default)]
pub(crate) struct Brittle {
    accept_init: bool,
    pub(crate) inits: AtomicUsize,
    pub(crate) uninits: AtomicUsize,
}

impl Brittle {
    pub(crate) fn accepting_init() -> Self {
        Self {
            accept_init: true,
            ..Self::default()
        }
    }
}

impl Component for Brittle {
    fn port_widths(&self) -> Vec<usize> {
        vec![1]
    }

    fn init(&self, _ctx: &mut StateContext<'_>, _last_property: Option<ComponentProperty>) -> Result<()> {
        let attempt = self.inits.fetch_add(1, Ordering::SeqCst) + 1;
        if self.accept_init {
            return Ok(());
        }
        Err(SimulationError::component("brittle", format!("init {}", attempt)))
    }

    fn uninit(&self, _ctx: &mut StateContext<'_>) -> Result<()> {
        let attempt = self.uninits.fetch_add(1, Ordering::SeqCst) + 1;
        Err(SimulationError::component("brittle", format!("uninit {}", attempt)))
    }

    fn value_changed(&self, _ctx: &mut StateContext<'_>, _value: &WireValue, _port_index: usize) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingListener {
    pub(crate) events: Mutex<Vec<(CircuitId, ComponentId, bool)>>,
}

impl CircuitChangeListener for RecordingListener {
    fn circuit_changed(&self, circuit: CircuitId, component: ComponentId, added: bool) {
        self.events.lock().push((circuit, component, added));
    }
}
