use crate::core::components::state::{downcast_property, downcast_property_mut, property, ComponentProperty};
use crate::core::errors::Result;
use crate::core::execution::engine::Engine;
use crate::core::types::{CircuitId, ComponentId, PortId, StateId};
use crate::core::values::WireValue;
use std::any::Any;

/// View of the engine handed to a component callback.
///
/// It borrows the engine that is already locked by the caller, so every
/// nested operation a component performs (pushing values, reading its
/// property, even editing the circuit) runs inside the same critical
/// section.
pub struct StateContext<'a> {
    engine: &'a mut Engine,
    state: StateId,
    component: ComponentId,
}

impl<'a> StateContext<'a> {
    pub(crate) fn new(engine: &'a mut Engine, state: StateId, component: ComponentId) -> Self {
        Self {
            engine,
            state,
            component,
        }
    }

    /// The circuit state being evaluated
    pub fn state(&self) -> StateId {
        self.state
    }

    /// The component receiving the callback
    pub fn component(&self) -> ComponentId {
        self.component
    }

    /// Circuit owning the current state
    pub fn circuit(&self) -> Result<CircuitId> {
        Ok(self.engine.circuit_state(self.state)?.circuit())
    }

    /// Whether the current state is its circuit's top-level state
    pub fn is_top_level(&self) -> bool {
        self.engine
            .circuit_state(self.state)
            .and_then(|state| self.engine.top_level_state(state.circuit()))
            .map_or(false, |top| top == self.state)
    }

    /// Handle for one of this component's ports
    pub fn port(&self, index: usize) -> PortId {
        self.component.port(index)
    }

    /// Drive `value` onto one of this component's ports
    pub fn push_value(&mut self, port_index: usize, value: WireValue) -> Result<()> {
        let port = self.port(port_index);
        self.engine.push_value(self.state, port, value)
    }

    /// Value last delivered to one of this component's ports
    pub fn last_received(&self, port_index: usize) -> Result<WireValue> {
        self.engine.last_received(self.state, self.port(port_index))
    }

    /// Value last driven by one of this component's ports
    pub fn last_pushed(&self, port_index: usize) -> Result<WireValue> {
        self.engine.last_pushed(self.state, self.port(port_index))
    }

    /// This component's property in the current state, if one is stored
    pub fn property<T: Any>(&self) -> Result<Option<&T>> {
        self.engine
            .component_property(self.state, self.component)?
            .map(downcast_property::<T>)
            .transpose()
    }

    pub fn property_mut<T: Any>(&mut self) -> Result<Option<&mut T>> {
        self.engine
            .component_property_mut(self.state, self.component)?
            .map(downcast_property_mut::<T>)
            .transpose()
    }

    /// Store this component's property, replacing any previous one
    pub fn put_property<T: Any + Send>(&mut self, value: T) -> Result<()> {
        self.engine
            .put_component_property(self.state, self.component, property(value))
    }

    /// Remove and return this component's property
    pub fn take_property(&mut self) -> Result<Option<ComponentProperty>> {
        self.engine.remove_component_property(self.state, self.component)
    }

    /// The locked engine, for components that edit the circuit
    pub fn engine(&mut self) -> &mut Engine {
        self.engine
    }
}
