use crate::core::circuit_state::CircuitState;
use crate::core::components::state::ComponentProperty;
use crate::core::components::traits::CircuitChangeListener;
use crate::core::errors::{FirstError, Result, SimulationError};
use crate::core::execution::engine::Engine;
use crate::core::types::{CircuitId, ComponentId, StateId};
use indexmap::IndexSet;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// A set of components sharing one topology, evaluated in one or more
/// circuit states.
pub struct Circuit {
    name: String,
    pub(crate) components: IndexSet<ComponentId>,
    pub(crate) states: IndexSet<StateId>,
    top_level: StateId,
    listeners: Vec<Arc<dyn CircuitChangeListener>>,
}

impl Circuit {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &IndexSet<ComponentId> {
        &self.components
    }

    /// Every live state, top-level first. Snapshots are not included.
    pub fn states(&self) -> &IndexSet<StateId> {
        &self.states
    }

    pub fn top_level_state(&self) -> StateId {
        self.top_level
    }

    pub fn contains_state(&self, state: StateId) -> bool {
        self.states.contains(&state)
    }
}

impl Engine {
    /// Create a circuit together with its top-level state
    pub fn create_circuit(&mut self, name: impl Into<String>) -> CircuitId {
        let id = CircuitId::next();
        let top_level = StateId::next();
        let mut states = IndexSet::new();
        states.insert(top_level);

        self.states.insert(top_level, CircuitState::new(id));
        self.circuits.insert(
            id,
            Circuit {
                name: name.into(),
                components: IndexSet::new(),
                states,
                top_level,
                listeners: Vec::new(),
            },
        );
        debug!("created {} with top-level {}", id, top_level);
        id
    }

    pub fn circuit(&self, id: CircuitId) -> Result<&Circuit> {
        self.circuits
            .get(&id)
            .ok_or_else(|| SimulationError::NotFound(id.to_string()))
    }

    fn circuit_mut(&mut self, id: CircuitId) -> Result<&mut Circuit> {
        self.circuits
            .get_mut(&id)
            .ok_or_else(|| SimulationError::NotFound(id.to_string()))
    }

    /// Ids of every circuit, in creation order
    pub fn circuits(&self) -> impl Iterator<Item = CircuitId> + '_ {
        self.circuits.keys().copied()
    }

    pub fn top_level_state(&self, circuit: CircuitId) -> Result<StateId> {
        Ok(self.circuit(circuit)?.top_level)
    }

    /// Drop a circuit and all of its states.
    ///
    /// Its components are uninitialised in every state and come out
    /// detached, each port back in a singleton link.
    pub fn remove_circuit(&mut self, id: CircuitId) -> Result<()> {
        let circuit = self.circuit(id)?;
        let components: Vec<ComponentId> = circuit.components.iter().copied().collect();
        let states: Vec<StateId> = circuit.states.iter().copied().collect();

        let mut errors = FirstError::new();
        for state in &states {
            for component in &components {
                errors.check(self.call_uninit(*state, *component));
            }
        }

        for state in states {
            self.scheduler.purge_state(state);
        }
        self.states.retain(|_, state| state.circuit != id);
        self.circuits.shift_remove(&id);

        for component in &components {
            if let Some(entry) = self.components.get_mut(component) {
                entry.circuit = None;
            }
        }
        for component in components {
            for index in 0..self.port_count(component)? {
                errors.check(self.unlink_port(component.port(index)));
            }
        }
        debug!("removed {}", id);
        errors.into_result()
    }

    /// Attach `component` to `circuit`, initialising it in every state.
    ///
    /// Already a member: no-op. Member of another circuit: error. A failing
    /// `init` does not stop the others; its error is returned afterwards.
    pub fn add_component(&mut self, circuit: CircuitId, component: ComponentId) -> Result<()> {
        match self.entry(component)?.circuit {
            Some(current) if current == circuit => return Ok(()),
            Some(_) => {
                return Err(SimulationError::AlreadyAttached(
                    self.component_label(component),
                ))
            }
            None => {}
        }
        self.circuit(circuit)?;

        let mut errors = FirstError::new();
        self.attach(circuit, component, HashMap::new(), &mut errors);
        errors.into_result()
    }

    /// Detach `component` from `circuit`, uninitialising it in every state.
    ///
    /// Every port must be unlinked first. No-op if it is not a member.
    pub fn remove_component(&mut self, circuit: CircuitId, component: ComponentId) -> Result<()> {
        if !self.circuit(circuit)?.components.contains(&component) {
            return Ok(());
        }

        let mut errors = FirstError::new();
        self.detach(circuit, component, true, &mut errors)?;
        errors.into_result()
    }

    /// Swap `old` for `new`, carrying each state's property over.
    ///
    /// `old` is detached keeping its link records, `in_between` runs, then
    /// `new` is attached and its `init` receives the property `old` left
    /// behind in that state. `old` stays registered afterwards; callers
    /// release it and its records with [`Engine::discard_component`].
    pub fn update_component<F>(
        &mut self,
        circuit: CircuitId,
        old: ComponentId,
        new: ComponentId,
        in_between: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Engine) -> Result<()>,
    {
        if !self.circuit(circuit)?.components.contains(&old) {
            return Err(SimulationError::NotFound(format!(
                "{} in {}",
                self.component_label(old),
                circuit
            )));
        }
        if self.entry(new)?.circuit.is_some() {
            return Err(SimulationError::AlreadyAttached(self.component_label(new)));
        }

        let mut errors = FirstError::new();
        let leftovers = self.detach(circuit, old, false, &mut errors)?;
        errors.check(in_between(self));
        self.attach(circuit, new, leftovers, &mut errors);
        errors.into_result()
    }

    /// Remove every component of the circuit
    pub fn clear_components(&mut self, circuit: CircuitId) -> Result<()> {
        let components: Vec<ComponentId> = self.circuit(circuit)?.components.iter().copied().collect();
        let mut errors = FirstError::new();
        for component in components {
            errors.check(self.remove_component(circuit, component));
        }
        errors.into_result()
    }

    /// Add an independent state to the circuit and initialise every
    /// component in it. If any `init` fails the state is discarded.
    pub fn add_state(&mut self, circuit: CircuitId) -> Result<StateId> {
        let components: Vec<ComponentId> = self.circuit(circuit)?.components.iter().copied().collect();
        let state = StateId::next();
        self.states.insert(state, CircuitState::new(circuit));
        self.circuit_mut(circuit)?.states.insert(state);

        for (count, component) in components.iter().enumerate() {
            if let Err(err) = self.call_init(state, *component, None) {
                warn!("init of {} failed in new {}: {}", self.component_label(*component), state, err);
                for initialised in &components[..count] {
                    if let Err(err) = self.call_uninit(state, *initialised) {
                        warn!(
                            "uninit of {} failed while discarding {}: {}",
                            self.component_label(*initialised),
                            state,
                            err
                        );
                    }
                }
                self.drop_state(circuit, state);
                return Err(err);
            }
        }
        debug!("added {} to {}", state, circuit);
        Ok(state)
    }

    /// Remove a state, uninitialising every component in it. The top-level
    /// state cannot be removed; snapshots are simply dropped.
    pub fn remove_state(&mut self, state: StateId) -> Result<()> {
        let circuit_id = self.circuit_state(state)?.circuit;
        let circuit = self.circuit(circuit_id)?;
        if circuit.top_level == state {
            return Err(SimulationError::Configuration(format!(
                "cannot remove the top-level state of {}",
                circuit_id
            )));
        }
        if !circuit.states.contains(&state) {
            return self.remove_snapshot(state);
        }

        let components: Vec<ComponentId> = circuit.components.iter().copied().collect();
        let mut errors = FirstError::new();
        for component in components {
            errors.check(self.call_uninit(state, component));
        }
        self.drop_state(circuit_id, state);
        errors.into_result()
    }

    pub fn add_listener(&mut self, circuit: CircuitId, listener: Arc<dyn CircuitChangeListener>) -> Result<()> {
        self.circuit_mut(circuit)?.listeners.push(listener);
        Ok(())
    }

    fn drop_state(&mut self, circuit: CircuitId, state: StateId) {
        if let Some(circuit) = self.circuits.get_mut(&circuit) {
            circuit.states.shift_remove(&state);
        }
        self.states.shift_remove(&state);
        self.scheduler.purge_state(state);
    }

    fn attach(
        &mut self,
        circuit: CircuitId,
        component: ComponentId,
        mut leftovers: HashMap<StateId, ComponentProperty>,
        errors: &mut FirstError,
    ) {
        let states: Vec<StateId> = match self.circuits.get_mut(&circuit) {
            Some(entry) => {
                entry.components.insert(component);
                entry.states.iter().copied().collect()
            }
            None => return,
        };
        if let Some(entry) = self.components.get_mut(&component) {
            entry.circuit = Some(circuit);
        }

        for state in states {
            let last_property = leftovers.remove(&state);
            errors.check(self.call_init(state, component, last_property));
        }
        self.notify_listeners(circuit, component, true);
    }

    /// Returns the properties the component left behind, per state
    fn detach(
        &mut self,
        circuit: CircuitId,
        component: ComponentId,
        remove_links: bool,
        errors: &mut FirstError,
    ) -> Result<HashMap<StateId, ComponentProperty>> {
        let port_links = self.entry(component)?.port_links.clone();
        for (index, link) in port_links.iter().enumerate() {
            if self.link(*link)?.len() > 1 {
                return Err(SimulationError::PortStillLinked {
                    component: self.component_label(component),
                    port: index,
                });
            }
        }

        let states: Vec<StateId> = self.circuit(circuit)?.states.iter().copied().collect();
        if remove_links {
            for state in &states {
                if let Some(state) = self.states.get_mut(state) {
                    for link in &port_links {
                        state.link_states.remove(link);
                    }
                }
            }
            for link in &port_links {
                self.link_removed(*link);
            }
        }

        self.circuit_mut(circuit)?.components.shift_remove(&component);
        let mut leftovers = HashMap::new();
        for state in states {
            errors.check(self.call_uninit(state, component));
            if let Some(property) = self.remove_component_property(state, component)? {
                leftovers.insert(state, property);
            }
        }
        self.entry_mut(component)?.circuit = None;

        self.notify_listeners(circuit, component, false);
        Ok(leftovers)
    }

    fn notify_listeners(&self, circuit: CircuitId, component: ComponentId, added: bool) {
        if let Some(entry) = self.circuits.get(&circuit) {
            for listener in &entry.listeners {
                listener.circuit_changed(circuit, component, added);
            }
        }
    }
}
