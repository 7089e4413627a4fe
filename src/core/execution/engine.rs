use crate::core::circuit::Circuit;
use crate::core::circuit_state::CircuitState;
use crate::core::components::context::StateContext;
use crate::core::components::state::ComponentProperty;
use crate::core::components::traits::Component;
use crate::core::connections::link::Link;
use crate::core::connections::port_validator::PortValidator;
use crate::core::errors::{Result, SimulationError};
use crate::core::execution::config::{SimulatorConfig, DEFAULT_MAX_BIT_SIZE};
use crate::core::execution::scheduler::Scheduler;
use crate::core::types::{CircuitId, ComponentId, LinkId, PortId, StateId};
use crate::core::values::WireValue;
use indexmap::IndexMap;
use log::trace;
use std::sync::Arc;

/// Registered component with its port table
pub(crate) struct ComponentEntry {
    pub(crate) component: Arc<dyn Component>,
    /// Back-pointer from each port to the link currently containing it
    pub(crate) port_links: Vec<LinkId>,
    pub(crate) circuit: Option<CircuitId>,
}

impl ComponentEntry {
    pub(crate) fn label(&self, id: ComponentId) -> String {
        match self.component.name() {
            "" => id.to_string(),
            name => format!("{} ({})", name, id),
        }
    }
}

/// Every object of a simulation, stored in id-keyed arenas.
///
/// The engine is never shared directly: callers reach it through
/// [`Simulator::run_sync`](crate::core::execution::Simulator::run_sync),
/// which holds the simulator lock for the duration of the closure.
pub struct Engine {
    pub(crate) config: SimulatorConfig,
    pub(crate) components: IndexMap<ComponentId, ComponentEntry>,
    pub(crate) links: IndexMap<LinkId, Link>,
    pub(crate) circuits: IndexMap<CircuitId, Circuit>,
    pub(crate) states: IndexMap<StateId, CircuitState>,
    pub(crate) scheduler: Scheduler,
}

impl Engine {
    /// Create an empty engine. Port widths are capped at 64 bits whatever
    /// the configuration asks for.
    pub fn new(mut config: SimulatorConfig) -> Self {
        config.max_bit_size = config.max_bit_size.min(DEFAULT_MAX_BIT_SIZE);
        Self {
            config,
            components: IndexMap::new(),
            links: IndexMap::new(),
            circuits: IndexMap::new(),
            states: IndexMap::new(),
            scheduler: Scheduler::default(),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Register a component. Each of its ports starts in a private
    /// singleton link; the component is not yet part of any circuit.
    pub fn create_component<C: Component + 'static>(&mut self, component: C) -> Result<ComponentId> {
        self.create_shared_component(Arc::new(component))
    }

    /// Register a component that is shared with the caller
    pub fn create_shared_component(&mut self, component: Arc<dyn Component>) -> Result<ComponentId> {
        let widths = component.port_widths();
        PortValidator::validate_widths(&widths, self.config.max_bit_size)?;

        let id = ComponentId::next();
        let port_links = widths
            .iter()
            .enumerate()
            .map(|(index, width)| {
                let link = LinkId::next();
                self.links.insert(link, Link::singleton(id.port(index), *width));
                link
            })
            .collect();

        self.components.insert(
            id,
            ComponentEntry {
                component,
                port_links,
                circuit: None,
            },
        );
        trace!("created {} with {} ports", id, widths.len());
        Ok(id)
    }

    /// Drop a detached component together with its singleton links
    pub fn discard_component(&mut self, id: ComponentId) -> Result<()> {
        let entry = self.entry(id)?;
        if entry.circuit.is_some() {
            return Err(SimulationError::AlreadyAttached(entry.label(id)));
        }
        for (index, link) in entry.port_links.iter().enumerate() {
            if self.links.get(link).map_or(false, |l| l.len() > 1) {
                return Err(SimulationError::PortStillLinked {
                    component: entry.label(id),
                    port: index,
                });
            }
        }

        if let Some(entry) = self.components.shift_remove(&id) {
            for link in entry.port_links {
                self.links.shift_remove(&link);
                for state in self.states.values_mut() {
                    state.link_states.remove(&link);
                }
                self.link_removed(link);
            }
        }
        Ok(())
    }

    /// Whether the component is registered
    pub fn contains_component(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    pub fn component(&self, id: ComponentId) -> Result<&Arc<dyn Component>> {
        Ok(&self.entry(id)?.component)
    }

    /// Display label: the component's name, or its id
    pub fn component_label(&self, id: ComponentId) -> String {
        self.components
            .get(&id)
            .map_or_else(|| id.to_string(), |entry| entry.label(id))
    }

    /// The circuit the component is attached to, if any
    pub fn component_circuit(&self, id: ComponentId) -> Result<Option<CircuitId>> {
        Ok(self.entry(id)?.circuit)
    }

    pub fn port_count(&self, id: ComponentId) -> Result<usize> {
        Ok(self.entry(id)?.port_links.len())
    }

    /// Drop every circuit, state, component and link, and all pending work
    pub fn clear(&mut self) {
        self.components.clear();
        self.links.clear();
        self.circuits.clear();
        self.states.clear();
        self.scheduler.clear();
    }

    pub(crate) fn entry(&self, id: ComponentId) -> Result<&ComponentEntry> {
        self.components
            .get(&id)
            .ok_or_else(|| SimulationError::NotFound(id.to_string()))
    }

    pub(crate) fn entry_mut(&mut self, id: ComponentId) -> Result<&mut ComponentEntry> {
        self.components
            .get_mut(&id)
            .ok_or_else(|| SimulationError::NotFound(id.to_string()))
    }

    pub(crate) fn call_init(
        &mut self,
        state: StateId,
        id: ComponentId,
        last_property: Option<ComponentProperty>,
    ) -> Result<()> {
        let component = Arc::clone(&self.entry(id)?.component);
        let mut ctx = StateContext::new(self, state, id);
        component.init(&mut ctx, last_property)
    }

    pub(crate) fn call_uninit(&mut self, state: StateId, id: ComponentId) -> Result<()> {
        let component = Arc::clone(&self.entry(id)?.component);
        let mut ctx = StateContext::new(self, state, id);
        component.uninit(&mut ctx)
    }

    /// Deliver a changed incoming value to the port's component.
    /// Components discarded in the meantime are skipped.
    pub(crate) fn notify_value_changed(&mut self, state: StateId, port: PortId, value: &WireValue) -> Result<()> {
        let Some(entry) = self.components.get(&port.component) else {
            return Ok(());
        };
        let component = Arc::clone(&entry.component);
        let mut ctx = StateContext::new(self, state, port.component);
        component.value_changed(&mut ctx, value, port.index)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}
