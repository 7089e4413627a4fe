use crate::core::components::state::ComponentProperty;
use crate::core::connections::link::Link;
use crate::core::errors::{FirstError, Result, SimulationError};
use crate::core::execution::engine::Engine;
use crate::core::types::{CircuitId, ComponentId, LinkId, PortId, StateId};
use crate::core::values::{BitState, WireValue};
use indexmap::IndexMap;
use log::{debug, error, trace};
use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// What one port has driven, propagated and received on its net
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PortStateInfo {
    pub(crate) last_pushed: WireValue,
    pub(crate) last_propagated: WireValue,
    pub(crate) last_received: WireValue,
}

impl PortStateInfo {
    fn floating(bit_size: usize) -> Self {
        Self {
            last_pushed: WireValue::new(bit_size),
            last_propagated: WireValue::new(bit_size),
            last_received: WireValue::new(bit_size),
        }
    }
}

/// Per-state record of one net
#[derive(Debug, Clone)]
pub(crate) struct LinkState {
    bit_size: usize,
    pub(crate) participants: IndexMap<PortId, PortStateInfo>,
    cached_merged: Option<WireValue>,
    short_circuited: Option<bool>,
}

impl LinkState {
    pub(crate) fn new(link: &Link) -> Self {
        let bit_size = link.bit_size();
        Self {
            bit_size,
            participants: link
                .participants()
                .iter()
                .map(|port| (*port, PortStateInfo::floating(bit_size)))
                .collect(),
            cached_merged: None,
            short_circuited: None,
        }
    }

    fn invalidate(&mut self) {
        self.cached_merged = None;
        self.short_circuited = None;
    }

    /// Merge of every other participant's propagated value
    fn incoming_value(&self, port: PortId) -> Result<WireValue> {
        let mut value = WireValue::new(self.bit_size);
        for (participant, info) in &self.participants {
            if *participant != port {
                value.merge(&info.last_propagated)?;
            }
        }
        Ok(value)
    }

    pub(crate) fn merged_value(&mut self) -> Result<WireValue> {
        if let Some(value) = &self.cached_merged {
            return Ok(value.clone());
        }

        let mut value = WireValue::new(self.bit_size);
        for info in self.participants.values() {
            if let Err(err) = value.merge(&info.last_propagated) {
                self.short_circuited = Some(err.is_short_circuit());
                return Err(err);
            }
        }
        self.cached_merged = Some(value.clone());
        self.short_circuited = Some(false);
        Ok(value)
    }

    pub(crate) fn is_short_circuit(&mut self) -> bool {
        match self.short_circuited {
            Some(flag) => flag,
            None => {
                let _ = self.merged_value();
                self.short_circuited == Some(true)
            }
        }
    }

    /// Advance every participant's propagated value to what it last pushed
    fn commit_pushed(&mut self) {
        let mut changed = false;
        for info in self.participants.values_mut() {
            if info.last_propagated != info.last_pushed {
                info.last_propagated = info.last_pushed.clone();
                changed = true;
            }
        }
        if changed {
            self.invalidate();
        }
    }

    /// Recompute every participant's incoming value.
    ///
    /// Returns the ports whose received value changed, in participant order,
    /// and the first short circuit met while merging.
    fn settle(&mut self) -> (Vec<(PortId, WireValue)>, Option<SimulationError>) {
        let mut changed = Vec::new();
        let mut short_circuit = None;

        let ports: Vec<PortId> = self.participants.keys().copied().collect();
        for port in ports {
            let incoming = match self.incoming_value(port) {
                Ok(value) => value,
                Err(err) => {
                    short_circuit.get_or_insert(err);
                    continue;
                }
            };

            if let Some(info) = self.participants.get_mut(&port) {
                if info.last_received != incoming {
                    info.last_received = incoming.clone();
                    changed.push((port, incoming));
                }
            }
        }
        (changed, short_circuit)
    }
}

/// One evaluation context of a circuit.
///
/// Holds each component's property and the lazily created records of
/// every net touched in this context.
pub struct CircuitState {
    pub(crate) circuit: CircuitId,
    pub(crate) read_only: bool,
    pub(crate) properties: HashMap<ComponentId, ComponentProperty>,
    pub(crate) link_states: HashMap<LinkId, LinkState>,
}

impl CircuitState {
    pub(crate) fn new(circuit: CircuitId) -> Self {
        Self {
            circuit,
            read_only: false,
            properties: HashMap::new(),
            link_states: HashMap::new(),
        }
    }

    pub fn circuit(&self) -> CircuitId {
        self.circuit
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl Engine {
    pub fn circuit_state(&self, id: StateId) -> Result<&CircuitState> {
        self.states
            .get(&id)
            .ok_or_else(|| SimulationError::NotFound(id.to_string()))
    }

    pub(crate) fn circuit_state_mut(&mut self, id: StateId) -> Result<&mut CircuitState> {
        self.states
            .get_mut(&id)
            .ok_or_else(|| SimulationError::NotFound(id.to_string()))
    }

    /// The state's record for `link`, created from the current topology on
    /// first use. Only links of the state's own circuit have records.
    pub(crate) fn link_state_mut(&mut self, state: StateId, link: LinkId) -> Result<&mut LinkState> {
        let link_circuit = self.link_circuit(link);
        let topology = self
            .links
            .get(&link)
            .ok_or_else(|| SimulationError::NotFound(link.to_string()))?;
        let state_ref = self
            .states
            .get_mut(&state)
            .ok_or_else(|| SimulationError::NotFound(state.to_string()))?;
        let circuit = state_ref.circuit;

        match state_ref.link_states.entry(link) {
            Entry::Occupied(record) => Ok(record.into_mut()),
            Entry::Vacant(slot) => match link_circuit {
                None => Err(SimulationError::NoCircuit(link.to_string())),
                Some(owner) if owner != circuit => Err(SimulationError::Configuration(format!(
                    "{} is not part of {}",
                    link, circuit
                ))),
                Some(_) => Ok(slot.insert(LinkState::new(topology))),
            },
        }
    }

    /// Drive `value` from `port`. A change schedules the port's net for
    /// propagation.
    pub fn push_value(&mut self, state: StateId, port: PortId, value: WireValue) -> Result<()> {
        if self.circuit_state(state)?.read_only {
            return Err(SimulationError::ReadOnly);
        }

        let link = self.port_link(port)?;
        let record = self.link_state_mut(state, link)?;
        if value.bit_size() != record.bit_size {
            return Err(SimulationError::BitSizeMismatch {
                expected: record.bit_size,
                found: value.bit_size(),
            });
        }

        let bit_size = record.bit_size;
        let info = record
            .participants
            .entry(port)
            .or_insert_with(|| PortStateInfo::floating(bit_size));
        if info.last_pushed != value {
            info.last_pushed = value;
            self.value_changed(state, link);
        }
        Ok(())
    }

    /// Value last delivered to `port`; all-Z if nothing arrived yet
    pub fn last_received(&self, state: StateId, port: PortId) -> Result<WireValue> {
        self.port_info(state, port, |info| &info.last_received)
    }

    /// Value last driven by `port`; all-Z if it never pushed
    pub fn last_pushed(&self, state: StateId, port: PortId) -> Result<WireValue> {
        self.port_info(state, port, |info| &info.last_pushed)
    }

    fn port_info(
        &self,
        state: StateId,
        port: PortId,
        field: impl Fn(&PortStateInfo) -> &WireValue,
    ) -> Result<WireValue> {
        let link = self.port_link(port)?;
        let bit_size = self.link_bit_size(link)?;
        Ok(self
            .circuit_state(state)?
            .link_states
            .get(&link)
            .and_then(|record| record.participants.get(&port))
            .map_or_else(|| WireValue::new(bit_size), |info| field(info).clone()))
    }

    /// Merge of every value propagated on the net
    pub fn merged_value(&mut self, state: StateId, link: LinkId) -> Result<WireValue> {
        self.link_state_mut(state, link)?.merged_value()
    }

    pub fn is_short_circuited(&mut self, state: StateId, link: LinkId) -> Result<bool> {
        Ok(self.link_state_mut(state, link)?.is_short_circuit())
    }

    /// Deliver the values pushed on `link` to every other participant.
    ///
    /// A failing component does not stop delivery to the rest. The first
    /// component error is returned ahead of any short circuit.
    pub fn propagate_signal(&mut self, state: StateId, link: LinkId) -> Result<()> {
        let record = self.link_state_mut(state, link)?;
        record.commit_pushed();
        let (changed, mut short_circuit) = record.settle();
        trace!("{} on {}: {} ports to notify", link, state, changed.len());

        let mut errors = FirstError::new();
        for (port, value) in changed {
            match self.notify_value_changed(state, port, &value) {
                Ok(()) => {}
                Err(err) if err.is_short_circuit() => short_circuit = Some(err),
                Err(err) => {
                    error!("{} failed: {}", self.component_label(port.component), err);
                    errors.record(err);
                }
            }
        }

        errors.into_result()?;
        if let Some(err) = short_circuit {
            return Err(err);
        }

        // the net may have been removed by a callback
        match self
            .states
            .get_mut(&state)
            .and_then(|state| state.link_states.get_mut(&link))
        {
            Some(record) => record.merged_value().map(|_| ()),
            None => Ok(()),
        }
    }

    /// Fold the record of `absorbed` into the record of `keep`.
    ///
    /// Absorbed participants forget what they propagated so the merged net
    /// is re-evaluated from scratch on the next step.
    pub(crate) fn merge_link_records(&mut self, state: StateId, keep: LinkId, absorbed: LinkId) -> Result<()> {
        self.link_state_mut(state, absorbed)?;
        self.link_state_mut(state, keep)?;

        let state_ref = self.circuit_state_mut(state)?;
        if let Some(absorbed_record) = state_ref.link_states.remove(&absorbed) {
            let keep_record = state_ref
                .link_states
                .get_mut(&keep)
                .ok_or_else(|| SimulationError::NotFound(keep.to_string()))?;
            for (port, mut info) in absorbed_record.participants {
                info.last_propagated.set_all_bits(BitState::Z);
                keep_record.participants.insert(port, info);
            }
            keep_record.invalidate();
        }

        self.link_removed(absorbed);
        self.value_changed(state, keep);
        Ok(())
    }

    /// Move `port`'s record out of `donor` into the record of its new
    /// singleton link.
    ///
    /// The port keeps driving its last pushed value and now receives
    /// nothing; its component is told right away if that is a change.
    pub(crate) fn split_link_record(&mut self, state: StateId, donor: LinkId, port: PortId) -> Result<()> {
        let fresh = self.port_link(port)?;
        let bit_size = self.link_bit_size(fresh)?;

        let state_ref = self.circuit_state_mut(state)?;
        let Some(donor_record) = state_ref.link_states.get_mut(&donor) else {
            return Ok(());
        };
        let Some(info) = donor_record.participants.shift_remove(&port) else {
            return Ok(());
        };
        donor_record.invalidate();
        let donor_empty = donor_record.participants.is_empty();

        let floating = WireValue::new(bit_size);
        let was_receiving = info.last_received != floating;
        let mut record = LinkState {
            bit_size,
            participants: IndexMap::new(),
            cached_merged: None,
            short_circuited: None,
        };
        record.participants.insert(
            port,
            PortStateInfo {
                last_propagated: info.last_pushed.clone(),
                last_pushed: info.last_pushed,
                last_received: floating.clone(),
            },
        );
        state_ref.link_states.insert(fresh, record);

        if donor_empty {
            state_ref.link_states.remove(&donor);
            self.link_removed(donor);
        } else {
            self.value_changed(state, donor);
        }

        if was_receiving {
            self.notify_value_changed(state, port, &floating)?;
        }
        Ok(())
    }

    /// Clear every value of the state and restart its components.
    ///
    /// Each component is uninitialised then initialised afresh; the first
    /// failure is returned once all components were restarted.
    pub fn reset_state(&mut self, state: StateId) -> Result<()> {
        let state_ref = self.circuit_state(state)?;
        if state_ref.read_only {
            return Err(SimulationError::ReadOnly);
        }
        let circuit = state_ref.circuit;
        let fresh: HashMap<LinkId, LinkState> = state_ref
            .link_states
            .keys()
            .filter_map(|link| self.links.get(link).map(|topology| (*link, LinkState::new(topology))))
            .collect();
        self.circuit_state_mut(state)?.link_states = fresh;
        debug!("resetting {} of {}", state, circuit);

        let components: Vec<ComponentId> = self.circuit(circuit)?.components.iter().copied().collect();
        let mut errors = FirstError::new();
        for component in components {
            errors.check(self.call_uninit(state, component));
            self.remove_component_property(state, component)?;
            errors.check(self.call_init(state, component, None));
        }
        errors.into_result()
    }

    /// Freeze a read-only copy of the state's values.
    ///
    /// The snapshot is not one of the circuit's states: later edits and
    /// propagation never reach it, and pushing into it fails. Component
    /// properties are not copied.
    pub fn snapshot_state(&mut self, state: StateId) -> Result<StateId> {
        let source = self.circuit_state(state)?;
        let snapshot = CircuitState {
            circuit: source.circuit,
            read_only: true,
            properties: HashMap::new(),
            link_states: source.link_states.clone(),
        };
        let id = StateId::next();
        self.states.insert(id, snapshot);
        trace!("snapshot {} of {}", id, state);
        Ok(id)
    }

    pub fn remove_snapshot(&mut self, snapshot: StateId) -> Result<()> {
        if !self.circuit_state(snapshot)?.read_only {
            return Err(SimulationError::Configuration(format!(
                "{} is not a snapshot",
                snapshot
            )));
        }
        self.states.shift_remove(&snapshot);
        Ok(())
    }

    pub fn component_property(
        &self,
        state: StateId,
        component: ComponentId,
    ) -> Result<Option<&(dyn Any + Send)>> {
        Ok(self
            .circuit_state(state)?
            .properties
            .get(&component)
            .map(|property| property.as_ref()))
    }

    pub fn component_property_mut(
        &mut self,
        state: StateId,
        component: ComponentId,
    ) -> Result<Option<&mut (dyn Any + Send)>> {
        Ok(self
            .circuit_state_mut(state)?
            .properties
            .get_mut(&component)
            .map(|property| property.as_mut()))
    }

    pub fn put_component_property(
        &mut self,
        state: StateId,
        component: ComponentId,
        property: ComponentProperty,
    ) -> Result<()> {
        self.circuit_state_mut(state)?
            .properties
            .insert(component, property);
        Ok(())
    }

    pub fn remove_component_property(
        &mut self,
        state: StateId,
        component: ComponentId,
    ) -> Result<Option<ComponentProperty>> {
        Ok(self.circuit_state_mut(state)?.properties.remove(&component))
    }
}
