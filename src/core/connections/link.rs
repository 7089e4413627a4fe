use crate::core::connections::port_validator::PortValidator;
use crate::core::errors::{FirstError, Result, SimulationError};
use crate::core::execution::engine::Engine;
use crate::core::types::{CircuitId, LinkId, PortId};
use indexmap::IndexSet;
use log::trace;

/// A net: the set of ports that are electrically the same wire.
///
/// A link is never empty. Every participant's back-pointer in its
/// component's port table names the link that contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    bit_size: usize,
    participants: IndexSet<PortId>,
}

impl Link {
    pub(crate) fn singleton(port: PortId, bit_size: usize) -> Self {
        let mut participants = IndexSet::new();
        participants.insert(port);
        Self {
            bit_size,
            participants,
        }
    }

    pub fn bit_size(&self) -> usize {
        self.bit_size
    }

    /// Participants in join order
    pub fn participants(&self) -> &IndexSet<PortId> {
        &self.participants
    }

    pub fn contains(&self, port: PortId) -> bool {
        self.participants.contains(&port)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

impl Engine {
    pub fn link(&self, id: LinkId) -> Result<&Link> {
        self.links
            .get(&id)
            .ok_or_else(|| SimulationError::NotFound(id.to_string()))
    }

    /// The link currently containing `port`
    pub fn port_link(&self, port: PortId) -> Result<LinkId> {
        self.entry(port.component)?
            .port_links
            .get(port.index)
            .copied()
            .ok_or_else(|| SimulationError::NotFound(port.to_string()))
    }

    pub fn link_participants(&self, id: LinkId) -> Result<Vec<PortId>> {
        Ok(self.link(id)?.participants.iter().copied().collect())
    }

    pub fn link_bit_size(&self, id: LinkId) -> Result<usize> {
        Ok(self.link(id)?.bit_size)
    }

    /// Circuit owning the link: the circuit of the first participant whose
    /// component is attached to one
    pub fn link_circuit(&self, id: LinkId) -> Option<CircuitId> {
        self.links.get(&id)?.participants.iter().find_map(|port| {
            self.components
                .get(&port.component)
                .and_then(|entry| entry.circuit)
        })
    }

    /// Join `other`'s net into `port`'s net.
    ///
    /// Both nets must belong to the same circuit and have the same width.
    /// Every state of the circuit merges its records for the two nets, then
    /// the absorbed net's ports are moved over and the absorbed link is
    /// deleted. No-op if the ports already share a net.
    pub fn link_ports(&mut self, port: PortId, other: PortId) -> Result<()> {
        let keep = self.port_link(port)?;
        let absorbed = self.port_link(other)?;
        if keep == absorbed {
            return Ok(());
        }

        let circuit = PortValidator::validate_join(self, keep, absorbed)?;
        trace!("linking {} into {} ({} <- {})", absorbed, keep, port, other);

        let states: Vec<_> = self.circuit(circuit)?.states.iter().copied().collect();
        for state in states {
            self.merge_link_records(state, keep, absorbed)?;
        }

        if let Some(absorbed_link) = self.links.shift_remove(&absorbed) {
            for moved in absorbed_link.participants {
                if let Some(entry) = self.components.get_mut(&moved.component) {
                    entry.port_links[moved.index] = keep;
                }
                if let Some(link) = self.links.get_mut(&keep) {
                    link.participants.insert(moved);
                }
            }
        }
        self.link_removed(absorbed);
        Ok(())
    }

    /// Carve `port` out of its net into a fresh singleton link.
    ///
    /// Every state of the circuit splits its record for the net; the port
    /// keeps driving what it last pushed and sees a floating input. The
    /// first error raised by a component notified of that change is
    /// returned after all states are split. No-op if the port is alone.
    pub fn unlink_port(&mut self, port: PortId) -> Result<()> {
        let donor = self.port_link(port)?;
        let link = self.link(donor)?;
        if !link.contains(port) || link.len() == 1 {
            return Ok(());
        }
        let bit_size = link.bit_size;
        let circuit = self.link_circuit(donor);

        let fresh = LinkId::next();
        if let Some(link) = self.links.get_mut(&donor) {
            link.participants.shift_remove(&port);
        }
        self.links.insert(fresh, Link::singleton(port, bit_size));
        self.entry_mut(port.component)?.port_links[port.index] = fresh;
        trace!("unlinked {} from {} into {}", port, donor, fresh);

        let mut errors = FirstError::new();
        if let Some(circuit) = circuit {
            let states: Vec<_> = self.circuit(circuit)?.states.iter().copied().collect();
            for state in states {
                errors.check(self.split_link_record(state, donor, port));
            }
        }
        errors.into_result()
    }
}
