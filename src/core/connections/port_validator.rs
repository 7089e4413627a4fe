use crate::core::errors::{Result, SimulationError};
use crate::core::execution::engine::Engine;
use crate::core::types::{CircuitId, LinkId};

/// Port and net validation utilities
pub struct PortValidator;

impl PortValidator {
    /// Validate the port widths a component declares
    pub fn validate_widths(widths: &[usize], max_bit_size: usize) -> Result<()> {
        match widths.iter().find(|w| **w == 0 || **w > max_bit_size) {
            Some(width) => Err(SimulationError::InvalidBitSize(*width)),
            None => Ok(()),
        }
    }

    /// Validate that two nets may be joined, returning their common circuit
    pub fn validate_join(engine: &Engine, keep: LinkId, absorbed: LinkId) -> Result<CircuitId> {
        let circuit = engine
            .link_circuit(keep)
            .ok_or_else(|| SimulationError::NoCircuit(keep.to_string()))?;
        let other_circuit = engine
            .link_circuit(absorbed)
            .ok_or_else(|| SimulationError::NoCircuit(absorbed.to_string()))?;
        if circuit != other_circuit {
            return Err(SimulationError::DifferentCircuits);
        }

        let expected = engine.link_bit_size(keep)?;
        let found = engine.link_bit_size(absorbed)?;
        if expected != found {
            return Err(SimulationError::BitSizeMismatch { expected, found });
        }
        Ok(circuit)
    }
}
