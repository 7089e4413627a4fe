pub mod core;

// Re-export commonly used types
pub use crate::core::circuit::Circuit;
pub use crate::core::circuit_state::CircuitState;
pub use crate::core::components::{CircuitChangeListener, Component, ComponentProperty, StateContext};
pub use crate::core::connections::Link;
pub use crate::core::errors::{Result, SimulationError};
pub use crate::core::execution::{Engine, Simulator, SimulatorConfig};
pub use crate::core::types::{CircuitId, ComponentId, LinkId, PendingLink, PortId, StateId};
pub use crate::core::values::{BitState, WireValue};
