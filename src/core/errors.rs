use crate::core::values::WireValue;

/// Result type used throughout the engine
pub type Result<T, E = SimulationError> = std::result::Result<T, E>;

/// Every failure the engine can report.
///
/// Configuration errors are raised synchronously by the call that caused
/// them. Short circuits found inside a propagation batch are deferred by the
/// scheduler and may be forgiven if they resolve before the batch settles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// Two values or links of different widths were combined.
    #[error("different size wires detected: wanted {expected}, found {found}")]
    BitSizeMismatch { expected: usize, found: usize },

    /// A port width outside `1..=max_bit_size`.
    #[error("invalid bit size {0}")]
    InvalidBitSize(usize),

    /// Two links owned by different circuits were joined.
    #[error("links belong to different circuits")]
    DifferentCircuits,

    /// A link or component is not attached to any circuit.
    #[error("{0} does not belong to a circuit")]
    NoCircuit(String),

    /// The component is already attached to another circuit.
    #[error("component {0} already belongs to a circuit")]
    AlreadyAttached(String),

    /// A component was removed while one of its ports is still linked.
    #[error("must unlink port {port} of component {component} before removing it")]
    PortStillLinked { component: String, port: usize },

    /// An id that does not resolve to a live engine object.
    #[error("{0} not found")]
    NotFound(String),

    /// Any other invalid use of the engine API.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Two drivers on one link assert different non-floating values.
    #[error("short circuit detected! value1 = {value1}, value2 = {value2}")]
    ShortCircuit { value1: WireValue, value2: WireValue },

    /// The pending work pattern keeps repeating.
    #[error("oscillation apparent")]
    Oscillation,

    /// Push attempted on a read-only snapshot.
    #[error("this circuit state is read-only")]
    ReadOnly,

    /// A floating value was read as an integer.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A component property had an unexpected type.
    #[error("invalid downcast: {0}")]
    InvalidDowncast(String),

    /// A component callback failed.
    #[error("component {component} failed: {message}")]
    Component { component: String, message: String },
}

impl SimulationError {
    /// Convenience constructor for component implementations
    pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
        SimulationError::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Whether this error describes an invalid engine edit rather than a
    /// simulation outcome
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SimulationError::BitSizeMismatch { .. }
                | SimulationError::InvalidBitSize(_)
                | SimulationError::DifferentCircuits
                | SimulationError::NoCircuit(_)
                | SimulationError::AlreadyAttached(_)
                | SimulationError::PortStillLinked { .. }
                | SimulationError::NotFound(_)
                | SimulationError::Configuration(_)
        )
    }

    pub fn is_short_circuit(&self) -> bool {
        matches!(self, SimulationError::ShortCircuit { .. })
    }
}

/// Keeps the first error of a best-effort loop so the loop can finish.
#[derive(Debug, Default)]
pub(crate) struct FirstError(Option<SimulationError>);

impl FirstError {
    pub(crate) fn new() -> Self {
        Self(None)
    }

    /// Record a failure; later failures are dropped
    pub(crate) fn record(&mut self, error: SimulationError) {
        if self.0.is_none() {
            self.0 = Some(error);
        }
    }

    /// Unwrap a result, recording its error
    pub(crate) fn check<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.record(error);
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub(crate) fn into_result(self) -> Result<()> {
        match self.0 {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
