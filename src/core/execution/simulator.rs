use crate::core::errors::Result;
use crate::core::execution::config::SimulatorConfig;
use crate::core::execution::engine::Engine;
use crate::core::types::{LinkId, StateId};
use parking_lot::FairMutex;
use std::sync::Arc;

/// Shared handle to one engine.
///
/// Clones refer to the same engine. Every call takes the engine's fair
/// lock, so an editor thread and a simulation loop are served in arrival
/// order. Component callbacks already hold the lock and reach the engine
/// through their context instead.
#[derive(Clone)]
pub struct Simulator {
    engine: Arc<FairMutex<Engine>>,
}

impl Simulator {
    /// Create a simulator with the default configuration
    pub fn new() -> Self {
        Self::with_config(SimulatorConfig::default())
    }

    pub fn with_config(config: SimulatorConfig) -> Self {
        Self {
            engine: Arc::new(FairMutex::new(Engine::new(config))),
        }
    }

    /// Run `f` with exclusive access to the engine.
    ///
    /// The lock is not reentrant. Component callbacks run while it is held,
    /// so they must reach the engine through [`StateContext::engine`]; calling
    /// back into a cloned `Simulator` from a callback deadlocks.
    ///
    /// [`StateContext::engine`]: crate::core::components::StateContext::engine
    pub fn run_sync<T>(&self, f: impl FnOnce(&mut Engine) -> T) -> T {
        let mut engine = self.engine.lock();
        f(&mut engine)
    }

    pub fn step(&self) -> Result<()> {
        self.run_sync(Engine::step)
    }

    pub fn step_all(&self) -> Result<()> {
        self.run_sync(Engine::step_all)
    }

    pub fn reset(&self) -> Result<()> {
        self.run_sync(Engine::reset)
    }

    /// Drop every circuit and all pending work
    pub fn clear(&self) {
        self.run_sync(Engine::clear)
    }

    pub fn has_links_to_update(&self) -> bool {
        self.run_sync(|engine| engine.has_links_to_update())
    }

    pub fn value_changed(&self, state: StateId, link: LinkId) {
        self.run_sync(|engine| engine.value_changed(state, link))
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_handle_is_shareable() {
        assert_send_sync::<Simulator>();
    }

    #[test]
    fn test_clones_share_engine() {
        let simulator = Simulator::with_config(SimulatorConfig::new().with_oscillation_threshold(3));
        let other = simulator.clone();
        let circuit = simulator.run_sync(|engine| engine.create_circuit("shared"));
        assert!(other.run_sync(|engine| engine.circuit(circuit).is_ok()));
        assert_eq!(other.run_sync(|engine| engine.config().oscillation_threshold), 3);

        other.clear();
        assert!(simulator.run_sync(|engine| engine.circuit(circuit).is_err()));
        assert!(!simulator.has_links_to_update());
    }
}
