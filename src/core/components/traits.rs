use crate::core::components::context::StateContext;
use crate::core::components::state::ComponentProperty;
use crate::core::errors::Result;
use crate::core::types::{CircuitId, ComponentId};
use crate::core::values::WireValue;

/// Behaviour of a circuit element.
///
/// A component owns no engine state. Everything it remembers between
/// callbacks lives in the per-state property slot reachable through the
/// [`StateContext`], so one component instance can serve any number of
/// circuit states.
pub trait Component: Send + Sync {
    /// Bit width of every port, in port order. Read once when the
    /// component is created in an engine.
    fn port_widths(&self) -> Vec<usize>;

    /// Display name used in logs and error messages
    fn name(&self) -> &str {
        ""
    }

    /// Called once per circuit state when the component is attached.
    ///
    /// `last_property` carries the property a replaced component left
    /// behind (see `Engine::update_component`), otherwise `None`.
    fn init(&self, _ctx: &mut StateContext<'_>, _last_property: Option<ComponentProperty>) -> Result<()> {
        Ok(())
    }

    /// Called once per circuit state when the component is detached
    fn uninit(&self, _ctx: &mut StateContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called whenever the value arriving at `port_index` changes.
    ///
    /// Implementations react by pushing values on their own ports.
    fn value_changed(&self, ctx: &mut StateContext<'_>, value: &WireValue, port_index: usize) -> Result<()>;
}

/// Observer notified when a circuit gains or loses a component
pub trait CircuitChangeListener: Send + Sync {
    fn circuit_changed(&self, circuit: CircuitId, component: ComponentId, added: bool);
}
