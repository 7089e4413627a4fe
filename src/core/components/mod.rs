pub mod context;
pub mod state;
pub mod traits;

// Re-export commonly used types
pub use context::StateContext;
pub use state::{downcast_property, downcast_property_mut, into_property, property, ComponentProperty};
pub use traits::{CircuitChangeListener, Component};
