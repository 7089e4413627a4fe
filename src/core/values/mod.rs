pub mod wire_value;

// Re-export commonly used types
pub use wire_value::{BitState, WireValue};
