pub mod config;
pub mod engine;
pub(crate) mod scheduler;
pub mod simulator;

// Re-export commonly used types
pub use config::SimulatorConfig;
pub use engine::Engine;
pub use simulator::Simulator;
