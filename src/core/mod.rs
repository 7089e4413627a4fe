pub mod circuit;
pub mod circuit_state;
pub mod components;
pub mod connections;
pub mod errors;
pub mod execution;
pub mod types;
pub mod values;

#[cfg(test)]
pub(crate) mod tests;
