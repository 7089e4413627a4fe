pub mod link;
pub mod port_validator;

pub use link::Link;
pub use port_validator::PortValidator;
