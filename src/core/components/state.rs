use crate::core::errors::{Result, SimulationError};
use std::any::Any;

/// Opaque per-state memory owned by one component.
///
/// Only the owning component interprets it; access goes through the checked
/// downcast helpers below.
pub type ComponentProperty = Box<dyn Any + Send>;

/// Wrap a value as a component property
pub fn property<T: Any + Send>(value: T) -> ComponentProperty {
    Box::new(value)
}

/// Helper function to safely downcast a component property
pub fn downcast_property<T: Any>(property: &(dyn Any + Send)) -> Result<&T> {
    property.downcast_ref::<T>().ok_or_else(|| {
        SimulationError::InvalidDowncast(format!(
            "cannot downcast property to {}",
            std::any::type_name::<T>()
        ))
    })
}

/// Helper function to safely downcast a mutable component property
pub fn downcast_property_mut<T: Any>(property: &mut (dyn Any + Send)) -> Result<&mut T> {
    property.downcast_mut::<T>().ok_or_else(|| {
        SimulationError::InvalidDowncast(format!(
            "cannot downcast mutable property to {}",
            std::any::type_name::<T>()
        ))
    })
}

/// Take ownership of a property's contents
pub fn into_property<T: Any>(property: ComponentProperty) -> Result<T> {
    match property.downcast::<T>() {
        Ok(value) => Ok(*value),
        Err(_) => Err(SimulationError::InvalidDowncast(format!(
            "cannot unwrap property as {}",
            std::any::type_name::<T>()
        ))),
    }
}
