#![allow(dead_code)]

use wiresim::core::components::into_property;
use wiresim::{BitState, CircuitId, Component, ComponentProperty, Result, StateContext, WireValue};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Passive port driven from outside through `Engine::push_value`
pub struct Pin {
    width: usize,
}

impl Pin {
    pub fn new(width: usize) -> Self {
        Self { width }
    }
}

impl Component for Pin {
    fn port_widths(&self) -> Vec<usize> {
        vec![self.width]
    }

    fn name(&self) -> &str {
        "pin"
    }

    fn value_changed(&self, _ctx: &mut StateContext<'_>, _value: &WireValue, _port_index: usize) -> Result<()> {
        Ok(())
    }
}

pub struct Constant {
    value: WireValue,
}

impl Constant {
    pub fn new(value: u64, width: usize) -> Self {
        Self {
            value: WireValue::of(value, width),
        }
    }
}

impl Component for Constant {
    fn port_widths(&self) -> Vec<usize> {
        vec![self.value.bit_size()]
    }

    fn init(&self, ctx: &mut StateContext<'_>, _last_property: Option<ComponentProperty>) -> Result<()> {
        ctx.push_value(0, self.value.clone())
    }

    fn value_changed(&self, _ctx: &mut StateContext<'_>, _value: &WireValue, _port_index: usize) -> Result<()> {
        Ok(())
    }
}

/// Level-sensitive latch: ports are data, enable, output.
///
/// The stored value lives in the state's property, so a replacement latch
/// picks up where the old one stopped.
pub struct Latch {
    width: usize,
}

impl Latch {
    pub fn new(width: usize) -> Self {
        Self { width }
    }
}

impl Component for Latch {
    fn port_widths(&self) -> Vec<usize> {
        vec![self.width, 1, self.width]
    }

    fn name(&self) -> &str {
        "latch"
    }

    fn init(&self, ctx: &mut StateContext<'_>, last_property: Option<ComponentProperty>) -> Result<()> {
        let stored = match last_property {
            Some(property) => into_property::<WireValue>(property)?,
            None => WireValue::new(self.width),
        };
        ctx.put_property(stored.clone())?;
        ctx.push_value(2, stored)
    }

    fn value_changed(&self, ctx: &mut StateContext<'_>, _value: &WireValue, port_index: usize) -> Result<()> {
        if port_index == 2 || ctx.last_received(1)?.bit(0) != BitState::One {
            return Ok(());
        }

        let data = ctx.last_received(0)?;
        if ctx.property::<WireValue>()? == Some(&data) {
            return Ok(());
        }
        if let Some(stored) = ctx.property_mut::<WireValue>()? {
            *stored = data.clone();
        }
        ctx.push_value(2, data)
    }
}

/// Cuts itself out of its net the first time it sees a high value
pub struct Fuse;

impl Component for Fuse {
    fn port_widths(&self) -> Vec<usize> {
        vec![1]
    }

    fn name(&self) -> &str {
        "fuse"
    }

    fn value_changed(&self, ctx: &mut StateContext<'_>, value: &WireValue, _port_index: usize) -> Result<()> {
        if value.bit(0) == BitState::One {
            let port = ctx.port(0);
            ctx.engine().unlink_port(port)?;
        }
        Ok(())
    }
}

/// Where a component was initialised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub top_level: bool,
    pub circuit: CircuitId,
}

/// Records its placement on init and clears it on uninit
pub struct Witness;

impl Component for Witness {
    fn port_widths(&self) -> Vec<usize> {
        vec![1]
    }

    fn init(&self, ctx: &mut StateContext<'_>, _last_property: Option<ComponentProperty>) -> Result<()> {
        let placement = Placement {
            top_level: ctx.is_top_level(),
            circuit: ctx.circuit()?,
        };
        ctx.put_property(placement)
    }

    fn uninit(&self, ctx: &mut StateContext<'_>) -> Result<()> {
        ctx.take_property()?;
        Ok(())
    }

    fn value_changed(&self, _ctx: &mut StateContext<'_>, _value: &WireValue, _port_index: usize) -> Result<()> {
        Ok(())
    }
}
