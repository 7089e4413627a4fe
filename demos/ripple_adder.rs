use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wiresim::{
    BitState, CircuitId, Component, ComponentId, ComponentProperty, Engine, PortId, Result,
    SimulationError, Simulator, StateContext, StateId, WireValue,
};

const WIDTH: usize = 4;
const ROUNDS: usize = 16;

#[derive(Debug, Clone, Copy)]
enum GateOp {
    And,
    Or,
    Xor,
}

/// Two-input gate: ports a, b, out. Any floating input floats the output.
struct Gate {
    op: GateOp,
}

impl Component for Gate {
    fn port_widths(&self) -> Vec<usize> {
        vec![1, 1, 1]
    }

    fn name(&self) -> &str {
        match self.op {
            GateOp::And => "and",
            GateOp::Or => "or",
            GateOp::Xor => "xor",
        }
    }

    fn value_changed(&self, ctx: &mut StateContext<'_>, _value: &WireValue, port_index: usize) -> Result<()> {
        if port_index == 2 {
            return Ok(());
        }
        let a = ctx.last_received(0)?;
        let b = ctx.last_received(1)?;
        let out = if a.is_valid_value() && b.is_valid_value() {
            let (a, b) = (a.bit(0) == BitState::One, b.bit(0) == BitState::One);
            let high = match self.op {
                GateOp::And => a && b,
                GateOp::Or => a || b,
                GateOp::Xor => a ^ b,
            };
            WireValue::of(high as u64, 1)
        } else {
            WireValue::new(1)
        };
        ctx.push_value(2, out)
    }
}

/// Drives a constant from init
struct Tie {
    value: WireValue,
}

impl Component for Tie {
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

/// External connection point, driven with `Engine::push_value`
struct Pin {
    width: usize,
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

/// Port 0 is a bus, ports 1..=width its bits. `fan_out` splits the bus
/// onto the bits, otherwise the bits are gathered onto the bus.
struct Splitter {
    width: usize,
    fan_out: bool,
}

impl Component for Splitter {
    fn port_widths(&self) -> Vec<usize> {
        let mut widths = vec![1; self.width + 1];
        widths[0] = self.width;
        widths
    }

    fn name(&self) -> &str {
        if self.fan_out {
            "splitter"
        } else {
            "joiner"
        }
    }

    fn value_changed(&self, ctx: &mut StateContext<'_>, value: &WireValue, port_index: usize) -> Result<()> {
        match (self.fan_out, port_index) {
            (true, 0) => {
                for bit in 0..self.width {
                    ctx.push_value(bit + 1, WireValue::from_bits(vec![value.bit(bit)]))?;
                }
                Ok(())
            }
            (false, bit) if bit > 0 => {
                let bits = (1..=self.width)
                    .map(|port| ctx.last_received(port).map(|value| value.bit(0)))
                    .collect::<Result<Vec<_>>>()?;
                ctx.push_value(0, WireValue::from_bits(bits))
            }
            _ => Ok(()),
        }
    }
}

struct Adder {
    state: StateId,
    a: PortId,
    b: PortId,
    sum: PortId,
}

fn place<C: Component + 'static>(engine: &mut Engine, circuit: CircuitId, component: C) -> Result<ComponentId> {
    let id = engine.create_component(component)?;
    engine.add_component(circuit, id)?;
    Ok(id)
}

fn build_adder(engine: &mut Engine, width: usize) -> Result<Adder> {
    let circuit = engine.create_circuit("ripple adder");
    let state = engine.top_level_state(circuit)?;

    let a_pin = place(engine, circuit, Pin { width })?;
    let b_pin = place(engine, circuit, Pin { width })?;
    let sum_pin = place(engine, circuit, Pin { width: width + 1 })?;
    let split_a = place(engine, circuit, Splitter { width, fan_out: true })?;
    let split_b = place(engine, circuit, Splitter { width, fan_out: true })?;
    let join = place(engine, circuit, Splitter { width: width + 1, fan_out: false })?;
    let carry_in = place(engine, circuit, Tie { value: WireValue::of(0, 1) })?;

    engine.link_ports(a_pin.port(0), split_a.port(0))?;
    engine.link_ports(b_pin.port(0), split_b.port(0))?;
    engine.link_ports(join.port(0), sum_pin.port(0))?;

    let mut carry = carry_in.port(0);
    for bit in 0..width {
        let a = split_a.port(bit + 1);
        let b = split_b.port(bit + 1);
        let half = place(engine, circuit, Gate { op: GateOp::Xor })?;
        let sum = place(engine, circuit, Gate { op: GateOp::Xor })?;
        let generate = place(engine, circuit, Gate { op: GateOp::And })?;
        let propagate = place(engine, circuit, Gate { op: GateOp::And })?;
        let carry_out = place(engine, circuit, Gate { op: GateOp::Or })?;

        engine.link_ports(a, half.port(0))?;
        engine.link_ports(b, half.port(1))?;
        engine.link_ports(a, generate.port(0))?;
        engine.link_ports(b, generate.port(1))?;

        engine.link_ports(half.port(2), sum.port(0))?;
        engine.link_ports(carry, sum.port(1))?;
        engine.link_ports(half.port(2), propagate.port(0))?;
        engine.link_ports(carry, propagate.port(1))?;

        engine.link_ports(generate.port(2), carry_out.port(0))?;
        engine.link_ports(propagate.port(2), carry_out.port(1))?;
        engine.link_ports(sum.port(2), join.port(bit + 1))?;
        carry = carry_out.port(2);
    }
    engine.link_ports(carry, join.port(width + 1))?;

    debug!(
        "built {}-bit adder from {} components",
        width,
        engine.circuit(circuit)?.components().len()
    );
    Ok(Adder {
        state,
        a: a_pin.port(0),
        b: b_pin.port(0),
        sum: sum_pin.port(0),
    })
}

fn main() -> Result<()> {
    env_logger::init();
    println!("Starting {}-bit ripple-carry adder", WIDTH);

    let simulator = Simulator::new();
    let adder = simulator.run_sync(|engine| build_adder(engine, WIDTH))?;
    simulator.step_all()?;

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let limit = 1u64 << WIDTH;
    for round in 0..ROUNDS {
        let a = rng.gen_range(0..limit);
        let b = rng.gen_range(0..limit);

        simulator.run_sync(|engine| -> Result<()> {
            engine.push_value(adder.state, adder.a, WireValue::of(a, WIDTH))?;
            engine.push_value(adder.state, adder.b, WireValue::of(b, WIDTH))
        })?;
        simulator.step_all()?;

        let sum = simulator.run_sync(|engine| engine.last_received(adder.state, adder.sum))?;
        println!(
            "round {:>2}: {:>2} + {:>2} = {} (0x{}, bits {})",
            round,
            a,
            b,
            sum.dec_string(),
            sum.hex_string(),
            sum
        );
        if sum.value()? != a + b {
            return Err(SimulationError::InvalidValue(format!(
                "{} + {} produced {}",
                a, b, sum
            )));
        }
    }

    info!("all {} rounds matched", ROUNDS);
    println!("Adder verified over {} random rounds", ROUNDS);
    Ok(())
}
