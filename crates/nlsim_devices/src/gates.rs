//! Combinational logic gates with four-state semantics.
//!
//! Every gate has inputs `A`, `B`, `C`, ..., one output `Q` and `VCC`/`GND`
//! supply pins. The output follows the inputs after a fixed delay while the
//! gate is powered and is `Z` otherwise.

use std::fmt;
use std::str::FromStr;

use nlsim_core::{
    BuildError, Device, EvalContext, Logic, PinId, PinRegistrar, PowerGate, Rail, SimError,
    FS_PER_NS,
};

/// Default propagation delay.
pub const DEFAULT_GATE_DELAY_FS: u64 = 10 * FS_PER_NS;

/// Largest number of inputs a gate accepts.
pub const MAX_INPUTS: usize = 8;

const INPUT_NAMES: [&str; MAX_INPUTS] = ["A", "B", "C", "D", "E", "F", "G", "H"];

/// The boolean function of a gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateKind {
    /// Conjunction.
    And,
    /// Negated conjunction.
    Nand,
    /// Disjunction.
    Or,
    /// Negated disjunction.
    Nor,
    /// Odd parity.
    Xor,
    /// Inverter; exactly one input.
    Not,
}

impl GateKind {
    /// All gate kinds.
    pub const ALL: [GateKind; 6] = [
        GateKind::And,
        GateKind::Nand,
        GateKind::Or,
        GateKind::Nor,
        GateKind::Xor,
        GateKind::Not,
    ];

    /// The netlist type name, e.g. `NAND`.
    pub fn type_name(self) -> &'static str {
        match self {
            GateKind::And => "AND",
            GateKind::Nand => "NAND",
            GateKind::Or => "OR",
            GateKind::Nor => "NOR",
            GateKind::Xor => "XOR",
            GateKind::Not => "NOT",
        }
    }

    /// Default input count.
    pub fn default_inputs(self) -> usize {
        match self {
            GateKind::Not => 1,
            _ => 2,
        }
    }

    /// Applies the function to `inputs`.
    pub fn apply(self, inputs: &[Logic]) -> Logic {
        let fold = |f: fn(Logic, Logic) -> Logic| {
            inputs
                .iter()
                .copied()
                .reduce(f)
                .unwrap_or(Logic::X)
        };
        match self {
            GateKind::And => fold(|a, b| a & b),
            GateKind::Nand => !fold(|a, b| a & b),
            GateKind::Or => fold(|a, b| a | b),
            GateKind::Nor => !fold(|a, b| a | b),
            GateKind::Xor => fold(|a, b| a ^ b),
            GateKind::Not => !fold(|a, _| a),
        }
    }

    fn accepts(self, inputs: usize) -> bool {
        match self {
            GateKind::Not => inputs == 1,
            _ => (2..=MAX_INPUTS).contains(&inputs),
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for GateKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        GateKind::ALL
            .into_iter()
            .find(|kind| kind.type_name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// A gate instance.
#[derive(Debug)]
pub struct LogicGate {
    kind: GateKind,
    inputs: Vec<PinId>,
    out: PinId,
    power: PowerGate,
    delay_fs: u64,
}

impl LogicGate {
    /// Registers the gate's pins and returns the device.
    pub fn register(
        pins: &mut PinRegistrar<'_>,
        kind: GateKind,
        inputs: usize,
        delay_fs: u64,
    ) -> Result<Self, BuildError> {
        if !kind.accepts(inputs) {
            return Err(pins.invalid(format!("{kind} gate cannot have {inputs} inputs")));
        }
        let inputs = pins.inputs(&INPUT_NAMES[..inputs])?;
        let out = pins.output("Q")?;
        let vcc = pins.supply("VCC", Rail::Vcc)?;
        let gnd = pins.supply("GND", Rail::Gnd)?;
        Ok(Self {
            kind,
            inputs,
            out,
            power: PowerGate::supply(vcc, gnd),
            delay_fs,
        })
    }

    /// The gate's function.
    pub fn kind(&self) -> GateKind {
        self.kind
    }
}

impl Device for LogicGate {
    fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), SimError> {
        let level = if self.power.is_satisfied(ctx) {
            let levels: Vec<Logic> = self.inputs.iter().map(|&pin| ctx.read(pin)).collect();
            self.kind.apply(&levels)
        } else {
            Logic::Z
        };
        ctx.write(self.out, level, self.delay_fs)
    }
}
