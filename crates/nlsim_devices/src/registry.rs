//! Instantiation of library devices by type name.
//!
//! Netlist descriptions name devices by type (`ROM_TMS4800_DIP`, `NAND`, ...)
//! and carry loosely typed parameters. [`instantiate`] maps a type name to the
//! matching constructor and checks that the required parameters are present.

use nlsim_common::Frequency;
use nlsim_core::{BuildError, DeviceId, NetlistBuilder};
use tracing::warn;

use crate::clock::Clock;
use crate::gates::{GateKind, LogicGate, DEFAULT_GATE_DELAY_FS};
use crate::rom::{RomImage, RomTiming, Tms4800, Tms4800Dip};
use crate::supply::Supply;

/// Every type name [`instantiate`] accepts.
pub const DEVICE_TYPES: [&str; 10] = [
    Tms4800::TYPE_NAME,
    Tms4800Dip::TYPE_NAME,
    Clock::TYPE_NAME,
    "NAND",
    "AND",
    "OR",
    "NOR",
    "XOR",
    "NOT",
    Supply::TYPE_NAME,
];

/// Optional construction parameters. Each device type reads the ones it
/// understands.
#[derive(Clone, Debug, Default)]
pub struct DeviceParams {
    /// ROM output delay.
    pub output_delay_fs: Option<u64>,
    /// ROM latch delay.
    pub latch_delay_fs: Option<u64>,
    /// ROM contents.
    pub image: Option<RomImage>,
    /// Clock frequency (required for `CLOCK`).
    pub frequency: Option<Frequency>,
    /// Gate input count.
    pub inputs: Option<usize>,
    /// Gate propagation delay.
    pub delay_fs: Option<u64>,
}

impl DeviceParams {
    fn set_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.output_delay_fs.is_some() {
            names.push("output_delay");
        }
        if self.latch_delay_fs.is_some() {
            names.push("latch_delay");
        }
        if self.image.is_some() {
            names.push("rom");
        }
        if self.frequency.is_some() {
            names.push("frequency");
        }
        if self.inputs.is_some() {
            names.push("inputs");
        }
        if self.delay_fs.is_some() {
            names.push("delay");
        }
        names
    }
}

/// Adds a device of type `type_name` called `name` to `builder`.
///
/// Type names are matched case-insensitively. Parameters that the type does
/// not use are ignored with a warning. Returns the core device; for package
/// types that is the device inside the sub-circuit.
pub fn instantiate(
    builder: &mut NetlistBuilder,
    name: &str,
    type_name: &str,
    params: DeviceParams,
) -> Result<DeviceId, BuildError> {
    let normalized = type_name.to_ascii_uppercase();
    let used: &[&str] = match normalized.as_str() {
        "ROM_TMS4800" | "ROM_TMS4800_DIP" => &["output_delay", "latch_delay", "rom"],
        "CLOCK" => &["frequency"],
        "SUPPLY" => &[],
        _ => &["inputs", "delay"],
    };
    for param in params.set_names() {
        if !used.contains(&param) {
            warn!(device = name, device_type = %normalized, param, "parameter ignored");
        }
    }

    match normalized.as_str() {
        "ROM_TMS4800" | "ROM_TMS4800_DIP" => {
            let image = params.image.unwrap_or_default();
            let mut timing = RomTiming::default();
            if let Some(delay) = params.output_delay_fs {
                timing.output_delay_fs = delay;
            }
            if let Some(delay) = params.latch_delay_fs {
                timing.latch_delay_fs = delay;
            }
            if normalized == Tms4800::TYPE_NAME {
                builder.add_device(name, |pins| Tms4800::register(pins, image, timing))
            } else {
                builder.add_subcircuit(name, Tms4800Dip { image, timing })
            }
        }
        "CLOCK" => {
            let frequency = params.frequency.ok_or_else(|| BuildError::InvalidParameter {
                device: name.to_string(),
                reason: "CLOCK requires a frequency".to_string(),
            })?;
            builder.add_device(name, |pins| Clock::register(pins, frequency))
        }
        "SUPPLY" => builder.add_device(name, Supply::register),
        other => {
            let kind: GateKind = other.parse().map_err(|()| BuildError::UnknownType {
                device: name.to_string(),
                type_name: type_name.to_string(),
            })?;
            let inputs = params.inputs.unwrap_or_else(|| kind.default_inputs());
            let delay = params.delay_fs.unwrap_or(DEFAULT_GATE_DELAY_FS);
            builder.add_device(name, |pins| LogicGate::register(pins, kind, inputs, delay))
        }
    }
}
