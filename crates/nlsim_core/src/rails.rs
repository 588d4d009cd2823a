//! Constant drivers, used for the global `VCC`/`GND` supply nets.

use nlsim_common::Logic;

use crate::device::{Device, EvalContext};
use crate::error::SimError;
use crate::ids::PinId;

/// Drives one output to a fixed level from time zero.
///
/// The builder instantiates one per supply rail when a supply pin is left
/// unwired, so supply injection is an ordinary device in the netlist rather
/// than hidden state.
#[derive(Debug)]
pub struct ConstantSource {
    out: PinId,
    level: Logic,
}

impl ConstantSource {
    /// Creates a source driving `out` to `level`.
    pub fn new(out: PinId, level: Logic) -> Self {
        Self { out, level }
    }
}

impl Device for ConstantSource {
    fn type_name(&self) -> &'static str {
        "CONSTANT"
    }

    fn reset(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), SimError> {
        ctx.write(self.out, self.level, 0)
    }

    fn evaluate(&mut self, _ctx: &mut EvalContext<'_>) -> Result<(), SimError> {
        Ok(())
    }
}
