//! An explicit power supply with `VCC` and `GND` outputs.

use nlsim_core::{BuildError, Device, EvalContext, Logic, PinId, PinRegistrar, SimError};

/// Drives `VCC` high and `GND` low from time zero.
///
/// Netlists that leave supply pins unwired get the global rails instead; this
/// device is for boards that wire power explicitly, e.g. to test a chip with
/// its supply disconnected.
#[derive(Debug)]
pub struct Supply {
    vcc: PinId,
    gnd: PinId,
}

impl Supply {
    /// Type name used in netlist descriptions.
    pub const TYPE_NAME: &'static str = "SUPPLY";

    /// Registers the two outputs and returns the device.
    pub fn register(pins: &mut PinRegistrar<'_>) -> Result<Self, BuildError> {
        Ok(Self {
            vcc: pins.output("VCC")?,
            gnd: pins.output("GND")?,
        })
    }
}

impl Device for Supply {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn reset(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), SimError> {
        ctx.write(self.vcc, Logic::One, 0)?;
        ctx.write(self.gnd, Logic::Zero, 0)
    }

    fn evaluate(&mut self, _ctx: &mut EvalContext<'_>) -> Result<(), SimError> {
        Ok(())
    }
}
