//! Free-running square-wave clock.

use nlsim_common::Frequency;
use nlsim_core::{BuildError, Device, EvalContext, Logic, PinId, PinRegistrar, SimError, StateVar};

/// A 50% duty-cycle clock on output `Q`.
///
/// `Q` starts low at time zero and toggles every half period. The device
/// listens to its own output through the `FB` feedback input, so each toggle
/// schedules the next one. A netlist containing a clock never goes idle.
#[derive(Debug)]
pub struct Clock {
    q: PinId,
    feedback: PinId,
    frequency: Frequency,
    half_period_fs: u64,
}

impl Clock {
    /// Type name used in netlist descriptions.
    pub const TYPE_NAME: &'static str = "CLOCK";

    /// Registers `Q` and `FB` and returns the device.
    pub fn register(pins: &mut PinRegistrar<'_>, frequency: Frequency) -> Result<Self, BuildError> {
        if !(frequency.hz() > 0.0 && frequency.hz().is_finite()) {
            return Err(pins.invalid(format!("frequency {frequency} must be positive")));
        }
        let half_period_fs = frequency.half_period_fs();
        if half_period_fs == 0 {
            return Err(pins.invalid(format!("frequency {frequency} is too high")));
        }
        let q = pins.output("Q")?;
        let feedback = pins.feedback("FB", q)?;
        Ok(Self {
            q,
            feedback,
            frequency,
            half_period_fs,
        })
    }

    /// The configured frequency.
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }
}

impl Device for Clock {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn reset(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), SimError> {
        ctx.write(self.q, Logic::Zero, 0)
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), SimError> {
        // anything other than a driven high restarts the cycle low
        let next = match ctx.read(self.feedback) {
            Logic::Zero => Logic::One,
            _ => Logic::Zero,
        };
        ctx.write(self.q, next, self.half_period_fs)
    }

    fn state_vars(&self) -> Vec<StateVar> {
        vec![StateVar::new("half_period_fs", Some(self.half_period_fs))]
    }
}
