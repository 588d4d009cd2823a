//! Power and output-enable gating.
//!
//! A [`PowerGate`] is a set of `(pin, level)` requirements, e.g. `VCC = 1` and
//! `GND = 0`, or `OE1 = 1`. It is satisfied only when every pin reads exactly
//! its required level; `X` and `Z` never satisfy a requirement.
//!
//! An [`OutputGroup`] ties a bus of outputs to its own enable gate. A device
//! with several independently enabled buses keeps one group per bus and asks
//! each group to drive; a disabled or unpowered group drives `Z` instead of
//! data.

use nlsim_common::Logic;

use crate::device::EvalContext;
use crate::error::SimError;
use crate::ids::PinId;

/// A conjunction of required pin levels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PowerGate {
    requirements: Vec<(PinId, Logic)>,
}

impl PowerGate {
    /// Creates a gate with no requirements; it is always satisfied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the usual supply gate: `vcc` must be `1` and `gnd` must be `0`.
    pub fn supply(vcc: PinId, gnd: PinId) -> Self {
        Self::new().require(vcc, Logic::One).require(gnd, Logic::Zero)
    }

    /// Adds a requirement that `pin` reads `level`.
    pub fn require(mut self, pin: PinId, level: Logic) -> Self {
        self.requirements.push((pin, level));
        self
    }

    /// Returns `true` if every requirement is met by the committed levels.
    pub fn is_satisfied(&self, ctx: &EvalContext<'_>) -> bool {
        self.requirements
            .iter()
            .all(|&(pin, level)| ctx.read(pin) == level)
    }

    /// Returns `true` if any gate pin changed in the triggering delta step.
    pub fn changed(&self, ctx: &EvalContext<'_>) -> bool {
        self.requirements.iter().any(|&(pin, _)| ctx.changed(pin))
    }

    /// The pins this gate looks at.
    pub fn pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.requirements.iter().map(|&(pin, _)| pin)
    }
}

/// A bus of outputs sharing one enable gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputGroup {
    outputs: Vec<PinId>,
    enable: PowerGate,
}

impl OutputGroup {
    /// Creates a group whose outputs are enabled when `enable` reads `active`.
    pub fn new(outputs: Vec<PinId>, enable: PinId, active: Logic) -> Self {
        Self {
            outputs,
            enable: PowerGate::new().require(enable, active),
        }
    }

    /// The output pins, least significant first.
    pub fn outputs(&self) -> &[PinId] {
        &self.outputs
    }

    /// Returns `true` if the enable requirement is met.
    pub fn is_enabled(&self, ctx: &EvalContext<'_>) -> bool {
        self.enable.is_satisfied(ctx)
    }

    /// Returns `true` if the enable pin changed in the triggering delta step.
    pub fn enable_changed(&self, ctx: &EvalContext<'_>) -> bool {
        self.enable.changed(ctx)
    }

    /// Drives `word` onto the outputs if the group is enabled and `power` is
    /// satisfied, otherwise drives `Z`. Returns whether data was driven.
    ///
    /// `word` is already shifted so that bit 0 belongs to the first output;
    /// `None` drives `X` on every output.
    pub fn drive(
        &self,
        ctx: &mut EvalContext<'_>,
        power: &PowerGate,
        word: Option<u64>,
        delay_fs: u64,
    ) -> Result<bool, SimError> {
        if power.is_satisfied(ctx) && self.is_enabled(ctx) {
            ctx.drive_word(&self.outputs, word, delay_fs)?;
            Ok(true)
        } else {
            ctx.drive_all(&self.outputs, Logic::Z, delay_fs)?;
            Ok(false)
        }
    }
}
