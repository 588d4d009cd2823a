//! The device evaluation protocol.
//!
//! A [`Device`] reacts to committed changes on its active inputs. It sees the
//! network through an [`EvalContext`]: it can read committed levels, ask which
//! of its pins changed in the triggering delta step, and queue delayed writes
//! on its own outputs. It cannot commit a level or advance time; the scheduler
//! enqueues the collected writes after the device returns.

use std::collections::HashSet;

use nlsim_common::{Arena, Interner, Logic};

use crate::error::SimError;
use crate::ids::{DeviceId, NetId, PinId};
use crate::net::{Net, Pin, PinDirection};
use crate::time::SimTime;

/// A unit of reactive behavior with pins and private state.
///
/// Devices are created once per netlist and live as long as the simulator.
pub trait Device {
    /// The device type name, e.g. `ROM_TMS4800`.
    fn type_name(&self) -> &'static str;

    /// Called once when the simulator is created, before any event is
    /// committed. Devices that drive constant or free-running outputs queue
    /// their first writes here.
    fn reset(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), SimError> {
        let _ = ctx;
        Ok(())
    }

    /// Called once per delta step in which at least one active input changed.
    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), SimError>;

    /// Named internal state for inspection and debugging.
    fn state_vars(&self) -> Vec<StateVar> {
        Vec::new()
    }
}

/// A named piece of device state. `None` means the value is unknown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateVar {
    /// Variable name, e.g. `last_data`.
    pub name: &'static str,
    /// Current value.
    pub value: Option<u64>,
}

impl StateVar {
    /// Creates a state variable.
    pub fn new(name: &'static str, value: Option<u64>) -> Self {
        Self { name, value }
    }
}

/// A write queued by a device, relative to the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingWrite {
    /// The output pin that issued the write.
    pub pin: PinId,
    /// The net behind the written pin.
    pub net: NetId,
    /// The level to commit.
    pub level: Logic,
    /// Delay in femtoseconds; zero means the next delta cycle.
    pub delay_fs: u64,
}

/// A device's view of the network during one evaluation.
pub struct EvalContext<'a> {
    now: SimTime,
    device: DeviceId,
    nets: &'a Arena<NetId, Net>,
    pins: &'a Arena<PinId, Pin>,
    interner: &'a Interner,
    changed: &'a HashSet<NetId>,
    writes: Vec<PendingWrite>,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(
        now: SimTime,
        device: DeviceId,
        nets: &'a Arena<NetId, Net>,
        pins: &'a Arena<PinId, Pin>,
        interner: &'a Interner,
        changed: &'a HashSet<NetId>,
    ) -> Self {
        Self {
            now,
            device,
            nets,
            pins,
            interner,
            changed,
            writes: Vec::new(),
        }
    }

    /// The time of the delta step being evaluated.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The device being evaluated.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Returns the committed level on the pin's net.
    pub fn read(&self, pin: PinId) -> Logic {
        self.net(pin).level
    }

    /// Returns `true` if the pin's net changed in the triggering delta step.
    pub fn changed(&self, pin: PinId) -> bool {
        self.changed.contains(&self.pins[pin].net)
    }

    /// Returns `true` if the pin's net just became `1`.
    pub fn rose(&self, pin: PinId) -> bool {
        let net = self.net(pin);
        self.changed(pin) && net.level == Logic::One && net.previous != Logic::One
    }

    /// Returns `true` if the pin's net just became `0`.
    pub fn fell(&self, pin: PinId) -> bool {
        let net = self.net(pin);
        self.changed(pin) && net.level == Logic::Zero && net.previous != Logic::Zero
    }

    /// Reads the pins as an unsigned word, least significant bit first.
    ///
    /// Returns `None` if any pin is `X` or `Z`.
    pub fn read_word(&self, pins: &[PinId]) -> Option<u64> {
        pins.iter().enumerate().try_fold(0u64, |acc, (bit, &pin)| {
            self.read(pin)
                .to_bool()
                .map(|set| acc | (u64::from(set) << bit))
        })
    }

    /// Queues a write of `level` on one of this device's outputs.
    pub fn write(&mut self, pin: PinId, level: Logic, delay_fs: u64) -> Result<(), SimError> {
        let info = &self.pins[pin];
        if info.device != self.device {
            return Err(self.illegal(pin, "pin belongs to another device"));
        }
        if info.direction != PinDirection::Output {
            return Err(self.illegal(pin, "pin is an input"));
        }
        self.writes.push(PendingWrite {
            pin,
            net: info.net,
            level,
            delay_fs,
        });
        Ok(())
    }

    /// Drives `pins` with the bits of `word` (LSB first); `None` drives `X`.
    pub fn drive_word(
        &mut self,
        pins: &[PinId],
        word: Option<u64>,
        delay_fs: u64,
    ) -> Result<(), SimError> {
        for (bit, &pin) in pins.iter().enumerate() {
            let level = match word {
                Some(w) => Logic::from_bool((w >> bit) & 1 == 1),
                None => Logic::X,
            };
            self.write(pin, level, delay_fs)?;
        }
        Ok(())
    }

    /// Drives every pin in `pins` with the same level.
    pub fn drive_all(
        &mut self,
        pins: &[PinId],
        level: Logic,
        delay_fs: u64,
    ) -> Result<(), SimError> {
        for &pin in pins {
            self.write(pin, level, delay_fs)?;
        }
        Ok(())
    }

    /// Returns the qualified name of a pin.
    pub fn pin_name(&self, pin: PinId) -> &str {
        self.interner.resolve(self.pins[pin].name)
    }

    pub(crate) fn into_writes(self) -> Vec<PendingWrite> {
        self.writes
    }

    fn net(&self, pin: PinId) -> &Net {
        &self.nets[self.pins[pin].net]
    }

    fn illegal(&self, pin: PinId, reason: &'static str) -> SimError {
        SimError::IllegalWrite {
            pin: self.pin_name(pin).to_string(),
            reason,
        }
    }
}
