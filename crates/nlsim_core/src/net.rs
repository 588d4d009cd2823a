//! Nets and pins: the static wiring fabric of a netlist.
//!
//! A [`Net`] holds the last level committed by the scheduler; a [`Pin`] is a
//! directional terminal of one device bound to exactly one net. Both tables are
//! frozen once the netlist is built. Only the scheduler mutates net levels.
//!
//! A bus net remembers the level each [`Driver`] last put on it and commits
//! the resolution of all of them.

use nlsim_common::{Ident, Logic};
use serde::{Deserialize, Serialize};

use crate::ids::{DeviceId, NetId, PinId};
use crate::time::SimTime;

/// Direction of a pin relative to its owning device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    /// The device reads the net.
    Input,
    /// The device drives the net.
    Output,
}

/// Whether a change on an input pin re-evaluates the owning device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensitivity {
    /// Any committed change on the net triggers the device.
    Active,
    /// The device only samples the pin when something else triggers it.
    Passive,
}

/// A global supply net that an unwired supply pin falls back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rail {
    /// Positive supply, driven to `1`.
    Vcc,
    /// Ground, driven to `0`.
    Gnd,
}

impl Rail {
    /// The name of the global net for this rail.
    pub fn net_name(self) -> &'static str {
        match self {
            Rail::Vcc => "VCC",
            Rail::Gnd => "GND",
        }
    }

    /// The level the rail is driven to.
    pub fn level(self) -> Logic {
        match self {
            Rail::Vcc => Logic::One,
            Rail::Gnd => Logic::Zero,
        }
    }
}

/// The source of a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Driver {
    /// A device output pin.
    Pin(PinId),
    /// Code outside the netlist: stimuli and test benches.
    External,
}

/// A pin in a built netlist.
#[derive(Clone, Debug)]
pub struct Pin {
    /// Qualified name, e.g. `rom.A.OE1`.
    pub name: Ident,
    /// The device that owns this pin.
    pub device: DeviceId,
    /// Input or output.
    pub direction: PinDirection,
    /// For inputs, whether changes trigger the owner. Outputs are `Passive`.
    pub sensitivity: Sensitivity,
    /// The net this pin is bound to.
    pub net: NetId,
}

/// The runtime state of a net.
///
/// `previous` and `last_change` describe the most recent committed change and
/// are what edge detection (`rose`/`fell`) looks at.
#[derive(Clone, Debug)]
pub struct Net {
    /// Net name, e.g. `addr5` or `VCC`.
    pub name: Ident,
    /// Current committed level.
    pub level: Logic,
    /// Level before the most recent committed change.
    pub previous: Logic,
    /// Time of the most recent committed change.
    pub last_change: SimTime,
    /// Every pin bound to this net, in binding order.
    pub pins: Vec<PinId>,
    /// Devices with an active input on this net, ascending and deduplicated.
    pub listeners: Vec<DeviceId>,
    /// Whether several outputs may drive this net.
    pub bus: bool,
    /// On a bus net, the last level from each driver, in first-drive order.
    pub drivers: Vec<(Driver, Logic)>,
    driven: Logic,
}

impl Net {
    /// Creates an undriven net.
    pub fn new(name: Ident, bus: bool) -> Self {
        Self {
            name,
            level: Logic::Z,
            previous: Logic::Z,
            last_change: SimTime::zero(),
            pins: Vec::new(),
            listeners: Vec::new(),
            bus,
            drivers: Vec::new(),
            driven: Logic::Z,
        }
    }

    /// Records a level from `driver` without committing it.
    ///
    /// A plain net keeps only the latest level. A bus net keeps one level per
    /// driver.
    pub fn drive(&mut self, driver: Driver, level: Logic) {
        if !self.bus {
            self.driven = level;
            return;
        }
        match self.drivers.iter_mut().find(|(d, _)| *d == driver) {
            Some(entry) => entry.1 = level,
            None => self.drivers.push((driver, level)),
        }
    }

    /// The level the recorded drives resolve to.
    pub fn resolved(&self) -> Logic {
        if self.bus {
            self.drivers
                .iter()
                .fold(Logic::Z, |acc, &(_, level)| acc.resolve(level))
        } else {
            self.driven
        }
    }

    /// Commits a new level, returning `true` if it differs from the old one.
    pub fn commit(&mut self, level: Logic, time: SimTime) -> bool {
        if self.level == level {
            return false;
        }
        self.previous = self.level;
        self.level = level;
        self.last_change = time;
        true
    }
}
