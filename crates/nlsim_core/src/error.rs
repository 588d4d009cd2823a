//! Error types for netlist construction and simulation.
//!
//! [`BuildError`] covers wiring mistakes caught before simulation starts;
//! [`SimError`] covers contract violations and device failures at run time.
//! Neither is transient: both indicate a bug in the netlist or the caller.

use std::io;

use crate::time::SimTime;

/// Errors detected while building a netlist.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A device, pin, net or alias name is already taken.
    #[error("duplicate name '{0}'")]
    DuplicateName(String),

    /// A pin name does not resolve to a pin or alias.
    #[error("unknown pin '{0}'")]
    UnknownPin(String),

    /// A net name does not resolve to a declared net.
    #[error("unknown net '{0}'")]
    UnknownNet(String),

    /// A pin has no net and no default supply rail.
    #[error("pin '{0}' is not connected to any net")]
    UnboundPin(String),

    /// A pin was connected a second time to a different net.
    #[error("pin '{pin}' is already bound to net '{net}'")]
    AlreadyBound {
        /// The qualified pin name.
        pin: String,
        /// The net it is already bound to.
        net: String,
    },

    /// A second output was connected to a net that is not declared as a bus.
    #[error("net '{net}' is already driven by '{existing}', cannot add driver '{new}'")]
    MultipleDrivers {
        /// The net name.
        net: String,
        /// The output already driving the net.
        existing: String,
        /// The rejected output.
        new: String,
    },

    /// A device parameter is out of range or malformed.
    #[error("invalid parameter for device '{device}': {reason}")]
    InvalidParameter {
        /// The device instance name.
        device: String,
        /// What was wrong.
        reason: String,
    },

    /// A device type name is not known to the device library.
    #[error("device '{device}' has unknown type '{type_name}'")]
    UnknownType {
        /// The device instance name.
        device: String,
        /// The requested type name.
        type_name: String,
    },

    /// A device constructor failed, leaving its slot empty.
    #[error("device '{0}' was not constructed")]
    IncompleteDevice(String),
}

/// Errors that can occur while the simulation is running.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// An event was scheduled strictly before the current virtual time.
    #[error("cannot schedule at {at}: current time is {now}")]
    ScheduleInPast {
        /// The requested commit time.
        at: SimTime,
        /// The scheduler's current time.
        now: SimTime,
    },

    /// Too many delta cycles at a single timestamp, indicating a combinational loop.
    #[error("delta cycle limit exceeded at {fs} fs (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// The timestamp in femtoseconds where the limit was hit.
        fs: u64,
        /// The maximum number of delta cycles allowed.
        max_deltas: u32,
    },

    /// A device reported malformed internal state or inputs it cannot handle.
    #[error("evaluation error: {reason}")]
    EvalError {
        /// Description of what went wrong during evaluation.
        reason: String,
    },

    /// A device evaluation failed; the delta step was abandoned.
    #[error("device '{device}' failed at {time}: {source}")]
    DeviceFailed {
        /// The device instance name.
        device: String,
        /// The time of the failing delta step.
        time: SimTime,
        /// The error the device returned.
        #[source]
        source: Box<SimError>,
    },

    /// A device tried to write a pin it may not drive.
    #[error("illegal write to pin '{pin}': {reason}")]
    IllegalWrite {
        /// The qualified pin name.
        pin: String,
        /// Why the write was rejected.
        reason: &'static str,
    },

    /// A pin name could not be resolved.
    #[error("unknown pin '{0}'")]
    UnknownPin(String),

    /// A net name could not be resolved.
    #[error("unknown net '{0}'")]
    UnknownNet(String),

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}
