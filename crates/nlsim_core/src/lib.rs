//! Discrete-event logic simulation core.
//!
//! A circuit is a set of [devices](device::Device) whose pins are bound to
//! [nets](net::Net). Each net carries one four-state [`Logic`] level. Devices
//! never change levels directly: they queue delayed writes, and the
//! [`Simulator`] commits them in timestamp order, one delta cycle at a time,
//! re-evaluating every device whose active inputs changed.
//!
//! # Usage
//!
//! ```ignore
//! use nlsim_core::{NetlistBuilder, SimConfig, Simulator, Logic, FS_PER_NS};
//!
//! let mut builder = NetlistBuilder::new("top");
//! // ... add devices and nets ...
//! let mut sim = Simulator::new(builder.build()?, SimConfig::default())?;
//! let oe = sim.pin("rom.OE1")?;
//! sim.write(oe, Logic::One, 0);
//! sim.run_for(1_000 * FS_PER_NS)?;
//! ```
//!
//! # Modules
//!
//! - `time`: Femtosecond time with delta cycles
//! - `net`: Nets, pins and supply rails
//! - `queue`: Pending writes with last-write-wins cancellation per driver
//! - `device`: The device trait and its evaluation context
//! - `gate`: Power and output-enable gating
//! - `builder`: Netlist construction, sub-circuits and aliases
//! - `kernel`: The scheduler
//! - `waveform`: VCD output

#![warn(missing_docs)]

pub mod builder;
pub mod device;
pub mod error;
pub mod gate;
pub mod ids;
pub mod kernel;
pub mod net;
pub mod queue;
pub mod rails;
pub mod time;
pub mod waveform;

pub use builder::{Netlist, NetlistBuilder, PinRegistrar, Scope, Subcircuit};
pub use device::{Device, EvalContext, PendingWrite, StateVar};
pub use error::{BuildError, SimError};
pub use gate::{OutputGroup, PowerGate};
pub use ids::{DeviceId, NetId, PinId};
pub use kernel::{Change, RunSummary, SimConfig, Simulator};
pub use net::{Driver, PinDirection, Rail, Sensitivity};
pub use nlsim_common::Logic;
pub use rails::ConstantSource;
pub use time::{SimTime, FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_S, FS_PER_US};
pub use waveform::{VcdRecorder, WaveformRecorder};
