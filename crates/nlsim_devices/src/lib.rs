//! Device library for the nlsim simulation core.
//!
//! Each device registers its pins through a
//! [`PinRegistrar`](nlsim_core::PinRegistrar) and implements
//! [`Device`](nlsim_core::Device). Package variants such as the TMS-4800 DIP
//! are [`Subcircuit`](nlsim_core::Subcircuit)s that wrap a core device and
//! publish package pin numbers as aliases.
//!
//! [`registry::instantiate`] creates any of them by type name, which is how
//! netlist descriptions are elaborated.

#![warn(missing_docs)]

pub mod clock;
pub mod gates;
pub mod registry;
pub mod rom;
pub mod supply;

pub use clock::Clock;
pub use gates::{GateKind, LogicGate};
pub use registry::{instantiate, DeviceParams, DEVICE_TYPES};
pub use rom::{RomImage, RomImageError, RomTiming, Tms4800, Tms4800Dip, ROM_WORDS};
pub use supply::Supply;
