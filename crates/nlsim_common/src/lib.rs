//! Shared foundational types used across the nlsim netlist simulator.
//!
//! This crate provides the 4-state logic level carried by every net, interned
//! names for devices and pins, dense ID-indexed arenas, and the duration and
//! frequency parsers used by device parameters and netlist descriptions.

#![warn(missing_docs)]

pub mod arena;
pub mod duration;
pub mod frequency;
pub mod ident;
pub mod logic;

pub use arena::{Arena, ArenaId};
pub use duration::{
    parse_duration, ParseDurationError, FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_S, FS_PER_US,
};
pub use frequency::{Frequency, ParseFrequencyError};
pub use ident::{Ident, Interner};
pub use logic::Logic;
