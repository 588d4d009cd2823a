//! Parsing and validation of `netlist.toml` descriptions.
//!
//! A description lists device instances by library type, the nets that wire
//! their pins together, timed stimuli and the pins to probe. This crate turns
//! the file into a strongly typed [`NetlistConfig`]; elaborating it into a
//! netlist is left to the caller, which knows the device library.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
