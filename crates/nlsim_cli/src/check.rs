//! `nlsim check`: validate and elaborate a description without running it.

use std::error::Error;
use std::path::Path;

use nlsim_config::{load_config, NetlistConfig};
use nlsim_core::{BuildError, Netlist};

use crate::elaborate::elaborate;
use crate::{CheckArgs, GlobalArgs};

/// Runs the `nlsim check` command.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let config = load_config(Path::new(&args.netlist))?;
    let netlist = check(&config)?;
    if !global.quiet {
        println!(
            "netlist '{}': {} devices, {} nets, {} pins",
            netlist.name(),
            netlist.device_count(),
            netlist.net_count(),
            netlist.pin_count()
        );
    }
    Ok(0)
}

/// Elaborates `config` and checks that every stimulus and probe names a pin.
pub fn check(config: &NetlistConfig) -> Result<Netlist, BuildError> {
    let netlist = elaborate(config)?;
    let referenced = config
        .stimuli
        .iter()
        .map(|s| &s.pin)
        .chain(config.probes.iter().map(|p| &p.pin));
    for pin in referenced {
        if netlist.pin(pin).is_none() {
            return Err(BuildError::UnknownPin(pin.clone()));
        }
    }
    Ok(netlist)
}
