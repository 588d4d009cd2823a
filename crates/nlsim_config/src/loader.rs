//! Netlist description loading and validation.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::ConfigError;
use crate::types::NetlistConfig;

/// Loads and validates a netlist description from a file.
pub fn load_config(path: &Path) -> Result<NetlistConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a netlist description from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<NetlistConfig, ConfigError> {
    let config: NetlistConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks the structural consistency of a description.
///
/// Whether pin names and device types exist is only known once the netlist
/// is elaborated; this pass catches what can be seen from the file alone.
fn validate_config(config: &NetlistConfig) -> Result<(), ConfigError> {
    if config.netlist.name.trim().is_empty() {
        return Err(ConfigError::MissingField("netlist.name".to_string()));
    }
    if config.simulation.max_deltas == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.max_deltas must be at least 1".to_string(),
        ));
    }

    let mut devices = HashSet::new();
    for (i, device) in config.devices.iter().enumerate() {
        if device.name.is_empty() {
            return Err(ConfigError::MissingField(format!("device[{i}].name")));
        }
        if device.name.contains('.') || device.name.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "device name '{}' may not contain '.' or whitespace",
                device.name
            )));
        }
        if device.device_type.is_empty() {
            return Err(ConfigError::MissingField(format!("device[{i}].type")));
        }
        if !devices.insert(device.name.as_str()) {
            return Err(ConfigError::DuplicateName {
                kind: "device",
                name: device.name.clone(),
            });
        }
    }

    let mut nets = HashSet::new();
    let mut bound: HashMap<&str, &str> = HashMap::new();
    for (i, net) in config.nets.iter().enumerate() {
        if net.name.is_empty() {
            return Err(ConfigError::MissingField(format!("net[{i}].name")));
        }
        if !nets.insert(net.name.as_str()) {
            return Err(ConfigError::DuplicateName {
                kind: "net",
                name: net.name.clone(),
            });
        }
        for pin in &net.pins {
            if let Some(other) = bound.insert(pin.as_str(), net.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "pin '{pin}' is listed in nets '{other}' and '{}'",
                    net.name
                )));
            }
        }
    }

    for (i, stimulus) in config.stimuli.iter().enumerate() {
        if stimulus.pin.is_empty() {
            return Err(ConfigError::MissingField(format!("stimulus[{i}].pin")));
        }
        if let Some(limit) = config.simulation.time_limit {
            if stimulus.at > limit {
                return Err(ConfigError::ValidationError(format!(
                    "stimulus on '{}' at {} fs is after the time limit",
                    stimulus.pin, stimulus.at
                )));
            }
        }
    }

    for (i, probe) in config.probes.iter().enumerate() {
        if probe.pin.is_empty() {
            return Err(ConfigError::MissingField(format!("probe[{i}].pin")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RomFill, DEFAULT_MAX_DELTAS};
    use nlsim_common::Logic;

    const ROM_DEMO: &str = r#"
[netlist]
name = "rom_demo"

[simulation]
max_deltas = 500
time_limit = "10us"
vcd = "out.vcd"

[[device]]
name = "rom"
type = "ROM_TMS4800_DIP"
output_delay = "450ns"
latch_delay = "20ns"
[device.rom]
fill = "index"

[[device]]
name = "clk"
type = "CLOCK"
frequency = "1MHz"

[[net]]
name = "oe1"
pins = ["rom.24"]

[[net]]
name = "ar"
pins = "rom.13"

[[stimulus]]
at = "100ns"
pin = "rom.24"
level = "1"

[[stimulus]]
at = "200ns"
pin = "rom.13"
level = 0

[[probe]]
pin = "rom.23"
label = "D0"
"#;

    #[test]
    fn parse_full_description() {
        let config = load_config_from_str(ROM_DEMO).unwrap();
        assert_eq!(config.netlist.name, "rom_demo");
        assert_eq!(config.simulation.max_deltas, 500);
        assert_eq!(config.simulation.time_limit, Some(10_000_000_000));
        assert_eq!(config.simulation.vcd.as_deref(), Some("out.vcd"));

        assert_eq!(config.devices.len(), 2);
        let rom = &config.devices[0];
        assert_eq!(rom.device_type, "ROM_TMS4800_DIP");
        assert_eq!(rom.output_delay, Some(450_000_000));
        assert_eq!(rom.latch_delay, Some(20_000_000));
        assert_eq!(rom.rom.as_ref().map(|r| r.fill), Some(RomFill::Index));
        let clk = &config.devices[1];
        assert_eq!(clk.frequency.map(|f| f.hz()), Some(1_000_000.0));

        assert_eq!(config.nets[0].pins, vec!["rom.24"]);
        assert_eq!(config.nets[1].pins, vec!["rom.13"]);
        assert!(!config.nets[0].bus);

        assert_eq!(config.stimuli[0].at, 100_000_000);
        assert_eq!(config.stimuli[0].level, Logic::One);
        assert_eq!(config.stimuli[1].level, Logic::Zero);
        assert_eq!(config.probes[0].display_name(), "D0");
    }

    #[test]
    fn defaults_apply() {
        let config = load_config_from_str("[netlist]\nname = \"empty\"\n").unwrap();
        assert_eq!(config.simulation.max_deltas, DEFAULT_MAX_DELTAS);
        assert!(config.simulation.time_limit.is_none());
        assert!(config.devices.is_empty());
        assert!(config.nets.is_empty());
    }

    #[test]
    fn missing_netlist_table_is_parse_error() {
        let err = load_config_from_str("[simulation]\nmax_deltas = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn empty_name_rejected() {
        let err = load_config_from_str("[netlist]\nname = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(f) if f == "netlist.name"));
    }

    #[test]
    fn bad_duration_is_parse_error() {
        let toml = r#"
[netlist]
name = "x"
[[device]]
name = "g"
type = "NAND"
delay = "10 parsecs"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(msg) if msg.contains("unknown duration unit")));
    }

    #[test]
    fn bad_level_is_parse_error() {
        let toml = r#"
[netlist]
name = "x"
[[stimulus]]
at = "1ns"
pin = "g.A"
level = 2
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn duplicate_device_rejected() {
        let toml = r#"
[netlist]
name = "x"
[[device]]
name = "g"
type = "NAND"
[[device]]
name = "g"
type = "NOR"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert_eq!(err.to_string(), "duplicate device name 'g'");
    }

    #[test]
    fn dotted_device_name_rejected() {
        let toml = r#"
[netlist]
name = "x"
[[device]]
name = "a.b"
type = "NAND"
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn pin_on_two_nets_rejected() {
        let toml = r#"
[netlist]
name = "x"
[[net]]
name = "n1"
pins = ["g.A"]
[[net]]
name = "n2"
pins = ["g.A", "g.B"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: pin 'g.A' is listed in nets 'n1' and 'n2'"
        );
    }

    #[test]
    fn stimulus_after_limit_rejected() {
        let toml = r#"
[netlist]
name = "x"
[simulation]
time_limit = "1us"
[[stimulus]]
at = "2us"
pin = "g.A"
level = "high"
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netlist.toml");
        std::fs::write(&path, ROM_DEMO).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.netlist.name, "rom_demo");

        let missing = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::IoError(_)));
    }
}
