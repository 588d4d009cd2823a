//! Shared fixtures for the command tests.

/// A description with one DIP ROM whose signal pins each sit on a net named
/// after the core pin in lower case. `extra` is appended verbatim.
pub fn rom_board(extra: &str) -> String {
    let mut toml = String::from(
        "[netlist]\nname = \"rom_board\"\n\n\
         [[device]]\nname = \"rom\"\ntype = \"ROM_TMS4800_DIP\"\n\
         [device.rom]\nfill = \"index\"\n\n",
    );
    for bit in 0..11 {
        toml.push_str(&format!("[[net]]\nname = \"a{bit}\"\npins = \"rom.A.A{bit}\"\n"));
    }
    for bit in 0..8 {
        toml.push_str(&format!("[[net]]\nname = \"d{bit}\"\npins = \"rom.A.D{bit}\"\n"));
    }
    for (net, pin) in [("ar", "13"), ("oe1", "24"), ("oe2", "14")] {
        toml.push_str(&format!("[[net]]\nname = \"{net}\"\npins = \"rom.{pin}\"\n"));
    }
    toml.push('\n');
    toml.push_str(extra);
    toml
}
