//! nlsim CLI: load a `netlist.toml` description and simulate it.
//!
//! Provides `nlsim check` to validate and elaborate a description without
//! running it, and `nlsim run` to simulate it, print probe changes and
//! optionally record a VCD waveform.

#![warn(missing_docs)]

mod check;
mod elaborate;
mod run;
#[cfg(test)]
mod testing;

use std::io::IsTerminal;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// nlsim: a discrete-event logic simulator.
#[derive(Parser, Debug)]
#[command(name = "nlsim", version, about = "Discrete-event netlist simulator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate and elaborate a netlist description.
    Check(CheckArgs),
    /// Simulate a netlist description.
    Run(RunArgs),
}

/// Arguments for the `nlsim check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the netlist description.
    pub netlist: String,
}

/// Arguments for the `nlsim run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the netlist description.
    pub netlist: String,

    /// Simulation time limit (e.g., "100ns", "1us"). Overrides
    /// `simulation.time_limit`.
    #[arg(long)]
    pub time: Option<String>,

    /// Output path for a VCD waveform. Overrides `simulation.vcd`.
    #[arg(long)]
    pub vcd: Option<String>,

    /// Disable waveform recording even if the description asks for it.
    #[arg(long, conflicts_with = "vcd")]
    pub no_waveform: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
}

impl GlobalArgs {
    /// The log filter used when `RUST_LOG` is not set.
    fn default_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

fn init_tracing(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(global.default_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(global.color)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Check(ref args) => check::run(args, &global),
        Command::Run(ref args) => run::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
