//! `nlsim run`: simulate a netlist description.
//!
//! Loads and elaborates the description, schedules its stimuli, attaches the
//! probes and the optional VCD recorder, then runs either for the configured
//! time limit or until no events remain. Probe changes go to stdout in the
//! order they were committed.

use std::cell::RefCell;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use nlsim_common::{parse_duration, Logic};
use nlsim_config::{load_config, NetlistConfig};
use nlsim_core::{RunSummary, SimConfig, SimTime, Simulator, VcdRecorder};
use tracing::info;

use crate::elaborate::elaborate;
use crate::{GlobalArgs, RunArgs};

/// Settings resolved from the description and the command line.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// How long to run, in femtoseconds; `None` runs until idle.
    pub time_limit: Option<u64>,
    /// Where to write the VCD waveform.
    pub vcd: Option<PathBuf>,
}

/// A committed change on a probed pin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeEvent {
    /// Commit time.
    pub time: SimTime,
    /// Probe label.
    pub label: String,
    /// New level.
    pub level: Logic,
}

/// The outcome of a run.
#[derive(Debug)]
pub struct RunReport {
    /// Scheduler counters.
    pub summary: RunSummary,
    /// Probe changes in commit order.
    pub probes: Vec<ProbeEvent>,
}

/// Runs the `nlsim run` command.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let path = Path::new(&args.netlist);
    let config = load_config(path)?;

    let time_limit = match &args.time {
        Some(t) => Some(parse_duration(t)?),
        None => config.simulation.time_limit,
    };
    let vcd = if args.no_waveform {
        None
    } else {
        match (&args.vcd, &config.simulation.vcd) {
            (Some(out), _) => Some(PathBuf::from(out)),
            (None, Some(out)) => Some(relative_to(path, out)),
            (None, None) => None,
        }
    };

    if !global.quiet {
        eprintln!("   Simulating {}", config.netlist.name);
    }

    let options = RunOptions { time_limit, vcd };
    let report = simulate(&config, &options)?;

    for event in &report.probes {
        println!("{:>14}  {:<12} {}", event.time.to_string(), event.label, event.level);
    }

    if !global.quiet {
        let summary = &report.summary;
        eprintln!(
            "    Finished at {}: {} events, {} delta steps, {} level changes",
            summary.final_time, summary.events_committed, summary.delta_steps, summary.level_changes
        );
        if let Some(out) = &options.vcd {
            eprintln!("    Waveform written to {}", out.display());
        }
    }
    Ok(0)
}

/// Elaborates `config` and simulates it.
pub fn simulate(config: &NetlistConfig, options: &RunOptions) -> Result<RunReport, Box<dyn Error>> {
    let netlist = elaborate(config)?;
    let sim_config = SimConfig {
        max_deltas: config.simulation.max_deltas,
    };
    let mut sim = Simulator::new(netlist, sim_config)?;

    // Scheduled in time order; equal times keep file order.
    let mut stimuli: Vec<_> = config.stimuli.iter().collect();
    stimuli.sort_by_key(|stimulus| stimulus.at);
    for stimulus in stimuli {
        let pin = sim.pin(&stimulus.pin)?;
        let net = sim.net_of(pin);
        // Stimuli at time zero land with the reset writes.
        let at = SimTime::from_fs(stimulus.at).max(sim.now().next_delta());
        sim.schedule_at(net, stimulus.level, at)?;
    }

    let log = Rc::new(RefCell::new(Vec::new()));
    for probe in &config.probes {
        let pin = sim.pin(&probe.pin)?;
        let label = probe.display_name().to_string();
        let sink = Rc::clone(&log);
        sim.watch_pin(pin, move |change| {
            sink.borrow_mut().push(ProbeEvent {
                time: change.time,
                label: label.clone(),
                level: change.level,
            });
        });
    }

    if let Some(out) = &options.vcd {
        let file = File::create(out)?;
        sim.set_recorder(Box::new(VcdRecorder::new(BufWriter::new(file))))?;
    }

    let result = match options.time_limit {
        Some(limit) => sim.run_for(limit),
        None => sim.run_until_idle(),
    };
    sim.finish_recording()?;
    let summary = result?;

    info!(
        netlist = %config.netlist.name,
        time = %summary.final_time,
        events = summary.events_committed,
        pending = sim.pending_events(),
        "simulation finished"
    );

    let probes = std::mem::take(&mut *log.borrow_mut());
    Ok(RunReport { summary, probes })
}

/// Resolves `target` against the directory holding `netlist`.
fn relative_to(netlist: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    match netlist.parent() {
        Some(dir) if target.is_relative() => dir.join(target),
        _ => target.to_path_buf(),
    }
}
