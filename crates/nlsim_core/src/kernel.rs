//! The scheduler: virtual time, level commits and device re-evaluation.
//!
//! [`Simulator`] owns a frozen [`Netlist`] and an [`EventQueue`]. Each call to
//! [`advance`](Simulator::advance) executes one delta step:
//!
//! 1. pop every live event at the earliest pending timestamp,
//! 2. record each event as its driver's level, then commit every touched
//!    net's resolved level once, in issuance order,
//! 3. notify watchers and the waveform recorder of the nets that changed,
//! 4. evaluate every device with an active input on a changed net, once each,
//!    in ascending device order, against the post-commit levels,
//! 5. enqueue the writes those devices issued.
//!
//! Writes issued in step 4 land at a later delta or timestamp, so devices
//! triggered by the same step all observe the same levels.

use std::collections::{BTreeSet, HashMap, HashSet};

use nlsim_common::{Arena, Ident, Interner, Logic};
use tracing::{debug, trace, warn};

use crate::builder::{DeviceSlot, Netlist};
use crate::device::{EvalContext, PendingWrite, StateVar};
use crate::error::SimError;
use crate::ids::{DeviceId, NetId, PinId};
use crate::net::{Driver, Net, Pin};
use crate::queue::EventQueue;
use crate::time::SimTime;
use crate::waveform::WaveformRecorder;

/// Tuning knobs for a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimConfig {
    /// Maximum delta cycles at one timestamp before the run is aborted.
    pub max_deltas: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { max_deltas: 10_000 }
    }
}

/// Totals for one `run_*` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Virtual time when control returned.
    pub final_time: SimTime,
    /// Events committed, whether or not they changed a level.
    pub events_committed: u64,
    /// Delta steps executed.
    pub delta_steps: u64,
    /// Committed events that changed a net's level.
    pub level_changes: u64,
}

/// A committed level change reported to watchers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Change {
    /// When the change was committed.
    pub time: SimTime,
    /// The net that changed.
    pub net: NetId,
    /// The level before the change.
    pub previous: Logic,
    /// The new level.
    pub level: Logic,
}

type Watcher = Box<dyn FnMut(&Change)>;

#[derive(Clone, Copy, Debug, Default)]
struct Counters {
    events_committed: u64,
    delta_steps: u64,
    level_changes: u64,
}

/// A running simulation of one netlist.
pub struct Simulator {
    name: String,
    interner: Interner,
    nets: Arena<NetId, Net>,
    pins: Arena<PinId, Pin>,
    devices: Arena<DeviceId, DeviceSlot>,
    pin_names: HashMap<Ident, PinId>,
    net_names: HashMap<Ident, NetId>,
    device_names: HashMap<Ident, DeviceId>,
    queue: EventQueue,
    now: SimTime,
    config: SimConfig,
    watchers: Vec<(NetId, Watcher)>,
    recorder: Option<Box<dyn WaveformRecorder>>,
    counters: Counters,
}

impl Simulator {
    /// Creates a simulator and runs every device's reset hook at time zero.
    ///
    /// Writes issued by reset hooks are queued but not committed; the first
    /// call to [`advance`](Self::advance) commits them.
    pub fn new(netlist: Netlist, config: SimConfig) -> Result<Self, SimError> {
        let mut sim = Self {
            name: netlist.name,
            interner: netlist.interner,
            nets: netlist.nets,
            pins: netlist.pins,
            devices: netlist.devices,
            pin_names: netlist.pin_names,
            net_names: netlist.net_names,
            device_names: netlist.device_names,
            queue: EventQueue::new(),
            now: SimTime::zero(),
            config,
            watchers: Vec::new(),
            recorder: None,
            counters: Counters::default(),
        };

        let no_changes = HashSet::new();
        let mut writes = Vec::new();
        for (id, slot) in sim.devices.iter_mut() {
            let mut ctx = EvalContext::new(
                sim.now,
                id,
                &sim.nets,
                &sim.pins,
                &sim.interner,
                &no_changes,
            );
            slot.device
                .reset(&mut ctx)
                .map_err(|e| device_failed(&sim.interner, slot, sim.now, e))?;
            writes.extend(ctx.into_writes());
        }
        sim.enqueue(writes);

        debug!(
            netlist = %sim.name,
            devices = sim.devices.len(),
            pending = sim.queue.len(),
            "simulator initialized"
        );
        Ok(sim)
    }

    /// The netlist name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current virtual time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of live events waiting to be committed.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Returns the committed level of a net.
    pub fn read(&self, net: NetId) -> Logic {
        self.nets[net].level
    }

    /// Returns the committed level of the net a pin is bound to.
    pub fn read_pin(&self, pin: PinId) -> Logic {
        self.nets[self.pins[pin].net].level
    }

    /// Reads pins as an unsigned word, LSB first; `None` if any bit is `X`/`Z`.
    pub fn read_word(&self, pins: &[PinId]) -> Option<u64> {
        pins.iter().enumerate().try_fold(0u64, |acc, (bit, &pin)| {
            self.read_pin(pin)
                .to_bool()
                .map(|set| acc | (u64::from(set) << bit))
        })
    }

    /// Resolves a pin or alias name.
    pub fn pin(&self, name: &str) -> Result<PinId, SimError> {
        self.interner
            .get(name)
            .and_then(|id| self.pin_names.get(&id).copied())
            .ok_or_else(|| SimError::UnknownPin(name.to_string()))
    }

    /// Resolves a net name.
    pub fn net(&self, name: &str) -> Result<NetId, SimError> {
        self.interner
            .get(name)
            .and_then(|id| self.net_names.get(&id).copied())
            .ok_or_else(|| SimError::UnknownNet(name.to_string()))
    }

    /// Resolves a device name.
    pub fn device(&self, name: &str) -> Option<DeviceId> {
        self.interner
            .get(name)
            .and_then(|id| self.device_names.get(&id).copied())
    }

    /// Returns the net a pin is bound to.
    pub fn net_of(&self, pin: PinId) -> NetId {
        self.pins[pin].net
    }

    /// The name of a net.
    pub fn net_name(&self, net: NetId) -> &str {
        self.interner.resolve(self.nets[net].name)
    }

    /// The qualified name of a pin.
    pub fn pin_name(&self, pin: PinId) -> &str {
        self.interner.resolve(self.pins[pin].name)
    }

    /// Iterates over all nets in declaration order.
    pub fn nets(&self) -> impl Iterator<Item = NetId> + '_ {
        self.nets.ids()
    }

    /// The type name of a device.
    pub fn device_type(&self, device: DeviceId) -> &'static str {
        self.devices[device].device.type_name()
    }

    /// The named internal state of a device.
    pub fn device_state(&self, device: DeviceId) -> Vec<StateVar> {
        self.devices[device].device.state_vars()
    }

    /// Schedules `level` on the pin's net after `delay_fs`.
    ///
    /// This is how external code drives top-level inputs. A zero delay
    /// commits on the next delta cycle.
    pub fn write(&mut self, pin: PinId, level: Logic, delay_fs: u64) {
        let net = self.pins[pin].net;
        self.write_net(net, level, delay_fs);
    }

    /// Schedules `level` on `net` after `delay_fs`.
    pub fn write_net(&mut self, net: NetId, level: Logic, delay_fs: u64) {
        let at = self.now.after(delay_fs);
        self.queue.schedule(at, net, Driver::External, level);
    }

    /// Schedules `level` on `net` at an absolute time.
    ///
    /// Fails with [`SimError::ScheduleInPast`] if `at` is before now.
    pub fn schedule_at(&mut self, net: NetId, level: Logic, at: SimTime) -> Result<(), SimError> {
        if at < self.now {
            return Err(SimError::ScheduleInPast { at, now: self.now });
        }
        self.queue.schedule(at, net, Driver::External, level);
        Ok(())
    }

    /// Registers a callback invoked synchronously for every committed change
    /// on `net`.
    pub fn watch<F>(&mut self, net: NetId, callback: F)
    where
        F: FnMut(&Change) + 'static,
    {
        self.watchers.push((net, Box::new(callback)));
    }

    /// Registers a callback for the net a pin is bound to.
    pub fn watch_pin<F>(&mut self, pin: PinId, callback: F)
    where
        F: FnMut(&Change) + 'static,
    {
        let net = self.pins[pin].net;
        self.watch(net, callback);
    }

    /// Attaches a waveform recorder and dumps the current level of every net.
    pub fn set_recorder(&mut self, mut recorder: Box<dyn WaveformRecorder>) -> Result<(), SimError> {
        recorder.begin_scope(&self.name)?;
        for (id, net) in self.nets.iter() {
            recorder.register_net(id, self.interner.resolve(net.name))?;
        }
        recorder.end_scope()?;
        for (id, net) in self.nets.iter() {
            recorder.record_change(self.now.fs, id, net.level)?;
        }
        self.recorder = Some(recorder);
        Ok(())
    }

    /// Flushes and detaches the waveform recorder, if any.
    pub fn finish_recording(&mut self) -> Result<(), SimError> {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.finalize()?;
        }
        Ok(())
    }

    /// Executes one delta step and returns the nets whose level changed, in
    /// commit order. Returns an empty list if nothing is pending.
    pub fn advance(&mut self) -> Result<Vec<NetId>, SimError> {
        let Some(next) = self.queue.peek_time() else {
            return Ok(Vec::new());
        };
        if next.delta > self.config.max_deltas {
            warn!(time = %next, max = self.config.max_deltas, "delta cycle limit exceeded");
            return Err(SimError::DeltaCycleLimit {
                fs: next.fs,
                max_deltas: self.config.max_deltas,
            });
        }
        debug_assert!(next >= self.now, "virtual time moved backwards");
        self.now = next;

        let events = self.queue.pop_at(next);
        let mut touched = Vec::new();
        let mut seen = HashSet::new();
        for evt in &events {
            self.nets[evt.net].drive(evt.driver, evt.level);
            if seen.insert(evt.net) {
                touched.push(evt.net);
            }
        }

        let mut changed = Vec::new();
        let mut changes = Vec::new();
        for id in touched {
            let net = &mut self.nets[id];
            let previous = net.level;
            let level = net.resolved();
            if net.commit(level, next) {
                changed.push(id);
                changes.push(Change {
                    time: next,
                    net: id,
                    previous,
                    level,
                });
            }
        }
        self.counters.events_committed += events.len() as u64;
        self.counters.level_changes += changed.len() as u64;
        self.counters.delta_steps += 1;
        trace!(time = %next, events = events.len(), changed = changed.len(), "delta step");

        self.notify(&changes)?;

        let triggered: BTreeSet<DeviceId> = changed
            .iter()
            .flat_map(|&net| self.nets[net].listeners.iter().copied())
            .collect();
        let changed_set: HashSet<NetId> = changed.iter().copied().collect();

        let mut writes = Vec::new();
        for id in triggered {
            let slot = &mut self.devices[id];
            let mut ctx = EvalContext::new(
                next,
                id,
                &self.nets,
                &self.pins,
                &self.interner,
                &changed_set,
            );
            if let Err(e) = slot.device.evaluate(&mut ctx) {
                let err = device_failed(&self.interner, slot, next, e);
                warn!(error = %err, "device evaluation failed");
                return Err(err);
            }
            writes.extend(ctx.into_writes());
        }
        self.enqueue(writes);

        Ok(changed)
    }

    /// Runs until no events remain.
    ///
    /// A netlist with a free-running clock never goes idle; use
    /// [`run_for`](Self::run_for) for those.
    pub fn run_until_idle(&mut self) -> Result<RunSummary, SimError> {
        let start = self.counters;
        while !self.queue.is_empty() {
            self.advance()?;
        }
        Ok(self.summary(start))
    }

    /// Runs every event up to and including `now + duration_fs`, then moves
    /// virtual time to that bound.
    pub fn run_for(&mut self, duration_fs: u64) -> Result<RunSummary, SimError> {
        let start = self.counters;
        let bound = self.now.fs.saturating_add(duration_fs);
        while let Some(next) = self.queue.peek_time() {
            if next.fs > bound {
                break;
            }
            self.advance()?;
        }
        if self.now.fs < bound {
            self.now = self.now.advance_to(bound);
        }
        Ok(self.summary(start))
    }

    fn summary(&self, start: Counters) -> RunSummary {
        let summary = RunSummary {
            final_time: self.now,
            events_committed: self.counters.events_committed - start.events_committed,
            delta_steps: self.counters.delta_steps - start.delta_steps,
            level_changes: self.counters.level_changes - start.level_changes,
        };
        debug!(
            time = %summary.final_time,
            events = summary.events_committed,
            deltas = summary.delta_steps,
            pending = self.queue.len(),
            "run finished"
        );
        summary
    }

    fn notify(&mut self, changes: &[Change]) -> Result<(), SimError> {
        for change in changes {
            for (net, callback) in self.watchers.iter_mut() {
                if *net == change.net {
                    callback(change);
                }
            }
            if let Some(recorder) = &mut self.recorder {
                recorder.record_change(change.time.fs, change.net, change.level)?;
            }
        }
        Ok(())
    }

    fn enqueue(&mut self, writes: Vec<PendingWrite>) {
        for write in writes {
            let at = self.now.after(write.delay_fs);
            self.queue
                .schedule(at, write.net, Driver::Pin(write.pin), write.level);
        }
    }
}

fn device_failed(interner: &Interner, slot: &DeviceSlot, time: SimTime, source: SimError) -> SimError {
    SimError::DeviceFailed {
        device: interner.resolve(slot.name).to_string(),
        time,
        source: Box::new(source),
    }
}
