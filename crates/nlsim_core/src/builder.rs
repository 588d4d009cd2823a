//! Netlist construction: devices, pins, nets, wiring and aliases.
//!
//! All structure is declared through a [`NetlistBuilder`] before simulation
//! starts. [`NetlistBuilder::build`] validates the wiring and consumes the
//! builder, so a running [`Simulator`](crate::kernel::Simulator) can never be
//! rewired.
//!
//! Names are hierarchical and dot-separated. A device `rom` with pin `AR` owns
//! the pin `rom.AR`. Sub-circuits are built inside a [`Scope`] that prefixes
//! every name, and may publish [aliases](Scope::alias) for internal pins under
//! their own names, e.g. `rom.13` for `rom.A.AR`.

use std::collections::{HashMap, HashSet};
use std::fmt;

use nlsim_common::{Arena, Ident, Interner};
use tracing::debug;

use crate::device::Device;
use crate::error::BuildError;
use crate::ids::{DeviceId, NetId, PinId};
use crate::net::{Net, Pin, PinDirection, Rail, Sensitivity};
use crate::rails::ConstantSource;

/// A reusable sub-network with its own external pin naming.
///
/// Implementors add their internal devices to the scope and publish aliases
/// for the pins they expose. The returned handle lets the caller reach the
/// internals (typically the `DeviceId` of the core device).
pub trait Subcircuit {
    /// What [`build`](Subcircuit::build) hands back to the caller.
    type Handle;

    /// Adds the sub-network to `scope`.
    fn build(self, scope: &mut Scope<'_>) -> Result<Self::Handle, BuildError>;
}

#[derive(Debug)]
struct PinDecl {
    name: Ident,
    device: DeviceId,
    direction: PinDirection,
    sensitivity: Sensitivity,
    net: Option<NetId>,
    rail: Option<Rail>,
    follows: Option<PinId>,
}

struct DeviceDecl {
    name: Ident,
    device: Option<Box<dyn Device>>,
}

/// Mutable netlist under construction.
pub struct NetlistBuilder {
    name: String,
    interner: Interner,
    nets: Arena<NetId, Net>,
    pins: Arena<PinId, PinDecl>,
    devices: Arena<DeviceId, DeviceDecl>,
    pin_names: HashMap<Ident, PinId>,
    net_names: HashMap<Ident, NetId>,
    device_names: HashMap<Ident, DeviceId>,
    scopes: HashSet<Ident>,
    alias_count: usize,
}

impl NetlistBuilder {
    /// Creates an empty netlist called `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interner: Interner::new(),
            nets: Arena::new(),
            pins: Arena::new(),
            devices: Arena::new(),
            pin_names: HashMap::new(),
            net_names: HashMap::new(),
            device_names: HashMap::new(),
            scopes: HashSet::new(),
            alias_count: 0,
        }
    }

    /// The netlist name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a net that accepts a single driver.
    pub fn add_net(&mut self, name: &str) -> Result<NetId, BuildError> {
        self.declare_net(name, false)
    }

    /// Declares a net that accepts any number of drivers (a tri-state bus).
    ///
    /// Its level resolves from every driver's last level: `Z` drivers yield
    /// and conflicting driven levels give `X`.
    pub fn add_bus_net(&mut self, name: &str) -> Result<NetId, BuildError> {
        self.declare_net(name, true)
    }

    /// Adds a device. `make` registers the device's pins and returns it.
    pub fn add_device<D, F>(&mut self, name: &str, make: F) -> Result<DeviceId, BuildError>
    where
        D: Device + 'static,
        F: FnOnce(&mut PinRegistrar<'_>) -> Result<D, BuildError>,
    {
        self.declare_device(name.to_string(), make)
    }

    /// Adds a sub-circuit whose names are prefixed with `name`.
    pub fn add_subcircuit<S: Subcircuit>(
        &mut self,
        name: &str,
        subcircuit: S,
    ) -> Result<S::Handle, BuildError> {
        self.declare_subcircuit(name.to_string(), subcircuit)
    }

    /// Publishes `pin` under an additional name.
    pub fn alias(&mut self, name: &str, pin: PinId) -> Result<(), BuildError> {
        self.declare_alias(name, pin)
    }

    /// Returns a scope that prefixes every name with `prefix`.
    pub fn scope(&mut self, prefix: &str) -> Scope<'_> {
        Scope {
            builder: self,
            prefix: prefix.to_string(),
        }
    }

    /// Resolves a pin or alias name.
    pub fn pin(&self, name: &str) -> Option<PinId> {
        self.interner
            .get(name)
            .and_then(|id| self.pin_names.get(&id).copied())
    }

    /// Resolves a pin or alias name, failing with [`BuildError::UnknownPin`].
    pub fn require_pin(&self, name: &str) -> Result<PinId, BuildError> {
        self.pin(name)
            .ok_or_else(|| BuildError::UnknownPin(name.to_string()))
    }

    /// Resolves a net name.
    pub fn net(&self, name: &str) -> Option<NetId> {
        self.interner
            .get(name)
            .and_then(|id| self.net_names.get(&id).copied())
    }

    /// Resolves a device name.
    pub fn device(&self, name: &str) -> Option<DeviceId> {
        self.interner
            .get(name)
            .and_then(|id| self.device_names.get(&id).copied())
    }

    /// Binds `pin` to `net`.
    ///
    /// Binding a pin twice to the same net is a no-op; binding it to a
    /// different net, or adding a second output to a non-bus net, fails.
    pub fn connect(&mut self, pin: PinId, net: NetId) -> Result<(), BuildError> {
        let decl = &self.pins[pin];
        if let Some(bound) = decl.net {
            if bound == net {
                return Ok(());
            }
            return Err(BuildError::AlreadyBound {
                pin: self.interner.resolve(decl.name).to_string(),
                net: self.interner.resolve(self.nets[bound].name).to_string(),
            });
        }

        let target = &self.nets[net];
        if decl.direction == PinDirection::Output && !target.bus {
            let existing = target
                .pins
                .iter()
                .find(|&&p| self.pins[p].direction == PinDirection::Output);
            if let Some(&existing) = existing {
                return Err(BuildError::MultipleDrivers {
                    net: self.interner.resolve(target.name).to_string(),
                    existing: self.resolve_pin_name(existing).to_string(),
                    new: self.resolve_pin_name(pin).to_string(),
                });
            }
        }

        self.pins[pin].net = Some(net);
        self.nets[net].pins.push(pin);
        Ok(())
    }

    /// Binds the pin called `pin` (a pin or alias name) to `net`.
    pub fn connect_name(&mut self, pin: &str, net: NetId) -> Result<(), BuildError> {
        let pin = self.require_pin(pin)?;
        self.connect(pin, net)
    }

    /// Declares net `name` and binds every pin in `pins` to it.
    pub fn join(&mut self, name: &str, pins: &[PinId]) -> Result<NetId, BuildError> {
        let net = self.add_net(name)?;
        for &pin in pins {
            self.connect(pin, net)?;
        }
        Ok(net)
    }

    /// Validates the wiring and freezes the netlist.
    ///
    /// Unwired supply pins are tied to the global `VCC`/`GND` nets, which are
    /// created on demand together with a constant driver. Feedback pins join
    /// the net of the pin they follow. Any other unwired pin is an error.
    pub fn build(mut self) -> Result<Netlist, BuildError> {
        if let Some((_, decl)) = self.devices.iter().find(|(_, d)| d.device.is_none()) {
            return Err(BuildError::IncompleteDevice(
                self.interner.resolve(decl.name).to_string(),
            ));
        }

        let unbound: Vec<PinId> = self
            .pins
            .iter()
            .filter(|(_, decl)| decl.net.is_none())
            .map(|(id, _)| id)
            .collect();
        for pin in unbound {
            let decl = &self.pins[pin];
            let net = match (decl.rail, decl.follows) {
                (Some(rail), _) => self.rail_net(rail)?,
                (None, Some(source)) => self.pins[source].net.ok_or_else(|| {
                    BuildError::UnboundPin(self.resolve_pin_name(source).to_string())
                })?,
                (None, None) => {
                    return Err(BuildError::UnboundPin(
                        self.resolve_pin_name(pin).to_string(),
                    ))
                }
            };
            self.connect(pin, net)?;
        }

        let mut pins = Arena::new();
        for (id, decl) in self.pins.iter() {
            let Some(net) = decl.net else {
                return Err(BuildError::UnboundPin(
                    self.interner.resolve(decl.name).to_string(),
                ));
            };
            if decl.direction == PinDirection::Input && decl.sensitivity == Sensitivity::Active {
                self.nets[net].listeners.push(decl.device);
            }
            let allocated = pins.alloc(Pin {
                name: decl.name,
                device: decl.device,
                direction: decl.direction,
                sensitivity: decl.sensitivity,
                net,
            });
            debug_assert_eq!(allocated, id);
        }
        for (_, net) in self.nets.iter_mut() {
            net.listeners.sort_unstable();
            net.listeners.dedup();
        }

        let mut devices = Arena::new();
        for (_, decl) in self.devices.iter_mut() {
            if let Some(device) = decl.device.take() {
                devices.alloc(DeviceSlot {
                    name: decl.name,
                    device,
                });
            }
        }

        debug!(
            netlist = %self.name,
            devices = devices.len(),
            nets = self.nets.len(),
            pins = pins.len(),
            aliases = self.alias_count,
            "netlist built"
        );

        Ok(Netlist {
            name: self.name,
            interner: self.interner,
            nets: self.nets,
            pins,
            devices,
            pin_names: self.pin_names,
            net_names: self.net_names,
            device_names: self.device_names,
        })
    }

    fn rail_net(&mut self, rail: Rail) -> Result<NetId, BuildError> {
        if let Some(net) = self.net(rail.net_name()) {
            return Ok(net);
        }
        debug!(rail = rail.net_name(), "creating global supply rail");
        let net = self.add_net(rail.net_name())?;
        let source_name = format!("{}_source", rail.net_name());
        let mut out = None;
        self.add_device(&source_name, |pins| {
            let q = pins.output("Q")?;
            out = Some(q);
            Ok(ConstantSource::new(q, rail.level()))
        })?;
        if let Some(q) = out {
            self.connect(q, net)?;
        }
        Ok(net)
    }

    fn declare_net(&mut self, name: &str, bus: bool) -> Result<NetId, BuildError> {
        let ident = self.interner.get_or_intern(name);
        if self.net_names.contains_key(&ident) {
            return Err(BuildError::DuplicateName(name.to_string()));
        }
        let id = self.nets.alloc(Net::new(ident, bus));
        self.net_names.insert(ident, id);
        Ok(id)
    }

    fn declare_device<D, F>(&mut self, name: String, make: F) -> Result<DeviceId, BuildError>
    where
        D: Device + 'static,
        F: FnOnce(&mut PinRegistrar<'_>) -> Result<D, BuildError>,
    {
        let ident = self.interner.get_or_intern(&name);
        if self.device_names.contains_key(&ident) || self.scopes.contains(&ident) {
            return Err(BuildError::DuplicateName(name));
        }
        let id = self.devices.alloc(DeviceDecl {
            name: ident,
            device: None,
        });
        self.device_names.insert(ident, id);

        let mut registrar = PinRegistrar {
            builder: &mut *self,
            device: id,
            prefix: name,
        };
        let device = make(&mut registrar)?;
        self.devices[id].device = Some(Box::new(device));
        Ok(id)
    }

    fn declare_subcircuit<S: Subcircuit>(
        &mut self,
        prefix: String,
        subcircuit: S,
    ) -> Result<S::Handle, BuildError> {
        let ident = self.interner.get_or_intern(&prefix);
        if self.device_names.contains_key(&ident) || !self.scopes.insert(ident) {
            return Err(BuildError::DuplicateName(prefix));
        }
        let mut scope = Scope {
            builder: &mut *self,
            prefix,
        };
        subcircuit.build(&mut scope)
    }

    fn declare_pin(
        &mut self,
        name: &str,
        device: DeviceId,
        direction: PinDirection,
        sensitivity: Sensitivity,
        rail: Option<Rail>,
        follows: Option<PinId>,
    ) -> Result<PinId, BuildError> {
        let ident = self.interner.get_or_intern(name);
        if self.pin_names.contains_key(&ident) {
            return Err(BuildError::DuplicateName(name.to_string()));
        }
        let id = self.pins.alloc(PinDecl {
            name: ident,
            device,
            direction,
            sensitivity,
            net: None,
            rail,
            follows,
        });
        self.pin_names.insert(ident, id);
        Ok(id)
    }

    fn declare_alias(&mut self, name: &str, pin: PinId) -> Result<(), BuildError> {
        if self.pins.try_get(pin).is_none() {
            return Err(BuildError::UnknownPin(name.to_string()));
        }
        let ident = self.interner.get_or_intern(name);
        if self.pin_names.contains_key(&ident) {
            return Err(BuildError::DuplicateName(name.to_string()));
        }
        self.pin_names.insert(ident, pin);
        self.alias_count += 1;
        Ok(())
    }

    fn resolve_pin_name(&self, pin: PinId) -> &str {
        self.interner.resolve(self.pins[pin].name)
    }
}

/// Registers the pins of the device currently being added.
///
/// Pin names are qualified with the device name.
pub struct PinRegistrar<'b> {
    builder: &'b mut NetlistBuilder,
    device: DeviceId,
    prefix: String,
}

impl PinRegistrar<'_> {
    /// The qualified name of the device being added.
    pub fn device_name(&self) -> &str {
        &self.prefix
    }

    /// The ID of the device being added.
    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// An input whose changes re-evaluate the device.
    pub fn input(&mut self, name: &str) -> Result<PinId, BuildError> {
        self.pin(name, PinDirection::Input, Sensitivity::Active, None, None)
    }

    /// An input the device only samples; changes do not trigger it.
    pub fn passive_input(&mut self, name: &str) -> Result<PinId, BuildError> {
        self.pin(name, PinDirection::Input, Sensitivity::Passive, None, None)
    }

    /// A supply input; tied to the global `rail` net if left unwired.
    pub fn supply(&mut self, name: &str, rail: Rail) -> Result<PinId, BuildError> {
        self.pin(name, PinDirection::Input, Sensitivity::Active, Some(rail), None)
    }

    /// An active input bound to whatever net `source` ends up on.
    ///
    /// Used by self-timed devices such as clocks, which re-trigger on their
    /// own output.
    pub fn feedback(&mut self, name: &str, source: PinId) -> Result<PinId, BuildError> {
        self.pin(name, PinDirection::Input, Sensitivity::Active, None, Some(source))
    }

    /// An output the device drives.
    pub fn output(&mut self, name: &str) -> Result<PinId, BuildError> {
        self.pin(name, PinDirection::Output, Sensitivity::Passive, None, None)
    }

    /// Registers several active inputs at once.
    pub fn inputs(&mut self, names: &[&str]) -> Result<Vec<PinId>, BuildError> {
        names.iter().map(|name| self.input(name)).collect()
    }

    /// Registers several passive inputs at once.
    pub fn passive_inputs(&mut self, names: &[&str]) -> Result<Vec<PinId>, BuildError> {
        names.iter().map(|name| self.passive_input(name)).collect()
    }

    /// Registers several outputs at once.
    pub fn outputs(&mut self, names: &[&str]) -> Result<Vec<PinId>, BuildError> {
        names.iter().map(|name| self.output(name)).collect()
    }

    /// Declares a net private to this device, e.g. a feedback path.
    pub fn internal_net(&mut self, name: &str) -> Result<NetId, BuildError> {
        let qualified = format!("{}.{name}", self.prefix);
        self.builder.add_net(&qualified)
    }

    /// Binds one of this device's pins to a net.
    pub fn connect(&mut self, pin: PinId, net: NetId) -> Result<(), BuildError> {
        self.builder.connect(pin, net)
    }

    /// Builds an [`BuildError::InvalidParameter`] for this device.
    pub fn invalid(&self, reason: impl Into<String>) -> BuildError {
        BuildError::InvalidParameter {
            device: self.prefix.clone(),
            reason: reason.into(),
        }
    }

    fn pin(
        &mut self,
        name: &str,
        direction: PinDirection,
        sensitivity: Sensitivity,
        rail: Option<Rail>,
        follows: Option<PinId>,
    ) -> Result<PinId, BuildError> {
        let qualified = format!("{}.{name}", self.prefix);
        self.builder.declare_pin(
            &qualified,
            self.device,
            direction,
            sensitivity,
            rail,
            follows,
        )
    }
}

/// A name-prefixing view of the builder, used to build sub-circuits.
pub struct Scope<'b> {
    builder: &'b mut NetlistBuilder,
    prefix: String,
}

impl Scope<'_> {
    /// The prefix applied to every name declared in this scope.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Adds a device named `<prefix>.<name>`.
    pub fn add_device<D, F>(&mut self, name: &str, make: F) -> Result<DeviceId, BuildError>
    where
        D: Device + 'static,
        F: FnOnce(&mut PinRegistrar<'_>) -> Result<D, BuildError>,
    {
        let qualified = self.qualify(name);
        self.builder.declare_device(qualified, make)
    }

    /// Adds a nested sub-circuit named `<prefix>.<name>`.
    pub fn add_subcircuit<S: Subcircuit>(
        &mut self,
        name: &str,
        subcircuit: S,
    ) -> Result<S::Handle, BuildError> {
        let qualified = self.qualify(name);
        self.builder.declare_subcircuit(qualified, subcircuit)
    }

    /// Declares a net named `<prefix>.<name>`.
    pub fn add_net(&mut self, name: &str) -> Result<NetId, BuildError> {
        let qualified = self.qualify(name);
        self.builder.add_net(&qualified)
    }

    /// Publishes an internal pin as `<prefix>.<name>`.
    pub fn alias(&mut self, name: &str, pin: PinId) -> Result<(), BuildError> {
        let qualified = self.qualify(name);
        self.builder.declare_alias(&qualified, pin)
    }

    /// Publishes the pin called `<prefix>.<target>` as `<prefix>.<name>`.
    pub fn alias_name(&mut self, name: &str, target: &str) -> Result<PinId, BuildError> {
        let pin = self.pin(target)?;
        self.alias(name, pin)?;
        Ok(pin)
    }

    /// Resolves `<prefix>.<name>` to a pin.
    pub fn pin(&self, name: &str) -> Result<PinId, BuildError> {
        self.builder.require_pin(&self.qualify(name))
    }

    /// Binds a pin to a net.
    pub fn connect(&mut self, pin: PinId, net: NetId) -> Result<(), BuildError> {
        self.builder.connect(pin, net)
    }

    fn qualify(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.prefix)
        }
    }
}

pub(crate) struct DeviceSlot {
    pub(crate) name: Ident,
    pub(crate) device: Box<dyn Device>,
}

/// A validated, frozen netlist ready to be simulated.
pub struct Netlist {
    pub(crate) name: String,
    pub(crate) interner: Interner,
    pub(crate) nets: Arena<NetId, Net>,
    pub(crate) pins: Arena<PinId, Pin>,
    pub(crate) devices: Arena<DeviceId, DeviceSlot>,
    pub(crate) pin_names: HashMap<Ident, PinId>,
    pub(crate) net_names: HashMap<Ident, NetId>,
    pub(crate) device_names: HashMap<Ident, DeviceId>,
}

impl fmt::Debug for Netlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Netlist")
            .field("name", &self.name)
            .field("nets", &self.nets.len())
            .field("pins", &self.pins.len())
            .field("devices", &self.devices.len())
            .finish_non_exhaustive()
    }
}

impl Netlist {
    /// The netlist name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of nets, including global supply rails.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Number of pins.
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Number of devices, including rail drivers.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Resolves a pin or alias name.
    pub fn pin(&self, name: &str) -> Option<PinId> {
        self.interner
            .get(name)
            .and_then(|id| self.pin_names.get(&id).copied())
    }

    /// Resolves a net name.
    pub fn net(&self, name: &str) -> Option<NetId> {
        self.interner
            .get(name)
            .and_then(|id| self.net_names.get(&id).copied())
    }

    /// Returns the net a pin is bound to.
    pub fn net_of(&self, pin: PinId) -> NetId {
        self.pins[pin].net
    }

    /// Resolves a device name.
    pub fn device(&self, name: &str) -> Option<DeviceId> {
        self.interner
            .get(name)
            .and_then(|id| self.device_names.get(&id).copied())
    }

    /// The qualified name of a pin.
    pub fn pin_name(&self, pin: PinId) -> &str {
        self.interner.resolve(self.pins[pin].name)
    }

    /// The name of a net.
    pub fn net_name(&self, net: NetId) -> &str {
        self.interner.resolve(self.nets[net].name)
    }

    /// The devices with an active input on `net`.
    pub fn listeners(&self, net: NetId) -> &[DeviceId] {
        &self.nets[net].listeners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::EvalContext;
    use crate::error::SimError;

    struct Probe;

    impl Device for Probe {
        fn type_name(&self) -> &'static str {
            "PROBE"
        }

        fn evaluate(&mut self, _ctx: &mut EvalContext<'_>) -> Result<(), SimError> {
            Ok(())
        }
    }

    fn buffer(builder: &mut NetlistBuilder, name: &str) -> (PinId, PinId) {
        let mut pins = (None, None);
        builder
            .add_device(name, |r| {
                pins = (Some(r.input("A")?), Some(r.output("Q")?));
                Ok(Probe)
            })
            .unwrap();
        (pins.0.unwrap(), pins.1.unwrap())
    }

    #[test]
    fn pins_are_qualified_by_device() {
        let mut b = NetlistBuilder::new("t");
        let (a, q) = buffer(&mut b, "buf");
        assert_eq!(b.pin("buf.A"), Some(a));
        assert_eq!(b.pin("buf.Q"), Some(q));
        assert_eq!(b.pin("buf.B"), None);
        assert!(b.device("buf").is_some());
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut b = NetlistBuilder::new("t");
        buffer(&mut b, "buf");
        let err = b.add_device("buf", |_| Ok(Probe)).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateName(n) if n == "buf"));
        b.add_net("n").unwrap();
        assert!(matches!(
            b.add_net("n"),
            Err(BuildError::DuplicateName(_))
        ));
    }

    #[test]
    fn unbound_pin_fails_build() {
        let mut b = NetlistBuilder::new("t");
        let (a, _q) = buffer(&mut b, "buf");
        b.join("in", &[a]).unwrap();
        let err = b.build().err().unwrap();
        assert!(matches!(err, BuildError::UnboundPin(p) if p == "buf.Q"));
    }

    #[test]
    fn second_driver_rejected_on_plain_net() {
        let mut b = NetlistBuilder::new("t");
        let (_, q1) = buffer(&mut b, "b1");
        let (_, q2) = buffer(&mut b, "b2");
        let net = b.add_net("shared").unwrap();
        b.connect(q1, net).unwrap();
        let err = b.connect(q2, net).unwrap_err();
        assert!(matches!(
            err,
            BuildError::MultipleDrivers { ref existing, ref new, .. }
                if existing == "b1.Q" && new == "b2.Q"
        ));
    }

    #[test]
    fn bus_net_accepts_several_drivers() {
        let mut b = NetlistBuilder::new("t");
        let (_, q1) = buffer(&mut b, "b1");
        let (_, q2) = buffer(&mut b, "b2");
        let bus = b.add_bus_net("bus").unwrap();
        b.connect(q1, bus).unwrap();
        b.connect(q2, bus).unwrap();
    }

    #[test]
    fn netlist_debug_lists_table_sizes() {
        let mut b = NetlistBuilder::new("t");
        let (a, q) = buffer(&mut b, "buf");
        b.join("in", &[a]).unwrap();
        b.join("out", &[q]).unwrap();
        let netlist = b.build().unwrap();
        assert_eq!(
            format!("{netlist:?}"),
            "Netlist { name: \"t\", nets: 2, pins: 2, devices: 1, .. }"
        );
    }

    #[test]
    fn rebinding_to_other_net_rejected() {
        let mut b = NetlistBuilder::new("t");
        let (a, _) = buffer(&mut b, "buf");
        let n1 = b.add_net("n1").unwrap();
        let n2 = b.add_net("n2").unwrap();
        b.connect(a, n1).unwrap();
        b.connect(a, n1).unwrap();
        assert!(matches!(
            b.connect(a, n2),
            Err(BuildError::AlreadyBound { .. })
        ));
    }

    #[test]
    fn supply_pins_fall_back_to_rails() {
        let mut b = NetlistBuilder::new("t");
        b.add_device("chip", |r| {
            r.supply("VCC", Rail::Vcc)?;
            r.supply("GND", Rail::Gnd)?;
            Ok(Probe)
        })
        .unwrap();
        let netlist = b.build().unwrap();
        let vcc = netlist.net("VCC").unwrap();
        let gnd = netlist.net("GND").unwrap();
        assert_eq!(netlist.net_of(netlist.pin("chip.VCC").unwrap()), vcc);
        assert_eq!(netlist.net_of(netlist.pin("chip.GND").unwrap()), gnd);
        assert!(netlist.device("VCC_source").is_some());
        assert!(netlist.device("GND_source").is_some());
        assert_eq!(netlist.device_count(), 3);
    }

    #[test]
    fn feedback_pin_joins_source_net() {
        let mut b = NetlistBuilder::new("t");
        let mut q = None;
        let dev = b
            .add_device("osc", |r| {
                let out = r.output("Q")?;
                r.feedback("FB", out)?;
                q = Some(out);
                Ok(Probe)
            })
            .unwrap();
        let net = b.join("clk", &[q.unwrap()]).unwrap();
        let netlist = b.build().unwrap();
        assert_eq!(netlist.net_of(netlist.pin("osc.FB").unwrap()), net);
        assert_eq!(netlist.listeners(net), &[dev]);
    }

    #[test]
    fn feedback_on_unbound_source_fails() {
        let mut b = NetlistBuilder::new("t");
        b.add_device("osc", |r| {
            let out = r.output("Q")?;
            r.feedback("FB", out)?;
            Ok(Probe)
        })
        .unwrap();
        assert!(matches!(
            b.build(),
            Err(BuildError::UnboundPin(p)) if p == "osc.Q"
        ));
    }

    #[test]
    fn listeners_only_include_active_inputs() {
        let mut b = NetlistBuilder::new("t");
        let mut pins = Vec::new();
        let dev = b
            .add_device("d", |r| {
                pins.push(r.input("A")?);
                pins.push(r.passive_input("B")?);
                Ok(Probe)
            })
            .unwrap();
        let na = b.join("na", &[pins[0]]).unwrap();
        let nb = b.join("nb", &[pins[1]]).unwrap();
        let netlist = b.build().unwrap();
        assert_eq!(netlist.listeners(na), &[dev]);
        assert!(netlist.listeners(nb).is_empty());
    }

    struct Wrapper;

    impl Subcircuit for Wrapper {
        type Handle = DeviceId;

        fn build(self, scope: &mut Scope<'_>) -> Result<DeviceId, BuildError> {
            let mut a = None;
            let id = scope.add_device("core", |r| {
                a = Some(r.input("A")?);
                r.output("Q")?;
                Ok(Probe)
            })?;
            if let Some(a) = a {
                scope.alias("1", a)?;
            }
            scope.alias_name("2", "core.Q")?;
            Ok(id)
        }
    }

    #[test]
    fn subcircuit_aliases_resolve_to_internal_pins() {
        let mut b = NetlistBuilder::new("t");
        let core = b.add_subcircuit("u1", Wrapper).unwrap();
        assert_eq!(b.device("u1.core"), Some(core));
        assert_eq!(b.pin("u1.1"), b.pin("u1.core.A"));
        assert_eq!(b.pin("u1.2"), b.pin("u1.core.Q"));

        let n = b.add_net("in").unwrap();
        b.connect_name("u1.1", n).unwrap();
        let out = b.add_net("out").unwrap();
        b.connect_name("u1.core.Q", out).unwrap();
        let netlist = b.build().unwrap();
        assert_eq!(netlist.net_of(netlist.pin("u1.core.A").unwrap()), n);
    }

    #[test]
    fn subcircuit_name_is_reserved() {
        let mut b = NetlistBuilder::new("t");
        b.add_subcircuit("u1", Wrapper).unwrap();
        assert!(matches!(
            b.add_subcircuit("u1", Wrapper),
            Err(BuildError::DuplicateName(_))
        ));
        assert!(matches!(
            b.add_device("u1", |_| Ok(Probe)),
            Err(BuildError::DuplicateName(_))
        ));
    }

    #[test]
    fn alias_cannot_shadow_pin() {
        let mut b = NetlistBuilder::new("t");
        let (a, q) = buffer(&mut b, "buf");
        b.alias("x", a).unwrap();
        assert!(matches!(
            b.alias("buf.Q", q),
            Err(BuildError::DuplicateName(_))
        ));
        assert!(matches!(b.alias("x", q), Err(BuildError::DuplicateName(_))));
    }

    #[test]
    fn failed_constructor_fails_build() {
        let mut b = NetlistBuilder::new("t");
        let err = b
            .add_device("bad", |r| -> Result<Probe, BuildError> { Err(r.invalid("no")) })
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidParameter { .. }));
        assert!(matches!(
            b.build(),
            Err(BuildError::IncompleteDevice(n)) if n == "bad"
        ));
    }
}
