//! Configuration types deserialized from `netlist.toml`.

use nlsim_common::{parse_duration, Frequency, Logic};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// Default delta-cycle limit per timestamp.
pub const DEFAULT_MAX_DELTAS: u32 = 10_000;

/// A complete netlist description.
#[derive(Debug, Deserialize)]
pub struct NetlistConfig {
    /// Name and description.
    pub netlist: NetlistMeta,
    /// Scheduler settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Device instances, in evaluation order.
    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceConfig>,
    /// Nets and the pins bound to them.
    #[serde(default, rename = "net")]
    pub nets: Vec<NetConfig>,
    /// External writes applied before the run.
    #[serde(default, rename = "stimulus")]
    pub stimuli: Vec<StimulusConfig>,
    /// Pins whose level changes are reported.
    #[serde(default, rename = "probe")]
    pub probes: Vec<ProbeConfig>,
}

/// The `[netlist]` table.
#[derive(Debug, Deserialize)]
pub struct NetlistMeta {
    /// The netlist name, used as the waveform scope.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// The `[simulation]` table.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Maximum delta cycles per timestamp.
    #[serde(default = "default_max_deltas")]
    pub max_deltas: u32,
    /// How long to run, in femtoseconds. Without a limit the run stops when
    /// no events remain.
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub time_limit: Option<u64>,
    /// Path of a VCD file to write.
    #[serde(default)]
    pub vcd: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_deltas: DEFAULT_MAX_DELTAS,
            time_limit: None,
            vcd: None,
        }
    }
}

fn default_max_deltas() -> u32 {
    DEFAULT_MAX_DELTAS
}

/// One `[[device]]` entry.
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    /// Instance name; prefixes all of the device's pins.
    pub name: String,
    /// Library type name, e.g. `ROM_TMS4800_DIP`.
    #[serde(rename = "type")]
    pub device_type: String,
    /// ROM output delay in femtoseconds.
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub output_delay: Option<u64>,
    /// ROM latch delay in femtoseconds.
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub latch_delay: Option<u64>,
    /// Clock frequency.
    #[serde(default, deserialize_with = "deserialize_opt_frequency")]
    pub frequency: Option<Frequency>,
    /// Gate input count.
    #[serde(default)]
    pub inputs: Option<usize>,
    /// Gate propagation delay in femtoseconds.
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub delay: Option<u64>,
    /// ROM contents.
    #[serde(default)]
    pub rom: Option<RomConfig>,
}

/// The `[device.rom]` table.
#[derive(Debug, Default, Deserialize)]
pub struct RomConfig {
    /// How the array is filled.
    #[serde(default)]
    pub fill: RomFill,
    /// Word used by [`RomFill::Constant`].
    #[serde(default)]
    pub value: u8,
    /// Words used by [`RomFill::Bytes`], from address 0.
    #[serde(default)]
    pub bytes: Vec<u8>,
}

/// ROM fill pattern.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RomFill {
    /// Every word is `value`.
    #[default]
    Constant,
    /// Each word holds the low 8 bits of its address.
    Index,
    /// Words come from `bytes`; the rest are zero.
    Bytes,
}

/// One `[[net]]` entry.
#[derive(Debug, Deserialize)]
pub struct NetConfig {
    /// Net name.
    pub name: String,
    /// Pins or aliases bound to the net (`"rom.24"` or `["rom.24", "u1.Q"]`).
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub pins: Vec<String>,
    /// Whether several outputs may drive the net.
    #[serde(default)]
    pub bus: bool,
}

/// One `[[stimulus]]` entry.
#[derive(Debug, Deserialize)]
pub struct StimulusConfig {
    /// Absolute commit time in femtoseconds.
    #[serde(deserialize_with = "deserialize_duration")]
    pub at: u64,
    /// Target pin or alias.
    pub pin: String,
    /// Level to write.
    #[serde(deserialize_with = "deserialize_level")]
    pub level: Logic,
}

/// One `[[probe]]` entry.
#[derive(Debug, Deserialize)]
pub struct ProbeConfig {
    /// Pin or alias to report.
    pub pin: String,
    /// Display label; defaults to the pin name.
    #[serde(default)]
    pub label: Option<String>,
}

impl ProbeConfig {
    /// The label to print for this probe.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.pin)
    }
}

/// Deserializes a field that can be either a single string or a list of strings.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Deserializes a duration string such as `"450ns"` into femtoseconds.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration(deserializer).map(Some)
}

fn deserialize_opt_frequency<'de, D>(deserializer: D) -> Result<Option<Frequency>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map(Some).map_err(de::Error::custom)
}

/// Deserializes a logic level written as `"1"`, `"z"`, `"high"`, `1` or `true`.
fn deserialize_level<'de, D>(deserializer: D) -> Result<Logic, D::Error>
where
    D: Deserializer<'de>,
{
    struct LevelVisitor;

    impl<'de> Visitor<'de> for LevelVisitor {
        type Value = Logic;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a logic level (0, 1, x, z, low, high)")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Logic::parse(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            match v {
                0 => Ok(Logic::Zero),
                1 => Ok(Logic::One),
                _ => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
            }
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Logic::from_bool(v))
        }
    }

    deserializer.deserialize_any(LevelVisitor)
}
