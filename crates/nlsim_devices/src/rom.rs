//! TMS-4800: 16 Kbit (2048 × 8) mask-programmed read-only memory.
//!
//! ```text
//!          +----------------+
//!      VSS |1      ++     24| OE1
//!       A0 |2             23| D0
//!       A1 |3             22| D1
//!       A2 |4   TMS-4800  21| D2
//!       A3 |5             20| D3
//!       A4 |6             19| D4
//!       A5 |7             18| D5
//!       A9 |8             17| D6
//!      VGG |9             16| D7
//!       A8 |10            15| A10
//!       A7 |11            14| OE2
//!       A6 |12            13| AR
//!          +----------------+
//! ```
//!
//! The address register samples `A0..A10` on the rising edge of `AR` and
//! latches the addressed word after the latch delay. The outputs are two
//! independently enabled nibbles: `D0..D3` behind `OE1` and `D4..D7` behind
//! `OE2`. Both enables are active high.

use nlsim_core::{
    BuildError, Device, DeviceId, EvalContext, Logic, OutputGroup, PinId, PinRegistrar,
    PowerGate, Rail, Scope, SimError, StateVar, Subcircuit, FS_PER_NS,
};
use tracing::trace;

/// Number of words in the array.
pub const ROM_WORDS: usize = 2048;

/// Number of address lines.
pub const ADDRESS_BITS: usize = 11;

const ADDRESS_PINS: [&str; ADDRESS_BITS] = [
    "A0", "A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9", "A10",
];
const DATA_PINS: [&str; 8] = ["D0", "D1", "D2", "D3", "D4", "D5", "D6", "D7"];

/// Errors building a ROM image.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RomImageError {
    /// More bytes than the array holds.
    #[error("ROM image is {len} bytes, the device holds {ROM_WORDS}")]
    TooLarge {
        /// Number of bytes supplied.
        len: usize,
    },
}

/// The contents of the array.
#[derive(Clone, PartialEq, Eq)]
pub struct RomImage {
    words: Box<[u8]>,
}

impl RomImage {
    /// An image with every word set to `value`.
    pub fn filled(value: u8) -> Self {
        Self {
            words: vec![value; ROM_WORDS].into_boxed_slice(),
        }
    }

    /// An image whose word at each address is `f(address)`.
    pub fn from_fn(f: impl Fn(usize) -> u8) -> Self {
        Self {
            words: (0..ROM_WORDS).map(f).collect(),
        }
    }

    /// An image holding `bytes` from address 0; the remainder is zero.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RomImageError> {
        if bytes.len() > ROM_WORDS {
            return Err(RomImageError::TooLarge { len: bytes.len() });
        }
        let mut words = vec![0u8; ROM_WORDS];
        words[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            words: words.into_boxed_slice(),
        })
    }

    /// The word at `address`, which is taken modulo the array size.
    pub fn word(&self, address: usize) -> u8 {
        self.words[address % ROM_WORDS]
    }
}

impl Default for RomImage {
    fn default() -> Self {
        Self::filled(0)
    }
}

impl std::fmt::Debug for RomImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RomImage({} words)", self.words.len())
    }
}

/// Propagation delays of the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RomTiming {
    /// Delay from a rising `AR` until the addressed word is latched.
    pub latch_delay_fs: u64,
    /// Delay from an enable, latch or supply change to the data outputs.
    pub output_delay_fs: u64,
}

impl Default for RomTiming {
    fn default() -> Self {
        Self {
            latch_delay_fs: 0,
            output_delay_fs: 450 * FS_PER_NS,
        }
    }
}

/// Internal strobe that completes a delayed latch. `strobe` drives a private
/// net and `done` reads it back.
#[derive(Debug)]
struct LatchTimer {
    strobe: PinId,
    done: PinId,
}

/// The bare TMS-4800 core, with pins named after their function.
#[derive(Debug)]
pub struct Tms4800 {
    address: Vec<PinId>,
    ar: PinId,
    low: OutputGroup,
    high: OutputGroup,
    power: PowerGate,
    image: RomImage,
    timing: RomTiming,
    latch: Option<LatchTimer>,
    sampled: Option<u8>,
    last_data: Option<u8>,
}

impl Tms4800 {
    /// Type name used in netlist descriptions.
    pub const TYPE_NAME: &'static str = "ROM_TMS4800";

    /// Registers the device pins and returns the device.
    ///
    /// A non-zero latch delay adds a `LATCH` output and its `LATCH_DONE`
    /// feedback on a private net.
    pub fn register(
        pins: &mut PinRegistrar<'_>,
        image: RomImage,
        timing: RomTiming,
    ) -> Result<Self, BuildError> {
        let address = pins.passive_inputs(&ADDRESS_PINS)?;
        let ar = pins.input("AR")?;
        let oe1 = pins.input("OE1")?;
        let oe2 = pins.input("OE2")?;
        let data = pins.outputs(&DATA_PINS)?;
        let vcc = pins.supply("VCC", Rail::Vcc)?;
        let gnd = pins.supply("GND", Rail::Gnd)?;
        let latch = if timing.latch_delay_fs > 0 {
            let strobe = pins.output("LATCH")?;
            let done = pins.feedback("LATCH_DONE", strobe)?;
            let net = pins.internal_net("latch")?;
            pins.connect(strobe, net)?;
            Some(LatchTimer { strobe, done })
        } else {
            None
        };
        Ok(Self {
            address,
            ar,
            low: OutputGroup::new(data[..4].to_vec(), oe1, Logic::One),
            high: OutputGroup::new(data[4..].to_vec(), oe2, Logic::One),
            power: PowerGate::supply(vcc, gnd),
            image,
            timing,
            latch,
            sampled: None,
            last_data: None,
        })
    }

    /// The latched word, `None` if nothing valid has been latched.
    pub fn last_data(&self) -> Option<u8> {
        self.last_data
    }
}

impl Device for Tms4800 {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> Result<(), SimError> {
        let mut latched = false;
        if ctx.rose(self.ar) {
            let address = ctx.read_word(&self.address);
            let word = address.map(|a| self.image.word(a as usize));
            trace!(time = %ctx.now(), address = ?address, "address sampled");
            match &self.latch {
                Some(timer) => {
                    self.sampled = word;
                    ctx.write(timer.strobe, Logic::One, self.timing.latch_delay_fs)?;
                }
                None => {
                    self.last_data = word;
                    latched = true;
                }
            }
        }
        if let Some(timer) = &self.latch {
            if ctx.rose(timer.done) {
                self.last_data = self.sampled;
                latched = true;
                ctx.write(timer.strobe, Logic::Zero, 0)?;
            }
        }
        if latched {
            trace!(time = %ctx.now(), data = ?self.last_data, "word latched");
        }

        let repower = latched || self.power.changed(ctx);
        let delay = self.timing.output_delay_fs;
        if repower || self.low.enable_changed(ctx) {
            let nibble = self.last_data.map(|w| u64::from(w & 0x0f));
            self.low.drive(ctx, &self.power, nibble, delay)?;
        }
        if repower || self.high.enable_changed(ctx) {
            let nibble = self.last_data.map(|w| u64::from(w >> 4));
            self.high.drive(ctx, &self.power, nibble, delay)?;
        }
        Ok(())
    }

    fn state_vars(&self) -> Vec<StateVar> {
        vec![StateVar::new("last_data", self.last_data.map(u64::from))]
    }
}

/// Package pin number to core pin name.
pub const DIP_PINOUT: [(&str, &str); 24] = [
    ("1", "GND"),
    ("2", "A0"),
    ("3", "A1"),
    ("4", "A2"),
    ("5", "A3"),
    ("6", "A4"),
    ("7", "A5"),
    ("8", "A9"),
    ("9", "VCC"),
    ("10", "A8"),
    ("11", "A7"),
    ("12", "A6"),
    ("13", "AR"),
    ("14", "OE2"),
    ("15", "A10"),
    ("16", "D7"),
    ("17", "D6"),
    ("18", "D5"),
    ("19", "D4"),
    ("20", "D3"),
    ("21", "D2"),
    ("22", "D1"),
    ("23", "D0"),
    ("24", "OE1"),
];

/// The 24-pin DIP package: a [`Tms4800`] core named `A` with every package
/// pin published under its number.
#[derive(Debug, Default)]
pub struct Tms4800Dip {
    /// Array contents.
    pub image: RomImage,
    /// Core timing.
    pub timing: RomTiming,
}

impl Tms4800Dip {
    /// Type name used in netlist descriptions.
    pub const TYPE_NAME: &'static str = "ROM_TMS4800_DIP";
}

impl Subcircuit for Tms4800Dip {
    type Handle = DeviceId;

    fn build(self, scope: &mut Scope<'_>) -> Result<Self::Handle, BuildError> {
        let core = scope.add_device("A", |pins| {
            Tms4800::register(pins, self.image, self.timing)
        })?;
        for (number, pin) in DIP_PINOUT {
            scope.alias_name(number, &format!("A.{pin}"))?;
        }
        Ok(core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_from_bytes_pads_with_zero() {
        let image = RomImage::from_bytes(&[0x12, 0x34]).unwrap();
        assert_eq!(image.word(0), 0x12);
        assert_eq!(image.word(1), 0x34);
        assert_eq!(image.word(2), 0);
        assert_eq!(image.word(ROM_WORDS - 1), 0);
    }

    #[test]
    fn image_too_large() {
        let bytes = vec![0u8; ROM_WORDS + 1];
        assert_eq!(
            RomImage::from_bytes(&bytes),
            Err(RomImageError::TooLarge { len: ROM_WORDS + 1 })
        );
    }

    #[test]
    fn image_from_fn() {
        let image = RomImage::from_fn(|a| (a & 0xff) as u8);
        assert_eq!(image.word(5), 5);
        assert_eq!(image.word(0x1ff), 0xff);
    }

    #[test]
    fn default_timing_is_450ns() {
        assert_eq!(RomTiming::default().output_delay_fs, 450_000_000);
        assert_eq!(RomTiming::default().latch_delay_fs, 0);
    }

    #[test]
    fn dip_pinout_covers_every_core_pin_once() {
        let mut names: Vec<&str> = DIP_PINOUT.iter().map(|&(_, pin)| pin).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 24);
        for pin in ADDRESS_PINS.iter().chain(DATA_PINS.iter()) {
            assert!(names.contains(pin), "{pin} missing");
        }
    }
}
