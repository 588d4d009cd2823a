//! Waveform recording for simulation output.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! writes IEEE 1364 Value Change Dump text that GTKWave, Surfer and other
//! viewers can open. Every net is a one-bit `wire`.

use std::collections::HashMap;
use std::io::Write;

use nlsim_common::Logic;

use crate::error::SimError;
use crate::ids::NetId;

/// Receives committed level changes.
pub trait WaveformRecorder {
    /// Registers a net for recording.
    fn register_net(&mut self, id: NetId, name: &str) -> Result<(), SimError>;

    /// Opens a new scope (hierarchy level) in the waveform.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a level change at the given time (in femtoseconds).
    fn record_change(&mut self, time_fs: u64, id: NetId, level: Logic) -> Result<(), SimError>;

    /// Finalizes the waveform output (flush, write trailer, etc.).
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD recorder.
///
/// Identifier codes use printable ASCII starting from `!` (0x21). Several
/// changes in delta cycles of one timestamp share a single `#time` line, so
/// only the last level per timestamp is meaningful to a viewer.
pub struct VcdRecorder<W: Write> {
    writer: W,
    codes: HashMap<NetId, String>,
    next_id: u32,
    header_written: bool,
    current_time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codes: HashMap::new(),
            next_id: 0,
            header_written: false,
            current_time: None,
        }
    }

    /// Consumes the recorder and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  nlsim {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1fs")?;
        writeln!(self.writer, "$end")?;
        self.header_written = true;
        Ok(())
    }

    /// Multi-character codes are generated for indices >= 94.
    fn make_id_code(index: u32) -> String {
        let mut result = String::new();
        let mut idx = index;
        loop {
            let c = (b'!' + (idx % 94) as u8) as char;
            result.push(c);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        result
    }

    fn format_level(level: Logic) -> char {
        match level {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'x',
            Logic::Z => 'z',
        }
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_net(&mut self, id: NetId, name: &str) -> Result<(), SimError> {
        self.write_header()?;
        let code = Self::make_id_code(self.next_id);
        self.next_id += 1;
        // VCD references cannot contain whitespace
        let name: String = name
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        writeln!(self.writer, "$var wire 1 {code} {name} $end")?;
        self.codes.insert(id, code);
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.write_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(&mut self, time_fs: u64, id: NetId, level: Logic) -> Result<(), SimError> {
        self.write_header()?;
        if self.current_time != Some(time_fs) {
            if self.current_time.is_none() {
                writeln!(self.writer, "$enddefinitions $end")?;
                writeln!(self.writer, "$dumpvars")?;
            }
            writeln!(self.writer, "#{time_fs}")?;
            self.current_time = Some(time_fs);
        }

        let code = self
            .codes
            .get(&id)
            .ok_or_else(|| SimError::UnknownNet(format!("#{}", id.as_raw())))?;
        writeln!(self.writer, "{}{code}", Self::format_level(level))?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            self.write_header()?;
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
