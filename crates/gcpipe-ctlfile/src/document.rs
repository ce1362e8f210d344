use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{CtlFileError, Result};
use crate::keys;

/// Number of acquisition channels on the instrument.
pub const CHANNEL_COUNT: u8 = 6;

/// Maximum bytes a control file may occupy; real ones are a few KiB.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// One line of a control file.
///
/// Entry lines keep their original text so untouched lines serialize back
/// byte for byte; `raw` is regenerated only when the value changes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry {
        key: String,
        value: String,
        raw: String,
    },
    Other(String),
}

/// An order-preserving control-file document.
///
/// Lines that are not `<KEY>=value` entries pass through unchanged, as does
/// the file's newline style (LF or CRLF) and whether it ends with a newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFile {
    lines: Vec<Line>,
    trailing_newline: bool,
}

/// A per-channel postrun on/off setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostrunFlag {
    SaveData,
    SaveResults,
    SaveImage,
    Autoincrement,
}

impl PostrunFlag {
    fn key(self, channel: u8) -> String {
        match self {
            PostrunFlag::SaveData => keys::channel_postrun_save_data(channel),
            PostrunFlag::SaveResults => keys::channel_postrun_save_results(channel),
            PostrunFlag::SaveImage => keys::channel_postrun_save_image(channel),
            PostrunFlag::Autoincrement => keys::channel_postrun_autoincrement(channel),
        }
    }
}

impl ControlFile {
    /// Parse control-file text. Never fails: lines that are not entries are
    /// preserved verbatim as opaque content.
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self {
                lines: Vec::new(),
                trailing_newline: false,
            };
        }

        let trailing_newline = text.ends_with('\n');
        let mut raw_lines: Vec<&str> = text.split('\n').collect();
        if trailing_newline {
            raw_lines.pop();
        }

        let lines = raw_lines
            .into_iter()
            .map(|raw| parse_line(raw.to_string()))
            .collect();

        Self {
            lines,
            trailing_newline,
        }
    }

    /// Read and parse a control file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        if size > MAX_FILE_SIZE {
            return Err(CtlFileError::FileTooLarge {
                size,
                max: MAX_FILE_SIZE,
            });
        }
        let text = std::fs::read_to_string(path)?;
        let file = Self::parse(&text);
        debug!(?path, entries = file.entries().count(), "loaded control file");
        Ok(file)
    }

    /// Write the document back to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_string())?;
        debug!(?path, "saved control file");
        Ok(())
    }

    /// Look up an entry's value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Look up an entry's value, erroring when absent.
    pub fn get_required(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| CtlFileError::MissingKey(key.to_string()))
    }

    /// Set an entry's value. Replaces the first existing entry for the key,
    /// or appends a new one at the end of the file.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let crlf = self.uses_crlf();
        for line in &mut self.lines {
            if let Line::Entry { key: k, value: v, raw } = line {
                if k == key {
                    *v = value;
                    *raw = render_entry(key, v, crlf);
                    return;
                }
            }
        }
        let raw = render_entry(key, &value, crlf);
        self.lines.push(Line::Entry {
            key: key.to_string(),
            value,
            raw,
        });
    }

    /// All `<KEY>=value` entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, value, .. } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    /// Parse an entry as an integer millisecond duration.
    pub fn get_millis(&self, key: &str) -> Result<Duration> {
        let value = self.get_required(key)?;
        let ms: u64 = value.trim().parse().map_err(|_| CtlFileError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected integer milliseconds",
        })?;
        Ok(Duration::from_millis(ms))
    }

    /// Parse an entry as a 0/1 flag.
    pub fn get_flag(&self, key: &str) -> Result<bool> {
        let value = self.get_required(key)?;
        match value.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(CtlFileError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
                reason: "expected 0 or 1",
            }),
        }
    }

    /// Parse an entry as an unsigned count.
    pub fn get_count(&self, key: &str) -> Result<u32> {
        let value = self.get_required(key)?;
        value.trim().parse().map_err(|_| CtlFileError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected unsigned integer",
        })
    }

    /// Run time for a channel.
    pub fn run_time(&self, channel: u8) -> Result<Duration> {
        check_channel(channel)?;
        self.get_millis(&keys::channel_time(channel))
    }

    /// Set a channel's run time.
    pub fn set_run_time(&mut self, channel: u8, run_time: Duration) -> Result<()> {
        check_channel(channel)?;
        self.set(&keys::channel_time(channel), millis_value(run_time));
        Ok(())
    }

    /// Whether a channel cycles automatically after a run.
    pub fn postrun_cycle(&self, channel: u8) -> Result<bool> {
        check_channel(channel)?;
        self.get_flag(&keys::channel_postrun_cycle(channel))
    }

    /// Enable or disable automatic postrun cycling for a channel.
    pub fn set_postrun_cycle(&mut self, channel: u8, on: bool) -> Result<()> {
        check_channel(channel)?;
        self.set(&keys::channel_postrun_cycle(channel), flag_value(on));
        Ok(())
    }

    /// Delay between cycled runs for a channel.
    pub fn postrun_cycle_time(&self, channel: u8) -> Result<Duration> {
        check_channel(channel)?;
        self.get_millis(&keys::channel_postrun_cycle_time(channel))
    }

    /// Set the delay between cycled runs for a channel.
    pub fn set_postrun_cycle_time(&mut self, channel: u8, cycle_time: Duration) -> Result<()> {
        check_channel(channel)?;
        self.set(
            &keys::channel_postrun_cycle_time(channel),
            millis_value(cycle_time),
        );
        Ok(())
    }

    /// How many cycled runs a channel performs.
    pub fn postrun_repeat(&self, channel: u8) -> Result<u32> {
        check_channel(channel)?;
        self.get_count(&keys::channel_postrun_repeat(channel))
    }

    /// Set how many cycled runs a channel performs.
    pub fn set_postrun_repeat(&mut self, channel: u8, repeat: u32) -> Result<()> {
        check_channel(channel)?;
        self.set(&keys::channel_postrun_repeat(channel), repeat.to_string());
        Ok(())
    }

    /// Detector label for a channel's output files.
    pub fn detector_file(&self, channel: u8) -> Result<&str> {
        check_channel(channel)?;
        self.get_required(&keys::channel_file(channel))
    }

    /// Set the detector label for a channel's output files.
    pub fn set_detector_file(&mut self, channel: u8, label: &str) -> Result<()> {
        check_channel(channel)?;
        self.set(&keys::channel_file(channel), label);
        Ok(())
    }

    /// Read a per-channel postrun flag.
    pub fn postrun_flag(&self, channel: u8, flag: PostrunFlag) -> Result<bool> {
        check_channel(channel)?;
        self.get_flag(&flag.key(channel))
    }

    /// Set a per-channel postrun flag.
    pub fn set_postrun_flag(&mut self, channel: u8, flag: PostrunFlag, on: bool) -> Result<()> {
        check_channel(channel)?;
        self.set(&flag.key(channel), flag_value(on));
        Ok(())
    }

    /// Minimum interval between collections: channel 1 run time plus channel 1
    /// postrun cycle time. Collections scheduled faster than this overlap the
    /// instrument's own cycle.
    pub fn min_cycle(&self) -> Result<Duration> {
        let run = self.get_millis(&keys::channel_time(1))?;
        let post = self.get_millis(&keys::channel_postrun_cycle_time(1))?;
        Ok(run + post)
    }

    fn uses_crlf(&self) -> bool {
        self.lines.iter().any(|line| {
            let raw = match line {
                Line::Entry { raw, .. } => raw,
                Line::Other(raw) => raw,
            };
            raw.ends_with('\r')
        })
    }
}

impl fmt::Display for ControlFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            match line {
                Line::Entry { raw, .. } => f.write_str(raw)?,
                Line::Other(raw) => f.write_str(raw)?,
            }
        }
        if self.trailing_newline {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

fn parse_line(raw: String) -> Line {
    let body = raw.strip_suffix('\r').unwrap_or(&raw);
    if let Some(rest) = body.strip_prefix('<') {
        if let Some(pos) = rest.find(">=") {
            let key = rest[..pos].to_string();
            let value = rest[pos + 2..].to_string();
            return Line::Entry { key, value, raw };
        }
    }
    Line::Other(raw)
}

fn render_entry(key: &str, value: &str, crlf: bool) -> String {
    if crlf {
        format!("<{key}>={value}\r")
    } else {
        format!("<{key}>={value}")
    }
}

fn millis_value(duration: Duration) -> String {
    duration.as_millis().to_string()
}

fn flag_value(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

pub(crate) fn check_channel(channel: u8) -> Result<()> {
    if (1..=CHANNEL_COUNT).contains(&channel) {
        Ok(())
    } else {
        Err(CtlFileError::ChannelOutOfRange(channel))
    }
}
