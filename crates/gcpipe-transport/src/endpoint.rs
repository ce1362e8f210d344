use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, TransportError};

/// Instrument name used when none is configured.
///
/// The control application publishes its pipe pair under this name.
pub const DEFAULT_INSTRUMENT_NAME: &str = "peaksimple";

/// Suffix of the endpoint carrying commands toward the instrument process.
pub const COMMAND_SUFFIX: &str = "cmd";

/// Suffix of the endpoint carrying responses back from the instrument process.
pub const RESPOND_SUFFIX: &str = "rsp";

const MAX_NAME_LEN: usize = 64;

/// A validated pipe name.
///
/// Pipe names are fixed well-known strings, not paths: they are combined with
/// a runtime directory to form the concrete endpoint addresses. On Windows the
/// same names would map under `\\.\pipe\`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeName(String);

impl PipeName {
    /// Validate and construct a pipe name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TransportError::InvalidName {
                name,
                reason: "name must not be empty",
            });
        }
        if name.len() > MAX_NAME_LEN {
            return Err(TransportError::InvalidName {
                name,
                reason: "name too long",
            });
        }
        if name
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_whitespace())
        {
            return Err(TransportError::InvalidName {
                name,
                reason: "name must not contain separators, NUL, or whitespace",
            });
        }
        Ok(Self(name))
    }

    /// The validated name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PipeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two well-known endpoints of one instrument control link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPair {
    command: PathBuf,
    respond: PathBuf,
}

impl EndpointPair {
    /// Resolve the endpoint pair for an instrument name under a pipe directory.
    ///
    /// Produces `<dir>/<name>-cmd.sock` and `<dir>/<name>-rsp.sock`.
    pub fn for_instrument(dir: impl AsRef<Path>, name: &PipeName) -> Self {
        let dir = dir.as_ref();
        Self {
            command: dir.join(format!("{name}-{COMMAND_SUFFIX}.sock")),
            respond: dir.join(format!("{name}-{RESPOND_SUFFIX}.sock")),
        }
    }

    /// Construct from two explicit endpoint paths.
    pub fn from_paths(command: impl Into<PathBuf>, respond: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            respond: respond.into(),
        }
    }

    /// Endpoint the client writes commands to.
    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Endpoint the client reads responses from.
    pub fn respond(&self) -> &Path {
        &self.respond
    }
}

impl Default for EndpointPair {
    /// The default instrument's pair in the default pipe directory.
    fn default() -> Self {
        // DEFAULT_INSTRUMENT_NAME satisfies PipeName validation by construction.
        let name = PipeName(DEFAULT_INSTRUMENT_NAME.to_string());
        Self::for_instrument(default_pipe_dir(), &name)
    }
}

/// The directory pipe endpoints are resolved under by default.
///
/// `$XDG_RUNTIME_DIR` when set, otherwise the system temp dir.
pub fn default_pipe_dir() -> PathBuf {
    match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_accepted() {
        assert_eq!(PipeName::new("peaksimple").unwrap().as_str(), "peaksimple");
        assert!(PipeName::new("gc-2").is_ok());
    }

    #[test]
    fn invalid_names_rejected() {
        assert!(matches!(
            PipeName::new(""),
            Err(TransportError::InvalidName { .. })
        ));
        assert!(PipeName::new("a/b").is_err());
        assert!(PipeName::new("a b").is_err());
        assert!(PipeName::new("x".repeat(65)).is_err());
    }

    #[test]
    fn pair_resolves_both_suffixes() {
        let name = PipeName::new("gc1").unwrap();
        let pair = EndpointPair::for_instrument("/run/user/1000", &name);
        assert_eq!(pair.command(), Path::new("/run/user/1000/gc1-cmd.sock"));
        assert_eq!(pair.respond(), Path::new("/run/user/1000/gc1-rsp.sock"));
    }

    #[test]
    fn default_pair_uses_default_name() {
        let pair = EndpointPair::default();
        let cmd = pair.command().to_string_lossy().into_owned();
        assert!(cmd.contains(DEFAULT_INSTRUMENT_NAME));
        assert!(cmd.ends_with("-cmd.sock"));
    }

    #[test]
    fn explicit_paths_kept_verbatim() {
        let pair = EndpointPair::from_paths("/tmp/a.sock", "/tmp/b.sock");
        assert_eq!(pair.command(), Path::new("/tmp/a.sock"));
        assert_eq!(pair.respond(), Path::new("/tmp/b.sock"));
    }
}
