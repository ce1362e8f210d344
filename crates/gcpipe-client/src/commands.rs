//! Typed instrument commands layered over [`Session::request_raw`].
//!
//! Each method encodes its parameters, sends the command, and decodes the
//! correlated response, turning a malformed reply into
//! [`ClientError::UnexpectedResponse`] rather than handing raw bytes up.

use gcpipe_wire::ids;
use gcpipe_wire::MAX_PARAMS_LEN;

use crate::channel::InstrumentChannel;
use crate::error::{ClientError, Result};
use crate::session::Session;

impl Session {
    /// Echo probe. Sends the given bytes and checks the instrument returns
    /// them unchanged.
    pub fn test_call(&mut self, params: &[u8]) -> Result<Vec<u8>> {
        let frame = self.request_raw(ids::TEST_CALL, params)?;
        if frame.params.as_ref() != params {
            return Err(ClientError::UnexpectedResponse(format!(
                "echo returned {} bytes for a {}-byte probe",
                frame.params.len(),
                params.len()
            )));
        }
        Ok(frame.params.to_vec())
    }

    /// Number of data points buffered for a channel since the last read.
    pub fn is_data_available(&mut self, channel: InstrumentChannel) -> Result<u16> {
        let frame = self.request_raw(ids::IS_DATA_AVAILABLE, &[channel.get()])?;
        match frame.params.as_ref().try_into() {
            Ok(raw) => Ok(u16::from_le_bytes(raw)),
            Err(_) => Err(ClientError::UnexpectedResponse(format!(
                "IS_DATA_AVAILABLE returned {} bytes, expected 2",
                frame.params.len()
            ))),
        }
    }

    /// Drain buffered data points for a channel.
    ///
    /// Returns at most 62 points per call; poll `is_data_available` and call
    /// again to drain a larger backlog.
    pub fn read_data(&mut self, channel: InstrumentChannel) -> Result<Vec<i32>> {
        let frame = self.request_raw(ids::READ_DATA, &[channel.get()])?;
        decode_points(frame.params.as_ref())
    }

    /// Whether an acquisition run is in progress on a channel.
    pub fn is_running(&mut self, channel: InstrumentChannel) -> Result<bool> {
        let frame = self.request_raw(ids::IS_RUNNING, &[channel.get()])?;
        match frame.params.as_ref() {
            [0] => Ok(false),
            [1] => Ok(true),
            other => Err(ClientError::UnexpectedResponse(format!(
                "IS_RUNNING returned {other:?}, expected [0] or [1]"
            ))),
        }
    }

    /// Start or stop an acquisition run on a channel.
    pub fn set_running(&mut self, channel: InstrumentChannel, running: bool) -> Result<()> {
        let frame = self.request_raw(ids::SET_RUNNING, &[channel.get(), running as u8])?;
        expect_empty("SET_RUNNING", frame.params.as_ref())
    }

    /// Ask the instrument to load a control file from the given path.
    ///
    /// The path travels as UTF-8 parameter bytes, so it must fit in a single
    /// command frame.
    pub fn load_control_file(&mut self, path: &str) -> Result<()> {
        if path.len() > MAX_PARAMS_LEN {
            return Err(ClientError::ControlFilePathTooLong {
                len: path.len(),
                max: MAX_PARAMS_LEN,
            });
        }
        let frame = self.request_raw(ids::LOAD_CONTROL_FILE, path.as_bytes())?;
        expect_empty("LOAD_CONTROL_FILE", frame.params.as_ref())
    }
}

fn expect_empty(command: &str, params: &[u8]) -> Result<()> {
    if params.is_empty() {
        Ok(())
    } else {
        Err(ClientError::UnexpectedResponse(format!(
            "{command} acknowledged with {} unexpected bytes",
            params.len()
        )))
    }
}

fn decode_points(params: &[u8]) -> Result<Vec<i32>> {
    let Some((&count, values)) = params.split_first() else {
        return Err(ClientError::UnexpectedResponse(
            "READ_DATA returned no count byte".into(),
        ));
    };

    let count = count as usize;
    if count > ids::MAX_DATA_POINTS_PER_READ {
        return Err(ClientError::UnexpectedResponse(format!(
            "READ_DATA declared {count} points, limit is {}",
            ids::MAX_DATA_POINTS_PER_READ
        )));
    }
    if values.len() != count * 4 {
        return Err(ClientError::UnexpectedResponse(format!(
            "READ_DATA declared {count} points but carried {} value bytes",
            values.len()
        )));
    }

    Ok(values
        .chunks_exact(4)
        .map(|raw| i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
        .collect())
}
