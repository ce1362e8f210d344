//! A deterministic stand-in for the instrument-control application.
//!
//! The emulator binds the same endpoint pair a real control application
//! would, answers the full command table, and keeps per-channel run state
//! with a synthetic data ramp. The CLI uses it for bench work with no
//! instrument attached; the test suite uses it as the far side of every
//! session exchange.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use gcpipe_transport::{EndpointPair, PipeStream};
#[cfg(unix)]
use gcpipe_transport::UnixDomainSocket;
use gcpipe_wire::{ids, Frame, FrameReader, FrameWriter, WireError};

use crate::channel::{InstrumentChannel, CHANNEL_COUNT};
use crate::error::Result;

/// Points seeded per channel when a run starts, unless configured otherwise.
pub const DEFAULT_DATA_BATCH: u16 = 24;

/// Spacing between consecutive synthetic data points.
const RAMP_STEP: i32 = 100;

/// Configuration for [`InstrumentEmulator`].
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Endpoints to publish the emulated instrument under.
    pub endpoints: EndpointPair,
    /// Points seeded per channel each time a run starts.
    pub data_batch: u16,
    /// Artificial delay before every response.
    pub response_delay: Duration,
    /// Command ids the emulator reads but never answers.
    ///
    /// Lets tests and bench runs exercise client timeouts.
    pub mute: Vec<u8>,
}

impl EmulatorConfig {
    /// Configuration with defaults for the given endpoint pair.
    pub fn for_endpoints(endpoints: EndpointPair) -> Self {
        Self {
            endpoints,
            data_batch: DEFAULT_DATA_BATCH,
            response_delay: Duration::ZERO,
            mute: Vec::new(),
        }
    }

    /// Set how many points each run start seeds.
    pub fn with_data_batch(mut self, data_batch: u16) -> Self {
        self.data_batch = data_batch;
        self
    }

    /// Set an artificial delay before every response.
    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    /// Set command ids the emulator never answers.
    pub fn with_mute(mut self, mute: Vec<u8>) -> Self {
        self.mute = mute;
        self
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self::for_endpoints(EndpointPair::default())
    }
}

#[derive(Debug, Default)]
struct ChannelState {
    running: bool,
    pending: VecDeque<i32>,
    ramp: i32,
}

impl ChannelState {
    fn seed_batch(&mut self, count: u16) {
        for _ in 0..count {
            self.ramp += RAMP_STEP;
            self.pending.push_back(self.ramp);
        }
    }
}

/// Observable state of the emulated instrument.
#[derive(Debug, Default)]
pub struct InstrumentState {
    channels: [ChannelState; CHANNEL_COUNT as usize],
    control_file: Option<String>,
}

impl InstrumentState {
    /// Whether a run is active on the channel.
    pub fn running(&self, channel: InstrumentChannel) -> bool {
        self.channels[(channel.get() - 1) as usize].running
    }

    /// Points currently buffered for the channel.
    pub fn available(&self, channel: InstrumentChannel) -> usize {
        self.channels[(channel.get() - 1) as usize].pending.len()
    }

    /// Path of the most recently loaded control file.
    pub fn control_file(&self) -> Option<&str> {
        self.control_file.as_deref()
    }

    /// Answer one command frame.
    fn handle(&mut self, frame: &Frame, data_batch: u16) -> Frame {
        let params = frame.params.as_ref();
        match frame.id {
            ids::TEST_CALL => Frame::new(ids::TEST_CALL, frame.params.clone()),
            ids::IS_DATA_AVAILABLE => self.on_is_data_available(params),
            ids::READ_DATA => self.on_read_data(params),
            ids::IS_RUNNING => self.on_is_running(params),
            ids::SET_RUNNING => self.on_set_running(params, data_batch),
            ids::LOAD_CONTROL_FILE => self.on_load_control_file(params),
            unknown => fault(unknown, ids::FAULT_UNKNOWN_COMMAND),
        }
    }

    fn on_is_data_available(&mut self, params: &[u8]) -> Frame {
        let &[channel] = params else {
            return fault(ids::IS_DATA_AVAILABLE, ids::FAULT_MALFORMED_PARAMS);
        };
        let Some(state) = self.channel(channel) else {
            return fault(ids::IS_DATA_AVAILABLE, ids::FAULT_CHANNEL_OUT_OF_RANGE);
        };

        // The count saturates; a backlog past 65535 still reads as 65535.
        let available = state.pending.len().min(u16::MAX as usize) as u16;
        Frame::new(ids::IS_DATA_AVAILABLE, available.to_le_bytes().to_vec())
    }

    fn on_read_data(&mut self, params: &[u8]) -> Frame {
        let &[channel] = params else {
            return fault(ids::READ_DATA, ids::FAULT_MALFORMED_PARAMS);
        };
        let Some(state) = self.channel_mut(channel) else {
            return fault(ids::READ_DATA, ids::FAULT_CHANNEL_OUT_OF_RANGE);
        };

        let count = state.pending.len().min(ids::MAX_DATA_POINTS_PER_READ);
        let mut reply = Vec::with_capacity(1 + count * 4);
        reply.push(count as u8);
        for _ in 0..count {
            if let Some(value) = state.pending.pop_front() {
                reply.extend_from_slice(&value.to_le_bytes());
            }
        }
        Frame::new(ids::READ_DATA, reply)
    }

    fn on_is_running(&mut self, params: &[u8]) -> Frame {
        let &[channel] = params else {
            return fault(ids::IS_RUNNING, ids::FAULT_MALFORMED_PARAMS);
        };
        let Some(state) = self.channel(channel) else {
            return fault(ids::IS_RUNNING, ids::FAULT_CHANNEL_OUT_OF_RANGE);
        };
        Frame::new(ids::IS_RUNNING, vec![state.running as u8])
    }

    fn on_set_running(&mut self, params: &[u8], data_batch: u16) -> Frame {
        let &[channel, flag] = params else {
            return fault(ids::SET_RUNNING, ids::FAULT_MALFORMED_PARAMS);
        };
        if flag > 1 {
            return fault(ids::SET_RUNNING, ids::FAULT_MALFORMED_PARAMS);
        }
        let Some(state) = self.channel_mut(channel) else {
            return fault(ids::SET_RUNNING, ids::FAULT_CHANNEL_OUT_OF_RANGE);
        };

        let starting = flag == 1 && !state.running;
        state.running = flag == 1;
        if starting {
            state.seed_batch(data_batch);
            debug!(channel, points = data_batch, "run started, data seeded");
        }
        Frame::new(ids::SET_RUNNING, Vec::new())
    }

    fn on_load_control_file(&mut self, params: &[u8]) -> Frame {
        let Ok(path) = std::str::from_utf8(params) else {
            return fault(ids::LOAD_CONTROL_FILE, ids::FAULT_MALFORMED_PARAMS);
        };
        if path.is_empty() {
            return fault(ids::LOAD_CONTROL_FILE, ids::FAULT_CONTROL_FILE_REJECTED);
        }
        if self.channels.iter().any(|state| state.running) {
            return fault(ids::LOAD_CONTROL_FILE, ids::FAULT_BUSY);
        }

        info!(path, "control file loaded");
        self.control_file = Some(path.to_string());
        Frame::new(ids::LOAD_CONTROL_FILE, Vec::new())
    }

    fn channel(&self, number: u8) -> Option<&ChannelState> {
        if (1..=CHANNEL_COUNT).contains(&number) {
            Some(&self.channels[(number - 1) as usize])
        } else {
            None
        }
    }

    fn channel_mut(&mut self, number: u8) -> Option<&mut ChannelState> {
        if (1..=CHANNEL_COUNT).contains(&number) {
            Some(&mut self.channels[(number - 1) as usize])
        } else {
            None
        }
    }
}

fn fault(command: u8, code: u8) -> Frame {
    debug!(command, code, "answering with fault");
    Frame::new(ids::FAULT, vec![command, code])
}

/// Emulated instrument-control process bound to an endpoint pair.
pub struct InstrumentEmulator {
    #[cfg(unix)]
    command_socket: UnixDomainSocket,
    #[cfg(unix)]
    respond_socket: UnixDomainSocket,
    config: EmulatorConfig,
    state: InstrumentState,
}

impl InstrumentEmulator {
    /// Bind both endpoints and get ready to accept a client.
    #[cfg(unix)]
    pub fn bind(config: EmulatorConfig) -> Result<Self> {
        let command_socket = UnixDomainSocket::bind(config.endpoints.command())?;
        let respond_socket = UnixDomainSocket::bind(config.endpoints.respond())?;
        info!(
            command = %config.endpoints.command().display(),
            respond = %config.endpoints.respond().display(),
            "instrument emulator ready"
        );
        Ok(Self {
            command_socket,
            respond_socket,
            config,
            state: InstrumentState::default(),
        })
    }

    /// The endpoints this emulator is published under.
    pub fn endpoints(&self) -> &EndpointPair {
        &self.config.endpoints
    }

    /// Observable instrument state, for assertions after a link closes.
    pub fn state(&self) -> &InstrumentState {
        &self.state
    }

    /// Accept one client and serve it until it disconnects.
    ///
    /// Instrument state persists across links, like the real control
    /// application staying up while clients come and go.
    #[cfg(unix)]
    pub fn serve_one(&mut self) -> Result<()> {
        let command = self.command_socket.accept()?;
        let respond = self.respond_socket.accept()?;
        self.serve_link(command, respond)
    }

    /// Serve clients until `stop` is set.
    ///
    /// The flag is checked between links only; to interrupt a blocked accept,
    /// set the flag and make one throwaway connection to the command endpoint.
    #[cfg(unix)]
    pub fn serve_until(&mut self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::SeqCst) {
            self.serve_one()?;
        }
        Ok(())
    }

    fn serve_link(&mut self, command: PipeStream, respond: PipeStream) -> Result<()> {
        let mut reader = FrameReader::new(command);
        let mut writer = FrameWriter::new(respond);
        info!("client link up");

        loop {
            let frame = match reader.read_frame() {
                Ok(frame) => frame,
                Err(WireError::ConnectionClosed) => {
                    info!("client disconnected");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            debug!(id = frame.id, params = frame.params.len(), "command received");

            if !self.config.response_delay.is_zero() {
                std::thread::sleep(self.config.response_delay);
            }
            if self.config.mute.contains(&frame.id) {
                debug!(id = frame.id, "muted, not answering");
                continue;
            }

            let reply = self.state.handle(&frame, self.config.data_batch);
            writer.write_frame(&reply)?;
        }
    }
}

impl std::fmt::Debug for InstrumentEmulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentEmulator")
            .field("endpoints", &self.config.endpoints)
            .field("control_file", &self.state.control_file)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(id: u8, params: &[u8]) -> Frame {
        Frame::new(id, params.to_vec())
    }

    fn fault_params(frame: &Frame) -> (u8, u8) {
        assert_eq!(frame.id, ids::FAULT);
        assert_eq!(frame.params.len(), 2);
        (frame.params[0], frame.params[1])
    }

    #[test]
    fn echo_reflects_params() {
        let mut state = InstrumentState::default();
        let reply = state.handle(&command(ids::TEST_CALL, &[29, 30]), 4);
        assert_eq!(reply.id, ids::TEST_CALL);
        assert_eq!(reply.params.as_ref(), &[29, 30]);
    }

    #[test]
    fn unknown_command_faults() {
        let mut state = InstrumentState::default();
        let reply = state.handle(&command(200, &[1, 2, 3]), 4);
        assert_eq!(fault_params(&reply), (200, ids::FAULT_UNKNOWN_COMMAND));
    }

    #[test]
    fn malformed_params_fault() {
        let mut state = InstrumentState::default();

        let reply = state.handle(&command(ids::IS_RUNNING, &[]), 4);
        assert_eq!(fault_params(&reply), (ids::IS_RUNNING, ids::FAULT_MALFORMED_PARAMS));

        let reply = state.handle(&command(ids::SET_RUNNING, &[1]), 4);
        assert_eq!(fault_params(&reply), (ids::SET_RUNNING, ids::FAULT_MALFORMED_PARAMS));

        let reply = state.handle(&command(ids::SET_RUNNING, &[1, 2]), 4);
        assert_eq!(fault_params(&reply), (ids::SET_RUNNING, ids::FAULT_MALFORMED_PARAMS));
    }

    #[test]
    fn out_of_range_channels_fault() {
        let mut state = InstrumentState::default();
        for bad in [0u8, 7, 255] {
            let reply = state.handle(&command(ids::IS_DATA_AVAILABLE, &[bad]), 4);
            assert_eq!(
                fault_params(&reply),
                (ids::IS_DATA_AVAILABLE, ids::FAULT_CHANNEL_OUT_OF_RANGE)
            );
        }
    }

    #[test]
    fn run_seeds_and_drains_data() {
        let mut state = InstrumentState::default();

        let reply = state.handle(&command(ids::SET_RUNNING, &[1, 1]), 3);
        assert_eq!(reply.id, ids::SET_RUNNING);
        assert!(reply.params.is_empty());

        let reply = state.handle(&command(ids::IS_RUNNING, &[1]), 3);
        assert_eq!(reply.params.as_ref(), &[1]);

        let reply = state.handle(&command(ids::IS_DATA_AVAILABLE, &[1]), 3);
        assert_eq!(reply.params.as_ref(), 3u16.to_le_bytes().as_ref());

        let reply = state.handle(&command(ids::READ_DATA, &[1]), 3);
        assert_eq!(reply.params[0], 3);
        assert_eq!(reply.params.len(), 1 + 3 * 4);

        // Drained; the next read is empty.
        let reply = state.handle(&command(ids::READ_DATA, &[1]), 3);
        assert_eq!(reply.params.as_ref(), &[0]);
    }

    #[test]
    fn restarting_a_running_channel_does_not_reseed() {
        let mut state = InstrumentState::default();
        state.handle(&command(ids::SET_RUNNING, &[2, 1]), 5);
        state.handle(&command(ids::SET_RUNNING, &[2, 1]), 5);

        let reply = state.handle(&command(ids::IS_DATA_AVAILABLE, &[2]), 5);
        assert_eq!(reply.params.as_ref(), 5u16.to_le_bytes().as_ref());
    }

    #[test]
    fn read_data_caps_one_batch() {
        let mut state = InstrumentState::default();
        state.handle(&command(ids::SET_RUNNING, &[1, 1]), 100);

        let reply = state.handle(&command(ids::READ_DATA, &[1]), 100);
        assert_eq!(reply.params[0] as usize, ids::MAX_DATA_POINTS_PER_READ);
        assert_eq!(reply.params.len(), 1 + ids::MAX_DATA_POINTS_PER_READ * 4);

        let reply = state.handle(&command(ids::READ_DATA, &[1]), 100);
        assert_eq!(reply.params[0], 38);
    }

    #[test]
    fn available_count_saturates() {
        let mut state = InstrumentState::default();
        // Two start/stop cycles at 40000 points leave 80000 pending.
        state.handle(&command(ids::SET_RUNNING, &[1, 1]), 40000);
        state.handle(&command(ids::SET_RUNNING, &[1, 0]), 40000);
        state.handle(&command(ids::SET_RUNNING, &[1, 1]), 40000);

        let reply = state.handle(&command(ids::IS_DATA_AVAILABLE, &[1]), 40000);
        assert_eq!(reply.params.as_ref(), u16::MAX.to_le_bytes().as_ref());
    }

    #[test]
    fn ramp_values_keep_climbing_across_runs() {
        let mut state = InstrumentState::default();
        state.handle(&command(ids::SET_RUNNING, &[1, 1]), 2);
        let first = state.handle(&command(ids::READ_DATA, &[1]), 2);
        state.handle(&command(ids::SET_RUNNING, &[1, 0]), 2);
        state.handle(&command(ids::SET_RUNNING, &[1, 1]), 2);
        let second = state.handle(&command(ids::READ_DATA, &[1]), 2);

        let last_of_first = i32::from_le_bytes([
            first.params[5],
            first.params[6],
            first.params[7],
            first.params[8],
        ]);
        let first_of_second = i32::from_le_bytes([
            second.params[1],
            second.params[2],
            second.params[3],
            second.params[4],
        ]);
        assert!(first_of_second > last_of_first);
    }

    #[test]
    fn control_file_life_cycle() {
        let mut state = InstrumentState::default();

        let reply = state.handle(&command(ids::LOAD_CONTROL_FILE, &[]), 4);
        assert_eq!(
            fault_params(&reply),
            (ids::LOAD_CONTROL_FILE, ids::FAULT_CONTROL_FILE_REJECTED)
        );

        let reply = state.handle(&command(ids::LOAD_CONTROL_FILE, &[0xFF, 0xFE]), 4);
        assert_eq!(
            fault_params(&reply),
            (ids::LOAD_CONTROL_FILE, ids::FAULT_MALFORMED_PARAMS)
        );

        state.handle(&command(ids::SET_RUNNING, &[3, 1]), 4);
        let reply = state.handle(&command(ids::LOAD_CONTROL_FILE, b"run.CON"), 4);
        assert_eq!(fault_params(&reply), (ids::LOAD_CONTROL_FILE, ids::FAULT_BUSY));

        state.handle(&command(ids::SET_RUNNING, &[3, 0]), 4);
        let reply = state.handle(&command(ids::LOAD_CONTROL_FILE, b"run.CON"), 4);
        assert_eq!(reply.id, ids::LOAD_CONTROL_FILE);
        assert!(reply.params.is_empty());
        assert_eq!(state.control_file(), Some("run.CON"));
    }

    #[test]
    fn state_accessors_track_channels() {
        let mut state = InstrumentState::default();
        let ch4 = InstrumentChannel::new(4).unwrap();

        assert!(!state.running(ch4));
        assert_eq!(state.available(ch4), 0);

        state.handle(&command(ids::SET_RUNNING, &[4, 1]), 6);
        assert!(state.running(ch4));
        assert_eq!(state.available(ch4), 6);
    }
}
