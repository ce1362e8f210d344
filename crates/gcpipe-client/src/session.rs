use std::net::Shutdown;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use gcpipe_transport::{EndpointPair, PipeStream};
#[cfg(unix)]
use gcpipe_transport::UnixDomainSocket;
use gcpipe_wire::{ids, Frame, FrameReader, FrameWriter, WireConfig, WireError};

use crate::config::SessionConfig;
use crate::error::{ClientError, FaultCode, Result};

type ReadResult = std::result::Result<Frame, WireError>;

/// A connected request/response session with the instrument-control process.
///
/// The session owns both halves of the link: a writer on the command pipe
/// and a background reader on the respond pipe. The reader feeds frames into
/// a bounded queue; `request_raw` correlates the next matching frame to the
/// command that was just sent. `&mut self` on every request keeps the link
/// single-flight, which is all the instrument side supports.
///
/// Dropping the session tears the link down and joins the reader.
pub struct Session {
    writer: FrameWriter<PipeStream>,
    command_half: PipeStream,
    respond_half: PipeStream,
    responses: Option<Receiver<ReadResult>>,
    reader_handle: Option<JoinHandle<()>>,
    closing: Arc<AtomicBool>,
    config: SessionConfig,
}

impl Session {
    /// Connect to both endpoints of the instrument link.
    ///
    /// Waits up to `config.connect_timeout` for the endpoints to appear, so a
    /// client started moments before the control application still connects.
    pub fn connect(config: SessionConfig) -> Result<Self> {
        #[cfg(unix)]
        {
            Self::connect_unix(config)
        }
        #[cfg(not(unix))]
        {
            Err(ClientError::Transport(
                gcpipe_transport::TransportError::Connect {
                    path: config.endpoints.command().to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        "pipe sessions require Unix domain sockets on this platform",
                    ),
                },
            ))
        }
    }

    #[cfg(unix)]
    fn connect_unix(config: SessionConfig) -> Result<Self> {
        let deadline = Instant::now() + config.connect_timeout;

        debug!(
            command = %config.endpoints.command().display(),
            "connecting to command endpoint"
        );
        let command_stream =
            UnixDomainSocket::connect_deadline(config.endpoints.command(), config.connect_timeout)?;

        // Both endpoints share one connect budget.
        let remaining = deadline.saturating_duration_since(Instant::now());
        debug!(
            respond = %config.endpoints.respond().display(),
            "connecting to respond endpoint"
        );
        let respond_stream =
            UnixDomainSocket::connect_deadline(config.endpoints.respond(), remaining)?;

        let command_half = command_stream.try_clone()?;
        let respond_half = respond_stream.try_clone()?;

        let wire_config = WireConfig {
            recovery: config.recovery,
            ..WireConfig::default()
        };
        let writer = FrameWriter::with_config_pipe(command_stream, wire_config.clone())?;
        let reader = FrameReader::with_config_pipe(respond_stream, wire_config)?;

        let (tx, rx) = mpsc::sync_channel(config.response_queue_depth);
        let closing = Arc::new(AtomicBool::new(false));
        let reader_closing = Arc::clone(&closing);
        let reader_handle = std::thread::Builder::new()
            .name("gcpipe-reader".into())
            .spawn(move || run_reader(reader, tx, reader_closing))
            .map_err(WireError::Io)?;

        info!("instrument session established");
        Ok(Self {
            writer,
            command_half,
            respond_half,
            responses: Some(rx),
            reader_handle: Some(reader_handle),
            closing,
            config,
        })
    }

    /// The endpoints this session is connected to.
    pub fn endpoints(&self) -> &EndpointPair {
        &self.config.endpoints
    }

    /// The current response timeout.
    pub fn timeout(&self) -> Duration {
        self.config.response_timeout
    }

    /// Change the response timeout for subsequent requests.
    ///
    /// Zero is rejected: a zero deadline would fail every request before the
    /// instrument had a chance to answer.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            return Err(ClientError::InvalidConfig("response timeout must be nonzero"));
        }
        self.config.response_timeout = timeout;
        Ok(())
    }

    /// Credentials of the process on the far side of the command pipe.
    pub fn peer_credentials(&self) -> Option<(u32, u32, u32)> {
        self.command_half.peer_credentials()
    }

    /// A handle that can cancel this session's in-flight request from
    /// another thread.
    pub fn canceller(&self) -> Result<SessionCanceller> {
        Ok(SessionCanceller {
            command: self.command_half.try_clone()?,
            respond: self.respond_half.try_clone()?,
            closing: Arc::clone(&self.closing),
        })
    }

    /// Send one command and wait for its correlated response.
    ///
    /// Any stale queued responses are discarded before the command goes out,
    /// and uncorrelated frames arriving during the wait are discarded too. A
    /// fault frame naming this command resolves the call with
    /// [`ClientError::Fault`]. The wait is bounded by the response timeout.
    pub fn request_raw(&mut self, id: u8, params: &[u8]) -> Result<Frame> {
        if ids::is_reserved(id) {
            return Err(ClientError::Protocol(format!(
                "id {id} is reserved and cannot be sent as a command"
            )));
        }

        self.drain_stale()?;

        debug!(id, params = params.len(), "sending command");
        self.writer.send(id, params)?;

        let timeout = self.config.response_timeout;
        let deadline = Instant::now() + timeout;
        let responses = self.responses.as_ref().ok_or(ClientError::Disconnected)?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match responses.recv_timeout(remaining) {
                Ok(Ok(frame)) if frame.id == id => {
                    debug!(id, params = frame.params.len(), "response correlated");
                    return Ok(frame);
                }
                Ok(Ok(frame)) if frame.id == ids::FAULT => {
                    let (command, code) = decode_fault(&frame)?;
                    if command == id {
                        warn!(command, code = code.as_u8(), "instrument fault");
                        return Err(ClientError::Fault { command, code });
                    }
                    warn!(command, "discarding fault for a stale command");
                }
                Ok(Ok(frame)) => {
                    warn!(got = frame.id, expected = id, "discarding stale response");
                }
                Ok(Err(err)) => return Err(err.into()),
                Err(RecvTimeoutError::Timeout) => return Err(ClientError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(ClientError::Disconnected),
            }
        }
    }

    /// Disconnect and join the background reader.
    pub fn disconnect(mut self) {
        self.teardown();
    }

    /// Discard responses left over from a previous request.
    ///
    /// The legacy protocol cleared its response slot before each command for
    /// the same reason: a late answer to an abandoned request must never be
    /// taken for the answer to the next one.
    fn drain_stale(&mut self) -> Result<()> {
        let responses = self.responses.as_ref().ok_or(ClientError::Disconnected)?;
        loop {
            match responses.try_recv() {
                Ok(Ok(frame)) => {
                    warn!(id = frame.id, "discarding stale queued response");
                }
                Ok(Err(err)) => return Err(err.into()),
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(ClientError::Disconnected),
            }
        }
    }

    fn teardown(&mut self) {
        if !self.closing.swap(true, Ordering::SeqCst) {
            debug!("closing instrument session");
            let _ = self.command_half.shutdown(Shutdown::Both);
            let _ = self.respond_half.shutdown(Shutdown::Both);
        }
        // Dropping the receiver first unblocks a reader stuck on a full queue.
        self.responses.take();
        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoints", &self.config.endpoints)
            .field("response_timeout", &self.config.response_timeout)
            .field("closing", &self.closing.load(Ordering::SeqCst))
            .finish()
    }
}

/// Cancels a session's in-flight request from another thread.
///
/// Cancelling shuts both pipe halves down; the blocked request resolves with
/// [`ClientError::Disconnected`] and the background reader exits. The session
/// itself still owns teardown — a cancelled session just has nothing left to
/// wait for.
#[derive(Debug)]
pub struct SessionCanceller {
    command: PipeStream,
    respond: PipeStream,
    closing: Arc<AtomicBool>,
}

impl SessionCanceller {
    /// Cancel the session's link.
    pub fn cancel(&self) {
        if !self.closing.swap(true, Ordering::SeqCst) {
            debug!("cancelling instrument session");
            let _ = self.command.shutdown(Shutdown::Both);
            let _ = self.respond.shutdown(Shutdown::Both);
        }
    }
}

fn run_reader(mut reader: FrameReader<PipeStream>, tx: SyncSender<ReadResult>, closing: Arc<AtomicBool>) {
    loop {
        match reader.read_frame() {
            Ok(frame) => {
                debug!(id = frame.id, params = frame.params.len(), "response frame");
                // A full queue blocks here; that bounds memory and the
                // requester drains on its next call.
                if tx.send(Ok(frame)).is_err() {
                    break;
                }
            }
            Err(err) => {
                if closing.load(Ordering::SeqCst) {
                    debug!("reader stopped by disconnect");
                } else {
                    warn!(%err, "response stream ended");
                    let _ = tx.send(Err(err));
                }
                break;
            }
        }
    }
}

fn decode_fault(frame: &Frame) -> Result<(u8, FaultCode)> {
    match frame.params.as_ref() {
        [command, code, ..] => Ok((*command, FaultCode::from(*code))),
        short => Err(ClientError::Protocol(format!(
            "fault frame carried {} param bytes, need 2",
            short.len()
        ))),
    }
}
