use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use gcpipe_transport::PipeStream;

use crate::codec::{decode_frame, Frame, RecoveryMode, WireConfig};
use crate::error::{Result, WireError};

// Frames cap at 255 bytes, so a small buffer covers many of them.
const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete frames,
/// never a prefix of one. Malformed headers either surface as errors
/// (`Strict`) or are skipped a byte at a time until the stream realigns
/// (`Skip`), per the configured [`RecoveryMode`].
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(WireError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match decode_frame(&mut self.buf, self.config.max_params) {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => {}
                Err(err)
                    if self.config.recovery == RecoveryMode::Skip
                        && err.is_malformed_frame() =>
                {
                    // decode_frame consumed nothing; the bad byte is still at
                    // the front of the buffer.
                    self.buf.advance(1);
                    tracing::warn!(%err, "skipping malformed byte to resynchronize");
                    continue;
                }
                Err(err) => return Err(err),
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };

            if read == 0 {
                return Err(WireError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

impl FrameReader<PipeStream> {
    /// Create a frame reader for `PipeStream` and apply read timeout from config.
    pub fn with_config_pipe(inner: PipeStream, config: WireConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_wire_error)?;
        Ok(Self::with_config(inner, config))
    }
}

fn transport_to_wire_error(err: gcpipe_transport::TransportError) -> WireError {
    match err {
        gcpipe_transport::TransportError::Io(io)
        | gcpipe_transport::TransportError::Accept(io) => WireError::Io(io),
        gcpipe_transport::TransportError::Bind { source, .. }
        | gcpipe_transport::TransportError::Connect { source, .. } => WireError::Io(source),
        other => WireError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::encode_frame;
    use crate::ids;

    #[test]
    fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_frame(ids::TEST_CALL, b"hello", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.id, ids::TEST_CALL);
        assert_eq!(frame.params.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames() {
        let mut wire = BytesMut::new();
        encode_frame(ids::IS_RUNNING, b"\x01", &mut wire).unwrap();
        encode_frame(ids::READ_DATA, b"\x02", &mut wire).unwrap();
        encode_frame(ids::TEST_CALL, b"three", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        let f3 = reader.read_frame().unwrap();

        assert_eq!((f1.id, f1.params.as_ref()), (ids::IS_RUNNING, b"\x01".as_ref()));
        assert_eq!((f2.id, f2.params.as_ref()), (ids::READ_DATA, b"\x02".as_ref()));
        assert_eq!((f3.id, f3.params.as_ref()), (ids::TEST_CALL, b"three".as_ref()));
    }

    #[test]
    fn partial_read_reassembly() {
        let mut wire = BytesMut::new();
        encode_frame(ids::TEST_CALL, b"slow", &mut wire).unwrap();

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, ids::TEST_CALL);
        assert_eq!(frame.params.as_ref(), b"slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        // Declares 10 bytes, delivers 4.
        let mut partial = BytesMut::new();
        partial.put_u8(10);
        partial.put_u8(ids::TEST_CALL);
        partial.put_slice(b"ab");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    fn strict_mode_surfaces_invalid_length() {
        let bytes = vec![0x00, ids::TEST_CALL, 0x01, 0x02];
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, WireError::InvalidLength { len: 0 }));
    }

    #[test]
    fn strict_mode_surfaces_reserved_id() {
        let bytes = vec![3, ids::ID_NONE, 0x01];
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, WireError::ReservedId { id: 0 }));
    }

    #[test]
    fn skip_mode_recovers_next_frame() {
        // Two garbage zero bytes, then a valid frame.
        let mut wire = vec![0x00, 0x00];
        let mut valid = BytesMut::new();
        encode_frame(ids::IS_RUNNING, b"\x01", &mut valid).unwrap();
        wire.extend_from_slice(&valid);

        let cfg = WireConfig {
            recovery: RecoveryMode::Skip,
            ..WireConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire), cfg);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, ids::IS_RUNNING);
        assert_eq!(frame.params.as_ref(), b"\x01");
    }

    #[test]
    fn skip_mode_recovers_after_reserved_id() {
        // A whole frame carrying the reserved id, then a valid one. The
        // resync walks byte by byte through the bad frame.
        let mut wire = vec![3, ids::ID_NONE, 0x00];
        let mut valid = BytesMut::new();
        encode_frame(ids::TEST_CALL, b"ok", &mut valid).unwrap();
        wire.extend_from_slice(&valid);

        let cfg = WireConfig {
            recovery: RecoveryMode::Skip,
            ..WireConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire), cfg);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, ids::TEST_CALL);
        assert_eq!(frame.params.as_ref(), b"ok");
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut wire = BytesMut::new();
        encode_frame(ids::READ_DATA, &[0u8; 64], &mut wire).unwrap();

        let cfg = WireConfig {
            max_params: 16,
            ..WireConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.to_vec()), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, WireError::ParamsTooLarge { .. }));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(ids::TEST_CALL, b"ping").unwrap();
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.id, ids::TEST_CALL);
        assert_eq!(frame.params.as_ref(), b"ping");
    }

    #[test]
    #[cfg(unix)]
    fn sequential_commands_roundtrip() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(ids::IS_DATA_AVAILABLE, &[1]).unwrap();
        writer.send(ids::READ_DATA, &[1]).unwrap();
        writer.send(ids::SET_RUNNING, &[1, 0]).unwrap();

        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        let f3 = reader.read_frame().unwrap();

        assert_eq!((f1.id, f1.params.as_ref()), (ids::IS_DATA_AVAILABLE, [1].as_ref()));
        assert_eq!((f2.id, f2.params.as_ref()), (ids::READ_DATA, [1].as_ref()));
        assert_eq!((f3.id, f3.params.as_ref()), (ids::SET_RUNNING, [1, 0].as_ref()));
    }

    #[test]
    #[cfg(unix)]
    fn reader_and_writer_on_separate_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        let reader_thread = std::thread::spawn(move || {
            for expected in 0..64u8 {
                let frame = reader.read_frame().unwrap();
                assert_eq!(frame.id, ids::TEST_CALL);
                assert_eq!(frame.params.as_ref(), &[expected]);
            }
        });

        for i in 0..64u8 {
            writer.send(ids::TEST_CALL, &[i]).unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let mut wire = BytesMut::new();
        encode_frame(ids::TEST_CALL, b"ok", &mut wire).unwrap();

        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, WireError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let mut wire = BytesMut::new();
        encode_frame(ids::TEST_CALL, b"ok", &mut wire).unwrap();

        let reader = InterruptedThenData {
            state: 0,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap();

        assert_eq!(frame.id, ids::TEST_CALL);
        assert_eq!(frame.params.as_ref(), b"ok");
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    #[cfg(unix)]
    fn applies_read_timeout_for_pipe_stream() {
        let dir = std::env::temp_dir().join(format!(
            "gcpipe-wire-timeout-reader-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("link.sock");
        let listener = gcpipe_transport::UnixDomainSocket::bind(&sock_path).unwrap();

        let path_clone = sock_path.clone();
        let connector = std::thread::spawn(move || {
            gcpipe_transport::UnixDomainSocket::connect(path_clone).unwrap()
        });
        let stream = listener.accept().unwrap();
        let _client = connector.join().unwrap();

        let cfg = WireConfig {
            read_timeout: Some(std::time::Duration::from_millis(10)),
            ..WireConfig::default()
        };

        let reader = FrameReader::with_config_pipe(stream, cfg);
        assert!(reader.is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_pipe_stream_uds() {
        let dir = std::env::temp_dir().join(format!(
            "gcpipe-wire-uds-roundtrip-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("link.sock");
        let listener = gcpipe_transport::UnixDomainSocket::bind(&sock_path).unwrap();

        let path_clone = sock_path.clone();
        let server = std::thread::spawn(move || {
            let stream = listener.accept().unwrap();
            let mut reader = FrameReader::new(stream);
            let frame = reader.read_frame().unwrap();
            assert_eq!(frame.id, ids::LOAD_CONTROL_FILE);
            assert_eq!(frame.params.as_ref(), b"run.CON");
        });

        let stream = gcpipe_transport::UnixDomainSocket::connect(&path_clone).unwrap();
        let mut writer = crate::writer::FrameWriter::new(stream);
        writer.send(ids::LOAD_CONTROL_FILE, b"run.CON").unwrap();

        server.join().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }
}
