use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use gcpipe_transport::PipeStream;

use crate::codec::{encode_frame, Frame, WireConfig};
use crate::error::{Result, WireError};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete frames to any `Write` stream.
///
/// Every frame is flushed as soon as it is written; the peer polls for whole
/// messages and must never see one parked in a buffer.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.id, frame.params.as_ref())
    }

    /// Encode and send one message.
    pub fn send(&mut self, id: u8, params: &[u8]) -> Result<()> {
        if params.len() > self.config.max_params {
            return Err(WireError::ParamsTooLarge {
                size: params.len(),
                max: self.config.max_params,
            });
        }

        self.buf.clear();
        encode_frame(id, params, &mut self.buf)?;

        // WouldBlock is not retried: with a write timeout armed it is the
        // timeout firing, and retrying would spin until the peer drains.
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

impl FrameWriter<PipeStream> {
    /// Create a frame writer for `PipeStream` and apply write timeout from config.
    pub fn with_config_pipe(inner: PipeStream, config: WireConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
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
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{decode_frame, Frame, MAX_PARAMS_LEN};
    use crate::ids;

    #[test]
    fn write_single_frame() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        writer.send(ids::TEST_CALL, b"hello").unwrap();

        let inner = writer.into_inner();
        let mut wire = BytesMut::from(inner.into_inner().as_slice());
        let frame = decode_frame(&mut wire, MAX_PARAMS_LEN).unwrap().unwrap();
        assert_eq!(frame.id, ids::TEST_CALL);
        assert_eq!(frame.params.as_ref(), b"hello");
    }

    #[test]
    fn write_produces_example_message_bytes() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        writer.send(ids::TEST_CALL, &[29, 30]).unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire, vec![4, 28, 29, 30]);
    }

    #[test]
    fn write_multiple_frames() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        writer.send(ids::IS_RUNNING, &[1]).unwrap();
        writer.send(ids::SET_RUNNING, &[2, 1]).unwrap();
        writer.send(ids::TEST_CALL, b"three").unwrap();

        let inner = writer.into_inner();
        let mut wire = BytesMut::from(inner.into_inner().as_slice());

        let f1 = decode_frame(&mut wire, MAX_PARAMS_LEN).unwrap().unwrap();
        let f2 = decode_frame(&mut wire, MAX_PARAMS_LEN).unwrap().unwrap();
        let f3 = decode_frame(&mut wire, MAX_PARAMS_LEN).unwrap().unwrap();

        assert_eq!((f1.id, f1.params.as_ref()), (ids::IS_RUNNING, [1].as_ref()));
        assert_eq!((f2.id, f2.params.as_ref()), (ids::SET_RUNNING, [2, 1].as_ref()));
        assert_eq!((f3.id, f3.params.as_ref()), (ids::TEST_CALL, b"three".as_ref()));
    }

    #[test]
    fn params_over_configured_max_rejected() {
        let cfg = WireConfig {
            max_params: 4,
            ..WireConfig::default()
        };
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::with_config(cursor, cfg);

        let err = writer.send(ids::TEST_CALL, b"oversized").unwrap_err();
        assert!(matches!(err, WireError::ParamsTooLarge { .. }));
    }

    #[test]
    fn reserved_id_rejected_before_write() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        let err = writer.send(ids::ID_NONE, b"x").unwrap_err();
        assert!(matches!(err, WireError::ReservedId { id: 0 }));
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(ids::TEST_CALL, b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn write_frame_method() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);
        let frame = Frame::new(ids::READ_DATA, "abc");

        writer.write_frame(&frame).unwrap();

        let inner = writer.into_inner();
        let mut wire = BytesMut::from(inner.into_inner().as_slice());
        let decoded = decode_frame(&mut wire, MAX_PARAMS_LEN).unwrap().unwrap();

        assert_eq!(decoded.id, ids::READ_DATA);
        assert_eq!(decoded.params.as_ref(), b"abc");
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let writer_impl = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };

        let mut writer = FrameWriter::new(writer_impl);
        writer.send(ids::TEST_CALL, b"retry").unwrap();

        let inner = writer.into_inner();
        assert!(!inner.data.is_empty());
    }

    #[test]
    fn would_block_write_propagates_io_error() {
        let mut writer = FrameWriter::new(WouldBlockWriter);
        let err = writer.send(ids::TEST_CALL, b"x").unwrap_err();
        assert!(matches!(err, WireError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(ids::TEST_CALL, b"x").unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    #[cfg(unix)]
    fn applies_write_timeout_for_pipe_stream() {
        let dir = std::env::temp_dir().join(format!(
            "gcpipe-wire-timeout-writer-{}",
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
            write_timeout: Some(std::time::Duration::from_millis(10)),
            ..WireConfig::default()
        };

        let writer = FrameWriter::with_config_pipe(stream, cfg);
        assert!(writer.is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct WouldBlockWriter;

    impl Write for WouldBlockWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn written_bytes_decode() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut writer = FrameWriter::new(cursor);

        writer.send(ids::TEST_CALL, b"z").unwrap();

        let mut wire = writer.into_inner().into_inner();
        let mut framed = crate::reader::FrameReader::new(Cursor::new(std::mem::take(&mut wire)));
        let frame = framed.read_frame().unwrap();
        assert_eq!(frame.id, ids::TEST_CALL);
        assert_eq!(frame.params.as_ref(), b"z");
    }
}
