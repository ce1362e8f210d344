use std::io::{Read, Write};
use std::net::Shutdown;

use crate::error::Result;

/// One connected half of the instrument link; implements Read + Write.
///
/// The legacy control application publishes Windows named pipes; this port
/// speaks Unix domain sockets, and a named-pipe variant slots into the inner
/// enum if that side is ever needed natively.
pub struct PipeStream {
    inner: PipeStreamInner,
}

enum PipeStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for PipeStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for PipeStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl PipeStream {
    /// Create a PipeStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: PipeStreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_unix(cloned))
            }
        }
    }

    /// Shut down one or both halves of the stream.
    ///
    /// A blocked `read` in another thread observes the shutdown as end of
    /// stream. This is the cancellation path: closing a link must release any
    /// peer waiting on it rather than leaving the wait to run unbounded.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => stream.shutdown(how).map_err(Into::into),
        }
    }

    /// Get the credentials of the connected peer (Linux only).
    ///
    /// Returns `(uid, gid, pid)` via `SO_PEERCRED`, or `None` if unavailable.
    #[cfg(target_os = "linux")]
    pub fn peer_credentials(&self) -> Option<(u32, u32, u32)> {
        use std::os::fd::AsRawFd;

        let fd = match &self.inner {
            PipeStreamInner::Unix(stream) => stream.as_raw_fd(),
        };

        let mut cred = libc::ucred {
            pid: 0,
            uid: 0,
            gid: 0,
        };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

        // SAFETY: `cred` and `len` are valid writable pointers for the provided sizes,
        // and `fd` is an open Unix socket descriptor owned by this process.
        let rc = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                (&mut cred as *mut libc::ucred).cast::<libc::c_void>(),
                &mut len,
            )
        };

        if rc == 0 && len as usize == std::mem::size_of::<libc::ucred>() {
            Some((cred.uid, cred.gid, cred.pid as u32))
        } else {
            None
        }
    }

    /// Get the credentials of the connected peer.
    ///
    /// Returns `None` on platforms that do not expose peer credentials.
    #[cfg(not(target_os = "linux"))]
    pub fn peer_credentials(&self) -> Option<(u32, u32, u32)> {
        None
    }
}

impl std::fmt::Debug for PipeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(_) => f.debug_struct("PipeStream").field("type", &"unix").finish(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream;

    #[test]
    fn read_write_roundtrip_over_pair() {
        let (a, b) = UnixStream::pair().unwrap();
        let mut writer = PipeStream::from_unix(a);
        let mut reader = PipeStream::from_unix(b);

        writer.write_all(b"hello").unwrap();
        writer.flush().unwrap();

        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn shutdown_unblocks_reader_with_eof() {
        let (a, b) = UnixStream::pair().unwrap();
        let writer = PipeStream::from_unix(a);
        let mut reader = PipeStream::from_unix(b);

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 8];
            reader.read(&mut buf)
        });

        std::thread::sleep(std::time::Duration::from_millis(20));
        writer.shutdown(Shutdown::Both).unwrap();

        let n = handle.join().unwrap().unwrap();
        assert_eq!(n, 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn peer_credentials_reports_own_uid_for_pair() {
        let (a, _b) = UnixStream::pair().unwrap();
        let stream = PipeStream::from_unix(a);
        let (uid, _gid, pid) = stream.peer_credentials().unwrap();
        // SAFETY: getuid and getpid cannot fail.
        let (my_uid, my_pid) = unsafe { (libc::getuid(), libc::getpid() as u32) };
        assert_eq!(uid, my_uid);
        assert_eq!(pid, my_pid);
    }

    #[test]
    fn try_clone_yields_independent_handle() {
        let (a, b) = UnixStream::pair().unwrap();
        let writer = PipeStream::from_unix(a);
        let mut reader = PipeStream::from_unix(b);

        let mut clone = writer.try_clone().unwrap();
        clone.write_all(b"x").unwrap();
        drop(writer);
        drop(clone);

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"x");
    }
}
