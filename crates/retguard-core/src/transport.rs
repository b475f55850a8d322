//! # Transport
//!
//! The byte-stream connection between the supervisor and the traced program:
//! a Unix domain socket at a private rendezvous path, accepting exactly one
//! peer, exchanging fixed-size frames.
//!
//! Framing is strict. A read that yields zero bytes exactly at a frame
//! boundary is the one and only clean way for a session to end; zero bytes
//! anywhere inside a frame is a [`TransportError::ShortRead`] and is fatal,
//! because a desynchronized stream can never be trusted again.

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use rand::distr::Alphanumeric;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::protocol::{Frame, FRAME_LEN};

/// Directory rendezvous sockets are created under.
pub const RENDEZVOUS_DIR: &str = "/tmp";

/// Length of the random suffix in a rendezvous path.
///
/// `bind(2)` rejects socket paths longer than roughly 108 bytes; the full
/// path here stays well under that.
pub const RENDEZVOUS_SUFFIX_LEN: usize = 18;

/// Generate a private rendezvous path that does not currently exist.
///
/// Candidate names use a random suffix drawn from `[A-Za-z0-9]`. A candidate
/// that already exists is retried with a fresh name.
///
/// There is a window between this check and the actual bind in which another
/// process could create the file. That is safe: the bind fails and the
/// supervisor exits before any traced program starts.
///
/// ## Errors
///
/// Any existence-probe failure other than "not found" is fatal and returned
/// as [`TransportError::Io`].
pub fn rendezvous_path() -> Result<PathBuf, TransportError>
{
    loop {
        let suffix: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(RENDEZVOUS_SUFFIX_LEN)
            .map(char::from)
            .collect();
        let candidate = PathBuf::from(RENDEZVOUS_DIR).join(format!("retguard-{suffix}"));

        if !candidate.try_exists()? {
            debug!(path = %candidate.display(), "generated rendezvous path");
            return Ok(candidate);
        }
    }
}

/// The supervisor's listening endpoint
///
/// Binds the rendezvous path and accepts exactly one peer. The socket file
/// is removed when the listener is dropped.
pub struct Listener
{
    inner: UnixListener,
    path: PathBuf,
}

impl Listener
{
    /// Create the listening endpoint at `path`.
    ///
    /// ## Errors
    ///
    /// Fails if the socket cannot be bound, including the (harmless) race
    /// where the path was created after [`rendezvous_path`] probed it.
    pub fn bind(path: &Path) -> Result<Self, TransportError>
    {
        let inner = UnixListener::bind(path)?;
        info!(path = %path.display(), "listening for the traced program");
        Ok(Self {
            inner,
            path: path.to_path_buf(),
        })
    }

    /// The path this listener is bound to.
    #[must_use]
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Block until the traced program connects.
    ///
    /// ## Errors
    ///
    /// Fails if the underlying `accept(2)` fails.
    pub fn accept(&self) -> Result<Connection, TransportError>
    {
        let (stream, _addr) = self.inner.accept()?;
        info!("traced program connected");
        Ok(Connection::from(stream))
    }
}

impl Drop for Listener
{
    fn drop(&mut self)
    {
        // Best effort; the file may already be gone
        let _ = std::fs::remove_file(&self.path);
    }
}

/// One accepted peer connection
///
/// Performs blocking, fixed-width frame I/O. Owned by the session that
/// serves it; there is no shared or global connection handle.
pub struct Connection
{
    stream: UnixStream,
}

impl From<UnixStream> for Connection
{
    fn from(stream: UnixStream) -> Self
    {
        Self { stream }
    }
}

impl Connection
{
    /// Receive one full frame, blocking until it arrives.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly, i.e.
    /// zero bytes were read exactly at a frame boundary.
    ///
    /// ## Errors
    ///
    /// - [`TransportError::ShortRead`]: the connection closed mid-frame.
    /// - [`TransportError::Io`]: the read itself failed.
    pub fn recv(&mut self) -> Result<Option<[u8; FRAME_LEN]>, TransportError>
    {
        let mut buf = [0u8; FRAME_LEN];
        let mut filled = 0;

        while filled < FRAME_LEN {
            let n = self.stream.read(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(TransportError::ShortRead {
                    want: FRAME_LEN,
                    got: filled,
                });
            }
            filled += n;
        }

        Ok(Some(buf))
    }

    /// Send one full frame.
    ///
    /// ## Errors
    ///
    /// Fails if the peer's read side is gone or the write fails partway; a
    /// partially written frame desynchronizes the stream and is fatal for
    /// the session.
    pub fn send(&mut self, frame: &Frame) -> Result<(), TransportError>
    {
        self.stream.write_all(&frame.encode())?;
        Ok(())
    }
}

/// Transport-level failure
///
/// Unrecoverable for the session it occurs on. A short read is protocol
/// desynchronization rather than a CFI violation, but it receives the same
/// severity: continued operation cannot be trusted.
#[derive(Debug, Error)]
pub enum TransportError
{
    /// The connection closed partway through a frame.
    #[error("connection closed mid-frame: got {got} of {want} bytes")]
    ShortRead
    {
        /// Bytes a full frame requires.
        want: usize,
        /// Bytes actually read before the stream ended.
        got: usize,
    },

    /// The underlying socket operation failed.
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
