//! Cooperative cancellation for blocking reads.
//!
//! A cancellation is a pipe. The [`CancelToken`] holds the read end and is
//! handed to [`read_full`](crate::io::read_full), which watches it in the
//! same `poll` as the data descriptor. [`Canceller::cancel`] writes one byte
//! to the other end, which wakes that `poll` exactly like a timeout would.
//!
//! ```rust,no_run
//! use std::thread;
//! use std::time::Duration;
//! use duelnet_transport::cancellation;
//!
//! let (token, canceller) = cancellation().expect("pipe");
//! thread::spawn(move || {
//!     thread::sleep(Duration::from_millis(50));
//!     canceller.cancel().expect("cancel");
//! });
//! // ... client.receive_cancellable::<M>(timeout, &token) ...
//! # drop(token);
//! ```

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::sync::Arc;

use crate::error::SystemError;
use crate::io::{has_pending_input, pipe};

/// Creates a linked token/canceller pair.
pub fn cancellation() -> Result<(CancelToken, Canceller), SystemError> {
    let (read, write) = pipe()?;
    Ok((
        CancelToken { fd: read },
        Canceller {
            fd: Arc::new(write),
        },
    ))
}

/// The watched side of a cancellation.
#[derive(Debug)]
pub struct CancelToken {
    fd: OwnedFd,
}

impl CancelToken {
    /// Non-blocking check: has [`Canceller::cancel`] been called?
    ///
    /// Dropping every [`Canceller`] without calling `cancel` does not
    /// cancel.
    pub fn is_cancelled(&self) -> bool {
        has_pending_input(self.fd.as_fd()).unwrap_or(false)
    }
}

impl AsFd for CancelToken {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for CancelToken {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

/// The triggering side of a cancellation. Cheap to clone and `Send`, so it
/// can be given to another thread or a signal-handling loop.
#[derive(Debug, Clone)]
pub struct Canceller {
    fd: Arc<OwnedFd>,
}

impl Canceller {
    /// Fires the cancellation. Calling it again is harmless.
    pub fn cancel(&self) -> Result<(), SystemError> {
        let byte = [1u8];
        loop {
            // SAFETY: writing one byte from a valid buffer to a pipe we own.
            let n = unsafe { libc::write(self.fd.as_raw_fd(), byte.as_ptr().cast(), 1) };
            if n >= 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                // Pipe full: plenty of cancellations already pending.
                io::ErrorKind::WouldBlock => return Ok(()),
                _ => return Err(SystemError::new("write(cancel)", err)),
            }
        }
    }
}
