//! Bounded-time reads and writes over non-blocking descriptors.
//!
//! [`read_full`] and [`write_full`] move an exact number of bytes or stop
//! with a typed outcome. They never block longer than the timeout they are
//! given: the only wait is a `poll(2)` call with the *remaining* budget,
//! recomputed after every partial transfer.
//!
//! # Loop
//!
//! ```text
//! while transferred < len:
//!     poll(fd [, cancel], remaining)
//!       EINTR            → poll again
//!       0 ready          → Timeout
//!       cancel readable  → Cancelled
//!       cancel hung up   → stop watching it
//!       fd ready         → one read/write for the rest of the span
//!           EINTR/EAGAIN → loop (readiness can still be spurious)
//!           read == 0    → PrematureEof
//!       POLLNVAL         → SystemError(EBADF)
//!       POLLERR/POLLHUP  → PeerHangup
//! ```
//!
//! The descriptor must be non-blocking. `poll` can report readiness that a
//! subsequent call does not honour; on a blocking descriptor that call would
//! hang and the timeout would mean nothing.

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::error::SystemError;

/// Result of one [`read_full`] / [`write_full`] call.
#[derive(Debug)]
pub struct Transfer<O> {
    pub outcome: O,
    /// Bytes moved before the outcome was decided.
    pub transferred: usize,
    /// Wall-clock time spent in the call.
    pub elapsed: Duration,
}

/// How a [`read_full`] call ended.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The whole buffer was filled.
    Success,
    /// The other end closed before the buffer was full.
    PrematureEof,
    /// The budget ran out.
    Timeout,
    /// `poll` reported an error or hangup condition on the descriptor.
    PeerHangup { revents: i16 },
    /// The cancellation token fired.
    Cancelled,
    SystemError(SystemError),
}

/// How a [`write_full`] call ended.
#[derive(Debug)]
pub enum WriteOutcome {
    Success,
    Timeout,
    PeerHangup { revents: i16 },
    SystemError(SystemError),
}

// ---------------------------------------------------------------------------
// Read / write
// ---------------------------------------------------------------------------

/// Reads exactly `buf.len()` bytes from `fd`, within `timeout`.
///
/// If `cancel` is given, it is watched in the same `poll` as `fd`; once it
/// becomes readable the call returns [`ReadOutcome::Cancelled`] with the
/// bytes already read left in `buf[..transferred]`.
pub fn read_full(
    fd: BorrowedFd<'_>,
    buf: &mut [u8],
    timeout: Duration,
    cancel: Option<&CancelToken>,
) -> Transfer<ReadOutcome> {
    let start = Instant::now();
    let mut done = 0;
    let mut cancel = cancel;

    let outcome = loop {
        if done == buf.len() {
            break ReadOutcome::Success;
        }

        let mut fds = [
            poll_entry(fd.as_raw_fd(), libc::POLLIN),
            poll_entry(cancel.map_or(-1, |c| c.as_raw_fd()), libc::POLLIN),
        ];
        let watched = if cancel.is_some() { 2 } else { 1 };
        let remaining = timeout.saturating_sub(start.elapsed());

        match poll(&mut fds[..watched], remaining) {
            Ok(0) => break ReadOutcome::Timeout,
            Ok(_) => {}
            Err(err) if err.source.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => break ReadOutcome::SystemError(err),
        }

        if cancel.is_some() {
            let cancel_revents = fds[1].revents;
            if cancel_revents & libc::POLLIN != 0 {
                break ReadOutcome::Cancelled;
            }
            // Hung up: every canceller was dropped without firing.
            if cancel_revents != 0 {
                tracing::debug!(fd = fd.as_raw_fd(), "canceller gone, ignoring token");
                cancel = None;
            }
        }

        let revents = fds[0].revents;
        if revents == 0 {
            continue;
        }
        if revents & libc::POLLIN != 0 {
            let rest = &mut buf[done..];
            // SAFETY: `rest` is a valid, writable region of `rest.len()` bytes.
            let n = unsafe { libc::read(fd.as_raw_fd(), rest.as_mut_ptr().cast(), rest.len()) };
            match n {
                0 => break ReadOutcome::PrematureEof,
                n if n > 0 => done += n as usize,
                _ => {
                    let err = io::Error::last_os_error();
                    if !is_transient(&err) {
                        break ReadOutcome::SystemError(SystemError::new("read", err));
                    }
                }
            }
        } else if revents & libc::POLLNVAL != 0 {
            break ReadOutcome::SystemError(SystemError::from_errno("poll", libc::EBADF));
        } else {
            break ReadOutcome::PeerHangup { revents };
        }
    };

    let transfer = Transfer {
        outcome,
        transferred: done,
        elapsed: start.elapsed(),
    };
    tracing::trace!(
        fd = fd.as_raw_fd(),
        requested = buf.len(),
        transferred = transfer.transferred,
        outcome = ?transfer.outcome,
        "read_full"
    );
    transfer
}

/// Writes all of `buf` to `fd`, within `timeout`.
pub fn write_full(fd: BorrowedFd<'_>, buf: &[u8], timeout: Duration) -> Transfer<WriteOutcome> {
    let start = Instant::now();
    let mut done = 0;

    let outcome = loop {
        if done == buf.len() {
            break WriteOutcome::Success;
        }

        let mut fds = [poll_entry(fd.as_raw_fd(), libc::POLLOUT)];
        let remaining = timeout.saturating_sub(start.elapsed());

        match poll(&mut fds, remaining) {
            Ok(0) => break WriteOutcome::Timeout,
            Ok(_) => {}
            Err(err) if err.source.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => break WriteOutcome::SystemError(err),
        }

        let revents = fds[0].revents;
        if revents & libc::POLLNVAL != 0 {
            break WriteOutcome::SystemError(SystemError::from_errno("poll", libc::EBADF));
        }
        if revents & (libc::POLLERR | libc::POLLHUP) != 0 {
            break WriteOutcome::PeerHangup { revents };
        }
        if revents & libc::POLLOUT != 0 {
            let rest = &buf[done..];
            // SAFETY: `rest` is a valid, readable region of `rest.len()` bytes.
            let n = unsafe { libc::write(fd.as_raw_fd(), rest.as_ptr().cast(), rest.len()) };
            if n >= 0 {
                done += n as usize;
                continue;
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                // The reader is gone. SIGPIPE is ignored by the Rust runtime,
                // so this surfaces as EPIPE instead of killing the process.
                Some(libc::EPIPE) | Some(libc::ECONNRESET) => {
                    break WriteOutcome::PeerHangup { revents };
                }
                _ if is_transient(&err) => {}
                _ => break WriteOutcome::SystemError(SystemError::new("write", err)),
            }
        }
    };

    let transfer = Transfer {
        outcome,
        transferred: done,
        elapsed: start.elapsed(),
    };
    tracing::trace!(
        fd = fd.as_raw_fd(),
        requested = buf.len(),
        transferred = transfer.transferred,
        outcome = ?transfer.outcome,
        "write_full"
    );
    transfer
}

// ---------------------------------------------------------------------------
// Readiness helpers
// ---------------------------------------------------------------------------

/// Waits until `fd` is readable (or has a pending error/hangup).
///
/// Returns `Ok(false)` if nothing happened within `timeout`.
pub fn wait_readable(fd: BorrowedFd<'_>, timeout: Duration) -> Result<bool, SystemError> {
    wait_for(fd, libc::POLLIN, timeout)
}

/// Non-blocking check for unread data on `fd`. A hangup with nothing left
/// to read does not count.
pub(crate) fn has_pending_input(fd: BorrowedFd<'_>) -> Result<bool, SystemError> {
    loop {
        let mut fds = [poll_entry(fd.as_raw_fd(), libc::POLLIN)];
        match poll(&mut fds, Duration::ZERO) {
            Ok(_) => return Ok(fds[0].revents & libc::POLLIN != 0),
            Err(err) if err.source.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Waits until `fd` is writable (or has a pending error/hangup).
pub fn wait_writable(fd: BorrowedFd<'_>, timeout: Duration) -> Result<bool, SystemError> {
    wait_for(fd, libc::POLLOUT, timeout)
}

fn wait_for(fd: BorrowedFd<'_>, events: i16, timeout: Duration) -> Result<bool, SystemError> {
    let start = Instant::now();
    loop {
        let mut fds = [poll_entry(fd.as_raw_fd(), events)];
        match poll(&mut fds, timeout.saturating_sub(start.elapsed())) {
            Ok(ready) => return Ok(ready > 0),
            Err(err) if err.source.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Creates a pipe whose both ends are non-blocking and close-on-exec.
///
/// Returns `(read_end, write_end)`.
pub fn pipe() -> Result<(OwnedFd, OwnedFd), SystemError> {
    let mut fds: [RawFd; 2] = [-1; 2];
    // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(SystemError::last_os_error("pipe"));
    }
    // SAFETY: pipe(2) succeeded; both descriptors are fresh and ours alone.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    for end in [&read, &write] {
        set_nonblocking_cloexec(end.as_raw_fd())?;
    }
    Ok((read, write))
}

fn set_nonblocking_cloexec(fd: RawFd) -> Result<(), SystemError> {
    // SAFETY: plain fcntl calls on a descriptor we own.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(SystemError::last_os_error("fcntl(O_NONBLOCK)"));
        }
        let flags = libc::fcntl(fd, libc::F_GETFD);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) < 0 {
            return Err(SystemError::last_os_error("fcntl(FD_CLOEXEC)"));
        }
    }
    Ok(())
}

fn poll_entry(fd: RawFd, events: i16) -> libc::pollfd {
    libc::pollfd {
        fd,
        events,
        revents: 0,
    }
}

/// One `poll(2)` call. A zero timeout still checks readiness once.
fn poll(fds: &mut [libc::pollfd], timeout: Duration) -> Result<usize, SystemError> {
    // SAFETY: `fds` is a valid array of `fds.len()` pollfd entries.
    let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, poll_timeout_ms(timeout)) };
    if rc < 0 {
        Err(SystemError::last_os_error("poll"))
    } else {
        Ok(rc as usize)
    }
}

/// Rounds up to whole milliseconds so a sub-millisecond remainder does not
/// turn into a busy zero-timeout poll.
fn poll_timeout_ms(timeout: Duration) -> libc::c_int {
    let ms = timeout.as_micros().div_ceil(1000);
    ms.min(libc::c_int::MAX as u128) as libc::c_int
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsFd;

    #[test]
    fn test_poll_timeout_ms_rounds_up() {
        assert_eq!(poll_timeout_ms(Duration::ZERO), 0);
        assert_eq!(poll_timeout_ms(Duration::from_micros(1)), 1);
        assert_eq!(poll_timeout_ms(Duration::from_millis(250)), 250);
        assert_eq!(poll_timeout_ms(Duration::from_secs(u64::MAX)), libc::c_int::MAX);
    }

    #[test]
    fn test_read_full_empty_buffer_succeeds_immediately() {
        let (read, _write) = pipe().unwrap();
        let result = read_full(read.as_fd(), &mut [], Duration::ZERO, None);
        assert!(matches!(result.outcome, ReadOutcome::Success));
        assert_eq!(result.transferred, 0);
    }

    #[test]
    fn test_read_full_data_already_buffered_succeeds() {
        let (read, write) = pipe().unwrap();
        assert!(matches!(
            write_full(write.as_fd(), b"xyz", Duration::from_millis(100)).outcome,
            WriteOutcome::Success
        ));

        let mut buf = [0u8; 3];
        let result = read_full(read.as_fd(), &mut buf, Duration::from_millis(100), None);
        assert!(matches!(result.outcome, ReadOutcome::Success));
        assert_eq!(&buf, b"xyz");
    }

    #[test]
    fn test_pipe_ends_are_nonblocking() {
        let (read, _write) = pipe().unwrap();
        // SAFETY: querying flags of a descriptor we own.
        let flags = unsafe { libc::fcntl(read.as_raw_fd(), libc::F_GETFL) };
        assert_ne!(flags & libc::O_NONBLOCK, 0);
    }
}
