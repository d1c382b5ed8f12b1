use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// A blocking byte-stream transport the session loops read from and write to.
///
/// A read returning `Ok(0)` means the peer closed the stream. The receive timeout
/// bounds every later read; a timed out read surfaces as
/// [`io::ErrorKind::WouldBlock`] or [`io::ErrorKind::TimedOut`].
pub trait Transport: Read + Write {
    /// Sets the receive timeout, `None` blocks indefinitely.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying socket option call.
    fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_recv_timeout(timeout)
    }
}
