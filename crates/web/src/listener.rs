//! Accept loop of the server.
//!
//! The listener polls a non-blocking socket, parks accepted connections in a bounded
//! pending set until their first bytes arrive, then offers them to the worker queue.
//! A full queue drops the connection instead of blocking the accept loop.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::pool::Dispatcher;

struct Pending {
    stream: TcpStream,
    peer: SocketAddr,
    accepted: Instant,
}

pub(crate) struct Listener {
    listener: TcpListener,
    dispatcher: Dispatcher<TcpStream>,
    running: Arc<AtomicBool>,
    pending: Vec<Pending>,
    max_pending: usize,
    poll_interval: Duration,
    pending_timeout: Duration,
}

impl Listener {
    pub(crate) fn new(
        listener: TcpListener,
        dispatcher: Dispatcher<TcpStream>,
        running: Arc<AtomicBool>,
        max_pending: usize,
        poll_interval: Duration,
        pending_timeout: Duration,
    ) -> Self {
        Self {
            listener,
            dispatcher,
            running,
            pending: Vec::with_capacity(max_pending),
            max_pending,
            poll_interval,
            pending_timeout,
        }
    }

    /// Runs until the shared running flag is cleared; pending connections are closed on exit.
    pub(crate) fn run(mut self) {
        if let Err(e) = self.listener.set_nonblocking(true) {
            warn!(cause = %e, "failed to switch listener to non-blocking mode");
            return;
        }

        while self.running.load(Ordering::Acquire) {
            self.accept();
            self.poll_pending();
            thread::sleep(self.poll_interval);
        }

        info!(dropped = self.pending.len(), "listener stopped");
    }

    fn accept(&mut self) {
        while self.pending.len() < self.max_pending {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!(cause = %e, %peer, "drop connection");
                        continue;
                    }
                    debug!(%peer, "accepted connection");
                    self.pending.push(Pending { stream, peer, accepted: Instant::now() });
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    break;
                }
            }
        }
    }

    fn poll_pending(&mut self) {
        let mut probe = [0u8; 1];

        for pending in std::mem::take(&mut self.pending) {
            let Pending { stream, peer, accepted } = pending;

            match stream.peek(&mut probe) {
                Ok(0) => debug!(%peer, "peer closed before sending a request"),
                Ok(_) => self.hand_off(stream, peer),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                    if accepted.elapsed() >= self.pending_timeout {
                        debug!(%peer, "no request before timeout, drop connection");
                    } else {
                        self.pending.push(Pending { stream, peer, accepted });
                    }
                }
                Err(e) => debug!(cause = %e, %peer, "drop connection"),
            }
        }
    }

    fn hand_off(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nonblocking(false) {
            warn!(cause = %e, %peer, "drop connection");
            return;
        }

        match self.dispatcher.try_dispatch(stream) {
            Ok(()) => trace!(%peer, "connection queued"),
            Err(_stream) => debug!(%peer, "worker queue full, drop connection"),
        }
    }
}
