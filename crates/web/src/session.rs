//! Server side session loop for one connection.
//!
//! The session reads from its transport into a growable buffer, feeds the request
//! decoder until a message completes, dispatches it through the [`Router`] and repeats
//! while the connection's keep-alive state allows. Requests on one connection are
//! answered strictly in order.

use std::io::{self, ErrorKind};

use bytes::BytesMut;
use embed_http::codec::RequestDecoder;
use embed_http::connection::{ConnectionState, Transport};
use embed_http::protocol::{KeyValueList, ParseError, Request};
use http::StatusCode;
use tokio_util::codec::Decoder;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::response::ResponseWriter;
use crate::router::{Dispatch, Router};

pub struct Session<'a, T: Transport> {
    transport: T,
    router: &'a Router,
    config: &'a ServerConfig,
    decoder: RequestDecoder,
    state: ConnectionState,
    buf: BytesMut,
    read_buf: Vec<u8>,
}

impl<T: Transport> std::fmt::Debug for Session<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("decoder", &self.decoder)
            .field("state", &self.state)
            .field("buffered", &self.buf.len())
            .finish_non_exhaustive()
    }
}

enum ReadOutcome {
    Request(Request),
    Closed,
}

impl<'a, T: Transport> Session<'a, T> {
    pub fn new(transport: T, router: &'a Router, config: &'a ServerConfig) -> Self {
        Self {
            transport,
            router,
            config,
            decoder: RequestDecoder::with_limits(config.limits),
            state: ConnectionState::new(config.keep_alive),
            buf: BytesMut::with_capacity(config.read_buffer_size),
            read_buf: vec![0; config.read_buffer_size.max(1)],
        }
    }

    /// Serves requests until the connection closes, returns how many were dispatched.
    ///
    /// # Errors
    ///
    /// Transport failures other than a closed peer or an expired receive timeout.
    pub fn run(mut self) -> io::Result<u32> {
        self.transport.set_recv_timeout(Some(self.config.keep_alive.default_timeout()))?;

        let mut served = 0;
        loop {
            let request = match self.read_request()? {
                ReadOutcome::Request(request) => request,
                ReadOutcome::Closed => break,
            };

            if let Some(timeout) = self.state.on_request(request.fields()) {
                self.transport.set_recv_timeout(Some(timeout))?;
            }
            served += 1;

            if request.fields().is_websocket_upgrade() {
                debug!(url = request.url(), "websocket upgrade requested, answered as plain http");
            }

            if !self.respond(&request) || self.state.should_close() {
                break;
            }

            debug!(remaining = self.state.remaining_requests(), "keep connection alive");
        }

        debug!(served, "session finished");
        Ok(served)
    }

    fn read_request(&mut self) -> io::Result<ReadOutcome> {
        loop {
            match self.decoder.decode(&mut self.buf) {
                Ok(Some(request)) => return Ok(ReadOutcome::Request(request)),
                Ok(None) => {}
                Err(e) => {
                    self.reject(&e);
                    return Ok(ReadOutcome::Closed);
                }
            }

            match self.transport.read(&mut self.read_buf) {
                Ok(0) => {
                    if !self.decoder.cursor().is_idle() || !self.buf.is_empty() {
                        debug!(buffered = self.buf.len(), "peer closed in the middle of a request");
                    }
                    return Ok(ReadOutcome::Closed);
                }
                Ok(n) => self.buf.extend_from_slice(&self.read_buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    debug!("receive timeout expired, close connection");
                    return Ok(ReadOutcome::Closed);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn reject(&mut self, e: &ParseError) {
        let status = if e.is_too_large() { StatusCode::PAYLOAD_TOO_LARGE } else { StatusCode::BAD_REQUEST };
        warn!(cause = %e, %status, "reject malformed request");

        let mut writer = ResponseWriter::new(&mut self.transport, ("close", None));
        if let Err(e) = writer.send_text(status, status.canonical_reason().unwrap_or_default()) {
            debug!(cause = %e, "failed to send error response");
        }
    }

    /// Dispatches one request, returns whether the connection can carry another.
    fn respond(&mut self, request: &Request) -> bool {
        let mut writer = ResponseWriter::new(&mut self.transport, self.state.response_headers());

        let result = match self.router.dispatch(request, &mut writer) {
            Ok(Dispatch::Handled) => Ok(()),
            Ok(Dispatch::NotFound) => writer.send_text(StatusCode::NOT_FOUND, "Not Found"),
            Err(e) => {
                error!(cause = %e, method = %request.method(), url = request.url(), "handler failed");
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(cause = %e, "failed to send response, close connection");
            return false;
        }

        if writer.is_finished() {
            info!(method = %request.method(), url = request.url(), status = ?writer.status(), "request served");
            return true;
        }

        if writer.is_started() {
            warn!(url = request.url(), "chunked response left unfinished, close connection");
            return false;
        }

        match writer.send_response(StatusCode::INTERNAL_SERVER_ERROR, b"", &KeyValueList::new()) {
            Ok(()) => true,
            Err(e) => {
                warn!(cause = %e, "failed to send error response, close connection");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_fn;
    use crate::router::{get, post};
    use std::collections::VecDeque;
    use std::io::{Read, Write};
    use std::time::Duration;

    /// Replays scripted reads and records what the session writes.
    struct MockTransport {
        reads: VecDeque<Vec<u8>>,
        at_end: ErrorKind,
        written: Vec<u8>,
        timeouts: Vec<Option<Duration>>,
    }

    impl MockTransport {
        fn new<I: IntoIterator<Item = &'static str>>(reads: I) -> Self {
            Self {
                reads: reads.into_iter().map(|s| s.as_bytes().to_vec()).collect(),
                at_end: ErrorKind::UnexpectedEof,
                written: Vec::new(),
                timeouts: Vec::new(),
            }
        }

        fn timing_out(mut self) -> Self {
            self.at_end = ErrorKind::WouldBlock;
            self
        }

        fn output(&self) -> String {
            String::from_utf8(self.written.clone()).unwrap()
        }
    }

    impl Read for MockTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(mut next) = self.reads.pop_front() else {
                return match self.at_end {
                    ErrorKind::UnexpectedEof => Ok(0),
                    kind => Err(kind.into()),
                };
            };

            let n = next.len().min(buf.len());
            buf[..n].copy_from_slice(&next[..n]);
            if n < next.len() {
                self.reads.push_front(next.split_off(n));
            }
            Ok(n)
        }
    }

    impl Write for MockTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for MockTransport {
        fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
            self.timeouts.push(timeout);
            Ok(())
        }
    }

    fn router() -> Router {
        Router::builder()
            .route(
                "/device/:id/status",
                get(handler_fn(|req, writer| {
                    let body = format!("device {} ok", req.param("id").unwrap_or_default());
                    writer.send_text(StatusCode::OK, &body)?;
                    Ok(())
                })),
            )
            .route(
                "/echo",
                post(handler_fn(|req, writer| {
                    writer.send_response(StatusCode::OK, req.entity(), &KeyValueList::new())?;
                    Ok(())
                })),
            )
            .route("/silent", get(handler_fn(|_req, _writer| Ok(()))))
            .route("/fail", get(handler_fn(|_req, _writer| Err("boom".into()))))
            .route(
                "/half",
                get(handler_fn(|_req, writer| {
                    writer.send_response_chunk(StatusCode::OK, b"part", &KeyValueList::new(), true, false)?;
                    Ok(())
                })),
            )
            .build()
    }

    fn run(transport: &mut MockTransport, config: &ServerConfig) -> u32 {
        let router = router();
        Session::new(transport, &router, config).run().unwrap()
    }

    #[test]
    fn single_request_closes_without_keep_alive() {
        let mut transport = MockTransport::new(["GET /device/42/status HTTP/1.1\r\nHost: x\r\n\r\n"]);

        assert_eq!(run(&mut transport, &ServerConfig::default()), 1);

        let output = transport.output();
        assert!(output.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(output.contains("Connection: close\r\n"));
        assert!(output.ends_with("device 42 ok"));
        assert_eq!(transport.timeouts, vec![Some(Duration::from_secs(5))]);
    }

    #[test]
    fn request_split_across_reads() {
        let mut transport = MockTransport::new([
            "POST /echo HTTP/1.1\r\nConnection: close\r\nContent-Le",
            "ngth: 10\r\n\r\n012",
            "345",
            "6789",
        ]);

        assert_eq!(run(&mut transport, &ServerConfig::default()), 1);
        assert!(transport.output().ends_with("Content-Length: 10\r\n\r\n0123456789"));
    }

    #[test]
    fn keep_alive_budget_and_timeout_applied_once() {
        let request = "GET /device/1/status HTTP/1.1\r\nConnection: keep-alive\r\nKeep-Alive: timeout=1000, max=2\r\n\r\n";
        let mut transport = MockTransport::new([request, request, request]);

        assert_eq!(run(&mut transport, &ServerConfig::default()), 2);

        let output = transport.output();
        assert_eq!(output.matches("HTTP/1.1 200 OK").count(), 2);
        assert!(output.contains("Connection: keep-alive\r\nKeep-Alive: timeout=60, max=1\r\n"));
        assert!(output.contains("Connection: close\r\n"));
        assert_eq!(transport.timeouts, vec![Some(Duration::from_secs(5)), Some(Duration::from_secs(60))]);
    }

    #[test]
    fn connection_close_overrides_budget() {
        let keep = "GET /device/1/status HTTP/1.1\r\nConnection: keep-alive\r\n\r\n";
        let close = "GET /device/2/status HTTP/1.1\r\nConnection: close\r\n\r\n";
        let mut transport = MockTransport::new([keep, close, keep]);

        assert_eq!(run(&mut transport, &ServerConfig::default()), 2);
        assert!(transport.output().ends_with("device 2 ok"));
    }

    #[test]
    fn pipelined_requests_in_one_read() {
        let mut transport = MockTransport::new([concat!(
            "GET /device/1/status HTTP/1.1\r\nConnection: keep-alive\r\n\r\n",
            "GET /device/2/status HTTP/1.1\r\nConnection: close\r\n\r\n"
        )]);

        assert_eq!(run(&mut transport, &ServerConfig::default()), 2);

        let output = transport.output();
        let first = output.find("device 1 ok").unwrap();
        let second = output.find("device 2 ok").unwrap();
        assert!(first < second);
    }

    #[test]
    fn not_found() {
        let mut transport = MockTransport::new(["GET /nowhere HTTP/1.1\r\n\r\n"]);

        assert_eq!(run(&mut transport, &ServerConfig::default()), 1);
        assert!(transport.output().starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn malformed_request_gets_400() {
        let mut transport = MockTransport::new(["GARBAGE\r\n\r\n"]);

        assert_eq!(run(&mut transport, &ServerConfig::default()), 0);

        let output = transport.output();
        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(output.contains("Connection: close\r\n"));
    }

    #[test]
    fn oversize_request_gets_413() {
        let mut config = ServerConfig::default();
        config.limits.max_message_size = 64;
        let mut transport =
            MockTransport::new(["POST /echo HTTP/1.1\r\nContent-Length: 100\r\n\r\n", "0123456789"]);

        assert_eq!(run(&mut transport, &config), 0);
        assert!(transport.output().starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[test]
    fn handler_without_response_gets_500() {
        for url in ["/silent", "/fail"] {
            let request = format!("GET {url} HTTP/1.1\r\nConnection: close\r\n\r\n");
            let mut transport = MockTransport::new([]);
            transport.reads.push_back(request.into_bytes());

            assert_eq!(run(&mut transport, &ServerConfig::default()), 1);
            assert!(transport.output().starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        }
    }

    #[test]
    fn unfinished_stream_closes_connection() {
        let request = "GET /half HTTP/1.1\r\nConnection: keep-alive\r\n\r\n";
        let mut transport = MockTransport::new([request, request]);

        assert_eq!(run(&mut transport, &ServerConfig::default()), 1);
        assert!(transport.output().ends_with("4\r\npart\r\n"));
    }

    #[test]
    fn timeout_and_peer_close_end_quietly() {
        let mut transport = MockTransport::new(["GET /device/1/sta"]).timing_out();
        assert_eq!(run(&mut transport, &ServerConfig::default()), 0);
        assert!(transport.written.is_empty());

        let mut transport = MockTransport::new(["GET /device/1/sta"]);
        assert_eq!(run(&mut transport, &ServerConfig::default()), 0);
        assert!(transport.written.is_empty());
    }

    #[test]
    fn small_read_buffer() {
        let config = ServerConfig { read_buffer_size: 3, ..ServerConfig::default() };
        let mut transport = MockTransport::new(["GET /device/77/status HTTP/1.1\r\nHost: x\r\n\r\n"]);

        assert_eq!(run(&mut transport, &config), 1);
        assert!(transport.output().ends_with("device 77 ok"));
    }

    #[test]
    fn transport_failure_is_returned() {
        let mut transport = MockTransport::new([]);
        transport.at_end = ErrorKind::ConnectionReset;
        let router = router();
        let config = ServerConfig::default();

        let e = Session::new(&mut transport, &router, &config).run().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::ConnectionReset);
    }
}
