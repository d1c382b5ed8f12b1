//! Response writing for request handlers.
//!
//! A [`ResponseWriter`] accepts exactly one response per request, sent either whole with
//! [`ResponseWriter::send_response`] or streamed with [`ResponseWriter::send_response_chunk`].
//! The `Connection` and `Keep-Alive` headers reflect the connection's keep-alive decision
//! and are added by the writer; values a handler sets for them are replaced.

use std::io::Write;

use bytes::BytesMut;
use embed_http::codec::ResponseEncoder;
use embed_http::protocol::{KeyValueList, Message, PayloadItem, PayloadSize, ResponseHead, SendError};
use http::StatusCode;
use tokio_util::codec::Encoder;
use tracing::{error, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Idle,
    Streaming,
    Finished,
}

pub struct ResponseWriter<'a> {
    stream: &'a mut dyn Write,
    encoder: ResponseEncoder,
    connection: (&'static str, Option<String>),
    state: WriterState,
    status: Option<StatusCode>,
    buf: BytesMut,
}

impl std::fmt::Debug for ResponseWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("connection", &self.connection)
            .field("state", &self.state)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<'a> ResponseWriter<'a> {
    /// `connection` is the `Connection` value plus the optional `Keep-Alive` value
    /// announced with the response.
    pub fn new(stream: &'a mut dyn Write, connection: (&'static str, Option<String>)) -> Self {
        Self {
            stream,
            encoder: ResponseEncoder::new(),
            connection,
            state: WriterState::Idle,
            status: None,
            buf: BytesMut::with_capacity(256),
        }
    }

    /// Sends headers and the whole body in one write, framed by `Content-Length`.
    ///
    /// # Errors
    ///
    /// Fails if a response was already started, or on a transport failure.
    pub fn send_response(&mut self, status: StatusCode, body: &[u8], headers: &KeyValueList) -> Result<(), SendError> {
        if self.state != WriterState::Idle {
            error!(?status, "response already started");
            return Err(SendError::invalid_state("response already started"));
        }

        let head = self.head(status, headers)?;
        self.encoder.encode_full(head, body, &mut self.buf)?;
        self.state = WriterState::Finished;
        self.status = Some(status);
        self.flush()
    }

    /// Sends one fragment of a chunked response.
    ///
    /// The first call (`is_first`) writes the status and headers; `status` and `headers`
    /// are ignored on later calls. The call with `is_last` writes the terminal chunk.
    /// Empty fragments write no chunk, so an empty fragment with `is_last` only
    /// terminates the body.
    ///
    /// # Errors
    ///
    /// Fails on calls out of order (a fragment before the first, a first after a
    /// started response, data after the last) and on transport failures. A repeated
    /// empty last call after the body ended writes nothing.
    pub fn send_response_chunk(
        &mut self,
        status: StatusCode,
        fragment: &[u8],
        headers: &KeyValueList,
        is_first: bool,
        is_last: bool,
    ) -> Result<(), SendError> {
        match (is_first, self.state) {
            (true, WriterState::Idle) => {
                let head = self.head(status, headers)?;
                self.encoder.encode(Message::<_, &[u8]>::Header((head, PayloadSize::Chunked)), &mut self.buf)?;
                self.state = WriterState::Streaming;
                self.status = Some(status);
            }
            (false, WriterState::Streaming) => {}
            (false, WriterState::Finished) if is_last && fragment.is_empty() => return Ok(()),
            (_, state) => {
                error!(?state, is_first, "unexpected response chunk");
                return Err(SendError::invalid_state(format!("chunk with is_first={is_first} in state {state:?}")));
            }
        }

        if !fragment.is_empty() {
            self.encoder.encode(Message::<(ResponseHead, PayloadSize), &[u8]>::Payload(PayloadItem::Chunk(fragment)), &mut self.buf)?;
        }

        if is_last {
            self.encoder.encode(Message::<(ResponseHead, PayloadSize), &[u8]>::Payload(PayloadItem::Eof), &mut self.buf)?;
            self.state = WriterState::Finished;
        }

        self.flush()
    }

    /// Sends a `text/plain; charset=utf-8` response.
    pub fn send_text(&mut self, status: StatusCode, text: &str) -> Result<(), SendError> {
        let mut headers = KeyValueList::new();
        headers.push("Content-Type", mime::TEXT_PLAIN_UTF_8.as_ref())?;
        self.send_response(status, text.as_bytes(), &headers)
    }

    /// Whether anything was written for the current request
    pub fn is_started(&self) -> bool {
        self.state != WriterState::Idle
    }

    /// Whether a complete response was written
    pub fn is_finished(&self) -> bool {
        self.state == WriterState::Finished
    }

    /// Status of the response written so far
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn connection_header(&self) -> &str {
        self.connection.0
    }

    fn head(&self, status: StatusCode, headers: &KeyValueList) -> Result<ResponseHead, SendError> {
        let mut head_headers = KeyValueList::new();
        for (key, value) in headers
            .iter()
            .filter(|(key, _)| !key.eq_ignore_ascii_case("connection") && !key.eq_ignore_ascii_case("keep-alive"))
        {
            head_headers.push(key, value)?;
        }

        let (connection, keep_alive) = &self.connection;
        head_headers.push("Connection", *connection)?;
        if let Some(keep_alive) = keep_alive {
            head_headers.push("Keep-Alive", keep_alive.as_str())?;
        }

        Ok(ResponseHead::with_headers(status, head_headers))
    }

    fn flush(&mut self) -> Result<(), SendError> {
        trace!(len = self.buf.len(), "write response bytes");
        let result = self.stream.write_all(&self.buf).and_then(|_| self.stream.flush());
        self.buf.clear();
        result.map_err(SendError::io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn crlf(s: &str) -> String {
        s.replace('\n', "\r\n")
    }

    #[test]
    fn whole_response() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, ("keep-alive", Some("timeout=5, max=19".to_owned())));

        let mut headers = KeyValueList::new();
        headers.push("Content-Type", "text/plain").unwrap();
        headers.push("Connection", "upgrade").unwrap();
        writer.send_response(StatusCode::OK, b"hello", &headers).unwrap();
        assert!(writer.is_finished());
        assert_eq!(writer.status(), Some(StatusCode::OK));

        let expected = indoc! {"
            HTTP/1.1 200 OK
            Content-Type: text/plain
            Connection: keep-alive
            Keep-Alive: timeout=5, max=19
            Content-Length: 5

            hello"};
        assert_eq!(String::from_utf8(out).unwrap(), crlf(expected));
    }

    #[test]
    fn chunked_response() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, ("close", None));
        let headers = KeyValueList::new();

        writer.send_response_chunk(StatusCode::OK, b"Wiki", &headers, true, false).unwrap();
        assert!(writer.is_started());
        assert!(!writer.is_finished());
        writer.send_response_chunk(StatusCode::OK, b"", &headers, false, false).unwrap();
        writer.send_response_chunk(StatusCode::OK, b"pedia", &headers, false, true).unwrap();
        assert!(writer.is_finished());

        let expected = indoc! {"
            HTTP/1.1 200 OK
            Connection: close
            Transfer-Encoding: chunked

            4
            Wiki
            5
            pedia
            0

        "};
        assert_eq!(String::from_utf8(out).unwrap(), crlf(expected));
    }

    #[test]
    fn single_chunk_call_with_first_and_last() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, ("close", None));

        writer.send_response_chunk(StatusCode::ACCEPTED, b"all", &KeyValueList::new(), true, true).unwrap();

        assert!(writer.is_finished());
        assert!(String::from_utf8(out).unwrap().ends_with("\r\n\r\n3\r\nall\r\n0\r\n\r\n"));
    }

    #[test]
    fn out_of_order_calls() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, ("close", None));
        let headers = KeyValueList::new();

        let result = writer.send_response_chunk(StatusCode::OK, b"x", &headers, false, false);
        assert!(matches!(result, Err(SendError::InvalidState { .. })));

        writer.send_response(StatusCode::OK, b"", &headers).unwrap();
        assert!(matches!(writer.send_response(StatusCode::OK, b"", &headers), Err(SendError::InvalidState { .. })));
        assert!(matches!(
            writer.send_response_chunk(StatusCode::OK, b"x", &headers, true, false),
            Err(SendError::InvalidState { .. })
        ));
    }

    #[test]
    fn repeated_last_chunk_writes_nothing() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, ("close", None));
        let headers = KeyValueList::new();

        writer.send_response_chunk(StatusCode::OK, b"done", &headers, true, true).unwrap();
        writer.send_response_chunk(StatusCode::OK, b"", &headers, false, true).unwrap();
        assert!(matches!(
            writer.send_response_chunk(StatusCode::OK, b"more", &headers, false, true),
            Err(SendError::InvalidState { .. })
        ));

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("\r\n\r\n4\r\ndone\r\n0\r\n\r\n"));
        assert!(text.contains("Connection: close\r\n"));
    }

    #[test]
    fn text_response() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, ("close", None));

        writer.send_text(StatusCode::NOT_FOUND, "missing").unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(text.ends_with("Content-Length: 7\r\n\r\nmissing"));
    }
}
