use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::thread::{self, JoinHandle};

use bytes::{Bytes, BytesMut};
use http::{Method, Uri, Version};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info, trace};

use crate::client::{BodyEncoding, ClientConfig, ClientError, ClientRequest};
use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::protocol::{
    KeyValueList, Message, ParseError, ParserLimits, PayloadItem, PayloadSize, RequestHead, RequestLine, Response, SendError,
};

const DEFAULT_PORT: u16 = 80;

/// Sends requests over short lived connections, one connection per exchange.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    config: ClientConfig,
}

/// Where a validated request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    host: String,
    port: u16,
    path_and_query: String,
}

impl Target {
    fn parse(url: &str) -> Result<Self, ClientError> {
        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| ClientError::invalid_url(url, e))?;

        if let Some(scheme) = uri.scheme_str()
            && scheme != "http"
        {
            return Err(ClientError::invalid_url(url, format!("unsupported scheme {scheme}")));
        }

        let host = uri.host().filter(|host| !host.is_empty()).ok_or_else(|| ClientError::invalid_url(url, "missing host"))?;
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
        let path_and_query = if path_and_query.is_empty() { "/" } else { path_and_query };

        Ok(Self { host: host.to_owned(), port: uri.port_u16().unwrap_or(DEFAULT_PORT), path_and_query: path_and_query.to_owned() })
    }

    fn host_header(&self) -> String {
        if self.port == DEFAULT_PORT { self.host.clone() } else { format!("{}:{}", self.host, self.port) }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Performs one request/response exchange.
    ///
    /// # Errors
    ///
    /// Fails before connecting for an unsupported method, a malformed url or an over-size
    /// entity; afterwards for connect, write or read failures and malformed or over-size
    /// responses.
    pub fn send(&self, request: ClientRequest) -> Result<Response, ClientError> {
        let target = self.validate(&request)?;

        let mut stream = self.connect(&target)?;
        info!(method = %request.method(), host = %target.host, port = target.port, path = %target.path_and_query, "send request");

        let response = self.exchange(&target, &request, &mut stream);
        if let Err(e) = &response {
            error!(cause = %e, "request failed");
        }
        response
    }

    /// Runs [`send`](Self::send) on a dedicated thread and hands the outcome to `callback`.
    ///
    /// # Errors
    ///
    /// Returns the error of spawning the thread.
    pub fn send_with_callback<F>(&self, request: ClientRequest, callback: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce(Result<Response, ClientError>) + Send + 'static,
    {
        let client = self.clone();
        thread::Builder::new().name("http-client".into()).spawn(move || callback(client.send(request)))
    }

    fn validate(&self, request: &ClientRequest) -> Result<Target, ClientError> {
        let method = request.method();
        if ![Method::GET, Method::POST, Method::PUT, Method::DELETE].contains(method) {
            return Err(ClientError::UnsupportedMethod(method.clone()));
        }

        let size = request.entity().len();
        let max_size = self.config.max_entity_size;
        if size > max_size {
            return Err(ClientError::TooLargeEntity { size, max_size });
        }

        Target::parse(request.url())
    }

    fn connect(&self, target: &Target) -> Result<TcpStream, ClientError> {
        let addrs = (target.host.as_str(), target.port).to_socket_addrs().map_err(|e| ClientError::connect(target.addr(), e))?;

        let mut last_error = io::Error::new(ErrorKind::NotFound, "host resolved to no address");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout()) {
                Ok(stream) => {
                    debug!(peer = %addr, "connected");
                    let timeouts = stream
                        .set_read_timeout(Some(self.config.read_timeout()))
                        .and_then(|()| stream.set_write_timeout(Some(self.config.write_timeout())));
                    return timeouts.map(|()| stream).map_err(|e| ClientError::connect(addr, e));
                }
                Err(e) => {
                    debug!(peer = %addr, cause = %e, "connect attempt failed");
                    last_error = e;
                }
            }
        }

        Err(ClientError::connect(target.addr(), last_error))
    }

    fn exchange<S: Read + Write>(&self, target: &Target, request: &ClientRequest, stream: &mut S) -> Result<Response, ClientError> {
        let wire = self.encode_request(target, request)?;
        stream.write_all(&wire).and_then(|()| stream.flush()).map_err(SendError::io)?;
        trace!(len = wire.len(), "request written");

        self.read_response(stream)
    }

    fn encode_request(&self, target: &Target, request: &ClientRequest) -> Result<BytesMut, ClientError> {
        let head = RequestHead::new(
            RequestLine::new(request.method().clone(), target.path_and_query.as_str(), Version::HTTP_11),
            self.request_headers(target, request)?,
        );

        let entity = request.entity().clone();
        let payload_size = match request.encoding() {
            _ if entity.is_empty() => PayloadSize::Empty,
            BodyEncoding::ContentLength => PayloadSize::Length(entity.len() as u64),
            BodyEncoding::Chunked => PayloadSize::Chunked,
        };

        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::with_capacity(entity.len() + 256);
        encoder.encode(Message::<_, Bytes>::Header((head, payload_size)), &mut dst)?;

        let chunk_size = self.config.chunk_size.max(1);
        let mut offset = 0;
        while offset < entity.len() {
            let end = (offset + chunk_size).min(entity.len());
            encoder.encode(Message::<(RequestHead, PayloadSize)>::Payload(PayloadItem::Chunk(entity.slice(offset..end))), &mut dst)?;
            offset = end;
        }
        encoder.encode(Message::<(RequestHead, PayloadSize)>::Payload(PayloadItem::Eof), &mut dst)?;

        Ok(dst)
    }

    fn request_headers(&self, target: &Target, request: &ClientRequest) -> Result<KeyValueList, ClientError> {
        let caller = request.headers();
        let mut headers = KeyValueList::new();

        let mut push = |key: &str, value: &str| headers.push(key, value).map_err(SendError::from);
        if caller.get_ignore_case("host").is_none() {
            push("Host", &target.host_header())?;
        }
        for (key, value) in caller.iter() {
            push(key, value)?;
        }
        if !request.entity().is_empty() && caller.get_ignore_case("content-type").is_none() {
            push("Content-Type", mime::APPLICATION_WWW_FORM_URLENCODED.as_ref())?;
        }
        if caller.get_ignore_case("connection").is_none() {
            push("Connection", "close")?;
        }

        Ok(headers)
    }

    fn read_response<S: Read>(&self, stream: &mut S) -> Result<Response, ClientError> {
        let max_size = self.config.max_response_size;
        let limits = ParserLimits { max_message_size: max_size, ..ParserLimits::default() };
        let mut decoder = ResponseDecoder::with_limits(limits);

        let mut buffer = BytesMut::with_capacity(self.config.read_buffer_size);
        let mut read_buf = vec![0u8; self.config.read_buffer_size.max(1)];

        loop {
            let n = match stream.read(&mut read_buf) {
                Ok(0) => return Err(ClientError::ConnectionClosed),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ParseError::io(e).into()),
            };

            trace!(len = n, "read response bytes");
            buffer.extend_from_slice(&read_buf[..n]);

            match decoder.decode(&mut buffer) {
                Ok(Some(response)) => {
                    debug!(status = %response.status(), entity_len = response.entity_len(), "received response");
                    return Ok(response);
                }
                Ok(None) => {}
                Err(e) if e.is_too_large() => return Err(ClientError::TooLargeResponse { max_size }),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::io::Cursor;
    use std::net::TcpListener;

    /// Replays a canned response and records what was written.
    struct MockStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
        max_read: usize,
    }

    impl MockStream {
        fn new(response: &[u8], max_read: usize) -> Self {
            Self { input: Cursor::new(response.to_vec()), output: Vec::new(), max_read }
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(self.max_read);
            self.input.read(&mut buf[..len])
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn target() -> Target {
        Target::parse("http://example.com/submit?x=1").unwrap()
    }

    #[test]
    fn parse_target() {
        assert_eq!(target(), Target { host: "example.com".into(), port: 80, path_and_query: "/submit?x=1".into() });

        let target = Target::parse("http://10.0.0.1:8080").unwrap();
        assert_eq!(target.port, 8080);
        assert_eq!(target.path_and_query, "/");
        assert_eq!(target.host_header(), "10.0.0.1:8080");

        assert!(matches!(Target::parse("https://example.com/"), Err(ClientError::InvalidUrl { .. })));
        assert!(matches!(Target::parse("/relative"), Err(ClientError::InvalidUrl { .. })));
    }

    #[test]
    fn reject_before_connecting() {
        let client = HttpClient::with_config(ClientConfig { max_entity_size: 4, ..ClientConfig::default() });

        let patch = ClientRequest::new(Method::PATCH, "http://example.com/");
        assert!(matches!(client.send(patch), Err(ClientError::UnsupportedMethod(m)) if m == Method::PATCH));

        let post = ClientRequest::post("http://example.com/", "too large");
        assert!(matches!(client.send(post), Err(ClientError::TooLargeEntity { size: 9, max_size: 4 })));
    }

    #[test]
    fn post_with_content_length() {
        let client = HttpClient::new();
        let mut stream = MockStream::new(b"HTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\nok", 7);

        let request = ClientRequest::post("http://example.com/submit?x=1", "a=1&b=2");
        let response = client.exchange(&target(), &request, &mut stream).unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(&response.entity()[..], b"ok");
        assert_eq!(
            String::from_utf8(stream.output).unwrap(),
            "POST /submit?x=1 HTTP/1.1\r\nHost: example.com\r\nContent-Type: application/x-www-form-urlencoded\r\n\
             Connection: close\r\nContent-Length: 7\r\n\r\na=1&b=2"
        );
    }

    #[test]
    fn put_with_chunked_body() {
        let client = HttpClient::with_config(ClientConfig { chunk_size: 4, ..ClientConfig::default() });
        let mut stream = MockStream::new(b"HTTP/1.1 204 No Content\r\n\r\n", 1024);

        let request = ClientRequest::put("http://example.com/", "Wikipedia").header("Content-Type", "text/plain").unwrap().chunked();
        let response = client.exchange(&target(), &request, &mut stream).unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let written = String::from_utf8(stream.output).unwrap();
        assert!(written.starts_with("PUT /submit?x=1 HTTP/1.1\r\nHost: example.com\r\nContent-Type: text/plain\r\n"));
        assert!(written.ends_with("Transfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n4\r\npedi\r\n1\r\na\r\n0\r\n\r\n"));
    }

    #[test]
    fn chunked_response_with_trailer() {
        let client = HttpClient::new();
        let mut stream = MockStream::new(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nTrailer: Expires\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\nExpires: never\r\n\r\n",
            3,
        );

        let response = client.exchange(&target(), &ClientRequest::get("http://example.com/"), &mut stream).unwrap();
        assert_eq!(&response.entity()[..], b"Wikipedia");
        assert_eq!(response.trailers().get("Expires"), Some("never"));
    }

    #[test]
    fn closed_before_complete() {
        let client = HttpClient::new();
        let mut stream = MockStream::new(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort", 1024);

        let result = client.exchange(&target(), &ClientRequest::get("http://example.com/"), &mut stream);
        assert!(matches!(result, Err(ClientError::ConnectionClosed)));
    }

    #[test]
    fn over_size_response() {
        let client = HttpClient::with_config(ClientConfig { max_response_size: 64, ..ClientConfig::default() });
        let mut stream = MockStream::new(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n", 1024);

        let result = client.exchange(&target(), &ClientRequest::get("http://example.com/"), &mut stream);
        assert!(matches!(result, Err(ClientError::TooLargeResponse { max_size: 64 })));
    }

    #[test]
    fn redirect_is_returned_as_is() {
        let client = HttpClient::new();
        let mut stream = MockStream::new(b"HTTP/1.1 302 Found\r\nLocation: http://elsewhere/\r\n\r\n", 1024);

        let response = client.exchange(&target(), &ClientRequest::get("http://example.com/"), &mut stream).unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get("Location"), Some("http://elsewhere/"));
    }

    #[test]
    fn send_over_loopback_with_callback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 256];
            while !received.ends_with(b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                received.extend_from_slice(&buf[..n]);
            }
            stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").unwrap();
            String::from_utf8(received).unwrap()
        });

        let (tx, rx) = std::sync::mpsc::channel();
        let handle = HttpClient::new()
            .send_with_callback(ClientRequest::get(format!("http://127.0.0.1:{port}/device/42")), move |result| {
                tx.send(result.map(|response| response.into_entity())).unwrap();
            })
            .unwrap();

        handle.join().unwrap();
        assert_eq!(&rx.recv().unwrap().unwrap()[..], b"hello");

        let received = server.join().unwrap();
        assert!(received.starts_with("GET /device/42 HTTP/1.1\r\n"));
        assert!(received.contains(&format!("Host: 127.0.0.1:{port}\r\n")));
    }
}
