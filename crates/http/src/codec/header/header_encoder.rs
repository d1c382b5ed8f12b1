//! HTTP header encoder implementation for serializing message heads
//!
//! This module serializes the start line and header block of outgoing responses
//! ([`ResponseHead`]) and requests ([`RequestHead`]). The framing header is always
//! derived from the [`PayloadSize`]: a `Content-Length` or `Transfer-Encoding: chunked`
//! set by the caller is replaced so the head can never disagree with the body.

use crate::protocol::message::version_str;
use crate::protocol::{KeyValueList, PayloadSize, RequestHead, ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 1024;

/// Encoder for HTTP message heads implementing the [`Encoder`] trait.
#[derive(Debug, Clone, Copy)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    /// Encodes the status line and headers of a response into `dst`.
    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (header, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        let status = header.status();
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or(""))?;

        write_headers(header.headers(), payload_size, dst);
        Ok(())
    }
}

impl Encoder<(RequestHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    /// Encodes the request line and headers of a request into `dst`.
    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (header, payload_size) = item;
        let line = header.line();

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "{} {} {}\r\n", line.method(), line.url(), version_str(line.version()))?;

        write_headers(header.headers(), payload_size, dst);
        Ok(())
    }
}

fn write_headers(headers: &KeyValueList, payload_size: PayloadSize, dst: &mut BytesMut) {
    for (key, value) in headers.iter() {
        if key.eq_ignore_ascii_case("content-length") || key.eq_ignore_ascii_case("transfer-encoding") {
            continue;
        }
        put_header(dst, key, value);
    }

    // Set appropriate content length or transfer encoding header
    match payload_size {
        PayloadSize::Length(n) => put_header(dst, "Content-Length", itoa(n, &mut [0; 20])),
        PayloadSize::Chunked => put_header(dst, "Transfer-Encoding", "chunked"),
        PayloadSize::Empty => put_header(dst, "Content-Length", "0"),
    }
    dst.put_slice(b"\r\n");
}

fn put_header(dst: &mut BytesMut, key: &str, value: &str) {
    dst.put_slice(key.as_bytes());
    dst.put_slice(b": ");
    dst.put_slice(value.as_bytes());
    dst.put_slice(b"\r\n");
}

fn itoa(mut n: u64, buf: &mut [u8; 20]) -> &str {
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    // only ascii digits were written
    std::str::from_utf8(&buf[pos..]).unwrap_or("0")
}

/// Fast writer implementation for writing to BytesMut.
///
/// Avoids the formatting adapter of `BufMut::writer` when the space was reserved already.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestLine;
    use http::{Method, StatusCode, Version};

    #[test]
    fn encode_response_head() {
        let mut head = ResponseHead::new(StatusCode::OK);
        head.headers_mut().push("Content-Type", "text/plain").unwrap();
        head.headers_mut().push("Content-Length", "999").unwrap();

        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, PayloadSize::Length(12)), &mut dst).unwrap();

        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 12\r\n\r\n");
    }

    #[test]
    fn encode_chunked_response_head() {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode((ResponseHead::new(StatusCode::NOT_FOUND), PayloadSize::Chunked), &mut dst).unwrap();

        assert_eq!(&dst[..], b"HTTP/1.1 404 Not Found\r\nTransfer-Encoding: chunked\r\n\r\n");
    }

    #[test]
    fn encode_request_head() {
        let mut headers = KeyValueList::new();
        headers.push("Host", "example.com").unwrap();
        let head = RequestHead::new(RequestLine::new(Method::POST, "/submit?x=1", Version::HTTP_11), headers);

        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, PayloadSize::Empty), &mut dst).unwrap();

        assert_eq!(&dst[..], b"POST /submit?x=1 HTTP/1.1\r\nHost: example.com\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn format_numbers() {
        assert_eq!(itoa(0, &mut [0; 20]), "0");
        assert_eq!(itoa(1234567890, &mut [0; 20]), "1234567890");
        assert_eq!(itoa(u64::MAX, &mut [0; 20]), "18446744073709551615");
    }
}
