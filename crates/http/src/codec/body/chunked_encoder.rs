//! Encoder for chunked transfer encoding.
//!
//! Every non-empty fragment becomes `<hex size>\r\n<bytes>\r\n`, the terminating
//! `0\r\n\r\n` is written exactly once. Empty fragments produce no output since a
//! zero sized chunk would end the body early.

use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Write;

use tokio_util::codec::Encoder;

const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
    send_size: usize,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false, send_size: 0 }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }

    /// Entity bytes framed so far, excluding chunk size lines
    pub fn send_size(&self) -> usize {
        self.send_size
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Eof if self.eof => Ok(()),
            PayloadItem::Chunk(_) if self.eof => Err(SendError::invalid_state("chunked body already finished")),
            PayloadItem::Chunk(bytes) => {
                self.send_size += bytes.remaining();
                encode_chunk(bytes, dst)
            }
            PayloadItem::Eof => {
                self.eof = true;
                encode_last_chunk(dst);
                Ok(())
            }
        }
    }
}

/// Frames one chunk into `dst`, writing nothing for an empty fragment.
pub fn encode_chunk<D: Buf>(mut bytes: D, dst: &mut BytesMut) -> Result<(), SendError> {
    let size = bytes.remaining();
    if size == 0 {
        return Ok(());
    }

    write!(helper::Writer(dst), "{size:x}\r\n")?;
    dst.reserve(size + 2);
    while bytes.has_remaining() {
        let chunk = bytes.chunk();
        let len = chunk.len();
        dst.put_slice(chunk);
        bytes.advance(len);
    }
    dst.extend_from_slice(b"\r\n");
    Ok(())
}

/// Writes the zero sized chunk terminating a chunked body.
pub fn encode_last_chunk(dst: &mut BytesMut) {
    dst.extend_from_slice(LAST_CHUNK);
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_chunk_framing() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello world, chunked")), &mut dst).unwrap();
        assert_eq!(&dst[..], b"14\r\nhello world, chunked\r\n");
        assert_eq!(encoder.send_size(), 20);
    }

    #[test]
    fn test_empty_fragment_is_skipped() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::new()), &mut dst).unwrap();
        assert!(dst.is_empty());
        assert!(!encoder.is_finish());
    }

    #[test]
    fn test_eof_written_once() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"a")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        assert_eq!(&dst[..], b"1\r\na\r\n0\r\n\r\n");
        assert!(encoder.is_finish());

        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        assert_eq!(&dst[..], b"1\r\na\r\n0\r\n\r\n");

        assert!(encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"b")), &mut dst).is_err());
        assert_eq!(&dst[..], b"1\r\na\r\n0\r\n\r\n");
    }

    #[test]
    fn test_free_functions() {
        let mut dst = BytesMut::new();
        encode_chunk(&b"0123456789abcdef"[..], &mut dst).unwrap();
        encode_last_chunk(&mut dst);
        assert_eq!(&dst[..], b"10\r\n0123456789abcdef\r\n0\r\n\r\n");
    }
}
