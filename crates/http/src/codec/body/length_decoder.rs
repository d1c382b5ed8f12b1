//! `Content-Length` framed entities.
//!
//! The entity is handed out in one piece: nothing is consumed from the source buffer
//! until all `Content-Length` bytes are present, so a short read leaves the buffer
//! untouched for the next attempt.

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Emits a fixed-size entity as one chunk followed by EOF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// The number of bytes still to be delivered, zero once the entity was emitted
    length: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    /// Entity bytes available in `src` that belong to this payload
    pub fn buffered(&self, src: &BytesMut) -> u64 {
        self.length.min(src.len() as u64)
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// `Ok(None)` until the whole entity is buffered, then the entity, then EOF.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.length == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        let Ok(length) = usize::try_from(self.length) else {
            return Err(ParseError::invalid_content_length("content length exceeds addressable memory"));
        };

        if src.len() < length {
            return Ok(None);
        }

        let bytes = src.split_to(length).freeze();
        self.length = 0;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_pipelined_bytes() {
        let mut buffer = BytesMut::from(&b"0123456789GET / HTTP/1.1\r\n"[..]);

        let mut length_decoder = LengthDecoder::new(10);
        let payload = length_decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(payload.is_chunk());

        assert_eq!(&payload.as_bytes().unwrap()[..], b"0123456789");
        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n");

        assert!(length_decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }

    #[test]
    fn waits_for_whole_entity() {
        let mut buffer = BytesMut::from(&b"hello"[..]);
        let mut length_decoder = LengthDecoder::new(10);

        assert!(length_decoder.decode(&mut buffer).unwrap().is_none());
        assert_eq!(length_decoder.buffered(&buffer), 5);
        assert_eq!(&buffer[..], b"hello");

        buffer.extend_from_slice(b"world!");
        let payload = length_decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&payload.as_bytes().unwrap()[..], b"helloworld");
        assert_eq!(&buffer[..], b"!");
    }

    #[test]
    fn zero_length() {
        let mut buffer = BytesMut::new();
        assert!(LengthDecoder::new(0).decode(&mut buffer).unwrap().unwrap().is_eof());
    }
}
