//! Body decoding dispatch.
//!
//! The message decoder picks one framing per message from the intercepted headers:
//! a `Content-Length` entity, a chunked body, or no body at all.

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{KeyValueList, ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    /// Yields EOF right away
    NoBody,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    /// Chunked body; the advertised `trailer` field is kept if it follows the last chunk.
    pub fn chunked(trailer: Option<String>) -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::with_trailer(trailer)) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody)
    }

    /// Bytes owed for the chunk currently in progress, zero outside a chunk.
    pub fn chunked_remain(&self) -> u64 {
        match &self.kind {
            Kind::Chunked(chunked_decoder) => chunked_decoder.remaining_size(),
            _ => 0,
        }
    }

    /// Entity bytes of a fixed-length payload already sitting in `src`.
    pub fn buffered(&self, src: &BytesMut) -> u64 {
        match &self.kind {
            Kind::Length(length_decoder) => length_decoder.buffered(src),
            _ => 0,
        }
    }

    /// Takes the trailer fields captured by a chunked payload.
    pub fn take_trailers(&mut self) -> KeyValueList {
        match &mut self.kind {
            Kind::Chunked(chunked_decoder) => chunked_decoder.take_trailers(),
            _ => KeyValueList::new(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}
