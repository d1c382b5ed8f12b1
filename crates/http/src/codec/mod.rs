//! HTTP codec module for encoding and decoding HTTP messages
//!
//! This module provides incremental HTTP message processing for both directions of
//! an exchange. Decoders implement [`tokio_util::codec::Decoder`] and encoders
//! implement [`tokio_util::codec::Encoder`], both over [`bytes::BytesMut`].
//!
//! # Architecture
//!
//! - Decoding:
//!   - [`MessageDecoder`]: resumable parser producing whole messages, with the
//!     [`RequestDecoder`] and [`ResponseDecoder`] aliases
//!   - Header lines via the [`header`] module
//!   - Payload decoding via the [`body`] module
//!
//! - Encoding:
//!   - [`MessageEncoder`]: writes a head followed by its payload items, with the
//!     [`ResponseEncoder`] and [`RequestEncoder`] aliases
//!   - [`encode_chunk`] / [`encode_last_chunk`] for hand written chunked bodies
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use embed_http::codec::ResponseEncoder;
//! use embed_http::protocol::ResponseHead;
//! use http::StatusCode;
//!
//! let mut encoder = ResponseEncoder::new();
//! let mut buffer = BytesMut::new();
//! encoder.encode_full(ResponseHead::new(StatusCode::OK), b"hi", &mut buffer).unwrap();
//! assert_eq!(&buffer[..], b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
//! ```

pub mod body;
pub mod header;
mod message_decoder;
mod message_encoder;

pub use body::{ChunkedDecoder, ChunkedEncoder, encode_chunk, encode_last_chunk};
pub use message_decoder::{MessageDecoder, ParseCursor, ParseState, RequestDecoder, ResponseDecoder};
pub use message_encoder::{MessageEncoder, RequestEncoder, ResponseEncoder};
