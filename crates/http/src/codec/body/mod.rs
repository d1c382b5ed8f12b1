//! Message bodies, framed by `Content-Length` or chunked `Transfer-Encoding`.
//!
//! Decoding side:
//! - [`ChunkedDecoder`]: `<hex-size>CRLF<data>CRLF` chunks, the terminal chunk and an
//!   advertised trailer, one byte state at a time
//! - [`LengthDecoder`]: a fixed-size entity, emitted once complete
//! - [`PayloadDecoder`]: picks one of the two, or no body
//!
//! Encoding side:
//! - [`ChunkedEncoder`] with the [`encode_chunk`] / [`encode_last_chunk`] helpers
//! - [`LengthEncoder`]: checks the written bytes against the announced length
//! - [`PayloadEncoder`]: picks one of the two from a [`PayloadSize`](crate::protocol::PayloadSize)

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use chunked_decoder::ChunkedDecoder;
pub use chunked_encoder::{ChunkedEncoder, encode_chunk, encode_last_chunk};
pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
