//! HTTP header processing module for encoding and decoding headers
//!
//! # Components
//!
//! - [`HeaderDecoder`]: Decodes one header line at a time
//!   - Splits on the first colon and trims the value
//!   - Enforces the header count and key/value size limits
//!   - Intercepts the framing and connection headers
//!
//! - [`HeaderEncoder`]: Encodes response and request heads to bytes
//!   - Writes the start line and header block
//!   - Derives content-length and transfer-encoding from the payload size

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
