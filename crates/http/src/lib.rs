//! A blocking HTTP/1.x framing engine for small servers and clients
//!
//! This crate reconstructs HTTP messages from a stream of fixed-size socket reads and
//! writes them back out. It has no async runtime: everything runs on plain threads
//! over a blocking [`Transport`](connection::Transport), which keeps it usable on
//! constrained targets where one worker thread per connection is the norm.
//!
//! # Features
//!
//! - Resumable parsing across arbitrary read boundaries
//! - `Content-Length` and chunked bodies, including an advertised trailer field
//! - Keep-alive negotiation with clamped `timeout` / `max` parameters
//! - Bounded inputs: every line, header and message has a configured size limit
//! - A small blocking client for `GET`, `POST`, `PUT` and `DELETE`
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use embed_http::codec::RequestDecoder;
//! use embed_http::connection::{ConnectionState, KeepAliveConfig};
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(
//!     "GET /device/42/status HTTP/1.1\r\nConnection: keep-alive\r\nKeep-Alive: timeout=10, max=3\r\n\r\n",
//! );
//!
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.path(), "/device/42/status");
//!
//! let mut state = ConnectionState::new(KeepAliveConfig::default());
//! let timeout = state.on_request(request.fields());
//! assert_eq!(timeout.map(|t| t.as_secs()), Some(10));
//! assert_eq!(state.remaining_requests(), 2);
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: message types, key/value lists, limits and errors
//! - [`codec`]: the incremental decoders and the encoders
//! - [`connection`]: keep-alive state and the transport abstraction
//! - [`client`]: the blocking client session
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - No TLS, use a reverse proxy or wrap the transport
//! - WebSocket upgrades are only detected, never performed

pub mod client;
pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
