//! Core HTTP protocol abstractions.
//!
//! # Architecture
//!
//! - **Key/value storage** ([`keyvalue`]): ordered header and parameter lists
//!   - [`KeyValueList`]: insertion ordered, duplicate keys allowed, bounded entries
//!
//! - **Message Handling** ([`message`]): decoded messages and payload items
//!   - [`HttpMessage`]: start line, headers, trailers and entity of one message
//!   - [`Message`]: outgoing head or payload item fed to the encoders
//!   - [`PayloadItem`] / [`PayloadSize`]: payload pieces and framing kind
//!
//! - **Requests** ([`request`]) and **Responses** ([`response`])
//!   - [`RequestLine`], [`Request`], [`RequestHead`]
//!   - [`StatusLine`], [`Response`], [`ResponseHead`]
//!
//! - **Limits** ([`limits`]): [`ParserLimits`]
//!
//! - **Error Handling** ([`error`]):
//!   - [`HttpError`]: Top-level error type
//!   - [`ParseError`]: Message parsing errors
//!   - [`SendError`]: Message sending errors

pub mod keyvalue;
pub use keyvalue::KeyValue;
pub use keyvalue::KeyValueList;

pub mod message;
pub use message::HttpMessage;
pub use message::Message;
pub use message::MessageFields;
pub use message::PayloadItem;
pub use message::PayloadSize;
pub use message::StartLine;

mod request;
pub use request::Request;
pub use request::RequestHead;
pub use request::RequestLine;

mod response;
pub use response::Response;
pub use response::ResponseHead;
pub use response::StatusLine;

mod limits;
pub use limits::ParserLimits;

mod error;
pub use error::HttpError;
pub use error::KeyValueError;
pub use error::ParseError;
pub use error::SendError;
