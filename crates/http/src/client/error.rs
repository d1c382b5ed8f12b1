use std::io;

use http::Method;
use thiserror::Error;

use crate::protocol::{ParseError, SendError};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported method {0}")]
    UnsupportedMethod(Method),

    #[error("entity size {size} exceed the limit {max_size}")]
    TooLargeEntity { size: usize, max_size: usize },

    #[error("connect to {addr} failed: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("send request error: {source}")]
    Request {
        #[from]
        source: SendError,
    },

    #[error("read response error: {source}")]
    Response {
        #[from]
        source: ParseError,
    },

    #[error("connection closed before the response was complete")]
    ConnectionClosed,

    #[error("response exceed the limit {max_size}")]
    TooLargeResponse { max_size: usize },
}

impl ClientError {
    pub fn invalid_url<U: ToString, R: ToString>(url: U, reason: R) -> Self {
        Self::InvalidUrl { url: url.to_string(), reason: reason.to_string() }
    }

    pub fn connect<A: ToString>(addr: A, source: io::Error) -> Self {
        Self::Connect { addr: addr.to_string(), source }
    }
}
