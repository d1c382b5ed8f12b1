use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// Failures of the message parser.
///
/// Running out of input is not represented here: decoders report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("message size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeMessage { current_size: usize, max_size: usize },

    #[error("line too long, current: {current_size} exceed the limit {max_size}")]
    TooLongLine { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid start line: {reason}")]
    InvalidStartLine { reason: String },

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http version: {0}")]
    InvalidVersion(String),

    #[error("invalid status code: {0}")]
    InvalidStatus(String),

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid chunk: {reason}")]
    InvalidChunk { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_message(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeMessage { current_size, max_size }
    }

    pub fn too_long_line(current_size: usize, max_size: usize) -> Self {
        Self::TooLongLine { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_start_line<S: ToString>(str: S) -> Self {
        Self::InvalidStartLine { reason: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_chunk<S: ToString>(str: S) -> Self {
        Self::InvalidChunk { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Whether the failure comes from a configured size bound rather than malformed input.
    pub fn is_too_large(&self) -> bool {
        matches!(self, Self::TooLargeMessage { .. })
    }
}

impl From<KeyValueError> for ParseError {
    fn from(e: KeyValueError) -> Self {
        Self::invalid_header(e)
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("invalid header: {source}")]
    InvalidHeader {
        #[from]
        source: KeyValueError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_state<S: ToString>(str: S) -> Self {
        Self::InvalidState { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyValueError {
    #[error("key length {len} exceed the limit {max_len}")]
    TooLongKey { len: usize, max_len: usize },

    #[error("value length {len} exceed the limit {max_len}")]
    TooLongValue { len: usize, max_len: usize },

    #[error("empty key")]
    EmptyKey,
}
