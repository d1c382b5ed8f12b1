//! HTTP status line, decoded response accessors and the outgoing response head.

use http::{StatusCode, Version};

use crate::protocol::message::parse_version;
use crate::protocol::{HttpMessage, KeyValueList, ParseError, StartLine};

/// `HTTP/1.x SP STATUS SP PHRASE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    version: Version,
    status: StatusCode,
    phrase: String,
}

impl StatusLine {
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }
}

impl StartLine for StatusLine {
    fn parse(line: &str) -> Result<Self, ParseError> {
        let (version, rest) =
            line.split_once(' ').ok_or_else(|| ParseError::invalid_start_line(format!("expect `VERSION STATUS`, got `{line}`")))?;
        let version = parse_version(version)?;

        let rest = rest.trim_start();
        let (status, phrase) = rest.split_once(' ').unwrap_or((rest, ""));
        let status = StatusCode::from_bytes(status.as_bytes()).map_err(|_| ParseError::InvalidStatus(status.to_owned()))?;

        Ok(Self { version, status, phrase: phrase.trim().to_owned() })
    }
}

/// A decoded HTTP response
pub type Response = HttpMessage<StatusLine>;

impl HttpMessage<StatusLine> {
    pub fn status(&self) -> StatusCode {
        self.line.status()
    }

    pub fn phrase(&self) -> &str {
        self.line.phrase()
    }

    pub fn version(&self) -> Version {
        self.line.version()
    }
}

/// The head of an outgoing response: status plus caller supplied headers.
///
/// Framing headers (`Content-Length`, `Transfer-Encoding`) are written by the encoder
/// from the payload size, so any the caller adds are replaced.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: StatusCode,
    headers: KeyValueList,
}

impl ResponseHead {
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: KeyValueList::new() }
    }

    pub fn with_headers(status: StatusCode, headers: KeyValueList) -> Self {
        Self { status, headers }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &KeyValueList {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut KeyValueList {
        &mut self.headers
    }
}
