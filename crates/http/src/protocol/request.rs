//! HTTP request line and decoded request accessors.

use http::{Method, Version};

use crate::protocol::message::parse_version;
use crate::protocol::{HttpMessage, KeyValueList, ParseError, StartLine};

/// `METHOD SP URL SP HTTP/1.x`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    url: String,
    version: Version,
}

impl RequestLine {
    pub fn new(method: Method, url: impl Into<String>, version: Version) -> Self {
        Self { method, url: url.into(), version }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> Version {
        self.version
    }
}

impl StartLine for RequestLine {
    fn parse(line: &str) -> Result<Self, ParseError> {
        let mut parts = line.split(' ').filter(|part| !part.is_empty());

        let (Some(method), Some(url), Some(version), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::invalid_start_line(format!("expect `METHOD URL VERSION`, got `{line}`")));
        };

        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
        let version = parse_version(version)?;

        Ok(Self { method, url: url.to_owned(), version })
    }
}

/// A decoded HTTP request
pub type Request = HttpMessage<RequestLine>;

impl HttpMessage<RequestLine> {
    pub fn method(&self) -> &Method {
        self.line.method()
    }

    /// The raw request target, query string included
    pub fn url(&self) -> &str {
        self.line.url()
    }

    pub fn version(&self) -> Version {
        self.line.version()
    }

    /// The request target without its query string
    pub fn path(&self) -> &str {
        let url = self.line.url();
        url.split_once('?').map_or(url, |(path, _)| path)
    }

    /// The query string without the leading `?`
    pub fn query(&self) -> Option<&str> {
        self.line.url().split_once('?').map(|(_, query)| query)
    }
}

/// The head of an outgoing request: request line plus caller supplied headers.
#[derive(Debug, Clone)]
pub struct RequestHead {
    line: RequestLine,
    headers: KeyValueList,
}

impl RequestHead {
    pub fn new(line: RequestLine, headers: KeyValueList) -> Self {
        Self { line, headers }
    }

    pub fn line(&self) -> &RequestLine {
        &self.line
    }

    pub fn headers(&self) -> &KeyValueList {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut KeyValueList {
        &mut self.headers
    }
}
