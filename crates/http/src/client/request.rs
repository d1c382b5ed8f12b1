use bytes::Bytes;
use http::Method;

use crate::protocol::{KeyValueError, KeyValueList};

/// How a request entity is framed on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyEncoding {
    #[default]
    ContentLength,
    Chunked,
}

/// A request to send with [`HttpClient`](super::HttpClient).
#[derive(Debug, Clone)]
pub struct ClientRequest {
    method: Method,
    url: String,
    headers: KeyValueList,
    body: Bytes,
    encoding: BodyEncoding,
}

impl ClientRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: KeyValueList::new(), body: Bytes::new(), encoding: BodyEncoding::default() }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, url).body(body)
    }

    pub fn put(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::PUT, url).body(body)
    }

    /// Appends a header; `Host`, `Content-Type` and `Connection` set here replace the defaults.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self, KeyValueError> {
        self.headers.push(key, value)?;
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sends the entity with `Transfer-Encoding: chunked`.
    pub fn chunked(mut self) -> Self {
        self.encoding = BodyEncoding::Chunked;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &KeyValueList {
        &self.headers
    }

    pub fn entity(&self) -> &Bytes {
        &self.body
    }

    pub fn encoding(&self) -> BodyEncoding {
        self.encoding
    }
}
