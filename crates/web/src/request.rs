//! Request handling module that provides access to a decoded request and its parameters.
//!
//! - `RequestContext`: the request plus the parameters the router extracted for it

use bytes::Bytes;
use embed_http::protocol::{KeyValueList, Request};
use http::{Method, Version};

/// Represents the context of an HTTP request, providing access to both the request
/// and the parameters captured from its path and query string.
///
/// The lifetime ties the context to the request and the match it was built from.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'req> {
    request: &'req Request,
    params: &'req KeyValueList,
}

impl<'req> RequestContext<'req> {
    pub fn new(request: &'req Request, params: &'req KeyValueList) -> Self {
        Self { request, params }
    }

    /// Returns the underlying decoded request
    pub fn request(&self) -> &'req Request {
        self.request
    }

    pub fn method(&self) -> &'req Method {
        self.request.method()
    }

    /// Returns the raw request target, query string included
    pub fn url(&self) -> &'req str {
        self.request.url()
    }

    pub fn path(&self) -> &'req str {
        self.request.path()
    }

    pub fn query(&self) -> Option<&'req str> {
        self.request.query()
    }

    pub fn version(&self) -> Version {
        self.request.version()
    }

    pub fn headers(&self) -> &'req KeyValueList {
        self.request.headers()
    }

    /// Looks a header up ignoring the case of its name
    pub fn header(&self, name: &str) -> Option<&'req str> {
        self.request.headers().get_ignore_case(name)
    }

    pub fn entity(&self) -> &'req Bytes {
        self.request.entity()
    }

    /// Path captures first, query parameters after them
    pub fn params(&self) -> &'req KeyValueList {
        self.params
    }

    /// The first parameter named `name`
    pub fn param(&self, name: &str) -> Option<&'req str> {
        self.params.get(name)
    }
}
