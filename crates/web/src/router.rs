//! Request routing.
//!
//! Routes are `(method, pattern)` pairs tried in registration order. A pattern is split
//! on `/` into segments; a request path matches when it has the same number of segments
//! and every position is either equal or a `:name` capture on one side. Captured values
//! and query string parameters end up in one parameter list handed to the handler.
//!
//! ```
//! use embed_web::router::{get, Router};
//! use embed_web::handler_fn;
//! use http::Method;
//!
//! let router = Router::builder()
//!     .route("/device/:id/status", get(handler_fn(|_req, _writer| Ok(()))))
//!     .build();
//!
//! let matched = router.find(&Method::GET, "/device/42/status?verbose=1").unwrap();
//! assert_eq!(matched.params().get("id"), Some("42"));
//! assert_eq!(matched.params().get("verbose"), Some("1"));
//! ```

use std::fmt;

use embed_http::protocol::{KeyValueError, KeyValueList, Request};
use http::Method;
use thiserror::Error;
use tracing::{debug, warn};

use crate::handler::{HandlerError, RequestHandler};
use crate::request::RequestContext;
use crate::response::ResponseWriter;

/// Upper bound for the number of parameters collected for one request
pub const MAX_PARAMS: usize = 32;

struct Route {
    method: Method,
    pattern: String,
    segments: Vec<String>,
    handler: Box<dyn RequestHandler>,
}

/// Routing table plus per-method fallback handlers
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    defaults: Vec<(Method, Box<dyn RequestHandler>)>,
}

/// A matched handler together with the parameters collected for the request
pub struct RouteMatch<'router> {
    handler: &'router dyn RequestHandler,
    params: KeyValueList,
    is_default: bool,
}

/// Outcome of [`Router::dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    NotFound,
}

/// A query string pair that could not be added to the parameter list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("missing `=` in query parameter `{pair}`")]
    MissingEquals { pair: String },

    #[error("empty key in query parameter `{pair}`")]
    EmptyKey { pair: String },

    #[error("too many parameters, the limit is {max}")]
    TooManyParams { max: usize },

    #[error("invalid query parameter: {source}")]
    KeyValue {
        #[from]
        source: KeyValueError,
    },
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/').filter(|segment| !segment.is_empty()).map(str::to_owned).collect()
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Registers a route; an existing route with the same method and pattern gets the new
    /// handler but keeps its position.
    pub fn register(&mut self, method: Method, pattern: &str, handler: impl RequestHandler + 'static) {
        self.insert(method, pattern, Box::new(handler));
    }

    fn insert(&mut self, method: Method, pattern: &str, handler: Box<dyn RequestHandler>) {
        let segments = split_segments(pattern);

        match self.routes.iter_mut().find(|route| route.method == method && route.segments == segments) {
            Some(route) => {
                debug!(%method, pattern, "replace route handler");
                route.handler = handler;
            }
            None => {
                debug!(%method, pattern, "register route");
                self.routes.push(Route { method, pattern: pattern.to_owned(), segments, handler });
            }
        }
    }

    /// Removes the route registered for `method` and `pattern`, returns whether one existed.
    pub fn deregister(&mut self, method: &Method, pattern: &str) -> bool {
        let segments = split_segments(pattern);
        let before = self.routes.len();
        self.routes.retain(|route| !(route.method == *method && route.segments == segments));
        before != self.routes.len()
    }

    /// Sets the handler used for `method` when no route matches.
    pub fn register_default(&mut self, method: Method, handler: impl RequestHandler + 'static) {
        self.insert_default(method, Box::new(handler));
    }

    fn insert_default(&mut self, method: Method, handler: Box<dyn RequestHandler>) {
        match self.defaults.iter_mut().find(|(m, _)| *m == method) {
            Some((_, existing)) => *existing = handler,
            None => self.defaults.push((method, handler)),
        }
    }

    pub fn deregister_default(&mut self, method: &Method) -> bool {
        let before = self.defaults.len();
        self.defaults.retain(|(m, _)| m != method);
        before != self.defaults.len()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Finds the handler for a request target, falling back to the default handler of
    /// the method. Malformed query pairs are logged and skipped.
    pub fn find(&self, method: &Method, url: &str) -> Option<RouteMatch<'_>> {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();

        let mut route_match = self
            .routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                match_segments(&route.segments, &segments)
                    .map(|params| RouteMatch { handler: route.handler.as_ref(), params, is_default: false })
            })
            .or_else(|| {
                self.defaults.iter().find(|(m, _)| m == method).map(|(_, handler)| RouteMatch {
                    handler: handler.as_ref(),
                    params: KeyValueList::new(),
                    is_default: true,
                })
            })?;

        if let Some(query) = query {
            for e in parse_query(query, &mut route_match.params) {
                warn!(cause = %e, url, "skip query parameter");
            }
        }

        Some(route_match)
    }

    /// Routes the request and invokes the matched handler.
    ///
    /// # Errors
    ///
    /// Returns the handler's error; the caller decides what reaches the peer.
    pub fn dispatch(&self, request: &Request, writer: &mut ResponseWriter<'_>) -> Result<Dispatch, HandlerError> {
        let Some(route_match) = self.find(request.method(), request.url()) else {
            debug!(method = %request.method(), url = request.url(), "no route matched");
            return Ok(Dispatch::NotFound);
        };

        let ctx = RequestContext::new(request, &route_match.params);
        route_match.handler.invoke(&ctx, writer)?;
        Ok(Dispatch::Handled)
    }
}

fn match_segments(pattern: &[String], path: &[&str]) -> Option<KeyValueList> {
    if pattern.len() != path.len() {
        return None;
    }

    let mut params = KeyValueList::new();
    for (expected, actual) in pattern.iter().zip(path) {
        if expected == actual {
            continue;
        }

        let (name, value) = match (expected.strip_prefix(':'), actual.strip_prefix(':')) {
            (Some(name), None) => (name, *actual),
            (None, Some(name)) => (name, expected.as_str()),
            _ => return None,
        };

        if let Err(e) = params.push(name, value) {
            warn!(cause = %e, name, "path parameter rejected");
            return None;
        }
    }

    Some(params)
}

/// Appends the `k=v` pairs of `query` to `params`.
///
/// Pairs that cannot be added are skipped and reported; the remaining pairs are still
/// collected. Empty pairs (`a=1&&b=2`) are ignored.
pub fn parse_query(query: &str, params: &mut KeyValueList) -> Vec<QueryError> {
    let mut errors = Vec::new();

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            errors.push(QueryError::MissingEquals { pair: pair.to_owned() });
            continue;
        };

        if key.is_empty() {
            errors.push(QueryError::EmptyKey { pair: pair.to_owned() });
            continue;
        }

        if params.len() >= MAX_PARAMS {
            errors.push(QueryError::TooManyParams { max: MAX_PARAMS });
            break;
        }

        if let Err(e) = params.push(key, value) {
            errors.push(e.into());
        }
    }

    errors
}

impl RouteMatch<'_> {
    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler
    }

    pub fn params(&self) -> &KeyValueList {
        &self.params
    }

    /// Whether the per-method default handler was selected
    pub fn is_default(&self) -> bool {
        self.is_default
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.iter().map(|route| (&route.method, &route.pattern)).collect::<Vec<_>>())
            .field("defaults", &self.defaults.iter().map(|(method, _)| method).collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch").field("params", &self.params).field("is_default", &self.is_default).finish()
    }
}

/// A handler bound to a method, waiting for its pattern in [`RouterBuilder::route`]
pub struct RouteItem {
    method: Method,
    handler: Box<dyn RequestHandler>,
}

impl fmt::Debug for RouteItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteItem").field("method", &self.method).finish_non_exhaustive()
    }
}

macro_rules! method_route {
    ($name:ident, $method:ident) => {
        pub fn $name<H: RequestHandler + 'static>(handler: H) -> RouteItem {
            RouteItem { method: Method::$method, handler: Box::new(handler) }
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
method_route!(patch, PATCH);

/// Collects routes in order before the server starts
#[derive(Debug, Default)]
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: &str, item: RouteItem) -> Self {
        self.router.insert(item.method, pattern, item.handler);
        self
    }

    pub fn default_route(mut self, item: RouteItem) -> Self {
        self.router.insert_default(item.method, item.handler);
        self
    }

    pub fn build(self) -> Router {
        self.router
    }
}
