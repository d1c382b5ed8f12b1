//! Request handlers bound to routes.
//!
//! A handler receives the [`RequestContext`] of a matched request and writes its
//! answer through the [`ResponseWriter`], either as one buffer or as a stream of chunks.
//! Plain closures become handlers through [`handler_fn`].

use std::error::Error;
use std::fmt;

use crate::request::RequestContext;
use crate::response::ResponseWriter;

pub type HandlerError = Box<dyn Error + Send + Sync>;

pub trait RequestHandler: Send + Sync {
    fn invoke(&self, req: &RequestContext<'_>, writer: &mut ResponseWriter<'_>) -> Result<(), HandlerError>;
}

impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    fn invoke(&self, req: &RequestContext<'_>, writer: &mut ResponseWriter<'_>) -> Result<(), HandlerError> {
        (**self).invoke(req, writer)
    }
}

/// a closure holder which acts as a [`RequestHandler`]
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&RequestContext<'_>, &mut ResponseWriter<'_>) -> Result<(), HandlerError> + Send + Sync,
{
    FnHandler { f }
}

impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&RequestContext<'_>, &mut ResponseWriter<'_>) -> Result<(), HandlerError> + Send + Sync,
{
    fn invoke(&self, req: &RequestContext<'_>, writer: &mut ResponseWriter<'_>) -> Result<(), HandlerError> {
        (self.f)(req, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use embed_http::protocol::{KeyValueList, Request, RequestLine};
    use http::{Method, StatusCode, Version};

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {}

    #[test]
    fn closure_is_handler() {
        let handler = handler_fn(|req, writer| {
            let body = format!("id={}", req.param("id").unwrap_or("none"));
            writer.send_response(StatusCode::OK, body.as_bytes(), &KeyValueList::new())?;
            Ok(())
        });
        assert_is_handler(&handler);

        let request = Request::new(RequestLine::new(Method::GET, "/", Version::HTTP_11), KeyValueList::new(), Bytes::new());
        let mut params = KeyValueList::new();
        params.push("id", "7").unwrap();
        let ctx = RequestContext::new(&request, &params);

        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out, ("close", None));
        let boxed: Box<dyn RequestHandler> = Box::new(handler);
        boxed.invoke(&ctx, &mut writer).unwrap();

        assert!(writer.is_finished());
        assert!(out.ends_with(b"\r\n\r\nid=7"));
    }
}
