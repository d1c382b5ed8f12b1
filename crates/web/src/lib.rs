//! A small threaded HTTP/1.1 server built on `embed-http`.
//!
//! Connections are accepted by one listener thread and served by a fixed pool of worker
//! threads, each running a keep-alive aware session loop. Requests are routed by method
//! and path pattern, with `:name` segments captured as parameters.
//!
//! # Example
//!
//! ```no_run
//! use embed_web::router::{get, Router};
//! use embed_web::{handler_fn, Server};
//! use http::StatusCode;
//!
//! let router = Router::builder()
//!     .route(
//!         "/device/:id/status",
//!         get(handler_fn(|req, writer| {
//!             let body = format!("device {} is up", req.param("id").unwrap_or_default());
//!             writer.send_text(StatusCode::OK, &body)?;
//!             Ok(())
//!         })),
//!     )
//!     .build();
//!
//! Server::builder().router(router).address("127.0.0.1:8080").build().unwrap().run().unwrap();
//! ```

mod config;
mod handler;
mod listener;
pub mod pool;
mod request;
mod response;
pub mod router;
mod server;
pub mod session;

pub use config::ServerConfig;
pub use handler::{handler_fn, FnHandler, HandlerError, RequestHandler};
pub use request::RequestContext;
pub use response::ResponseWriter;
pub use server::{Server, ServerBuildError, ServerBuilder, ServerError, ServerHandle};
