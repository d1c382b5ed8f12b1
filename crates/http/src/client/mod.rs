//! Blocking HTTP client
//!
//! One [`HttpClient::send`] call performs a whole exchange on a fresh connection: connect,
//! write the request, read until the response is complete, close. Redirects are not
//! followed, a 3xx response is returned like any other.
//!
//! ```no_run
//! use embed_http::client::{ClientRequest, HttpClient};
//!
//! let client = HttpClient::new();
//! let response = client.send(ClientRequest::get("http://127.0.0.1:8080/device/42/status")).unwrap();
//! println!("{} {:?}", response.status(), response.entity());
//! ```

mod config;
mod error;
mod http_client;
mod request;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http_client::HttpClient;
pub use request::{BodyEncoding, ClientRequest};
