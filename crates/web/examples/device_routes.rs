//! Path parameters, query parameters, a request body and a fallback route.
//!
//! ```sh
//! curl -v 'http://127.0.0.1:3000/device/42/status?verbose=1'
//! curl -v -X PUT -d 'mode=eco' http://127.0.0.1:3000/device/42/config
//! curl -v http://127.0.0.1:3000/unknown
//! ```
//!
//! The server settings can be given as a JSON file in the first argument.

use embed_http::protocol::KeyValueList;
use embed_web::router::{get, put, Router};
use embed_web::{handler_fn, Server, ServerConfig};
use http::StatusCode;
use serde::Serialize;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Serialize)]
struct DeviceStatus<'a> {
    id: &'a str,
    online: bool,
    verbose: bool,
}

fn router() -> Router {
    Router::builder()
        .route(
            "/device/:id/status",
            get(handler_fn(|req, writer| {
                let status = DeviceStatus {
                    id: req.param("id").unwrap_or_default(),
                    online: true,
                    verbose: req.param("verbose") == Some("1"),
                };
                let body = serde_json::to_vec(&status)?;

                let mut headers = KeyValueList::new();
                headers.push("Content-Type", mime::APPLICATION_JSON.as_ref())?;
                writer.send_response(StatusCode::OK, &body, &headers)?;
                Ok(())
            })),
        )
        .route(
            "/device/:id/config",
            put(handler_fn(|req, writer| {
                let entity = String::from_utf8_lossy(req.entity());
                info!(id = req.param("id"), len = entity.len(), "update device config");
                writer.send_text(StatusCode::ACCEPTED, &format!("accepted: {entity}"))?;
                Ok(())
            })),
        )
        .default_route(get(handler_fn(|req, writer| {
            writer.send_text(StatusCode::NOT_FOUND, &format!("no device resource at {}", req.path()))?;
            Ok(())
        })))
        .build()
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path).expect("failed to read config file");
            ServerConfig::from_json(&json).expect("invalid config file")
        }
        None => ServerConfig { address: "127.0.0.1:3000".to_owned(), ..ServerConfig::default() },
    };

    let server = Server::builder().config(config).router(router()).build().expect("invalid server setup");
    if let Err(e) = server.run() {
        error!(cause = %e, "server failed");
    }
}
