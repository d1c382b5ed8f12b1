//! Streams a response as chunks and calls itself with the blocking client.

use std::time::Duration;

use embed_http::client::{ClientRequest, HttpClient};
use embed_http::protocol::KeyValueList;
use embed_web::router::{get, Router};
use embed_web::{handler_fn, Server};
use http::StatusCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = Router::builder()
        .route(
            "/count/:n",
            get(handler_fn(|req, writer| {
                let n: usize = req.param("n").unwrap_or("3").parse()?;
                let headers = KeyValueList::new();

                writer.send_response_chunk(StatusCode::OK, b"", &headers, true, false)?;
                for i in 0..n {
                    writer.send_response_chunk(StatusCode::OK, format!("{i}\n").as_bytes(), &headers, false, false)?;
                }
                writer.send_response_chunk(StatusCode::OK, b"", &headers, false, true)?;
                Ok(())
            })),
        )
        .build();

    let mut handle = Server::builder()
        .router(router)
        .address("127.0.0.1:0")
        .accept_poll_interval(Duration::from_millis(5))
        .build()
        .expect("invalid server setup")
        .start()
        .expect("failed to start server");

    let url = format!("http://{}/count/5", handle.local_addr());
    match HttpClient::new().send(ClientRequest::get(url)) {
        Ok(response) => info!(status = %response.status(), body = ?response.entity(), "received"),
        Err(e) => error!(cause = %e, "request failed"),
    }

    let callback = HttpClient::new().send_with_callback(
        ClientRequest::get(format!("http://{}/count/oops", handle.local_addr())),
        |result| match result {
            Ok(response) => info!(status = %response.status(), "callback received"),
            Err(e) => error!(cause = %e, "callback request failed"),
        },
    );
    if let Ok(join) = callback {
        let _ = join.join();
    }

    if let Err(e) = handle.stop() {
        error!(cause = %e, "failed to stop server");
    }
}
