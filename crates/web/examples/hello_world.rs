use embed_web::router::{get, Router};
use embed_web::{handler_fn, Server};
use http::StatusCode;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = Router::builder()
        .route(
            "/",
            get(handler_fn(|_req, writer| {
                writer.send_text(StatusCode::OK, "hello world")?;
                Ok(())
            })),
        )
        .build();

    let server = Server::builder().router(router).address("127.0.0.1:3000").build().expect("invalid server setup");
    if let Err(e) = server.run() {
        error!(cause = %e, "server failed");
    }
}
