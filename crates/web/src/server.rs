//! Server assembly and lifecycle.
//!
//! [`Server::builder`] collects the configuration and the [`Router`]; [`Server::start`]
//! binds the listening socket, spawns the worker pool and the listener thread and
//! returns a [`ServerHandle`] that stops them again.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embed_http::connection::KeepAliveConfig;
use embed_http::protocol::ParserLimits;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::listener::Listener;
use crate::pool::WorkerPool;
use crate::router::Router;
use crate::session::Session;

#[derive(Debug)]
pub struct ServerBuilder {
    config: ServerConfig,
    router: Option<Router>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { config: ServerConfig::default(), router: None }
    }

    /// Replaces the whole configuration, e.g. one loaded with [`ServerConfig::from_json`]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn max_pending_connections(mut self, max: usize) -> Self {
        self.config.max_pending_connections = max;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    pub fn accept_poll_interval(mut self, interval: Duration) -> Self {
        self.config.accept_poll_interval_ms = interval.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn limits(mut self, limits: ParserLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;

        let config = self.config;
        for (name, value) in [
            ("workers", config.workers),
            ("queue_capacity", config.queue_capacity),
            ("max_pending_connections", config.max_pending_connections),
            ("read_buffer_size", config.read_buffer_size),
        ] {
            if value == 0 {
                return Err(ServerBuildError::InvalidConfig { reason: format!("{name} must be positive") });
            }
        }

        Ok(Server { config: Arc::new(config), router: Arc::new(router) })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },
    #[error("failed to spawn server thread: {source}")]
    Spawn {
        #[from]
        source: io::Error,
    },
    #[error("server already stopped")]
    AlreadyStopped,
}

#[derive(Debug)]
pub struct Server {
    config: Arc<ServerConfig>,
    router: Arc<Router>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the configured address and starts serving in background threads.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound or a thread cannot be spawned.
    pub fn start(self) -> Result<ServerHandle, ServerError> {
        let address = self.config.address.clone();
        let tcp_listener =
            TcpListener::bind(&address).map_err(|source| ServerError::Bind { address: address.clone(), source })?;
        let local_addr = tcp_listener.local_addr().map_err(|source| ServerError::Bind { address, source })?;
        info!(%local_addr, workers = self.config.workers, "start listening");

        let router = Arc::clone(&self.router);
        let config = Arc::clone(&self.config);
        let pool = WorkerPool::new(self.config.workers, self.config.queue_capacity, move |stream: TcpStream| {
            serve_connection(stream, &router, &config);
        })?;

        let running = Arc::new(AtomicBool::new(true));
        let listener = Listener::new(
            tcp_listener,
            pool.dispatcher(),
            Arc::clone(&running),
            self.config.max_pending_connections,
            self.config.accept_poll_interval(),
            self.config.keep_alive.default_timeout(),
        );
        let listener = thread::Builder::new().name("http-listener".into()).spawn(move || listener.run())?;

        Ok(ServerHandle { local_addr, running, listener: Some(listener), pool })
    }

    /// Starts the server and blocks the calling thread while it runs.
    pub fn run(self) -> Result<(), ServerError> {
        self.start()?.wait();
        Ok(())
    }
}

fn serve_connection(stream: TcpStream, router: &Router, config: &ServerConfig) {
    let peer = stream.peer_addr().map_or_else(|_| "unknown".to_owned(), |addr| addr.to_string());

    match Session::new(stream, router, config).run() {
        Ok(served) => debug!(%peer, served, "connection closed"),
        Err(e) => warn!(cause = %e, %peer, "connection failed"),
    }
}

/// Controls a started server; dropping it stops the server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    listener: Option<JoinHandle<()>>,
    pool: WorkerPool<TcpStream>,
}

impl ServerHandle {
    /// The bound address, useful when the configured port was `0`
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    /// Stops accepting, wakes every worker and waits for in-flight connections to finish.
    ///
    /// # Errors
    ///
    /// [`ServerError::AlreadyStopped`] on a second call.
    pub fn stop(&mut self) -> Result<(), ServerError> {
        let listener = self.listener.take().ok_or(ServerError::AlreadyStopped)?;

        self.running.store(false, Ordering::Release);
        if listener.join().is_err() {
            error!("listener thread panicked");
        }
        self.pool.stop();

        info!(local_addr = %self.local_addr, "server stopped");
        Ok(())
    }

    /// Blocks until the listener thread exits.
    fn wait(mut self) {
        if let Some(listener) = self.listener.take() {
            if listener.join().is_err() {
                error!("listener thread panicked");
            }
        }
        self.pool.stop();
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.listener.is_some() {
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_fn;
    use crate::router::get;
    use http::StatusCode;

    fn router() -> Router {
        Router::builder()
            .route(
                "/",
                get(handler_fn(|_req, writer| {
                    writer.send_text(StatusCode::OK, "hello world")?;
                    Ok(())
                })),
            )
            .build()
    }

    #[test]
    fn build_requires_router() {
        assert!(matches!(Server::builder().build(), Err(ServerBuildError::MissingRouter)));
    }

    #[test]
    fn build_rejects_zero_sizes() {
        let result = Server::builder().router(router()).workers(0).build();
        assert!(matches!(result, Err(ServerBuildError::InvalidConfig { reason }) if reason.contains("workers")));

        let result = Server::builder().router(router()).queue_capacity(0).build();
        assert!(matches!(result, Err(ServerBuildError::InvalidConfig { .. })));
    }

    #[test]
    fn builder_setters() {
        let server = Server::builder()
            .router(router())
            .address("127.0.0.1:0")
            .workers(2)
            .accept_poll_interval(Duration::from_millis(3))
            .build()
            .unwrap();

        assert_eq!(server.config().address, "127.0.0.1:0");
        assert_eq!(server.config().workers, 2);
        assert_eq!(server.config().accept_poll_interval(), Duration::from_millis(3));
    }

    #[test]
    fn bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = taken.local_addr().unwrap().to_string();

        let result = Server::builder().router(router()).address(address).build().unwrap().start();
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[test]
    fn stop_twice() {
        let mut handle = Server::builder().router(router()).address("127.0.0.1:0").build().unwrap().start().unwrap();

        assert!(handle.is_running());
        handle.stop().unwrap();
        assert!(!handle.is_running());
        assert!(matches!(handle.stop(), Err(ServerError::AlreadyStopped)));
    }
}
