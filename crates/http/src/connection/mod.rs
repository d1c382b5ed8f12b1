//! Connection lifecycle management
//!
//! This module tracks the state of one transport connection across its sequential
//! request/response exchanges.
//!
//! # Components
//!
//! - [`ConnectionState`]: keep-alive flag, negotiated timeout and remaining request budget
//! - [`KeepAliveConfig`]: defaults and clamping bounds for negotiated values
//! - [`KeepAliveParams`]: parsed `Keep-Alive` header parameters
//! - [`Transport`]: the blocking byte stream the session loops drive

mod keep_alive;
mod transport;

pub use keep_alive::ConnectionState;
pub use keep_alive::KeepAliveConfig;
pub use keep_alive::KeepAliveParams;
pub use transport::Transport;
