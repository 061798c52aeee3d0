//! Hostgate Server
//!
//! This crate puts a narrow HTTP front-end on a host that can only run one
//! script at a time from one thread. Requests are classified by path, script
//! executions are marshalled onto the host thread, and every answer goes
//! back as the same JSON envelope.

pub mod config;
pub mod http_router;
pub mod http_server;
pub mod lifecycle;
pub mod resource_limits;
pub mod runtime;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use http_router::{IncomingRequest, Operation, Router};
pub use http_server::HttpServer;
pub use lifecycle::{Gateway, ListenerState};
pub use resource_limits::ExecutionLimits;
pub use runtime::{BoaHost, HostProxy, ScriptHost};
