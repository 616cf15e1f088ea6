//! listd: lifecycle coordination for a single HTTP listening endpoint.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod storage;

pub use config::DaemonConfig;
pub use http::HttpServer;
pub use lifecycle::{Coordinator, Exit, ListenerTask, Termination};
