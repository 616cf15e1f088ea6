//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (hyper HTTP/1.1, header limits, graceful drain)
//!     → request.rs (request ID)
//!     → routes.rs or a caller supplied axum Router
//!     → Send to client
//! ```

pub mod request;
pub mod routes;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::HttpServer;
