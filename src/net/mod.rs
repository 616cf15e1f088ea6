//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits, error classification)
//!     → connection.rs (lifecycle tracking)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked so a drain knows what it waits on
//! - Descriptor exhaustion backs off (backoff.rs) instead of failing

pub mod backoff;
pub mod connection;
pub mod listener;

pub use listener::{Listener, ListenerError};
