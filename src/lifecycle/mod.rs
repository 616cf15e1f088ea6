//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Open storage → Bind listener → Register signals
//!
//! Running (task.rs, signals.rs, coordinator.rs):
//!     Spawn listener task → Spawn signal watcher
//!     → wait for first of {listener ended, termination requested}
//!
//! Shutdown (coordinator.rs, closer.rs):
//!     Signal path: close resource → request stop → drain (bounded) → Closed | ForceClosed
//!     Fault path:  close resource → Faulted
//! ```
//!
//! # Design Decisions
//! - Ordered startup: storage first, then listener, then signal handlers
//! - Termination is an explicit value handed to the coordinator, not a global
//! - Shutdown has a single deadline: forced close after the grace period

pub mod closer;
pub mod coordinator;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod task;

pub use closer::{Resource, ResourceCloser, ResourceError};
pub use coordinator::{Coordinator, Exit, LifecycleState, Outcome, EXIT_CLEAN, EXIT_FAILURE};
pub use shutdown::Termination;
pub use signals::SignalWatcher;
pub use startup::{StartupError, Started};
pub use task::ListenerTask;
