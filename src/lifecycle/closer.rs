//! Release of the dependent resource during shutdown.

use std::future::Future;
use std::io;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::observability::metrics;

/// Errors a resource may report while closing. Never fatal to shutdown.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("close timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// An external resource the daemon must release on the way out.
///
/// `close` consumes the resource; implementations are expected to bound
/// their own close time.
pub trait Resource: Send {
    /// Short name used in logs and metrics.
    fn name(&self) -> &str {
        "resource"
    }

    fn close(self) -> impl Future<Output = Result<(), ResourceError>> + Send;
}

/// Owns a resource and closes it at most once.
#[derive(Debug)]
pub struct ResourceCloser<R> {
    resource: Option<R>,
}

impl<R: Resource> ResourceCloser<R> {
    pub fn new(resource: R) -> Self {
        Self {
            resource: Some(resource),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.resource.is_none()
    }

    /// Close the resource. Later calls are no-ops returning `Ok(())`.
    pub async fn close(&mut self) -> Result<(), ResourceError> {
        let Some(resource) = self.resource.take() else {
            tracing::debug!("Resource already closed");
            return Ok(());
        };

        let name = resource.name().to_string();
        let started = Instant::now();
        let result = resource.close().await;
        metrics::record_resource_close(&name, result.is_ok(), started);

        match &result {
            Ok(()) => tracing::info!(
                resource = %name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Resource closed"
            ),
            Err(e) => tracing::warn!(resource = %name, error = %e, "Failed to close resource"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Counting {
        closes: Arc<AtomicU32>,
        fail: bool,
    }

    impl Resource for Counting {
        async fn close(self) -> Result<(), ResourceError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ResourceError::Other("connection reset".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_double_close_is_noop() {
        let closes = Arc::new(AtomicU32::new(0));
        let mut closer = ResourceCloser::new(Counting {
            closes: closes.clone(),
            fail: false,
        });

        assert!(!closer.is_closed());
        closer.close().await.unwrap();
        closer.close().await.unwrap();

        assert!(closer.is_closed());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_close_is_not_retried() {
        let closes = Arc::new(AtomicU32::new(0));
        let mut closer = ResourceCloser::new(Counting {
            closes: closes.clone(),
            fail: true,
        });

        let err = closer.close().await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");

        assert!(closer.close().await.is_ok());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
