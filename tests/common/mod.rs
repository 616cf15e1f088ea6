//! Shared stubs for lifecycle and server tests.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use listd::config::ListenerConfig;
use listd::http::HttpServer;
use listd::lifecycle::{ListenerTask, Resource, ResourceError};
use listd::net::{Listener, ListenerError};

/// Something a stub observed, in the order it happened.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ResourceClosed,
    StopRequested,
    ListenerStopped,
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

#[allow(dead_code)]
impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: Event) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }
}

/// A resource that records its close and optionally fails it.
#[allow(dead_code)]
pub struct RecordingResource {
    log: EventLog,
    fail: bool,
}

#[allow(dead_code)]
impl RecordingResource {
    pub fn new(log: EventLog) -> Self {
        Self { log, fail: false }
    }

    pub fn failing(log: EventLog) -> Self {
        Self { log, fail: true }
    }
}

impl Resource for RecordingResource {
    fn name(&self) -> &str {
        "recording"
    }

    async fn close(self) -> Result<(), ResourceError> {
        self.log.push(Event::ResourceClosed);
        if self.fail {
            Err(ResourceError::Other("storage went away".into()))
        } else {
            Ok(())
        }
    }
}

/// A listener that runs until asked to stop, then takes `ack_after` to
/// finish. `None` never finishes.
#[allow(dead_code)]
pub fn stub_listener(log: EventLog, ack_after: Option<Duration>) -> ListenerTask {
    ListenerTask::spawn(move |stop| async move {
        stop.cancelled().await;
        log.push(Event::StopRequested);

        match ack_after {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                log.push(Event::ListenerStopped);
                Ok(())
            }
            None => std::future::pending::<Result<(), ListenerError>>().await,
        }
    })
}

/// A listener whose accept loop fails after `after`, unless stopped first.
#[allow(dead_code)]
pub fn faulting_listener(log: EventLog, after: Duration) -> ListenerTask {
    ListenerTask::spawn(move |stop| async move {
        tokio::select! {
            _ = stop.cancelled() => {
                log.push(Event::StopRequested);
                Ok(())
            }
            _ = tokio::time::sleep(after) => {
                Err(ListenerError::Accept(io::Error::other("listener socket closed")))
            }
        }
    })
}

#[allow(dead_code)]
pub fn local_listener_config() -> ListenerConfig {
    ListenerConfig {
        bind_address: "127.0.0.1:0".into(),
        ..ListenerConfig::default()
    }
}

/// Bind an ephemeral port and spawn a real HTTP server on it.
#[allow(dead_code)]
pub async fn spawn_server(config: &ListenerConfig, routes: Router) -> (SocketAddr, ListenerTask) {
    let listener = Listener::bind(config).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, routes);
    let task = ListenerTask::spawn(move |stop| server.serve(listener, stop));
    (addr, task)
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
