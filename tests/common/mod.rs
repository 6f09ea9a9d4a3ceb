//! Shared utilities for lifecycle integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use axum::Router;
use sales_api::config::HttpConfig;
use sales_api::lifecycle::{LifecycleError, Server, ServerError, Shutdown, Supervisor};
use sales_api::HttpServer;

/// What `serve` does once called.
#[derive(Debug, Clone, Copy)]
pub enum ServeScript {
    /// Fail right away with an I/O error of this kind.
    Fail(io::ErrorKind),
    /// Return `Ok` right away, as if the listener closed by itself.
    ReturnOk,
    /// Run until shutdown or force close succeeds.
    UntilClosed,
}

/// A scriptable `Server` that records how the supervisor drives it.
pub struct MockServer {
    serve: ServeScript,
    drain: Duration,
    drain_error: Option<String>,
    close_error: Option<String>,
    closed: watch::Sender<bool>,
    pub serve_calls: AtomicUsize,
    pub shutdown_calls: AtomicUsize,
    pub force_close_calls: AtomicUsize,
    pub force_closed_at: Mutex<Option<Instant>>,
}

impl MockServer {
    pub fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            serve: ServeScript::UntilClosed,
            drain: Duration::ZERO,
            drain_error: None,
            close_error: None,
            closed,
            serve_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            force_close_calls: AtomicUsize::new(0),
            force_closed_at: Mutex::new(None),
        }
    }

    pub fn serve_script(mut self, script: ServeScript) -> Self {
        self.serve = script;
        self
    }

    /// Graceful shutdown takes this long.
    pub fn drain_for(mut self, drain: Duration) -> Self {
        self.drain = drain;
        self
    }

    pub fn drain_error(mut self, msg: &str) -> Self {
        self.drain_error = Some(msg.to_string());
        self
    }

    pub fn close_error(mut self, msg: &str) -> Self {
        self.close_error = Some(msg.to_string());
        self
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    pub fn force_closes(&self) -> usize {
        self.force_close_calls.load(Ordering::SeqCst)
    }

    pub fn force_closed_at(&self) -> Option<Instant> {
        *self.force_closed_at.lock().unwrap()
    }
}

impl Server for MockServer {
    async fn serve(&self, address: &str) -> Result<(), ServerError> {
        self.serve_calls.fetch_add(1, Ordering::SeqCst);
        match self.serve {
            ServeScript::Fail(kind) => Err(ServerError::Bind {
                address: address.to_string(),
                source: io::Error::new(kind, "address in use"),
            }),
            ServeScript::ReturnOk => Ok(()),
            ServeScript::UntilClosed => {
                let mut closed = self.closed.subscribe();
                let _ = closed.wait_for(|closed| *closed).await;
                Ok(())
            }
        }
    }

    async fn shutdown(&self, _deadline: Instant) -> Result<(), ServerError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.drain).await;
        if let Some(msg) = &self.drain_error {
            return Err(ServerError::Other(msg.clone()));
        }
        self.closed.send_replace(true);
        Ok(())
    }

    fn force_close(&self) -> Result<(), ServerError> {
        self.force_close_calls.fetch_add(1, Ordering::SeqCst);
        *self.force_closed_at.lock().unwrap() = Some(Instant::now());
        if let Some(msg) = &self.close_error {
            return Err(ServerError::Other(msg.clone()));
        }
        self.closed.send_replace(true);
        Ok(())
    }
}

/// A real HTTP server under supervision.
pub struct Running {
    pub server: Arc<HttpServer>,
    pub shutdown: Shutdown,
    pub addr: SocketAddr,
    pub handle: JoinHandle<Result<(), LifecycleError>>,
}

/// Start an `HttpServer` with `routes` on an ephemeral port under a supervisor.
pub async fn start_http(grace_period: Duration, routes: Router, shutdown: Shutdown) -> Running {
    let config = HttpConfig {
        address: "127.0.0.1:0".into(),
        ..HttpConfig::default()
    };
    let server = Arc::new(HttpServer::with_routes(&config, routes));
    let supervisor = Supervisor::new(server.clone(), config.address.clone(), grace_period, shutdown.subscribe());
    let handle = tokio::spawn(supervisor.run());

    let addr = tokio::time::timeout(Duration::from_secs(5), server.bound_addr())
        .await
        .expect("server did not bind in time")
        .expect("bound address");

    Running { server, shutdown, addr, handle }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Wait until `server` has exactly `expected` open connections.
pub async fn wait_for_open_connections(server: &HttpServer, expected: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.open_connections() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {expected} open connections, saw {}", server.open_connections()));
}
