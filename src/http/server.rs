//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum Router with operational and application routes
//! - Wire up middleware (request ID, tracing, timeout)
//! - Run the accept loop and hand each connection to hyper
//! - Drain connections on shutdown, abort them on forced close
//!
//! # Design Decisions
//! - Accept loop stops as soon as shutdown or forced close begins
//! - Connection tasks live in a `JoinSet` so forced close can abort them all
//! - hyper-util's graceful watcher tells in-flight connections to finish up

use axum::Router;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    server::graceful::GracefulShutdown,
    service::TowerToHyperService,
};
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::HttpConfig;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, request_span, set_request_id_layer};
use crate::lifecycle::{Server, ServerError};
use crate::net::listener::is_transient_accept_error;
use crate::net::{ConnectionPermit, ConnectionTracker, Listener};

/// HTTP server driven by the lifecycle supervisor.
pub struct HttpServer {
    router: Router,
    max_connections: usize,
    tracker: ConnectionTracker,
    /// Set once shutdown or forced close begins; stops the accept loop.
    stop: watch::Sender<bool>,
    /// Address actually bound, once the listener is up.
    bound: watch::Sender<Option<SocketAddr>>,
    /// Taken by the first shutdown; `None` means no new connections are served.
    graceful: Mutex<Option<GracefulShutdown>>,
    connections: Mutex<JoinSet<()>>,
}

impl HttpServer {
    /// Create a server exposing only the operational routes.
    pub fn new(config: &HttpConfig) -> Self {
        Self::with_routes(config, Router::new())
    }

    /// Create a server exposing `routes` alongside the operational routes.
    pub fn with_routes(config: &HttpConfig, routes: Router) -> Self {
        let tracker = ConnectionTracker::new();
        let router = Self::build_router(config, routes, tracker.clone());
        let (stop, _) = watch::channel(false);
        let (bound, _) = watch::channel(None);

        Self {
            router,
            max_connections: config.max_connections,
            tracker,
            stop,
            bound,
            graceful: Mutex::new(Some(GracefulShutdown::new())),
            connections: Mutex::new(JoinSet::new()),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &HttpConfig, routes: Router, tracker: ConnectionTracker) -> Router {
        routes.merge(handlers::routes(tracker)).layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(propagate_request_id_layer())
                .layer(TimeoutLayer::new(config.request_timeout())),
        )
    }

    /// Number of connections currently open.
    pub fn open_connections(&self) -> u64 {
        self.tracker.open_count()
    }

    /// Wait until the listener is bound and return its address.
    ///
    /// Never resolves if binding fails; callers should bound the wait.
    pub async fn bound_addr(&self) -> Option<SocketAddr> {
        let mut rx = self.bound.subscribe();
        rx.wait_for(Option::is_some).await.ok().and_then(|addr| *addr)
    }

    fn spawn_connection(
        &self,
        builder: &auto::Builder<TokioExecutor>,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
    ) {
        let graceful = lock(&self.graceful);
        let Some(graceful) = graceful.as_ref() else {
            tracing::debug!(peer_addr = %peer, "Dropping connection accepted during shutdown");
            return;
        };

        let service = TowerToHyperService::new(self.router.clone());
        let conn = builder
            .serve_connection_with_upgrades(TokioIo::new(stream), service)
            .into_owned();
        let conn = graceful.watch(conn);
        let guard = self.tracker.track();

        let mut connections = lock(&self.connections);
        // Reap finished connection tasks.
        while connections.try_join_next().is_some() {}

        connections.spawn(async move {
            let _permit = permit;
            tracing::trace!(connection_id = %guard.id(), peer_addr = %peer, "Serving connection");
            if let Err(e) = conn.await {
                tracing::debug!(connection_id = %guard.id(), error = %e, "Connection error");
            }
            drop(guard);
        });
    }
}

impl Server for HttpServer {
    async fn serve(&self, address: &str) -> Result<(), ServerError> {
        let mut stop = self.stop.subscribe();
        if *stop.borrow_and_update() {
            return Ok(());
        }

        let listener = Listener::bind(address, self.max_connections).await?;
        let local_addr = listener.local_addr()?;
        self.bound.send_replace(Some(local_addr));

        tracing::info!(
            address = %local_addr,
            max_connections = listener.max_connections(),
            "HTTP server starting"
        );

        let builder = auto::Builder::new(TokioExecutor::new());
        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = stopped(&mut stop) => break,
            };

            match accepted {
                Ok((stream, peer, permit)) => self.spawn_connection(&builder, stream, peer, permit),
                Err(e) if is_transient_accept_error(&e) => {
                    tracing::debug!(error = %e, "Transient accept error");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept loop failed");
                    return Err(ServerError::Accept(e));
                }
            }
        }

        tracing::info!(address = %local_addr, "HTTP server stopped accepting");
        Ok(())
    }

    async fn shutdown(&self, deadline: Instant) -> Result<(), ServerError> {
        self.stop.send_replace(true);

        let graceful = lock(&self.graceful).take();
        let Some(graceful) = graceful else {
            return Ok(());
        };

        tracing::info!(open_connections = self.tracker.open_count(), "Draining connections");
        time::timeout_at(deadline, graceful.shutdown())
            .await
            .map_err(|_| ServerError::DeadlineExceeded)?;

        tracing::info!("All connections drained");
        Ok(())
    }

    fn force_close(&self) -> Result<(), ServerError> {
        self.stop.send_replace(true);
        lock(&self.graceful).take();

        let open = self.tracker.open_count();
        lock(&self.connections).abort_all();

        tracing::warn!(open_connections = open, "Force-closed open connections");
        Ok(())
    }
}

/// Resolves once `stop` is set.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
