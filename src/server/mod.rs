//! HTTP boundary
//!
//! Thin axum layer over [`IngestService`](crate::ingest::IngestService):
//! derives the client identity from the connection, runs the storage work on
//! the blocking pool and turns typed outcomes into JSON responses.

pub mod peer;
pub mod routes;

pub use routes::{router, AppState};

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

/// Handle to control the running server
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    addr: SocketAddr,
}

impl ServerHandle {
    /// Get the address the server is listening on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests to finish
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if the server already stopped on its own
            let _ = tx.send(());
        }
        self.task.await.context("Server task panicked")
    }
}

/// Start the log server
///
/// # Arguments
/// * `addr` - Address to bind; port 0 lets the OS pick one
/// * `state` - Shared handler state
///
/// # Returns
/// A `ServerHandle` that can be used to shut down the server
pub async fn start(addr: SocketAddr, state: AppState) -> Result<ServerHandle> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let bound_addr = listener.local_addr()?;

    info!("Log server listening on {}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Log server shutting down");
        })
        .await;

        if let Err(e) = result {
            tracing::error!("Log server stopped with error: {}", e);
        }
    });

    Ok(ServerHandle {
        shutdown_tx: Some(shutdown_tx),
        task,
        addr: bound_addr,
    })
}
