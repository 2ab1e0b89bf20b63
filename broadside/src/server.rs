//! HTTP server assembly.

use std::time::Duration;

use axum::Router;
use broadside_common::Signal;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The process's HTTP server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    router: Router,
}

impl Server {
    /// Bind the listener and attach the request timeout layer.
    pub async fn bind(address: &str, router: Router) -> Result<Self, AppError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| AppError::Bind {
                address: address.to_string(),
                source,
            })?;

        tracing::info!(address = %address, "HTTP server bound successfully");

        Ok(Self {
            listener,
            router: router.layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
        })
    }

    /// Local address actually bound, for tests binding port 0.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, AppError> {
        self.listener
            .local_addr()
            .map_err(|e| AppError::Server(e.to_string()))
    }

    /// Serve until a shutdown signal is received.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), AppError> {
        tracing::info!("HTTP server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await
            .map_err(|e| AppError::Server(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
