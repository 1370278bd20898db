//! API server lifecycle: binds the listener and serves `api_router()`
//! until the shutdown signal fires.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::core_state::CoreState;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl ApiServer {
    /// Signal graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
        let _ = self.task.await;
    }

    /// Serve until `signal` resolves, then shut down gracefully.
    pub async fn run_until(mut self, signal: impl Future<Output = ()>) {
        let stopped_on_its_own = tokio::select! {
            _ = signal => false,
            _ = &mut self.task => true,
        };
        if stopped_on_its_own {
            tracing::warn!("API server task exited before shutdown was requested");
        } else {
            self.shutdown().await;
        }
    }
}

/// Bind `addr` and spawn the axum server in a background task.
/// Port 0 picks an ephemeral port; the bound address is in `ApiServer::addr`.
pub async fn start_api_server(
    core: Arc<CoreState>,
    addr: SocketAddr,
) -> Result<ApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = api_router(core);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::api::endpoints::test_support::TestApp;

    #[tokio::test]
    async fn start_serve_and_stop() {
        let app = TestApp::unavailable();
        let server = start_api_server(
            app.core.clone(),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        )
        .await
        .expect("server should start");
        assert!(server.addr.port() > 0);

        let url = format!("http://{}/api/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "unhealthy");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn run_until_stops_on_signal() {
        let app = TestApp::unavailable();
        let server = start_api_server(
            app.core.clone(),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        )
        .await
        .unwrap();
        let addr = server.addr;

        server.run_until(async {}).await;
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn bind_conflict_is_error() {
        let app = TestApp::unavailable();
        let first = start_api_server(
            app.core.clone(),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
        )
        .await
        .unwrap();

        let second = start_api_server(app.core.clone(), first.addr).await;
        assert!(second.is_err());

        first.shutdown().await;
    }
}
