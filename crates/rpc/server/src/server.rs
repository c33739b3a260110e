//! The HTTP server.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use hyrule_net_transport::{PeerService, protocol};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{NodeApi, RpcError, handlers, peer};

/// Largest accepted request body (object payloads and pushes).
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Serves the status API and the peer protocol on one listener.
#[derive(Clone)]
pub struct RpcServer {
    router: Router,
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer").finish_non_exhaustive()
    }
}

impl RpcServer {
    pub fn new(api: Arc<dyn NodeApi>, peer: Arc<dyn PeerService>) -> Self {
        let status_api = Router::new()
            .route("/health", get(handlers::health))
            .route("/status", get(handlers::status))
            .route("/repos", get(handlers::list_repos))
            .route(
                "/repos/:repo/objects",
                get(handlers::list_objects).post(handlers::put_object),
            )
            .route(
                "/objects/:fingerprint",
                get(handlers::get_object).delete(handlers::delete_object),
            )
            .with_state(api);

        let peer_api = Router::new()
            .route(protocol::HANDSHAKE_PATH, post(peer::handshake))
            .route(protocol::MANIFEST_PATH, get(peer::manifest))
            .route(protocol::OBJECTS_PATH, post(peer::push))
            .route(&format!("{}/:fingerprint", protocol::OBJECTS_PATH), get(peer::fetch))
            .with_state(peer);

        let router = status_api
            .merge(peer_api)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));
        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn bind(addr: SocketAddr) -> Result<TcpListener, RpcError> {
        TcpListener::bind(addr)
            .await
            .map_err(|source| RpcError::Bind { addr, source })
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), RpcError> {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "HTTP server listening");
        }
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(RpcError::Serve)?;
        info!("HTTP server stopped");
        Ok(())
    }
}
