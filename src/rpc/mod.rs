pub mod handlers;
pub mod types;

use crate::account::AccountService;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ApiState {
    pub accounts: AccountService,
}

/// Build the HTTP routes over the given service.
pub fn router(accounts: AccountService) -> Router {
    Router::new()
        .route("/users", get(handlers::handle_list_users))
        .route("/users/:username", delete(handlers::handle_delete_user))
        .route("/register", post(handlers::handle_register))
        .route("/login", post(handlers::handle_login))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ApiState { accounts })
}

pub struct ApiServer {
    accounts: AccountService,
    bind_addr: String,
}

impl ApiServer {
    pub fn new(accounts: AccountService, bind_addr: &str, port: u16) -> Self {
        Self {
            accounts,
            bind_addr: format!("{}:{}", bind_addr, port),
        }
    }

    /// Serve until Ctrl+C / SIGTERM, then close the user store.
    pub async fn start(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!("Account service listening at http://{}", listener.local_addr()?);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    /// The user store is closed (final flush) once serving stops, even on error.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.accounts.clone());
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        info!("Shutting down... saving database");
        self.accounts.close();
        result
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
