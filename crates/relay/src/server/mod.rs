mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{convert::Converter, notify::Notifier, Result};

pub struct AppState {
    pub converter: Converter,
    pub telephone: Option<Arc<dyn Notifier>>,
}

pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(converter: Converter, telephone: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            state: Arc::new(AppState {
                converter,
                telephone,
            }),
        }
    }

    pub fn build_router(self) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route("/convert", post(routes::convert_alerts))
            .route("/webhook/telephone", post(routes::telephone_webhook))
            .route("/metrics", get(routes::metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state)
    }

    pub async fn start(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.build_router()).await?;
        Ok(())
    }
}
