use crate::{
    app::{App, AppError},
    metadata::{MetaOptions, ResolvedMetadata},
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
pub struct SharedState {
    app: Arc<App>,
}

impl SharedState {
    pub fn new(app: App) -> Self {
        Self { app: Arc::new(app) }
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/scrape-meta", get(scrape_meta))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(Arc::new(state))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

async fn start_app(app: App, addr: &str) -> anyhow::Result<()> {
    let router = router(SharedState::new(app));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn start_daemon(app: App, addr: &str) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(app, addr))
}

// Make our own error that wraps `AppError`.
#[derive(Debug)]
struct HttpError(AppError);

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            AppError::MissingUrl | AppError::InvalidUrl(_) | AppError::UnsupportedUrl(_) => {
                log::debug!("{self:?}");
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    Json(json!({"error": self.0.to_string()})),
                )
            }
            AppError::Other(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": self.0.to_string()})),
                )
            }
        }
        .into_response()
    }
}

// This enables using `?` on functions that return `Result<_, AppError>` or
// `anyhow::Result<_>` inside handlers.
impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupQuery {
    pub url: Option<String>,

    /// Bypass the cache for this request.
    #[serde(default)]
    pub no_cache: bool,

    /// Skip the browser-header fallback fetch.
    #[serde(default)]
    pub no_headless: bool,
}

async fn scrape_meta(
    State(state): State<Arc<SharedState>>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<ResolvedMetadata>, HttpError> {
    log::debug!("query: {query:?}");

    let app = state.app.clone();
    let opts = MetaOptions {
        no_cache: query.no_cache,
        no_headless: query.no_headless,
    };

    tokio::task::block_in_place(move || {
        app.lookup(query.url.as_deref(), opts)
            .map(Json)
            .map_err(Into::into)
    })
}
