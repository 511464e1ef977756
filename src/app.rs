//! Shared application state and router assembly.

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{AppConfig, DatabaseConfig, StorageBackend};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::memory::MemoryDocumentStore;
use crate::database::partitions::{connect_certificates, Partitions};
use crate::database::store::DocumentStore;
use crate::handlers;
use crate::integrations::TelegramClient;
use crate::services::{CertificateService, ProgramAssembler};

/// Everything a handler can reach. Built once at startup; immutable afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub partitions: Arc<Partitions>,
    pub assembler: Arc<ProgramAssembler>,
    pub certificates: Arc<CertificateService>,
    pub telegram: Arc<TelegramClient>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        partitions: Partitions,
        certificates: CertificateService,
    ) -> Self {
        let partitions = Arc::new(partitions);
        let assembler = ProgramAssembler::from_config(partitions.clone(), &config.assembler);
        let telegram = TelegramClient::from_config(&config.telegram, &config.server);
        Self {
            config: Arc::new(config),
            partitions,
            assembler: Arc::new(assembler),
            certificates: Arc::new(certificates),
            telegram: Arc::new(telegram),
        }
    }
}

/// Opened storage: the language partitions plus the certificates store
pub struct Storage {
    pub partitions: Partitions,
    pub certificates: Arc<dyn DocumentStore>,
    /// Present for the Postgres backend so pools can be closed on shutdown
    pub manager: Option<Arc<DatabaseManager>>,
}

impl Storage {
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using the in-memory storage backend; data is lost on exit");
                Ok(Self {
                    partitions: Partitions::in_memory(),
                    certificates: Arc::new(MemoryDocumentStore::new()),
                    manager: None,
                })
            }
            StorageBackend::Postgres => {
                let manager = Arc::new(DatabaseManager::new(config.clone()));
                let partitions = Partitions::connect(&manager).await?;
                let certificates = connect_certificates(&manager).await?;
                Ok(Self {
                    partitions,
                    certificates,
                    manager: Some(manager),
                })
            }
        }
    }

    pub async fn close(&self) {
        if let Some(manager) = &self.manager {
            manager.close_all().await;
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let trace = trace_layer(&state.config);
    let certificates_dir = state.config.server.certificates_dir.clone();
    let templates_dir = state.config.server.templates_dir.clone();

    let router = Router::new()
        // Public
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health))
        .merge(content_routes())
        .merge(certificate_routes())
        .merge(telegram_routes())
        .nest_service("/certificates", ServeDir::new(certificates_dir))
        .nest_service("/templates", ServeDir::new(templates_dir))
        .with_state(state);

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };
    match trace {
        Some(trace) => router.layer(trace),
        None => router,
    }
}

fn content_routes() -> Router<AppState> {
    use handlers::data;

    Router::new()
        // Assembled program
        .route("/api/:lang/programs/:program_id", get(handlers::programs::assemble))
        // Resource-level operations (collection)
        .route("/api/:lang/data/:resource", get(data::schema_get).post(data::schema_post))
        // Document-level operations (individual)
        .route(
            "/api/:lang/data/:resource/:uid",
            get(data::record_get).put(data::record_put).delete(data::record_delete),
        )
}

fn certificate_routes() -> Router<AppState> {
    use handlers::certificates;

    Router::new()
        .route("/api/certificates/issue", post(certificates::issue))
        .route("/api/certificates/:cert_id", get(certificates::verify))
}

fn telegram_routes() -> Router<AppState> {
    Router::new().route("/api/telegram/send-document", post(handlers::telegram::send_document))
}

/// Per-request spans, unless request logging is switched off
fn trace_layer(config: &AppConfig) -> Option<TraceLayer<SharedClassifier<ServerErrorsAsFailures>>> {
    config.api.enable_request_logging.then(TraceLayer::new_for_http)
}

fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }

    let origins = &config.security.cors_origins;
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(Any));
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    Some(layer.allow_origin(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDocumentStore;
    use crate::render::{CertificateRenderer, RenderError, RenderFormat};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    struct NoRenderer;

    #[async_trait]
    impl CertificateRenderer for NoRenderer {
        async fn render(&self, _html: &str, _format: RenderFormat) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Failed("not available in tests".to_string()))
        }
    }

    fn router(adjust: impl FnOnce(&mut AppConfig)) -> Router {
        let mut config = AppConfig::development();
        config.database.backend = StorageBackend::Memory;
        adjust(&mut config);
        let certificates =
            CertificateService::from_config(Arc::new(MemoryDocumentStore::new()), Arc::new(NoRenderer), &config);
        build_router(AppState::new(config, Partitions::in_memory(), certificates))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn routes_reach_their_handlers() {
        let app = router(|_| {});

        let response = app
            .clone()
            .oneshot(Request::get("/api/en/programs/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");

        let response = app
            .oneshot(Request::get("/api/en/data/modules").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn request_logging_follows_configuration() {
        let mut config = AppConfig::development();
        assert!(trace_layer(&config).is_some());

        config.api.enable_request_logging = false;
        assert!(trace_layer(&config).is_none());

        let response = router(|c| c.api.enable_request_logging = false)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_follows_configuration() {
        let request = || {
            Request::get("/health")
                .header(header::ORIGIN, "https://learn.example.org")
                .body(Body::empty())
                .unwrap()
        };

        let response = router(|_| {}).oneshot(request()).await.unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let response = router(|c| c.security.enable_cors = false).oneshot(request()).await.unwrap();
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        let response = router(|c| c.security.cors_origins = vec!["https://learn.example.org".to_string()])
            .oneshot(request())
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://learn.example.org"
        );
    }
}
