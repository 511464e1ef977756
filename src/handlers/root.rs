use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Map, Value};

use crate::app::AppState;
use crate::types::{Language, ResourceKind};

/// GET / - service description and the endpoints of every partition
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    let mut languages = Map::new();
    for language in Language::ALL {
        let mut endpoints = Map::new();
        endpoints.insert(
            "programs_assembled".to_string(),
            json!(format!("/api/{}/programs/:program_id", language)),
        );
        for kind in ResourceKind::ALL {
            endpoints.insert(kind.to_string(), json!(format!("/api/{}/data/{}", language, kind)));
        }
        languages.insert(language.to_string(), Value::Object(endpoints));
    }

    Json(json!({
        "name": "CourseHub API",
        "version": version,
        "description": "Multi-language course content and certificate service",
        "endpoints": languages,
        "certificates": {
            "issue": "/api/certificates/issue",
            "verify": "/api/certificates/:cert_id",
            "files": "/certificates/:file",
        },
        "telegram": {
            "send_document": "/api/telegram/send-document",
        },
    }))
}

/// GET /health - pings every language partition
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let mut partitions = Map::new();
    let mut healthy = true;
    for partition in state.partitions.iter() {
        let status = match partition.ping().await {
            Ok(()) => "ok".to_string(),
            Err(e) => {
                tracing::warn!("Health check failed for {} partition: {}", partition.language(), e);
                healthy = false;
                "unavailable".to_string()
            }
        };
        partitions.insert(partition.language().to_string(), Value::String(status));
    }

    let (status_code, status) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "timestamp": now,
            "partitions": partitions,
        })),
    )
}
