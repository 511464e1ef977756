#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use coursehub_api::app::{build_router, AppState};
use coursehub_api::config::{AppConfig, StorageBackend};
use coursehub_api::database::memory::MemoryDocumentStore;
use coursehub_api::database::partitions::Partitions;
use coursehub_api::render::{CertificateRenderer, RenderError, RenderFormat};
use coursehub_api::services::CertificateService;

/// Produces a small marker file instead of launching a browser
pub struct StubRenderer;

#[async_trait]
impl CertificateRenderer for StubRenderer {
    async fn render(&self, html: &str, format: RenderFormat) -> Result<Vec<u8>, RenderError> {
        Ok(format!("{}\n{}", format, html).into_bytes())
    }
}

/// An in-process server over the in-memory backend, bound to an ephemeral port
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub work_dir: PathBuf,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with<F>(adjust: F) -> Result<Self>
    where
        F: FnOnce(&mut AppConfig),
    {
        let work_dir = std::env::temp_dir().join(format!("coursehub-it-{}", uuid::Uuid::new_v4().simple()));
        std::fs::create_dir_all(&work_dir).context("failed to create work dir")?;
        let template = work_dir.join("certificate.html");
        std::fs::write(&template, "<h1>{{LABEL_TITLE}}</h1><p>{{USER_NAME}} / {{COURSE_TITLE}} / {{SCORE}}</p>")?;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let port = listener.local_addr()?.port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.database.backend = StorageBackend::Memory;
        config.server.port = port;
        config.server.base_url = base_url.clone();
        config.server.certificates_dir = work_dir.join("certificates");
        config.server.templates_dir = work_dir.clone();
        config.certificates.template_path = template;
        config.telegram.bot_token = None;
        adjust(&mut config);

        let certificates = CertificateService::from_config(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(StubRenderer),
            &config,
        );
        let state = AppState::new(config, Partitions::in_memory(), certificates);
        let app = build_router(state.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url,
            state,
            work_dir,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).send().await?;
        read(res).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let res = self.client.post(self.url(path)).json(body).send().await?;
        read(res).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<(StatusCode, Value)> {
        let res = self.client.put(self.url(path)).json(body).send().await?;
        read(res).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.delete(self.url(path)).send().await?;
        read(res).await
    }

    pub async fn get_bytes(&self, path: &str) -> Result<(StatusCode, Vec<u8>)> {
        let res = self.client.get(self.url(path)).send().await?;
        let status = res.status();
        Ok((status, res.bytes().await?.to_vec()))
    }

    /// POST every document, failing on anything but 201
    pub async fn seed(&self, lang: &str, resource: &str, documents: &[Value]) -> Result<()> {
        for document in documents {
            let (status, body) = self.post(&format!("/api/{}/data/{}", lang, resource), document).await?;
            anyhow::ensure!(status == StatusCode::CREATED, "seeding {} failed: {} {}", resource, status, body);
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.work_dir);
    }
}

async fn read(res: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = res.status();
    let text = res.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).with_context(|| format!("response is not JSON: {}", text))?
    };
    Ok((status, body))
}

/// Asserts the shared error envelope and returns its code
pub fn error_code(body: &Value) -> &str {
    assert_eq!(body["error"], Value::Bool(true), "expected an error body: {}", body);
    assert!(body["message"].is_string(), "error body without message: {}", body);
    body["code"].as_str().unwrap_or_default()
}
