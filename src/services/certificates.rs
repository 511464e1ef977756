use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::Certificate;
use crate::database::repository::Repository;
use crate::database::store::DocumentStore;
use crate::render::{
    render_certificate, CertificateBindings, CertificateRenderer, RenderError, RenderFormat,
};
use crate::types::{Language, UnknownLanguage};

#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    UnsupportedLanguage(#[from] UnknownLanguage),
    #[error("Certificate already issued: {0}")]
    AlreadyIssued(String),
    #[error("Certificate not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),
    #[error("Cannot write certificate file: {0}")]
    Io(#[from] std::io::Error),
}

/// Body of an issue request. Fields are optional here so that missing ones
/// produce a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueCertificateRequest {
    #[serde(default, alias = "userName")]
    pub user_name: Option<String>,
    #[serde(default, alias = "courseTitle")]
    pub course_title: Option<String>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default, alias = "certId")]
    pub cert_id: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// A validated issue request
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateOrder {
    pub user_name: String,
    pub course_title: String,
    pub score: f64,
    pub cert_id: String,
    pub lang: Language,
    pub format: RenderFormat,
}

impl IssueCertificateRequest {
    pub fn validate(self) -> Result<CertificateOrder, CertificateError> {
        let user_name = required_text(self.user_name, "user_name")?;
        let course_title = required_text(self.course_title, "course_title")?;
        let cert_id = required_text(self.cert_id, "cert_id")?;
        if !is_valid_cert_id(&cert_id) {
            return Err(CertificateError::Validation(format!(
                "cert_id may only contain letters, digits, '-' and '_': {}",
                cert_id
            )));
        }

        let score = match self.score {
            Some(Value::Number(n)) => n.as_f64().filter(|s| s.is_finite()),
            _ => None,
        }
        .ok_or_else(|| {
            CertificateError::Validation("Missing or invalid field: score".to_string())
        })?;

        let lang = match self.lang.as_deref().map(str::trim) {
            None | Some("") => Language::Am,
            Some(code) => code.parse::<Language>()?,
        };
        let format = match self.format.as_deref().map(str::trim) {
            None | Some("") => RenderFormat::default(),
            Some(f) => f
                .parse::<RenderFormat>()
                .map_err(|e| CertificateError::Validation(e.to_string()))?,
        };

        Ok(CertificateOrder {
            user_name,
            course_title,
            score,
            cert_id,
            lang,
            format,
        })
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, CertificateError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CertificateError::Validation(format!("Missing required field: {}", field))),
    }
}

pub fn is_valid_cert_id(cert_id: &str) -> bool {
    !cert_id.is_empty()
        && cert_id.len() <= 128
        && cert_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedCertificate {
    pub certificate: Certificate,
    pub file_url: String,
}

/// Issues, renders and verifies certificates
pub struct CertificateService {
    certificates: Repository<Certificate>,
    renderer: Arc<dyn CertificateRenderer>,
    template_path: PathBuf,
    output_dir: PathBuf,
    base_url: String,
}

impl CertificateService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        renderer: Arc<dyn CertificateRenderer>,
        template_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            certificates: Repository::new(store),
            renderer,
            template_path: template_path.into(),
            output_dir: output_dir.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(
        store: Arc<dyn DocumentStore>,
        renderer: Arc<dyn CertificateRenderer>,
        config: &AppConfig,
    ) -> Self {
        Self::new(
            store,
            renderer,
            config.certificates.template_path.clone(),
            config.server.certificates_dir.clone(),
            config.server.base_url.clone(),
        )
    }

    pub fn verification_url(&self, cert_id: &str) -> String {
        format!("{}/api/certificates/{}", self.base_url, cert_id)
    }

    /// Record the certificate, then render it to `{output_dir}/{cert_id}.{ext}`.
    ///
    /// The record is written first and is kept when rendering fails.
    pub async fn issue(
        &self,
        request: IssueCertificateRequest,
    ) -> Result<IssuedCertificate, CertificateError> {
        let order = request.validate()?;
        let file_name = format!("{}.{}", order.cert_id, order.format.extension());
        let file_url = format!("/certificates/{}", file_name);

        let certificate = Certificate {
            uid: order.cert_id.clone(),
            user_name: order.user_name,
            course_title: order.course_title,
            score: order.score,
            issued_at: Utc::now(),
            verification_url: self.verification_url(&order.cert_id),
            lang: order.lang,
            file_url: Some(file_url.clone()),
        };

        let certificate = match self.certificates.create(certificate).await {
            Ok(cert) => cert,
            Err(DatabaseError::Conflict(_)) => {
                return Err(CertificateError::AlreadyIssued(order.cert_id))
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!("Issued certificate {} ({})", certificate.uid, certificate.lang);

        let bindings = CertificateBindings::from(&certificate);
        let renderer = self.renderer.as_ref();
        let bytes = render_certificate(renderer, &self.template_path, &bindings, order.format)
            .await
            .map_err(|e| {
                tracing::error!("Rendering certificate {} failed: {}", certificate.uid, e);
                e
            })?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(self.output_dir.join(&file_name), &bytes).await?;
        tracing::debug!("Wrote {} ({} bytes)", file_name, bytes.len());

        Ok(IssuedCertificate { certificate, file_url })
    }

    pub async fn verify(&self, cert_id: &str) -> Result<Certificate, CertificateError> {
        if !is_valid_cert_id(cert_id) {
            return Err(CertificateError::NotFound(cert_id.to_string()));
        }
        self.certificates
            .select_one(cert_id)
            .await?
            .ok_or_else(|| CertificateError::NotFound(cert_id.to_string()))
    }
}
