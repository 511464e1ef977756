//! Certificate rendering: template bindings plus an opaque HTML-to-file renderer.

pub mod browser;
pub mod dictionary;
pub mod qr;
pub mod template;

pub use browser::HeadlessBrowserRenderer;
pub use dictionary::Labels;
pub use template::{render_template, CertificateBindings};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    #[default]
    Pdf,
    Png,
}

impl RenderFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            RenderFormat::Pdf => "pdf",
            RenderFormat::Png => "png",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for RenderFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(RenderFormat::Pdf),
            "png" => Ok(RenderFormat::Png),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("Cannot read template {path}: {source}")]
    Template {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to launch renderer: {0}")]
    Launch(#[source] std::io::Error),
    #[error("Renderer timed out after {0:?}")]
    Timeout(Duration),
    #[error("Renderer failed: {0}")]
    Failed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a fully bound HTML document into file bytes
#[async_trait]
pub trait CertificateRenderer: Send + Sync {
    async fn render(&self, html: &str, format: RenderFormat) -> Result<Vec<u8>, RenderError>;
}

/// Load the template at `template_path`, bind it and hand it to `renderer`
pub async fn render_certificate(
    renderer: &dyn CertificateRenderer,
    template_path: &Path,
    bindings: &CertificateBindings,
    format: RenderFormat,
) -> Result<Vec<u8>, RenderError> {
    let template = tokio::fs::read_to_string(template_path)
        .await
        .map_err(|source| RenderError::Template {
            path: template_path.display().to_string(),
            source,
        })?;
    let html = render_template(&template, bindings);
    renderer.render(&html, format).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_and_describe_themselves() {
        assert_eq!("PDF".parse::<RenderFormat>().unwrap(), RenderFormat::Pdf);
        assert_eq!("png".parse::<RenderFormat>().unwrap(), RenderFormat::Png);
        assert!(matches!("gif".parse::<RenderFormat>(), Err(RenderError::UnsupportedFormat(_))));
        assert_eq!(RenderFormat::default().extension(), "pdf");
    }
}
