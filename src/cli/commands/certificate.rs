use anyhow::Context;
use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::render::{render_certificate, CertificateBindings, HeadlessBrowserRenderer, RenderFormat};
use crate::services::certificates::is_valid_cert_id;
use crate::types::Language;

#[derive(Subcommand)]
pub enum CertificateCommands {
    #[command(about = "Render a certificate file without recording it")]
    Render {
        #[arg(long, help = "Learner name")]
        user: String,
        #[arg(long, help = "Course title")]
        course: String,
        #[arg(long, help = "Score")]
        score: f64,
        #[arg(long, help = "Certificate id")]
        cert_id: String,
        #[arg(long, help = "Label language (am, or, en)", default_value = "am")]
        lang: String,
        #[arg(long, help = "Output format (pdf, png)", default_value = "pdf")]
        format: String,
        #[arg(long, help = "Template path override")]
        template: Option<PathBuf>,
        #[arg(long, help = "Output file")]
        out: PathBuf,
    },
}

pub async fn handle(
    cmd: CertificateCommands,
    config: &AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        CertificateCommands::Render {
            user,
            course,
            score,
            cert_id,
            lang,
            format,
            template,
            out,
        } => {
            if !is_valid_cert_id(&cert_id) {
                anyhow::bail!("cert_id may only contain letters, digits, '-' and '_'");
            }
            if !score.is_finite() {
                anyhow::bail!("score must be a finite number");
            }
            let lang: Language = lang.parse()?;
            let format: RenderFormat = format.parse()?;
            let template = template.unwrap_or_else(|| config.certificates.template_path.clone());

            let bindings = CertificateBindings {
                user_name: user,
                course_title: course,
                score,
                issued_at: Utc::now(),
                verification_url: format!(
                    "{}/api/certificates/{}",
                    config.server.base_url, cert_id
                ),
                cert_id,
                lang,
            };

            let renderer = HeadlessBrowserRenderer::from_config(&config.certificates);
            let bytes = render_certificate(&renderer, &template, &bindings, format)
                .await
                .context("rendering failed")?;
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("cannot write {}", out.display()))?;

            output_success(
                output_format,
                &format!("Rendered {} ({} bytes)", out.display(), bytes.len()),
                Some(json!({
                    "path": out.display().to_string(),
                    "bytes": bytes.len(),
                    "format": format,
                })),
            )
        }
    }
}
