use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

use super::{CertificateRenderer, RenderError, RenderFormat};
use crate::config::CertificateConfig;

/// A4 landscape at 96 dpi
const PAGE_WIDTH_PX: u32 = 1123;
const PAGE_HEIGHT_PX: u32 = 794;

/// Renders through a headless Chromium-compatible browser binary.
/// Each call launches its own process; the child is killed if the call is
/// dropped or runs past the timeout.
pub struct HeadlessBrowserRenderer {
    browser_bin: PathBuf,
    timeout: Duration,
    work_dir: PathBuf,
}

impl HeadlessBrowserRenderer {
    pub fn new(browser_bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            browser_bin: browser_bin.into(),
            timeout,
            work_dir: std::env::temp_dir(),
        }
    }

    pub fn from_config(config: &CertificateConfig) -> Self {
        Self::new(config.browser_bin.clone(), Duration::from_secs(config.render_timeout_secs))
    }

    fn command(&self, input: &Path, output: &Path, format: RenderFormat) -> Command {
        let mut cmd = Command::new(&self.browser_bin);
        cmd.arg("--headless=new")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars");

        match format {
            RenderFormat::Pdf => {
                cmd.arg("--no-pdf-header-footer")
                    .arg(format!("--print-to-pdf={}", output.display()));
            }
            RenderFormat::Png => {
                cmd.arg(format!("--window-size={},{}", PAGE_WIDTH_PX, PAGE_HEIGHT_PX))
                    .arg(format!("--screenshot={}", output.display()));
            }
        }

        cmd.arg(format!("file://{}", input.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(
        &self,
        input: &Path,
        output: &Path,
        format: RenderFormat,
    ) -> Result<Vec<u8>, RenderError> {
        let child = self.command(input, output, format).spawn().map_err(RenderError::Launch)?;

        let result = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(RenderError::Timeout(self.timeout)),
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::warn!("Browser exited with {}: {}", result.status, stderr.trim());
            return Err(RenderError::Failed(format!("browser exited with {}", result.status)));
        }

        let bytes = tokio::fs::read(output)
            .await
            .map_err(|e| RenderError::Failed(format!("no output produced: {}", e)))?;
        if bytes.is_empty() {
            return Err(RenderError::Failed("empty output".to_string()));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl CertificateRenderer for HeadlessBrowserRenderer {
    async fn render(&self, html: &str, format: RenderFormat) -> Result<Vec<u8>, RenderError> {
        let stem = format!("certificate-{}", Uuid::new_v4().simple());
        let input = self.work_dir.join(format!("{}.html", stem));
        let output = self.work_dir.join(format!("{}.{}", stem, format.extension()));

        tokio::fs::write(&input, html).await?;
        let started = std::time::Instant::now();
        let result = self.run(&input, &output, format).await;

        for path in [&input, &output] {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!("Could not remove {}: {}", path.display(), e);
                }
            }
        }

        if result.is_ok() {
            tracing::debug!("Rendered {} certificate in {:?}", format, started.elapsed());
        }
        result
    }
}
