use anyhow::Context;
use clap::Args;
use std::sync::Arc;

use crate::app::Storage;
use crate::cli::utils::{output_document, require_persistent_storage};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::services::ProgramAssembler;

#[derive(Args)]
pub struct AssembleArgs {
    #[arg(help = "Language code (am, or, en)")]
    pub lang: String,
    #[arg(help = "Program uid")]
    pub program_id: String,
    #[arg(long, help = "Pretty-print the document")]
    pub pretty: bool,
}

pub async fn handle(
    args: AssembleArgs,
    config: &AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    require_persistent_storage(config)?;
    let storage = Storage::open(&config.database).await.context("failed to open storage")?;
    let assembler = ProgramAssembler::from_config(Arc::new(storage.partitions), &config.assembler);

    let result = assembler.assemble(&args.lang, &args.program_id).await;
    if let Some(manager) = &storage.manager {
        manager.close_all().await;
    }

    let program = result.with_context(|| format!("cannot assemble program '{}'", args.program_id))?;
    let value = serde_json::to_value(&program)?;
    output_document(&value, args.pretty || output_format == OutputFormat::Text)
}
