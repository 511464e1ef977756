pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "coursehub")]
#[command(about = "CourseHub CLI - assemble programs, load fixtures, render certificates")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Print the assembled document for one program")]
    Assemble(commands::assemble::AssembleArgs),

    #[command(about = "Load course content fixtures into a language partition")]
    Fixture {
        #[command(subcommand)]
        cmd: commands::fixture::FixtureCommands,
    },

    #[command(about = "Certificate rendering")]
    Certificate {
        #[command(subcommand)]
        cmd: commands::certificate::CertificateCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Assemble(args) => commands::assemble::handle(args, &config, output_format).await,
        Commands::Fixture { cmd } => commands::fixture::handle(cmd, &config, output_format).await,
        Commands::Certificate { cmd } => {
            commands::certificate::handle(cmd, &config, output_format).await
        }
    }
}
