use anyhow::{anyhow, Context};
use clap::Subcommand;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::api::format::document_from_api_input;
use crate::app::Storage;
use crate::cli::utils::{output_success, require_persistent_storage};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::manager::DatabaseError;
use crate::database::partitions::Partition;
use crate::types::{Language, ResourceKind};

#[derive(Subcommand)]
pub enum FixtureCommands {
    #[command(about = "Load a JSON or YAML fixture ({resource: [documents...]}) into a partition")]
    Load {
        #[arg(help = "Language code (am, or, en)")]
        lang: String,
        #[arg(help = "Fixture file (.json, .yaml or .yml)")]
        path: PathBuf,
        #[arg(long, help = "Replace documents whose uid already exists")]
        replace: bool,
    },
}

/// Documents of one resource kind, in file order
pub type FixtureSet = Vec<(ResourceKind, Vec<Value>)>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadCounts {
    pub created: usize,
    pub replaced: usize,
    pub skipped: usize,
}

pub async fn handle(
    cmd: FixtureCommands,
    config: &AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        FixtureCommands::Load { lang, path, replace } => {
            handle_load(&lang, &path, replace, config, output_format).await
        }
    }
}

async fn handle_load(
    lang: &str,
    path: &Path,
    replace: bool,
    config: &AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    require_persistent_storage(config)?;
    let language: Language = lang.parse()?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let fixture = parse_fixture(&text, path)?;

    let storage = Storage::open(&config.database).await.context("failed to open storage")?;
    let partition = storage.partitions.get(language);

    let mut summary = Map::new();
    let mut result = Ok(());
    for (kind, documents) in fixture {
        match load_documents(partition, kind, documents, replace).await {
            Ok(counts) => {
                if output_format == OutputFormat::Text {
                    println!(
                        "{}: {} created, {} replaced, {} skipped",
                        kind, counts.created, counts.replaced, counts.skipped
                    );
                }
                summary.insert(
                    kind.to_string(),
                    json!({
                        "created": counts.created,
                        "replaced": counts.replaced,
                        "skipped": counts.skipped,
                    }),
                );
            }
            Err(e) => {
                result = Err(e.context(format!("failed loading {}", kind)));
                break;
            }
        }
    }
    storage.close().await;
    result?;

    output_success(
        output_format,
        &format!("Loaded {} into {} partition", path.display(), language),
        Some(json!({ "resources": summary })),
    )
}

/// Parse fixture text; the format follows the file extension (YAML unless `.json`)
pub fn parse_fixture(text: &str, path: &Path) -> anyhow::Result<FixtureSet> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let raw: BTreeMap<String, Value> = if is_json {
        serde_json::from_str(text).context("invalid JSON fixture")?
    } else {
        serde_yaml::from_str(text).context("invalid YAML fixture")?
    };

    let mut sets: FixtureSet = Vec::with_capacity(raw.len());
    for (name, value) in raw {
        let kind: ResourceKind = name.parse()?;
        let documents = match value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            _ => return Err(anyhow!("fixture entry '{}' must be a list of documents", name)),
        };
        sets.push((kind, documents));
    }
    sets.sort_by_key(|(kind, _)| load_rank(*kind));
    Ok(sets)
}

/// Referenced kinds first
fn load_rank(kind: ResourceKind) -> u8 {
    match kind {
        ResourceKind::Images => 0,
        ResourceKind::Modules => 1,
        ResourceKind::Courses => 2,
        ResourceKind::FinalQuiz => 3,
        ResourceKind::Programs => 4,
    }
}

pub async fn load_documents(
    partition: &Partition,
    kind: ResourceKind,
    documents: Vec<Value>,
    replace: bool,
) -> anyhow::Result<LoadCounts> {
    let collection = partition.documents(kind);
    let mut counts = LoadCounts::default();

    for (index, value) in documents.into_iter().enumerate() {
        let document = document_from_api_input(kind, value)
            .with_context(|| format!("{} entry #{} is invalid", kind, index))?;
        let uid = document.uid().unwrap_or_default().to_string();

        match collection.create(document.clone()).await {
            Ok(_) => counts.created += 1,
            Err(DatabaseError::Conflict(_)) if replace => {
                collection.update(&uid, document).await?;
                counts.replaced += 1;
            }
            Err(DatabaseError::Conflict(_)) => {
                tracing::debug!("Skipping existing {} {}", kind, uid);
                counts.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::partitions::Partitions;

    const YAML: &str = r#"
programs:
  - uid: p1
    title: Intro
    courses_ids: { a: c1 }
courses:
  - uid: c1
    module_ids: { a: m1 }
modules:
  - uid: m1
    title: M1
"#;

    #[test]
    fn parses_yaml_in_dependency_order() {
        let sets = parse_fixture(YAML, Path::new("seed.yaml")).unwrap();
        let kinds: Vec<ResourceKind> = sets.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![ResourceKind::Modules, ResourceKind::Courses, ResourceKind::Programs]);
        assert_eq!(sets[2].1[0]["title"], "Intro");
    }

    #[test]
    fn rejects_unknown_resources_and_non_lists() {
        assert!(parse_fixture(r#"{"lessons": []}"#, Path::new("x.json")).is_err());
        assert!(parse_fixture(r#"{"modules": {"uid": "m1"}}"#, Path::new("x.json")).is_err());
    }

    #[tokio::test]
    async fn load_refuses_the_memory_backend() {
        let mut config = AppConfig::development();
        config.database.backend = crate::config::StorageBackend::Memory;

        let err = handle_load("en", Path::new("missing.yaml"), false, &config, OutputFormat::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("STORAGE_BACKEND=memory"));
    }

    #[tokio::test]
    async fn skips_or_replaces_existing_documents() {
        let partitions = Partitions::in_memory();
        let partition = partitions.get(Language::Or);
        let docs = vec![json!({ "uid": "m1", "title": "First" })];

        let counts = load_documents(partition, ResourceKind::Modules, docs, false).await.unwrap();
        assert_eq!(counts.created, 1);

        let again = vec![json!({ "uid": "m1", "title": "Second" })];
        let counts = load_documents(partition, ResourceKind::Modules, again.clone(), false).await.unwrap();
        assert_eq!(counts.skipped, 1);

        let counts = load_documents(partition, ResourceKind::Modules, again, true).await.unwrap();
        assert_eq!(counts.replaced, 1);
        let stored = partition.documents(ResourceKind::Modules).select_one("m1").await.unwrap().unwrap();
        assert_eq!(stored.fields["title"], "Second");
    }
}
