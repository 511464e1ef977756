use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::services::assembler::DanglingReferencePolicy;
use crate::types::Language;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub assembler: AssemblerConfig,
    pub api: ApiConfig,
    pub certificates: CertificateConfig,
    pub telegram: TelegramConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Public origin used to build absolute links (verification URLs, bot uploads)
    pub base_url: String,
    pub templates_dir: PathBuf,
    pub certificates_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StorageBackend::Postgres),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSettings {
    /// Database name holding the partition's collections
    pub name: String,
    /// Overrides `DatabaseConfig::fallback_url` for this partition
    pub fallback_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagePartitions {
    pub am: PartitionSettings,
    pub or: PartitionSettings,
    pub en: PartitionSettings,
}

impl LanguagePartitions {
    pub fn get(&self, language: Language) -> &PartitionSettings {
        match language {
            Language::Am => &self.am,
            Language::Or => &self.or,
            Language::En => &self.en,
        }
    }

    fn get_mut(&mut self, language: Language) -> &mut PartitionSettings {
        match language {
            Language::Am => &mut self.am,
            Language::Or => &mut self.or,
            Language::En => &mut self.en,
        }
    }
}

impl Default for LanguagePartitions {
    fn default() -> Self {
        let settings = |language: Language| PartitionSettings {
            name: language.default_partition_name().to_string(),
            fallback_url: None,
        };
        Self {
            am: settings(Language::Am),
            or: settings(Language::Or),
            en: settings(Language::En),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: Option<String>,
    pub fallback_url: Option<String>,
    pub partitions: LanguagePartitions,
    pub certificates_db: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
    pub enable_slow_query_warning: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Budget for one whole assembly, all fetches included
    pub timeout_ms: u64,
    pub dangling_references: DanglingReferencePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_list_limit: i64,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateConfig {
    pub template_path: PathBuf,
    pub browser_bin: PathBuf,
    pub render_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        parse_override(lookup, "PORT", &mut self.server.port);
        if let Some(v) = lookup("BASE_URL") {
            self.server.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("TEMPLATES_DIR") {
            self.server.templates_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CERTIFICATES_DIR") {
            self.server.certificates_dir = PathBuf::from(v);
        }

        // Database overrides
        parse_override(lookup, "STORAGE_BACKEND", &mut self.database.backend);
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_FALLBACK_URL") {
            self.database.fallback_url = Some(v);
        }
        for language in Language::ALL {
            let code = language.code().to_ascii_uppercase();
            let settings = self.database.partitions.get_mut(language);
            if let Some(v) = lookup(&format!("DATABASE_PARTITION_{}", code)) {
                settings.name = v;
            }
            if let Some(v) = lookup(&format!("DATABASE_FALLBACK_URL_{}", code)) {
                settings.fallback_url = Some(v);
            }
        }
        if let Some(v) = lookup("DATABASE_CERTIFICATES_DB") {
            self.database.certificates_db = v;
        }
        parse_override(lookup, "DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        parse_override(
            lookup,
            "DATABASE_CONNECTION_TIMEOUT",
            &mut self.database.connection_timeout,
        );
        parse_override(
            lookup,
            "DATABASE_ENABLE_QUERY_LOGGING",
            &mut self.database.enable_query_logging,
        );
        parse_override(
            lookup,
            "DATABASE_ENABLE_SLOW_QUERY_WARNING",
            &mut self.database.enable_slow_query_warning,
        );
        parse_override(
            lookup,
            "DATABASE_SLOW_QUERY_THRESHOLD_MS",
            &mut self.database.slow_query_threshold_ms,
        );

        // Assembler overrides
        parse_override(lookup, "ASSEMBLER_TIMEOUT_MS", &mut self.assembler.timeout_ms);
        parse_override(
            lookup,
            "ASSEMBLER_DANGLING_REFERENCES",
            &mut self.assembler.dangling_references,
        );

        // API overrides
        parse_override(lookup, "API_MAX_LIST_LIMIT", &mut self.api.max_list_limit);
        parse_override(lookup, "API_ENABLE_REQUEST_LOGGING", &mut self.api.enable_request_logging);

        // Certificate overrides
        if let Some(v) = lookup("CERT_TEMPLATE_PATH") {
            self.certificates.template_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CERT_BROWSER_BIN") {
            self.certificates.browser_bin = PathBuf::from(v);
        }
        parse_override(
            lookup,
            "CERT_RENDER_TIMEOUT_SECS",
            &mut self.certificates.render_timeout_secs,
        );

        // Telegram overrides (BOT_TOKEN kept for older deployments)
        if let Some(v) = lookup("TELEGRAM_BOT_TOKEN").or_else(|| lookup("BOT_TOKEN")) {
            self.telegram.bot_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Some(v) = lookup("TELEGRAM_API_BASE") {
            self.telegram.api_base = v.trim_end_matches('/').to_string();
        }

        // Security overrides
        parse_override(lookup, "SECURITY_ENABLE_CORS", &mut self.security.enable_cors);
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::default(),
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                fallback_url: None,
                partitions: LanguagePartitions::default(),
                certificates_db: "Certificates".to_string(),
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
                enable_slow_query_warning: true,
                slow_query_threshold_ms: 100,
            },
            assembler: AssemblerConfig {
                timeout_ms: 30_000,
                dangling_references: DanglingReferencePolicy::Tolerate,
            },
            api: ApiConfig {
                max_list_limit: 1000,
                enable_request_logging: true,
            },
            certificates: CertificateConfig::default(),
            telegram: TelegramConfig::default(),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![],
            },
        }
    }

    pub fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.database.slow_query_threshold_ms = 500;
        config.assembler.timeout_ms = 15_000;
        config.api.max_list_limit = 500;
        config
    }

    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.database.enable_query_logging = false;
        config.database.slow_query_threshold_ms = 1000;
        config.assembler.timeout_ms = 10_000;
        config.api.max_list_limit = 100;
        config.api.enable_request_logging = false;
        config
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            base_url: "http://localhost:4000".to_string(),
            templates_dir: PathBuf::from("templates"),
            certificates_dir: PathBuf::from("certificates"),
        }
    }
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("templates/certificate.html"),
            browser_bin: PathBuf::from("chromium"),
            render_timeout_secs: 60,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

/// Parse `key` into `target` when set; an unparseable value keeps the current one
fn parse_override<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(v) => *target = v,
            Err(_) => tracing::warn!("Ignoring invalid value for {}: {}", key, raw),
        }
    }
}
