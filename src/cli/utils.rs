use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::{AppConfig, StorageBackend};

/// Storage-backed commands need a database that outlives the process
pub fn require_persistent_storage(config: &AppConfig) -> anyhow::Result<()> {
    if config.database.backend == StorageBackend::Memory {
        anyhow::bail!(
            "STORAGE_BACKEND=memory keeps data only for the life of one process; \
             set STORAGE_BACKEND=postgres and DATABASE_URL to use this command"
        );
    }
    Ok(())
}

/// Output a success message in the appropriate format.
/// In JSON mode the fields of `data` (an object) are merged into the message.
pub fn output_success(
    output_format: OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(obj)) = (data, response.as_object_mut()) {
                obj.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a JSON document, pretty or compact
pub fn output_document(value: &Value, pretty: bool) -> anyhow::Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", serde_json::to_string(value)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_is_refused() {
        let mut config = AppConfig::development();
        assert!(require_persistent_storage(&config).is_ok());

        config.database.backend = StorageBackend::Memory;
        let err = require_persistent_storage(&config).unwrap_err();
        assert!(err.to_string().contains("STORAGE_BACKEND=memory"));
    }
}
