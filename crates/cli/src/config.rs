//! Executor configuration loading.

use std::path::Path;

use anyhow::{Context, Result};
use engine::ExecutorConfig;

/// Load an `ExecutorConfig` from a JSON file, or fall back to defaults.
///
/// Keys missing from the file keep their default values.
pub fn load_executor_config(path: Option<&Path>) -> Result<ExecutorConfig> {
    let Some(path) = path else {
        return Ok(ExecutorConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config: ExecutorConfig = serde_json::from_str(&content)
        .with_context(|| format!("invalid config {}", path.display()))?;

    tracing::debug!(?config, "loaded executor config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_uses_defaults() {
        assert_eq!(load_executor_config(None).unwrap(), ExecutorConfig::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let path = std::env::temp_dir().join(format!("executor-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{ "max_backoff_ms": 5000 }"#).unwrap();

        let config = load_executor_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.max_backoff_ms, 5_000);
        assert_eq!(config.backoff_multiplier, ExecutorConfig::default().backoff_multiplier);
    }
}
