// src/config/validate.rs

use crate::config::model::ConfigFile;
use crate::errors::{KernelError, Result};

/// Semantic checks on a deserialized config. A config-built kernel manages
/// its executors, so the file must actually describe some.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_executors(cfg)?;
    validate_executor_sections(cfg)?;
    Ok(())
}

fn ensure_has_executors(cfg: &ConfigFile) -> Result<()> {
    if cfg.executor.is_empty() {
        return Err(KernelError::Config(
            "config must contain at least one [executor.<site>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_executor_sections(cfg: &ConfigFile) -> Result<()> {
    for (site, section) in cfg.executor.iter() {
        if site.is_empty() {
            return Err(KernelError::Config(
                "executor site names must be non-empty".to_string(),
            ));
        }
        if section.max_workers == 0 {
            return Err(KernelError::Config(format!(
                "[executor.{site}].max_workers must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}
