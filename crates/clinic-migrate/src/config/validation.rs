//! Job configuration validation.

use super::{JobConfig, MAX_BATCH_SIZE};
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &JobConfig) -> Result<()> {
    if config.entity_types.is_empty() {
        return Err(MigrateError::Config(
            "entity_types must name at least one entity kind".into(),
        ));
    }

    if config.batch_size == 0 {
        return Err(MigrateError::Config("batch_size must be at least 1".into()));
    }
    if config.batch_size > MAX_BATCH_SIZE {
        return Err(MigrateError::Config(format!(
            "batch_size must be at most {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if let Some(ref filter) = config.entity_filter {
        if filter.field.trim().is_empty() {
            return Err(MigrateError::Config(
                "entity_filter.field must not be empty".into(),
            ));
        }
        if let Some(kind) = filter
            .kinds
            .iter()
            .find(|k| !config.entity_types.contains(k))
        {
            return Err(MigrateError::Config(format!(
                "entity_filter applies to '{}', which is not in entity_types",
                kind
            )));
        }
    }

    Ok(())
}
