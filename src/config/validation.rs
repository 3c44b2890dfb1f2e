use crate::config::types::{Config, DomainEntry, StorageConfig};
use crate::url::domain_key;
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    validate_domains(&config.domains)?;
    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates domain entries
///
/// Every domain identity may be configured only once, since the scheduler
/// keeps exactly one queue and one pacer per identity.
fn validate_domains(domains: &[DomainEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in domains {
        let key = validate_domain_entry(entry)?;

        if !seen.insert(key.clone()) {
            return Err(ConfigError::Validation(format!(
                "Domain '{}' is configured more than once",
                key
            )));
        }
    }

    Ok(())
}

/// Validates a single domain entry and returns its identity
fn validate_domain_entry(entry: &DomainEntry) -> Result<String, ConfigError> {
    let key = domain_key(&entry.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid domain URL '{}': {}", entry.url, e)))?;

    if entry.delay == 0 {
        return Err(ConfigError::Validation(format!(
            "delay for '{}' must be >= 1ms",
            key
        )));
    }

    for point in &entry.start_points {
        let point_key = domain_key(point).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid start point '{}': {}", point, e))
        })?;

        if point_key != key {
            return Err(ConfigError::Validation(format!(
                "Start point '{}' belongs to '{}', not '{}'",
                point, point_key, key
            )));
        }
    }

    Ok(key)
}
