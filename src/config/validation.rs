use crate::config::types::{Config, OutputConfig, SiteConfig, SpiderConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker count accepted from a config file
pub const MAX_THREAD_NUM: usize = 256;

/// Smallest accepted empty sleep time (milliseconds)
pub const MIN_EMPTY_SLEEP_TIME_MS: u64 = 10_000;

/// Pipeline names understood by the binary
pub const PIPELINE_NAMES: &[&str] = &["json-file", "console", "sqlite"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_spider_config(&config.spider)?;
    validate_site_config(&config.site)?;
    validate_output_config(&config.output)?;
    validate_identity(&config.identity())?;
    Ok(())
}

/// Checks a run identity against `[A-Za-z0-9_\-/]+`
///
/// `/` only separates non-empty segments, so the identity always stays a
/// relative path under the data root.
pub fn validate_identity(identity: &str) -> Result<(), ConfigError> {
    let valid = identity.split('/').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    });

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentity(identity.to_string()))
    }
}

/// Validates engine configuration
fn validate_spider_config(config: &SpiderConfig) -> Result<(), ConfigError> {
    if config.thread_num < 1 {
        return Err(ConfigError::InvalidThreadNum(config.thread_num));
    }

    if config.thread_num > MAX_THREAD_NUM {
        return Err(ConfigError::Validation(format!(
            "thread-num must be between 1 and {}, got {}",
            MAX_THREAD_NUM, config.thread_num
        )));
    }

    if let Some(ms) = config.empty_sleep_time {
        if ms < MIN_EMPTY_SLEEP_TIME_MS {
            return Err(ConfigError::InvalidEmptySleepTime(ms));
        }
    }

    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    for seed in &config.start_urls {
        let url = Url::parse(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", seed, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Start URL '{}' must use http or https",
                seed
            )));
        }
    }

    if config.timeout == 0 {
        return Err(ConfigError::Validation(
            "timeout must be greater than 0".to_string(),
        ));
    }

    if config.accepted_status_codes.is_empty() {
        return Err(ConfigError::Validation(
            "accepted-status-codes cannot be empty".to_string(),
        ));
    }

    if config.proxy_pool_enabled && config.proxies.is_empty() {
        return Err(ConfigError::Validation(
            "proxy-pool-enabled requires at least one proxy".to_string(),
        ));
    }

    for proxy in &config.proxies {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    for domain in &config.allowed_domains {
        validate_domain_pattern(domain)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for name in &config.pipelines {
        if !PIPELINE_NAMES.contains(&name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown pipeline '{}', expected one of: {}",
                name,
                PIPELINE_NAMES.join(", ")
            )));
        }
    }

    if config.pipelines.iter().any(|p| p == "sqlite") && config.sqlite_path.is_empty() {
        return Err(ConfigError::Validation(
            "sqlite-path cannot be empty when the sqlite pipeline is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates an allowed-domain pattern (supports a leading `*.`)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Allowed domain '{}' is empty",
            pattern
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Allowed domain '{}' contains invalid characters",
            pattern
        )));
    }

    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return Err(ConfigError::Validation(format!(
            "Allowed domain '{}' has misplaced dots",
            pattern
        )));
    }

    Ok(())
}
