use crate::config::types::{Config, ProxyConfig};
use crate::ConfigError;
use url::Url;

/// Log levels accepted in `logLevel`
pub const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_start_url(&config.start_url)?;
    validate_allowed_domains(&config.allowed_domains)?;
    validate_numbers(config)?;
    validate_log_level(&config.log_level)?;

    if config.output_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "outputDir cannot be empty".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        validate_proxy(proxy)?;
    }

    Ok(())
}

fn validate_start_url(start_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid startUrl '{}': {}", start_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "startUrl '{}' must use http or https",
            start_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "startUrl '{}' has no host",
            start_url
        )));
    }

    Ok(())
}

fn validate_allowed_domains(domains: &[String]) -> Result<(), ConfigError> {
    if domains.is_empty() {
        return Err(ConfigError::Validation(
            "allowedDomains must list at least one domain".to_string(),
        ));
    }

    for domain in domains {
        validate_domain_pattern(domain)?;
    }

    Ok(())
}

/// All numeric knobs must be positive; `requestDelay` may be zero
fn validate_numbers(config: &Config) -> Result<(), ConfigError> {
    let positive: [(&str, u64); 8] = [
        ("maxDepth", config.max_depth.into()),
        ("maxPagesPerDomain", config.max_pages_per_domain.into()),
        ("timeout", config.timeout),
        ("frameworkTimeout", config.framework_timeout),
        ("retryDelay", config.retry_delay),
        ("networkIdleTime", config.network_idle_time),
        ("maxConcurrentRequests", config.max_concurrent_requests.into()),
        ("maxDynamicDepth", config.max_dynamic_depth.into()),
    ];

    for (name, value) in positive {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{} must be positive, got 0",
                name
            )));
        }
    }

    Ok(())
}

fn validate_log_level(level: &str) -> Result<(), ConfigError> {
    if LOG_LEVELS.contains(&level) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "logLevel must be one of {:?}, got '{}'",
            LOG_LEVELS, level
        )))
    }
}

fn validate_proxy(proxy: &ProxyConfig) -> Result<(), ConfigError> {
    Url::parse(&proxy.server).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid proxy server '{}': {}", proxy.server, e))
    })?;
    Ok(())
}

/// Validates a domain pattern (supports a leading `*.` wildcard)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain pattern '{}' has nothing after the wildcard",
            pattern
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
