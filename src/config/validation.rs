use crate::config::types::{
    Config, CrawlerConfig, ExtractionConfig, LinkConfig, OutputConfig, UserAgentConfig,
};
use crate::url::{extract_domain, normalize_url, DomainGuard};
use crate::ConfigError;
use regex::Regex;
use std::time::Duration;
use url::Url;

/// Upper bound on the inter-request delay
const MAX_REQUEST_DELAY_MS: u64 = 60_000;

/// Startup values derived from a validated configuration
///
/// Built once before traversal begins; everything in here is immutable for
/// the rest of the run.
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    /// Normalized seed URL
    pub seed: Url,

    /// The seed as configured (fragment dropped); this is what gets requested
    pub seed_fetch_url: Url,

    /// Domain scoping rule for the seed and every discovered URL
    pub guard: DomainGuard,

    /// Fixed pause after each processed URL
    pub delay: Duration,
}

/// Validates the entire configuration and derives the crawl plan
pub fn validate(config: &Config) -> Result<CrawlPlan, ConfigError> {
    let plan = validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_link_config(&config.links)?;
    validate_extraction_config(&config.extraction)?;
    validate_output_config(&config.output)?;
    Ok(plan)
}

/// Reads the extraction API key from the environment variable named in the config
///
/// A missing or blank variable is a startup failure.
pub fn resolve_api_key(config: &ExtractionConfig) -> Result<String, ConfigError> {
    match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(ConfigError::MissingCredential(config.api_key_env.clone())),
    }
}

/// Validates traversal settings: seed, domain scope, delay
fn validate_crawler_config(config: &CrawlerConfig) -> Result<CrawlPlan, ConfigError> {
    let seed = normalize_url(&config.seed_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed_url, e))
    })?;

    let mut seed_fetch_url = Url::parse(config.seed_url.trim()).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed_url, e))
    })?;
    seed_fetch_url.set_fragment(None);

    let domain = match &config.target_domain {
        Some(domain) => {
            validate_domain_string(domain)?;
            domain.clone()
        }
        None => extract_domain(&seed).ok_or_else(|| {
            ConfigError::Validation(format!(
                "No target-domain given and none derivable from seed '{}'",
                config.seed_url
            ))
        })?,
    };

    let guard = DomainGuard::new(&domain, config.include_subdomains)
        .map_err(|e| ConfigError::Validation(format!("Invalid target domain: {}", e)))?;

    if !guard.allowed(&seed) {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' is outside target domain '{}'",
            config.seed_url,
            guard.domain()
        )));
    }

    if config.request_delay_ms > MAX_REQUEST_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "request_delay_ms must be <= {}ms, got {}ms",
            MAX_REQUEST_DELAY_MS, config.request_delay_ms
        )));
    }

    Ok(CrawlPlan {
        seed,
        seed_fetch_url,
        guard,
        delay: Duration::from_millis(config.request_delay_ms),
    })
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the article URL shape
fn validate_link_config(config: &LinkConfig) -> Result<(), ConfigError> {
    Regex::new(&config.path_pattern).map_err(|e| {
        ConfigError::InvalidPattern(format!(
            "Invalid path-pattern '{}': {}",
            config.path_pattern, e
        ))
    })?;

    if config.id_param.trim().is_empty() {
        return Err(ConfigError::Validation(
            "id-param cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates extraction provider parameters
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid extraction base-url: {}", e)))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Extraction base-url must be http(s), got '{}'",
            config.base_url
        )));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("model cannot be empty".to_string()));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "api-key-env cannot be empty".to_string(),
        ));
    }

    if config.max_tokens < 1 {
        return Err(ConfigError::Validation(format!(
            "max_tokens must be >= 1, got {}",
            config.max_tokens
        )));
    }

    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "temperature must be between 0 and 2, got {}",
            config.temperature
        )));
    }

    if !(config.top_p > 0.0 && config.top_p <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "top_p must be in (0, 1], got {}",
            config.top_p
        )));
    }

    if !(-2.0..=2.0).contains(&config.frequency_penalty) {
        return Err(ConfigError::Validation(format!(
            "frequency_penalty must be between -2 and 2, got {}",
            config.frequency_penalty
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "data_root cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
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

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
