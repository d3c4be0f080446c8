use serde::Deserialize;

/// Main configuration structure for News-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub links: LinkConfig,
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
}

/// Traversal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// First URL placed on the queue
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Host the crawl is confined to; derived from the seed when omitted
    #[serde(rename = "target-domain", default)]
    pub target_domain: Option<String>,

    /// Accept subdomains of the target domain as well as the domain itself
    #[serde(rename = "include-subdomains", default)]
    pub include_subdomains: bool,

    /// Fixed pause after every processed URL (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Stop after this many dequeued URLs (0 = unbounded)
    #[serde(rename = "max-pages", default)]
    pub max_pages: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// HTTP page fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Check robots.txt before fetching a page
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            respect_robots: true,
        }
    }
}

/// Article URL shape used for link discovery
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Regex the URL path must match
    #[serde(rename = "path-pattern", default = "default_path_pattern")]
    pub path_pattern: String,

    /// Query parameter carrying the numeric article id (name matched case-insensitively)
    #[serde(rename = "id-param", default = "default_id_param")]
    pub id_param: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            path_pattern: default_path_pattern(),
            id_param: default_id_param(),
        }
    }
}

/// LLM extraction provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Maximum output tokens
    #[serde(rename = "max-tokens", default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Nucleus sampling mass
    #[serde(rename = "top-p", default = "default_top_p")]
    pub top_p: f32,

    /// Frequency penalty
    #[serde(rename = "frequency-penalty", default)]
    pub frequency_penalty: f32,

    /// Instruction prepended to the schema in the system prompt
    #[serde(default = "default_instruction")]
    pub instruction: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory; records land in `<data-root>/<domain>/<fingerprint>/`
    #[serde(rename = "data-root")]
    pub data_root: String,
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_path_pattern() -> String {
    r"(?i)/NewsDetail\.aspx$".to_string()
}

fn default_id_param() -> String {
    "newsID".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_top_p() -> f32 {
    1.0
}

fn default_instruction() -> String {
    "Extract the news data from the markdown content".to_string()
}
