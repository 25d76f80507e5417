//! Configuration models for bias-probe.
//!
//! Every tunable of a run lives here. The struct is built once at startup
//! and passed down by reference; nothing reads ambient globals afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid"));

/// Top-level configuration for bias-probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat-completion endpoint settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Model and sampling parameters
    #[serde(default)]
    pub model: ModelSpec,

    /// Input discovery and prompt expansion
    #[serde(default)]
    pub batch: BatchConfig,

    /// Result document location
    #[serde(default)]
    pub output: OutputConfig,

    /// Report rendering settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// Chat-completion endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key (can also be set via the env var named by `api_key_env`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per query
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed pause between attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Model and sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model ID sent to the API (e.g., "gpt-4")
    #[serde(default = "default_model_id")]
    pub id: String,

    /// Human-readable tag written as the `LLM` field of the result document
    #[serde(default = "default_model_label")]
    pub label: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model_id() -> String {
    "gpt-4".to_string()
}

fn default_model_label() -> String {
    "Chat GPT 4".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    100
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            id: default_model_id(),
            label: default_model_label(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Input discovery and prompt expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory scanned for question tables
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Demographic group labels, in iteration order
    #[serde(default = "default_groups")]
    pub groups: Vec<String>,

    /// Queries issued per manufactured prompt
    #[serde(default = "default_responses_per_prompt")]
    pub responses_per_prompt: usize,

    /// Stripped from file names when deriving the file label
    #[serde(default = "default_label_prefix")]
    pub label_prefix: String,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("prompts")
}

/// The fixed demographic group list used when none is configured.
pub fn default_groups() -> Vec<String> {
    [
        "white male",
        "white female",
        "black male",
        "black female",
        "asian male",
        "asian female",
        "hispanic male",
        "hispanic female",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_responses_per_prompt() -> usize {
    1
}

fn default_label_prefix() -> String {
    "Nick LLM Prompts - ".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            groups: default_groups(),
            responses_per_prompt: default_responses_per_prompt(),
            label_prefix: default_label_prefix(),
        }
    }
}

/// Result document location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory (defaults to `<input_dir>/results`)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Default file name; a timestamp is inserted on collision
    #[serde(default = "default_output_filename")]
    pub filename: String,
}

fn default_output_filename() -> String {
    "chatGPT_responses.json".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            filename: default_output_filename(),
        }
    }
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of leading row indices to report on
    #[serde(default = "default_max_idx")]
    pub max_idx: usize,

    /// Longest unbroken run of non-whitespace characters in the PDF
    #[serde(default = "default_break_width")]
    pub break_width: usize,

    /// Wrap width of a PDF line
    #[serde(default = "default_chars_per_line")]
    pub chars_per_line: usize,

    #[serde(default = "default_text_path")]
    pub text_path: PathBuf,

    #[serde(default = "default_pdf_path")]
    pub pdf_path: PathBuf,
}

fn default_max_idx() -> usize {
    15
}

fn default_break_width() -> usize {
    60
}

fn default_chars_per_line() -> usize {
    90
}

fn default_text_path() -> PathBuf {
    PathBuf::from("output.txt")
}

fn default_pdf_path() -> PathBuf {
    PathBuf::from("output.pdf")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_idx: default_max_idx(),
            break_width: default_break_width(),
            chars_per_line: default_chars_per_line(),
            text_path: default_text_path(),
            pdf_path: default_pdf_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the API key from config or environment.
    ///
    /// An inline key that is blank, or still holds a `${VAR}` reference after
    /// expansion, counts as missing.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = &self.api.api_key {
            let key = expand_env_vars(key);
            if key.trim().is_empty() || ENV_VAR_PATTERN.is_match(&key) {
                return Err(ConfigError::MissingApiKey {
                    env_var: self.api.api_key_env.clone(),
                });
            }
            return Ok(key);
        }

        match std::env::var(&self.api.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey {
                env_var: self.api.api_key_env.clone(),
            }),
        }
    }

    /// Apply command-line model overrides.
    ///
    /// A new model ID without an explicit label also becomes the label, so
    /// the `LLM` tag never names a model that did not answer.
    pub fn override_model(&mut self, id: Option<String>, label: Option<String>) {
        match (id, label) {
            (Some(id), Some(label)) => {
                self.model.id = id;
                self.model.label = label;
            }
            (Some(id), None) => {
                self.model.label = id.clone();
                self.model.id = id;
            }
            (None, Some(label)) => self.model.label = label,
            (None, None) => {}
        }
    }

    /// Directory the result document is written to.
    pub fn output_dir(&self) -> PathBuf {
        self.output
            .dir
            .clone()
            .unwrap_or_else(|| self.batch.input_dir.join("results"))
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.groups.is_empty() {
            return Err(ConfigError::Invalid("batch.groups must not be empty".into()));
        }
        if self.batch.responses_per_prompt == 0 {
            return Err(ConfigError::Invalid(
                "batch.responses_per_prompt must be at least 1".into(),
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be at least 1".into()));
        }
        if self.api.max_retries == 0 {
            return Err(ConfigError::Invalid("api.max_retries must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid(format!(
                "model.temperature must be within 0.0..=2.0, got {}",
                self.model.temperature
            )));
        }
        if self.model.max_tokens == 0 {
            return Err(ConfigError::Invalid("model.max_tokens must be at least 1".into()));
        }
        if self.report.break_width == 0 || self.report.chars_per_line == 0 {
            return Err(ConfigError::Invalid(
                "report widths must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(s) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing API key: set {env_var} env var or api.api_key in config")]
    MissingApiKey { env_var: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
