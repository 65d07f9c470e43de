//! Configuration for the OCR tool.
//!
//! Every setting lives in [`AppConfig`], populated once at startup either
//! from the process environment ([`AppConfig::from_env`]) or explicitly via
//! [`AppConfig::builder`]. Both paths validate eagerly: a missing password,
//! credential blob or API key is reported before any service is contacted.

use crate::error::HwOcrError;
use std::fmt;

/// Expected secret for the access gate.
pub const ENV_PASSWORD: &str = "password";
/// Raw service-account JSON for the OCR service.
pub const ENV_CREDENTIALS_JSON: &str = "GOOGLE_APPLICATION_CREDENTIALS_JSON";
/// Set by the credential provisioner to the materialised key file.
pub const ENV_CREDENTIALS_PATH: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// API key for the generative-text service.
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

pub const ENV_MODEL: &str = "HWOCR_MODEL";
pub const ENV_PROVIDER: &str = "HWOCR_PROVIDER";
pub const ENV_OCR_TIMEOUT: &str = "HWOCR_OCR_TIMEOUT";
pub const ENV_REFINE_TIMEOUT: &str = "HWOCR_REFINE_TIMEOUT";
pub const ENV_LANGUAGE_HINTS: &str = "HWOCR_LANGUAGE_HINTS";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Configuration for one running instance of the tool.
///
/// # Example
/// ```rust
/// use hwocr::AppConfig;
///
/// let config = AppConfig::builder()
///     .password("rahasia")
///     .credentials_json(r#"{"type":"service_account"}"#)
///     .gemini_api_key("AIza-test")
///     .language_hints(["id", "en"])
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-2.0-flash");
/// ```
#[derive(Clone)]
pub struct AppConfig {
    /// Expected secret compared by the access gate.
    pub password: String,

    /// Service-account JSON blob, written to a temp file at startup.
    pub credentials_json: String,

    /// API key for the generative-text provider.
    pub gemini_api_key: String,

    /// `edgequake-llm` provider name. Default: `gemini`.
    pub provider_name: String,

    /// Generative model identifier. Default: `gemini-2.0-flash`.
    pub model: String,

    /// Sampling temperature for the refine call. Default: 0.2.
    ///
    /// Kept low so the model tidies the transcription instead of rewriting it.
    pub temperature: f32,

    /// Maximum tokens generated by the refine call. Default: 4096.
    pub max_tokens: usize,

    /// Per-call timeout for the OCR service in seconds. Default: 60.
    pub ocr_timeout_secs: u64,

    /// Per-call timeout for the refine call in seconds. Default: 120.
    pub refine_timeout_secs: u64,

    /// BCP-47 language hints forwarded to the OCR service. Default: none.
    pub language_hints: Vec<String>,

    /// Vision `images:annotate` endpoint.
    pub vision_endpoint: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            password: String::new(),
            credentials_json: String::new(),
            gemini_api_key: String::new(),
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            ocr_timeout_secs: 60,
            refine_timeout_secs: 120,
            language_hints: Vec::new(),
            vision_endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("password", &redact(&self.password))
            .field("credentials_json", &redact(&self.credentials_json))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("refine_timeout_secs", &self.refine_timeout_secs)
            .field("language_hints", &self.language_hints)
            .field("vision_endpoint", &self.vision_endpoint)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl AppConfig {
    /// Create a new builder for `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, HwOcrError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    ///
    /// Separated from [`AppConfig::from_env`] so tests never touch the real
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HwOcrError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder()
            .password(get(ENV_PASSWORD).unwrap_or_default())
            .credentials_json(get(ENV_CREDENTIALS_JSON).unwrap_or_default())
            .gemini_api_key(get(ENV_GEMINI_API_KEY).unwrap_or_default());

        if let Some(model) = get(ENV_MODEL) {
            builder = builder.model(model.trim());
        }
        if let Some(provider) = get(ENV_PROVIDER) {
            builder = builder.provider_name(provider.trim());
        }
        if let Some(secs) = get(ENV_OCR_TIMEOUT) {
            builder = builder.ocr_timeout_secs(parse_secs(ENV_OCR_TIMEOUT, &secs)?);
        }
        if let Some(secs) = get(ENV_REFINE_TIMEOUT) {
            builder = builder.refine_timeout_secs(parse_secs(ENV_REFINE_TIMEOUT, &secs)?);
        }
        if let Some(hints) = get(ENV_LANGUAGE_HINTS) {
            builder = builder.language_hints(
                hints
                    .split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string),
            );
        }

        builder.build()
    }
}

fn parse_secs(var: &str, raw: &str) -> Result<u64, HwOcrError> {
    raw.trim()
        .parse()
        .map_err(|_| HwOcrError::InvalidConfig(format!("{var} must be a whole number of seconds, got '{raw}'")))
}

/// Builder for [`AppConfig`].
#[derive(Debug)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn credentials_json(mut self, blob: impl Into<String>) -> Self {
        self.config.credentials_json = blob.into();
        self
    }

    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.gemini_api_key = key.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn refine_timeout_secs(mut self, secs: u64) -> Self {
        self.config.refine_timeout_secs = secs;
        self
    }

    pub fn language_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.language_hints = hints.into_iter().map(Into::into).collect();
        self
    }

    pub fn vision_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.vision_endpoint = url.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AppConfig, HwOcrError> {
        let c = &self.config;
        if c.password.is_empty() {
            return Err(HwOcrError::MissingConfig {
                var: ENV_PASSWORD,
                hint: "Set the expected login password.",
            });
        }
        if c.credentials_json.trim().is_empty() {
            return Err(HwOcrError::MissingConfig {
                var: ENV_CREDENTIALS_JSON,
                hint: "Paste the Google Cloud service-account JSON into this variable.",
            });
        }
        if c.gemini_api_key.trim().is_empty() {
            return Err(HwOcrError::MissingConfig {
                var: ENV_GEMINI_API_KEY,
                hint: "Create a key at https://aistudio.google.com/apikey.",
            });
        }
        if c.model.trim().is_empty() {
            return Err(HwOcrError::InvalidConfig("model must not be empty".into()));
        }
        if c.ocr_timeout_secs == 0 || c.refine_timeout_secs == 0 {
            return Err(HwOcrError::InvalidConfig("timeouts must be ≥ 1s".into()));
        }
        if c.max_tokens == 0 {
            return Err(HwOcrError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}
