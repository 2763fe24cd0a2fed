use anyhow::{anyhow, Result};
use std::env;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// How a JSON object is located inside the model's free-text answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionStrategy {
    /// First non-greedy `{...}` match. Stops at the first `}` even inside nested objects.
    #[default]
    Lazy,
    /// Depth-counted scan from the first `{`, aware of string literals.
    Balanced,
}

impl ExtractionStrategy {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lazy" => Some(ExtractionStrategy::Lazy),
            "balanced" => Some(ExtractionStrategy::Balanced),
            _ => None,
        }
    }
}

/// What to do when a required profile field is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFieldPolicy {
    /// Render the field as `undefined` in the prompt and keep going.
    #[default]
    Placeholder,
    /// Fail the request before calling the model.
    Reject,
}

impl MissingFieldPolicy {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "placeholder" => Some(MissingFieldPolicy::Placeholder),
            "reject" => Some(MissingFieldPolicy::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub bind_addr: String,
    pub extraction: ExtractionStrategy,
    pub missing_fields: MissingFieldPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("NEXT_PUBLIC_GOOGLE_AI_API_KEY"))
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow!("GEMINI_API_KEY must be set in .env file"))?;

        let extraction = match lookup("JSON_EXTRACTION") {
            Some(value) => ExtractionStrategy::from_string(&value)
                .ok_or_else(|| anyhow!("JSON_EXTRACTION must be 'lazy' or 'balanced', got '{}'", value))?,
            None => ExtractionStrategy::default(),
        };

        let missing_fields = match lookup("PROFILE_MISSING_FIELDS") {
            Some(value) => MissingFieldPolicy::from_string(&value).ok_or_else(|| {
                anyhow!(
                    "PROFILE_MISSING_FIELDS must be 'placeholder' or 'reject', got '{}'",
                    value
                )
            })?,
            None => MissingFieldPolicy::default(),
        };

        Ok(Self {
            api_key,
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: lookup("GEMINI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            extraction,
            missing_fields,
        })
    }
}
