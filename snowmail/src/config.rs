//! Configuration module for environment variable parsing.
//!
//! Every variable is read exactly once, at startup, into an immutable
//! [`Config`] that is handed to each component explicitly.

use std::env;

use secrecy::SecretString;
use tracing::warn;

/// Tone used by the rewrite step when the caller does not supply one.
pub const DEFAULT_TONE: &str = "professional, friendly";

/// Errors raised while loading configuration. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Which direct-invocation endpoints are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub expose_process: bool,
    pub expose_moderate: bool,
    pub expose_rewrite: bool,
    pub expose_threats: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            expose_process: true,
            expose_moderate: false,
            expose_rewrite: false,
            expose_threats: false,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// HTTP request timeout in milliseconds for every upstream call
    pub request_timeout_ms: u64,

    // =========================================================================
    // OpenAI (moderation + text generation)
    // =========================================================================

    pub openai_api_key: SecretString,
    pub openai_base_url: String,
    pub openai_chat_model: String,
    pub openai_moderation_model: Option<String>,

    /// Tone passed to the rewrite step for webhook-triggered runs
    pub rewrite_tone: String,

    // =========================================================================
    // Mailgun (webhook authentication + delivery)
    // =========================================================================

    /// Mailgun signing key for HMAC signature verification
    pub mailgun_signing_key: SecretString,

    /// Mailgun private API key used to send forwarded mail
    pub mailgun_api_key: SecretString,

    /// Mailgun sending domain; inbound recipients must belong to it
    pub mailgun_domain: String,

    pub mailgun_api_base: String,

    /// Maximum age in seconds for Mailgun webhook timestamps
    pub mailgun_signature_max_age: u64,

    /// The single address every forwarded message goes to
    pub forward_to: String,

    /// Optional fixed From address; the original sender is used otherwise
    pub forward_from: Option<String>,

    // =========================================================================
    // Pocket (read-later store)
    // =========================================================================

    pub pocket_consumer_key: SecretString,
    pub pocket_access_token: SecretString,
    pub pocket_api_base: String,

    pub features: Features,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let defaults = Features::default();

        Ok(Config {
            port: parse_or("PORT", 8080)?,

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 8000)?,

            openai_api_key: required_secret("OPENAI_API_KEY")
                .or_else(|_| required_secret("OPENAI_API"))
                .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY"))?,

            openai_base_url: optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),

            openai_chat_model: optional("OPENAI_CHAT_MODEL")
                .unwrap_or_else(|| "gpt-3.5-turbo".to_string()),

            openai_moderation_model: optional("OPENAI_MODERATION_MODEL"),

            rewrite_tone: optional("REWRITE_TONE").unwrap_or_else(|| DEFAULT_TONE.to_string()),

            mailgun_signing_key: required_secret("MAILGUN_SIGNING_KEY")?,

            mailgun_api_key: required_secret("MAILGUN_API_KEY")?,

            mailgun_domain: required("MAILGUN_DOMAIN")?,

            mailgun_api_base: optional("MAILGUN_API_BASE")
                .unwrap_or_else(|| "https://api.mailgun.net/v3".to_string()),

            mailgun_signature_max_age: parse_or("MAILGUN_SIGNATURE_MAX_AGE", 300)?, // 5 minutes default

            forward_to: required("FORWARD_TO")?,

            forward_from: optional("FORWARD_FROM"),

            pocket_consumer_key: required_secret("POCKET_CONSUMER_KEY")?,

            pocket_access_token: required_secret("POCKET_ACCESS_TOKEN")?,

            pocket_api_base: optional("POCKET_API_BASE")
                .unwrap_or_else(|| "https://getpocket.com/v3".to_string()),

            features: Features {
                expose_process: parse_flag("EXPOSE_PROCESS_ENDPOINT", defaults.expose_process),
                expose_moderate: parse_flag("EXPOSE_MODERATE_ENDPOINT", defaults.expose_moderate),
                expose_rewrite: parse_flag("EXPOSE_REWRITE_ENDPOINT", defaults.expose_rewrite),
                expose_threats: parse_flag("EXPOSE_THREATS_ENDPOINT", defaults.expose_threats),
            },
        })
    }
}

/// Read a variable, treating blank values as unset.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::MissingEnvVar(name))
}

fn required_secret(name: &'static str) -> Result<SecretString, ConfigError> {
    required(name).map(SecretString::from)
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: name,
            message: e.to_string(),
        }),
    }
}

/// Parse a boolean feature flag. Unrecognised values fall back to the default.
fn parse_flag(name: &str, default: bool) -> bool {
    let Some(raw) = optional(name) else {
        return default;
    };

    match parse_bool(&raw) {
        Some(v) => v,
        None => {
            warn!(env_var = name, value = %raw, "Invalid boolean flag, using default");
            default
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("No"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_flag_default() {
        assert!(parse_flag("SNOWMAIL_TEST_NONEXISTENT_FLAG", true));
        assert!(!parse_flag("SNOWMAIL_TEST_NONEXISTENT_FLAG", false));
    }

    #[test]
    fn test_parse_flag_invalid_uses_default() {
        env::set_var("SNOWMAIL_TEST_BAD_FLAG", "sometimes");
        assert!(parse_flag("SNOWMAIL_TEST_BAD_FLAG", true));
        env::remove_var("SNOWMAIL_TEST_BAD_FLAG");
    }

    #[test]
    fn test_parse_or() {
        env::set_var("SNOWMAIL_TEST_PORT", "9090");
        assert_eq!(parse_or("SNOWMAIL_TEST_PORT", 8080u16).unwrap(), 9090);
        env::remove_var("SNOWMAIL_TEST_PORT");

        assert_eq!(parse_or("SNOWMAIL_TEST_UNSET_PORT", 8080u16).unwrap(), 8080);

        env::set_var("SNOWMAIL_TEST_BAD_PORT", "eighty");
        assert!(matches!(
            parse_or("SNOWMAIL_TEST_BAD_PORT", 8080u16),
            Err(ConfigError::InvalidValue { key: "SNOWMAIL_TEST_BAD_PORT", .. })
        ));
        env::remove_var("SNOWMAIL_TEST_BAD_PORT");
    }

    #[test]
    fn test_required_missing() {
        assert!(matches!(
            required("SNOWMAIL_TEST_MISSING_VAR"),
            Err(ConfigError::MissingEnvVar("SNOWMAIL_TEST_MISSING_VAR"))
        ));
    }

    #[test]
    fn test_optional_blank_is_unset() {
        env::set_var("SNOWMAIL_TEST_BLANK", "   ");
        assert_eq!(optional("SNOWMAIL_TEST_BLANK"), None);
        env::remove_var("SNOWMAIL_TEST_BLANK");
    }

    #[test]
    fn test_feature_defaults() {
        let features = Features::default();
        assert!(features.expose_process);
        assert!(!features.expose_moderate);
        assert!(!features.expose_rewrite);
        assert!(!features.expose_threats);
    }
}
