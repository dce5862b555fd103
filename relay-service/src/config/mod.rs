use secrecy::{ExposeSecret, Secret};
use service_core::config::{self as core_config, get_env, get_env_opt, get_env_parsed, split_list};
use service_core::error::AppError;
use service_core::middleware::rate_limit::RateLimitPolicy;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_MAX_PROMPT_CHARS: usize = 10_000;
/// 1 MiB request body cap.
const DEFAULT_MAX_BODY_BYTES: usize = 1_048_576;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub gemini: GeminiSettings,
    pub limits: RequestLimits,
    pub rate_limit: RateLimitConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "prod" | "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("Unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
    pub timeout_seconds: u64,
}

impl GeminiSettings {
    /// Whether a usable credential is present in the running configuration.
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    /// Upper bound for prompt and system instruction, in characters.
    pub max_prompt_chars: usize,
    pub max_body_bytes: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Applies to every `/api/*` route.
    pub api: RateLimitPolicy,
    /// Applies to generation calls only, on top of `api`.
    pub generation: RateLimitPolicy,
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api: RateLimitPolicy::new(100, 15 * 60),
            generation: RateLimitPolicy::new(10, 60),
            trust_proxy: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// `*` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            environment: Environment::default(),
            service_name: "relay-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            gemini: GeminiSettings::default(),
            limits: RequestLimits::default(),
            rate_limit: RateLimitConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let defaults = RelayConfig::default();

        let environment: Environment = get_env("ENVIRONMENT", "development")
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let default_origins = match environment {
            Environment::Production => "http://localhost:3000",
            Environment::Development | Environment::Test => "*",
        };

        Ok(RelayConfig {
            common,
            environment,
            service_name: get_env("SERVICE_NAME", &defaults.service_name),
            service_version: get_env("SERVICE_VERSION", &defaults.service_version),
            log_level: get_env("LOG_LEVEL", &defaults.log_level),
            otlp_endpoint: get_env_opt("OTLP_ENDPOINT"),
            gemini: GeminiSettings {
                api_key: get_env_opt("GEMINI_API_KEY").map(Secret::new),
                model: get_env("GEMINI_MODEL", DEFAULT_MODEL),
                api_base: get_env("GEMINI_API_BASE", DEFAULT_API_BASE),
                timeout_seconds: get_env_parsed("GEMINI_TIMEOUT_SECONDS", DEFAULT_TIMEOUT_SECONDS)?,
            },
            limits: RequestLimits {
                max_prompt_chars: get_env_parsed("MAX_PROMPT_CHARS", DEFAULT_MAX_PROMPT_CHARS)?,
                max_body_bytes: get_env_parsed("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            },
            rate_limit: RateLimitConfig {
                api: RateLimitPolicy::new(
                    get_env_parsed("API_RATE_LIMIT_MAX", defaults.rate_limit.api.max_requests)?,
                    get_env_parsed(
                        "API_RATE_LIMIT_WINDOW_SECONDS",
                        defaults.rate_limit.api.window.as_secs(),
                    )?,
                ),
                generation: RateLimitPolicy::new(
                    get_env_parsed(
                        "GENERATE_RATE_LIMIT_MAX",
                        defaults.rate_limit.generation.max_requests,
                    )?,
                    get_env_parsed(
                        "GENERATE_RATE_LIMIT_WINDOW_SECONDS",
                        defaults.rate_limit.generation.window.as_secs(),
                    )?,
                ),
                trust_proxy: get_env_parsed("TRUST_PROXY", false)?,
            },
            security: SecurityConfig {
                allowed_origins: split_list(&get_env("ALLOWED_ORIGINS", default_origins)),
            },
        })
    }

    /// The model name requests are forwarded to.
    pub fn model(&self) -> &str {
        &self.gemini.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!(
            " Development ".parse::<Environment>(),
            Ok(Environment::Development)
        );
        assert_eq!("test".parse::<Environment>(), Ok(Environment::Test));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_blank_api_key_is_not_configured() {
        let mut settings = GeminiSettings::default();
        assert!(!settings.is_configured());

        settings.api_key = Some(Secret::new("   ".to_string()));
        assert!(!settings.is_configured());

        settings.api_key = Some(Secret::new("key-123".to_string()));
        assert!(settings.is_configured());
    }

    #[test]
    fn test_api_key_redacted_in_debug_output() {
        let settings = GeminiSettings {
            api_key: Some(Secret::new("super-secret".to_string())),
            ..GeminiSettings::default()
        };
        assert!(!format!("{:?}", settings).contains("super-secret"));
    }

    #[test]
    fn test_default_limits() {
        let config = RelayConfig::default();
        assert_eq!(config.rate_limit.api.max_requests, 100);
        assert_eq!(config.rate_limit.api.window.as_secs(), 900);
        assert_eq!(config.rate_limit.generation.max_requests, 10);
        assert_eq!(config.rate_limit.generation.window.as_secs(), 60);
        assert_eq!(config.limits.max_prompt_chars, 10_000);
        assert_eq!(config.model(), DEFAULT_MODEL);
    }
}
