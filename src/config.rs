use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::llm::LlmProvider;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const COPYLEAKS_IDENTITY_URL: &str = "https://id.copyleaks.com";
pub const COPYLEAKS_API_URL: &str = "https://api.copyleaks.com";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub default_provider: LlmProvider,
    pub openai: Option<VendorConfig>,
    pub gemini: Option<VendorConfig>,
    pub copyleaks: Option<CopyleaksConfig>,
    pub correlation_ttl: Option<Duration>,
}

/// Credentials and endpoint for one LLM vendor.
#[derive(Clone, Debug)]
pub struct VendorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct CopyleaksConfig {
    pub email: String,
    pub api_key: String,
    pub identity_url: String,
    pub api_url: String,
    /// Public root the provider calls back on, without a trailing slash.
    pub webhook_base_url: String,
    pub sandbox: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let server_addr = SocketAddr::new(ip, port);

        let default_provider = match optional_var("AI_PROVIDER")? {
            Some(name) => name
                .parse::<LlmProvider>()
                .map_err(|_| AppError::ConfigError(format!("Invalid AI_PROVIDER: {}", name)))?,
            None => LlmProvider::OpenAi,
        };

        let openai = vendor_from_env("OPENAI", OPENAI_BASE_URL, "gpt-4o-mini")?;
        let gemini = vendor_from_env("GEMINI", GEMINI_BASE_URL, "gemini-1.5-flash")?;

        let copyleaks = match (optional_var("COPYLEAKS_EMAIL")?, optional_var("COPYLEAKS_API_KEY")?) {
            (Some(email), Some(api_key)) => {
                let webhook_base_url = optional_var("WEBHOOK_BASE_URL")?
                    .unwrap_or_else(|| format!("http://{}", server_addr));
                let sandbox = match optional_var("COPYLEAKS_SANDBOX")? {
                    Some(raw) => parse_bool(&raw)
                        .ok_or_else(|| AppError::ConfigError(format!("Invalid COPYLEAKS_SANDBOX: {}", raw)))?,
                    None => false,
                };

                Some(CopyleaksConfig {
                    email,
                    api_key,
                    identity_url: optional_var("COPYLEAKS_IDENTITY_URL")?
                        .unwrap_or_else(|| COPYLEAKS_IDENTITY_URL.to_string()),
                    api_url: optional_var("COPYLEAKS_API_URL")?
                        .unwrap_or_else(|| COPYLEAKS_API_URL.to_string()),
                    webhook_base_url: webhook_base_url.trim_end_matches('/').to_string(),
                    sandbox,
                })
            }
            _ => None,
        };

        let correlation_ttl = match optional_var("CORRELATION_TTL_SECS")? {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .map_err(|e| AppError::ConfigError(format!("Invalid CORRELATION_TTL_SECS: {}", e)))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Config {
            server_addr,
            default_provider,
            openai,
            gemini,
            copyleaks,
            correlation_ttl,
        })
    }
}

fn vendor_from_env(prefix: &str, default_base: &str, default_model: &str) -> Result<Option<VendorConfig>> {
    let Some(api_key) = optional_var(&format!("{}_API_KEY", prefix))? else {
        return Ok(None);
    };

    Ok(Some(VendorConfig {
        api_key,
        base_url: optional_var(&format!("{}_BASE_URL", prefix))?
            .unwrap_or_else(|| default_base.to_string())
            .trim_end_matches('/')
            .to_string(),
        model: optional_var(&format!("{}_MODEL", prefix))?.unwrap_or_else(|| default_model.to_string()),
    }))
}

fn optional_var(key: &str) -> Result<Option<String>> {
    present(key, env::var(key))
}

/// Unset and blank variables both count as absent.
fn present(key: &str, value: std::result::Result<String, env::VarError>) -> Result<Option<String>> {
    match value {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(AppError::ConfigError(format!("{}: {}", key, err))),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_boolean_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn blank_variable_is_absent() {
        assert_eq!(present("OPENAI_API_KEY", Ok("   ".to_string())).unwrap(), None);
        assert_eq!(present("OPENAI_API_KEY", Err(env::VarError::NotPresent)).unwrap(), None);
        assert_eq!(optional_var("STORY_PROXY_TEST_NEVER_SET").unwrap(), None);
    }

    #[test]
    fn present_values_are_trimmed() {
        assert_eq!(present("GEMINI_MODEL", Ok(" gemini-1.5-pro\n".to_string())).unwrap(), Some("gemini-1.5-pro".to_string()));
    }

    #[test]
    fn non_unicode_variable_is_config_error() {
        let err = present("COPYLEAKS_EMAIL", Err(env::VarError::NotUnicode("x".into()))).unwrap_err();
        assert_eq!(err.code(), "config_error");
        assert!(err.to_string().contains("COPYLEAKS_EMAIL"));
    }
}
