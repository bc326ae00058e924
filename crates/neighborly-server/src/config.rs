use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use neighborly_ai::GeminiConfig;
use neighborly_ai::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your_jwt_secret_key",
];

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:3002",
    "http://localhost:3003",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub gemini: GeminiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("NEIGHBORLY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("NEIGHBORLY_JWT_SECRET is unset or still a placeholder");
        }

        let port = match get("NEIGHBORLY_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid NEIGHBORLY_PORT: {raw}"))?,
            None => 4000,
        };
        let timeout_secs: u64 = match get("NEIGHBORLY_AI_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid NEIGHBORLY_AI_TIMEOUT_SECS: {raw}"))?,
            None => 60,
        };

        let cors_origins = match get("NEIGHBORLY_CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Self {
            host: get("NEIGHBORLY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("NEIGHBORLY_DB_PATH").unwrap_or_else(|| "neighborly.db".into()).into(),
            jwt_secret,
            cors_origins,
            gemini: GeminiConfig {
                api_key: get("GEMINI_API_KEY"),
                model: get("NEIGHBORLY_GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
                base_url: get("NEIGHBORLY_GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("NEIGHBORLY_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 4000);
        assert_eq!(config.db_path, PathBuf::from("neighborly.db"));
        assert_eq!(config.cors_origins.len(), 4);
        assert_eq!(config.gemini.api_key, None);
        assert_eq!(config.gemini.model, DEFAULT_MODEL);
        assert_eq!(config.gemini.timeout, Duration::from_secs(60));
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("NEIGHBORLY_JWT_SECRET", "s3cret"),
            ("NEIGHBORLY_PORT", "8080"),
            ("NEIGHBORLY_CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("GEMINI_API_KEY", "key"),
            ("NEIGHBORLY_AI_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.gemini.api_key.as_deref(), Some("key"));
        assert_eq!(config.gemini.timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_missing_or_placeholder_secret() {
        assert!(load(&[]).is_err());
        assert!(load(&[("NEIGHBORLY_JWT_SECRET", "  ")]).is_err());
        assert!(load(&[("NEIGHBORLY_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(load(&[("NEIGHBORLY_JWT_SECRET", "s"), ("NEIGHBORLY_PORT", "http")]).is_err());
        assert!(load(&[("NEIGHBORLY_JWT_SECRET", "s"), ("NEIGHBORLY_AI_TIMEOUT_SECS", "-1")]).is_err());
    }
}
