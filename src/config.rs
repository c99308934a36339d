use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Raw duration string such as `24h` or `1h30m`.
    pub token_lifetime: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    /// Takes precedence over the discrete fields when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
    pub allowed_origins: Vec<String>,
    pub database: DbConfig,
    pub jwt: JwtConfig,
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

pub fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

impl DbConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let url = var("DATABASE_URL");
        let required = |key: &str| -> anyhow::Result<String> {
            match (var(key), &url) {
                (Some(v), _) => Ok(v),
                (None, Some(_)) => Ok(String::new()),
                (None, None) => bail!("{key} is required when DATABASE_URL is not set"),
            }
        };

        Ok(Self {
            host: required("DB_HOST")?,
            user: required("DB_USER")?,
            name: required("DB_NAME")?,
            password: var_or("DB_PASSWORD", ""),
            port: parsed_or("DB_PORT", 5432),
            ssl_mode: var_or("DB_SSLMODE", "disable"),
            max_open_conns: parsed_or("DB_MAX_OPEN_CONNS", 25),
            max_idle_conns: parsed_or("DB_MAX_IDLE_CONNS", 5),
            url,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: var("JWT_SECRET").context("JWT_SECRET is required")?,
            token_lifetime: var_or("TOKEN_LIFETIME", "24h"),
        };
        let port = match var("PORT").or_else(|| var("APP_PORT")) {
            Some(raw) => raw.trim().parse().context("PORT must be a port number")?,
            None => 8080,
        };

        Ok(Self {
            environment: var_or("ENVIRONMENT", "development"),
            host: var_or("APP_HOST", "0.0.0.0"),
            port,
            api_prefix: var_or("API_PREFIX", "/api"),
            allowed_origins: split_origins(&var_or("ALLOWED_ORIGINS", "")),
            database: DbConfig::from_env()?,
            jwt,
        })
    }
}
