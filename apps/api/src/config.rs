use anyhow::{bail, Context, Result};

use crate::admin::table::PAGE_SIZE_OPTIONS;

const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which implementation backs the record, blob, and session stores.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Postgres + S3-compatible storage + Redis.
    Hosted(HostedConfig),
    /// Process-local stores. Data is lost on restart.
    Memory,
}

#[derive(Debug, Clone)]
pub struct HostedConfig {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    /// Base URL under which stored objects are publicly fetchable.
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub identity_api_key: String,
    pub identity_endpoint: String,
    /// Lowercased emails allowed through the admin gate.
    pub admin_emails: Vec<String>,
    pub session_ttl_secs: u64,
    pub export_min_delay_ms: u64,
    pub max_upload_bytes: usize,
    pub default_page_size: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let backend = match lookup("STORAGE_BACKEND").as_deref().unwrap_or("hosted") {
            "hosted" => {
                let s3_endpoint = require("S3_ENDPOINT")?;
                let s3_bucket = require("S3_BUCKET")?;
                let s3_public_url = lookup("S3_PUBLIC_URL").unwrap_or_else(|| {
                    format!("{}/{}", s3_endpoint.trim_end_matches('/'), s3_bucket)
                });
                Backend::Hosted(HostedConfig {
                    database_url: require("DATABASE_URL")?,
                    redis_url: require("REDIS_URL")?,
                    s3_bucket,
                    s3_endpoint,
                    s3_region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                    s3_public_url,
                    aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
                    aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
                })
            }
            "memory" => Backend::Memory,
            other => bail!("STORAGE_BACKEND must be 'hosted' or 'memory', got '{other}'"),
        };

        let default_page_size = parse_or(&lookup, "DEFAULT_PAGE_SIZE", 10usize)?;
        if !PAGE_SIZE_OPTIONS.contains(&default_page_size) {
            bail!("DEFAULT_PAGE_SIZE must be one of {PAGE_SIZE_OPTIONS:?}");
        }

        // Redis refuses `SET EX 0`.
        let session_ttl_secs = parse_or(&lookup, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        if session_ttl_secs == 0 {
            bail!("SESSION_TTL_SECS must be at least 1");
        }

        Ok(Config {
            backend,
            identity_api_key: require("IDENTITY_API_KEY")?,
            identity_endpoint: lookup("IDENTITY_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_IDENTITY_ENDPOINT.to_string()),
            admin_emails: parse_admin_emails(lookup("ADMIN_EMAILS").as_deref().unwrap_or("")),
            session_ttl_secs,
            export_min_delay_ms: parse_or(&lookup, "EXPORT_MIN_DELAY_MS", 0u64)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            default_page_size,
            port: parse_or(&lookup, "PORT", 8080u16)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|a| *a == email)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

/// Splits a comma-separated allowlist into normalized emails.
pub fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
