use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub store_timeout: Duration,
    pub session_key: Vec<u8>,
    pub sweep_cron: String,
    pub stale_after: chrono::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL missing"))?;

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| {
            let port = get("PORT").unwrap_or_else(|| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let db_max_connections = parse_or(&get, "DB_MAX_CONNECTIONS", 10u32)?;
        let store_timeout_ms = parse_or(&get, "STORE_TIMEOUT_MS", 5000u64)?;
        if store_timeout_ms == 0 {
            return Err(anyhow!("STORE_TIMEOUT_MS must be greater than zero"));
        }

        let session_key_b64 = get("SESSION_KEY").ok_or_else(|| anyhow!("SESSION_KEY missing"))?;
        let session_key = general_purpose::STANDARD
            .decode(session_key_b64.trim())
            .context("SESSION_KEY must be base64")?;
        if session_key.is_empty() {
            return Err(anyhow!("SESSION_KEY must not be empty"));
        }

        let sweep_cron =
            get("OPEN_ESCALATION_SWEEP_CRON").unwrap_or_else(|| "0 */15 * * * *".to_string());
        let stale_minutes = parse_or(&get, "OPEN_ESCALATION_STALE_MINUTES", 30i64)?;
        if stale_minutes <= 0 {
            return Err(anyhow!("OPEN_ESCALATION_STALE_MINUTES must be greater than zero"));
        }

        Ok(Self {
            database_url,
            bind_addr,
            db_max_connections,
            store_timeout: Duration::from_millis(store_timeout_ms),
            session_key,
            sweep_cron,
            stale_after: chrono::Duration::minutes(stale_minutes),
        })
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} is invalid ({}): {}", key, raw, e)),
        None => Ok(default),
    }
}
