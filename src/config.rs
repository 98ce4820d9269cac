use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{Context, bail};

/// Which `UserStore` implementation the server is wired to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Redis { uri: String },
    Memory,
}

/// Application configuration driven by environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    pub store: StoreBackend,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = env::var("SCOREBOARD_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("parsing SCOREBOARD_BIND_ADDR")?;

        let cors_origin = env::var("SCOREBOARD_CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        let kind: StoreKind = env::var("SCOREBOARD_STORE")
            .unwrap_or_else(|_| "redis".to_string())
            .parse()?;

        let store = match kind {
            StoreKind::Redis => {
                let uri = env::var("REDIS_URI")
                    .ok()
                    .filter(|value| !value.is_empty())
                    .context("REDIS_URI is not set in environment variables")?;
                StoreBackend::Redis { uri }
            }
            StoreKind::Memory => StoreBackend::Memory,
        };

        Ok(Self {
            bind_addr,
            cors_origin,
            store,
        })
    }
}

enum StoreKind {
    Redis,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown store backend {other:?}, expected \"redis\" or \"memory\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 4] = [
        "SCOREBOARD_BIND_ADDR",
        "SCOREBOARD_CORS_ORIGIN",
        "SCOREBOARD_STORE",
        "REDIS_URI",
    ];

    // Both cases live in one test so they never race each other on the process environment.
    #[test]
    fn env_drives_backend_and_defaults() {
        let previous: Vec<Option<String>> = VARS.iter().map(|key| env::var(key).ok()).collect();

        // Mutating process environment is unsafe in Rust 2024 because it affects global state.
        unsafe {
            for key in VARS {
                env::remove_var(key);
            }
        }

        let err = AppConfig::from_env().expect_err("redis backend needs a uri");
        assert!(err.to_string().contains("REDIS_URI"));

        unsafe {
            env::set_var("REDIS_URI", "redis://127.0.0.1:6379/0");
        }
        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.cors_origin, "http://localhost:5173");
        assert_eq!(
            config.store,
            StoreBackend::Redis {
                uri: "redis://127.0.0.1:6379/0".to_string()
            }
        );

        unsafe {
            env::remove_var("REDIS_URI");
            env::set_var("SCOREBOARD_STORE", "Memory");
        }
        let config = AppConfig::from_env().expect("memory backend needs no uri");
        assert_eq!(config.store, StoreBackend::Memory);

        unsafe {
            env::set_var("SCOREBOARD_STORE", "sqlite");
        }
        assert!(AppConfig::from_env().is_err());

        // Restore any previous environment to avoid leaking state across tests.
        unsafe {
            for (key, value) in VARS.iter().zip(previous) {
                match value {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
