//! Credential resolution: environment variables win, the config file at
//! `~/.insync/config.toml` fills whatever is missing.

use anyhow::{Context, Result};
use insync_client::Credentials;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_insync_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CredentialsSection {
    pub login: Option<String>,
    pub auth_basic: Option<String>,
    pub client_app: Option<String>,
    pub dev_id: Option<String>,
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_insync_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(toml::from_str(&s).context("parse config.toml")?)
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let s = toml::to_string_pretty(&Config::default()).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    println!("Wrote {}", p.display());
    println!("Fill in [credentials]: login, auth_basic, client_app, dev_id");
    Ok(())
}

/// Resolve the full credential set or fail naming the first missing value.
pub fn resolve_credentials() -> Result<Credentials> {
    let section = load_config()?.credentials;
    Ok(Credentials {
        login: required("login", "INSYNC_LOGIN", section.login)?,
        auth_basic: required("auth_basic", "INSYNC_AUTH", section.auth_basic)?,
        client_app: required("client_app", "INSYNC_CLIENT_APP", section.client_app)?,
        dev_id: required("dev_id", "INSYNC_DEV_ID", section.dev_id)?,
    })
}

fn required(name: &str, env: &str, fallback: Option<String>) -> Result<String> {
    std::env::var(env)
        .ok()
        .filter(|s| !s.is_empty())
        .or(fallback)
        .with_context(|| {
            format!("missing {env} (set the env var or [credentials].{name} in ~/.insync/config.toml)")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let cfg: Config = toml::from_str(
            r#"
            [credentials]
            login = "user"
            auth_basic = "dXNlcjpwYXNz"
            client_app = "web/1.0"
            dev_id = "device-1"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.credentials.login.as_deref(), Some("user"));
        assert_eq!(cfg.credentials.dev_id.as_deref(), Some("device-1"));
    }

    #[test]
    fn test_empty_config_is_valid() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.credentials.login, None);
    }

    #[test]
    fn test_default_config_round_trips() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let cfg: Config = toml::from_str(&s).unwrap();
        assert_eq!(cfg.credentials.auth_basic, None);
    }
}
