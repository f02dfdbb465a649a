use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::client::RetryPolicy;

const DEFAULT_ADDRESS: &str = "http://127.0.0.1";
const DEFAULT_USERNAME: &str = "username";
const DEFAULT_PASSWORD: &str = "password";
const DEFAULT_OBJECT_TARGET: &str = "car";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ALERT_ADDR: &str = "0.0.0.0:7777";

#[derive(Debug, Deserialize, Default)]
struct AinvrConfigFile {
    address: Option<String>,
    username: Option<String>,
    password: Option<String>,
    object_targets: Option<Vec<String>>,
    retry: Option<String>,
    timeout_secs: Option<u64>,
    alert: Option<AlertConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    addr: Option<String>,
}

/// Connection and behaviour settings shared by every tool.
#[derive(Clone)]
pub struct AinvrConfig {
    /// Base URL of the AINVR server, without trailing slash.
    pub address: String,
    pub username: String,
    pub password: String,
    /// Object types the ROI check considers (e.g. `car`).
    pub object_targets: Vec<String>,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub alert_addr: String,
}

impl std::fmt::Debug for AinvrConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AinvrConfig")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("object_targets", &self.object_targets)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("alert_addr", &self.alert_addr)
            .finish()
    }
}

impl Default for AinvrConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            object_targets: vec![DEFAULT_OBJECT_TARGET.to_string()],
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            alert_addr: DEFAULT_ALERT_ADDR.to_string(),
        }
    }
}

impl AinvrConfig {
    /// Loads from the file named by `AINVR_CONFIG` (if set), then applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("AINVR_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Like [`AinvrConfig::load`] but with an explicit file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => AinvrConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AinvrConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let retry = match file.retry.as_deref() {
            Some(value) => RetryPolicy::from_str(value)?,
            None => defaults.retry,
        };
        Ok(Self {
            address: file.address.unwrap_or(defaults.address),
            username: file.username.unwrap_or(defaults.username),
            password: file.password.unwrap_or(defaults.password),
            object_targets: file.object_targets.unwrap_or(defaults.object_targets),
            retry,
            timeout: file
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            alert_addr: file
                .alert
                .and_then(|alert| alert.addr)
                .unwrap_or(defaults.alert_addr),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(address) = non_empty_env("AINVR_ADDRESS") {
            self.address = address;
        }
        if let Some(username) = non_empty_env("AINVR_USERNAME") {
            self.username = username;
        }
        if let Ok(password) = std::env::var("AINVR_PASSWORD") {
            self.password = password;
        }
        if let Some(targets) = non_empty_env("AINVR_OBJECT_TARGETS") {
            self.object_targets = split_csv(&targets);
        }
        if let Some(retry) = non_empty_env("AINVR_RETRY") {
            self.retry = RetryPolicy::from_str(&retry)?;
        }
        if let Some(timeout) = non_empty_env("AINVR_TIMEOUT_SECS") {
            let seconds: u64 = timeout
                .parse()
                .map_err(|_| anyhow!("AINVR_TIMEOUT_SECS must be an integer number of seconds"))?;
            self.timeout = Duration::from_secs(seconds);
        }
        if let Some(addr) = non_empty_env("AINVR_ALERT_ADDR") {
            self.alert_addr = addr;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let address = self.address.trim().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&address)
            .map_err(|e| anyhow!("invalid AINVR address '{}': {}", address, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "AINVR address must use http or https, got '{}'",
                parsed.scheme()
            ));
        }
        self.address = address;

        self.object_targets = self
            .object_targets
            .iter()
            .map(|target| target.trim().to_string())
            .filter(|target| !target.is_empty())
            .collect();
        if self.object_targets.is_empty() {
            return Err(anyhow!("at least one object target is required"));
        }

        if self.timeout.as_secs() == 0 {
            return Err(anyhow!("timeout must be greater than zero"));
        }

        self.alert_addr
            .parse::<SocketAddr>()
            .map_err(|e| anyhow!("invalid alert address '{}': {}", self.alert_addr, e))?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AinvrConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Splits a comma separated list, dropping blank entries.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_drops_blanks() {
        assert_eq!(split_csv(" car, truck ,,bus "), vec!["car", "truck", "bus"]);
        assert!(split_csv(" , ").is_empty());
    }

    #[test]
    fn validate_strips_trailing_slash() {
        let mut cfg = AinvrConfig {
            address: "http://10.0.0.5/".to_string(),
            ..AinvrConfig::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.address, "http://10.0.0.5");
    }

    #[test]
    fn validate_rejects_non_http_scheme() {
        let mut cfg = AinvrConfig {
            address: "ftp://10.0.0.5".to_string(),
            ..AinvrConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_targets() {
        let mut cfg = AinvrConfig {
            object_targets: vec![" ".to_string()],
            ..AinvrConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = AinvrConfig {
            password: "p@ssWord".to_string(),
            ..AinvrConfig::default()
        };
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("p@ssWord"));
        assert!(rendered.contains("<redacted>"));
    }
}
