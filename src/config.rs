//! Server configuration
//!
//! YAML-backed configuration with a default for every field, so the server
//! runs with no config file at all. `Config::load()` reads the file named by
//! the `TIDEGATE_CONFIG` environment variable when it is set;
//! `Config::from_yaml` parses a literal document, which is what tests use.

use anyhow::Context as _;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub shutdown: ShutdownConfig,
    pub faults: FaultsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the TCP listener binds to
    pub listen_addr: String,
    /// Deadline for reading one full request
    pub read_timeout_secs: u64,
    /// Deadline for each response write
    pub write_timeout_secs: u64,
    /// How long a keep-alive connection may sit between requests
    pub idle_timeout_secs: u64,
    /// Cap on the size of a request's header block
    pub max_header_bytes: usize,
    /// Cap on a request's declared body length
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Grace period the drain may take before remaining connections are
    /// force-closed
    pub grace_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FaultsConfig {
    /// Whether the packet-loss gate sits in front of dispatch
    pub enabled: bool,
    /// Probability that an incoming request is dropped
    pub drop_probability: f64,
    /// Fixed RNG seed for reproducible loss patterns
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            read_timeout_secs: 5,
            write_timeout_secs: 10,
            idle_timeout_secs: 60,
            max_header_bytes: 1 << 20,
            max_body_bytes: 4 << 20,
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_secs: 5 }
    }
}

impl Default for FaultsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            drop_probability: 0.2,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl ShutdownConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

impl Config {
    /// Loads configuration from the file named by `TIDEGATE_CONFIG`,
    /// falling back to defaults when the variable is unset.
    pub fn load() -> anyhow::Result<Self> {
        let cfg = match std::env::var("TIDEGATE_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {path}"))?;
                serde_yaml::from_str(&raw)
                    .with_context(|| format!("parsing config file {path}"))?
            }
            Err(_) => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses a YAML document; missing fields take their defaults.
    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(raw).context("parsing config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.faults.drop_probability) {
            anyhow::bail!(
                "faults.drop_probability must be in [0.0, 1.0], got {}",
                self.faults.drop_probability
            );
        }
        if self.server.read_timeout_secs == 0
            || self.server.write_timeout_secs == 0
            || self.server.idle_timeout_secs == 0
        {
            anyhow::bail!("server timeouts must be non-zero");
        }
        if self.server.max_header_bytes == 0 {
            anyhow::bail!("server.max_header_bytes must be non-zero");
        }
        Ok(())
    }
}
