//! Maintenance job configuration file.
//!
//! ```toml
//! interval = "1m"
//! cache_dir = "/var/cache/app"
//!
//! [[commands]]
//! name = "absentees"
//! program = "docker"
//! args = ["exec", "app-django-1", "python", "manage.py", "absentees"]
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use super::parse_duration;

fn default_interval() -> String {
    "1m".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceConfig {
    /// Delay between passes
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Directory deleted at the end of every pass
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Commands run in order on every pass
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    /// Label used in log lines (defaults to the command line)
    #[serde(default)]
    pub name: Option<String>,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None if self.args.is_empty() => f.write_str(&self.program),
            None => write!(f, "{} {}", self.program, self.args.join(" ")),
        }
    }
}

impl MaintenanceConfig {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self =
            toml::from_str(content).context("Failed to parse maintenance config TOML")?;
        config.interval()?;
        if config.commands.is_empty() && config.cache_dir.is_none() {
            anyhow::bail!("Maintenance config has neither commands nor a cache_dir");
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read maintenance config {path:?}"))?;
        Self::from_toml(&content).with_context(|| format!("Invalid maintenance config {path:?}"))
    }

    pub fn interval(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.interval)
            .with_context(|| format!("Invalid maintenance interval '{}'", self.interval))
    }
}
