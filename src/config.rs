//! Tool configuration (`intentcheck.yaml`).

use std::fs;
use std::path::{Path, PathBuf};

use globset::Glob;
use serde::{Deserialize, Serialize};

/// Config file names searched for in the working directory, in order.
pub const CONFIG_FILES: &[&str] = &["intentcheck.yaml", ".intentcheck.yaml"];

/// Authentication middleware recognized when no list is configured.
pub const DEFAULT_AUTH_MIDDLEWARE: &[&str] = &[
    "authenticate",
    "requireAuth",
    "isAuthenticated",
    "ensureAuthenticated",
    "verifyToken",
    "passport.authenticate",
    "auth",
];

/// Paths excluded when no list is configured.
pub const DEFAULT_EXCLUDE: &[&str] = &[
    "node_modules/**",
    "dist/**",
    "build/**",
    "coverage/**",
    ".git/**",
];

fn default_intent_file() -> String {
    "intent.yaml".to_string()
}

fn default_scan_dir() -> String {
    ".".to_string()
}

fn default_exclude() -> Vec<String> {
    DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect()
}

fn default_auth_middleware() -> Vec<String> {
    DEFAULT_AUTH_MIDDLEWARE.iter().map(|s| s.to_string()).collect()
}

/// Which analyzers to register.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzersConfig {
    /// Built-in analyzers to enable; all of them when absent.
    #[serde(default)]
    pub include: Option<Vec<String>>,
    /// Custom analyzer names, resolved against the plugin catalog in order.
    #[serde(default)]
    pub custom: Vec<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_intent_file")]
    pub intent_file: String,
    #[serde(default = "default_scan_dir")]
    pub scan_dir: String,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub analyzers: AnalyzersConfig,
    #[serde(default = "default_auth_middleware")]
    pub auth_middleware: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            intent_file: default_intent_file(),
            scan_dir: default_scan_dir(),
            exclude: default_exclude(),
            analyzers: AnalyzersConfig::default(),
            auth_middleware: default_auth_middleware(),
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path.display(), e))?;
        Self::parse_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {}", path.display(), e))
    }

    /// Parse a config from text. An empty document yields the defaults.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Find a config file in a directory.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|path| path.is_file())
    }

    /// Load an explicit config file, a discovered one, or the defaults.
    ///
    /// Returns the config along with the path it was loaded from.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(dir),
        };
        match path {
            Some(path) => {
                let config = Self::parse_file(&path)?;
                tracing::debug!(config = %path.display(), "loaded config");
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Check that every exclude pattern is a valid glob.
    pub fn validate(&self) -> anyhow::Result<()> {
        for pattern in &self.exclude {
            Glob::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid exclude pattern {:?}: {}", pattern, e))?;
        }
        if self.intent_file.trim().is_empty() {
            anyhow::bail!("intentFile must not be empty");
        }
        Ok(())
    }
}
