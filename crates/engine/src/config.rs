use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use nutrirec_core::DEFAULT_NEIGHBORS;
use serde::Deserialize;

pub const DEFAULT_CONFIG: &str = "nutrirec.toml";
pub const DEFAULT_SNAPSHOT: &str = "recipes.snapshot";
pub const DEFAULT_INSTRUCTIONS: &str = "instructions.sqlite";
pub const DEFAULT_MAX_NEIGHBORS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub snapshot_path: PathBuf,
    pub instructions_path: PathBuf,
    pub default_k: usize,
    pub max_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT),
            instructions_path: PathBuf::from(DEFAULT_INSTRUCTIONS),
            default_k: DEFAULT_NEIGHBORS,
            max_k: DEFAULT_MAX_NEIGHBORS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    data: DataSection,
    #[serde(default)]
    query: QuerySection,
}

#[derive(Debug, Default, Deserialize)]
struct DataSection {
    snapshot: Option<PathBuf>,
    instructions: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct QuerySection {
    default_k: Option<usize>,
    max_k: Option<usize>,
}

impl EngineConfig {
    /// Defaults, then the TOML file named by `NUTRIREC_CONFIG` (or
    /// `nutrirec.toml` when present), then environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = env::var("NUTRIREC_CONFIG").ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG));
        let base = if path.exists() {
            Self::from_file(&path)?
        } else if explicit.is_some() {
            return Err(anyhow!("config file {} not found", path.display()));
        } else {
            Self::default()
        };
        base.with_overrides(|key| env::var(key).ok())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(raw)?;
        let mut config = Self::default();
        if let Some(snapshot) = file.data.snapshot {
            config.snapshot_path = snapshot;
        }
        if let Some(instructions) = file.data.instructions {
            config.instructions_path = instructions;
        }
        if let Some(k) = file.query.default_k {
            config.default_k = k;
        }
        if let Some(k) = file.query.max_k {
            config.max_k = k;
        }
        Ok(config)
    }

    /// Applies `NUTRIREC_*` overrides read through `lookup`, then validates
    /// the merged result. Unparseable numbers are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("NUTRIREC_SNAPSHOT") {
            self.snapshot_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("NUTRIREC_INSTRUCTIONS") {
            self.instructions_path = PathBuf::from(path);
        }
        if let Some(k) = lookup("NUTRIREC_DEFAULT_K").and_then(|v| v.trim().parse().ok()) {
            self.default_k = k;
        }
        if let Some(k) = lookup("NUTRIREC_MAX_K").and_then(|v| v.trim().parse().ok()) {
            self.max_k = k;
        }
        self.validate()
    }

    pub fn validate(self) -> Result<Self> {
        if self.default_k == 0 {
            return Err(anyhow!("default_k must be at least 1"));
        }
        if self.max_k < self.default_k {
            return Err(anyhow!(
                "max_k ({}) must not be smaller than default_k ({})",
                self.max_k,
                self.default_k
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [data]
            snapshot = "/srv/recipes.snapshot"
            "#,
        )
        .unwrap();
        assert_eq!(config.snapshot_path, PathBuf::from("/srv/recipes.snapshot"));
        assert_eq!(config.instructions_path, PathBuf::from(DEFAULT_INSTRUCTIONS));
        assert_eq!(config.default_k, DEFAULT_NEIGHBORS);
        assert_eq!(config.max_k, DEFAULT_MAX_NEIGHBORS);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("NUTRIREC_INSTRUCTIONS", "/tmp/i.sqlite"),
            ("NUTRIREC_MAX_K", "12"),
            ("NUTRIREC_DEFAULT_K", "not a number"),
        ]
        .into_iter()
        .collect();
        let config = EngineConfig::from_toml_str("[query]\ndefault_k = 3\n")
            .unwrap()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.instructions_path, PathBuf::from("/tmp/i.sqlite"));
        assert_eq!(config.default_k, 3);
        assert_eq!(config.max_k, 12);
    }

    #[test]
    fn rejects_inconsistent_limits() {
        let merged = |raw: &str| EngineConfig::from_toml_str(raw)?.with_overrides(|_| None);
        assert!(merged("[query]\ndefault_k = 0\n").is_err());
        assert!(merged("[query]\ndefault_k = 10\nmax_k = 4\n").is_err());
    }

    #[test]
    fn limits_are_checked_after_env_overrides() {
        let config = EngineConfig::from_toml_str("[query]\ndefault_k = 200\n")
            .unwrap()
            .with_overrides(|key| (key == "NUTRIREC_MAX_K").then(|| "300".to_string()))
            .unwrap();
        assert_eq!(config.default_k, 200);
        assert_eq!(config.max_k, 300);

        let lowered = EngineConfig::from_toml_str("[query]\nmax_k = 8\n")
            .unwrap()
            .with_overrides(|key| (key == "NUTRIREC_DEFAULT_K").then(|| "9".to_string()));
        assert!(lowered.is_err());
    }

    #[test]
    fn reads_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG);
        fs::write(&path, "[query]\nmax_k = 20\n").unwrap();
        assert_eq!(EngineConfig::from_file(&path).unwrap().max_k, 20);
        assert!(EngineConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
