//! Project configuration from loom.toml
//!
//! ```toml
//! [generate]
//! target = "javascript"
//! output = "bindings"
//! strict = false
//! ```
//!
//! Every key is optional; command-line flags win over file values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default project file name, looked up in the working directory
pub const CONFIG_FILE: &str = "loom.toml";

/// Parsed project file
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    #[serde(default)]
    pub generate: GenerateConfig,
}

/// `[generate]` defaults
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct GenerateConfig {
    /// Target used when `--target` is omitted
    pub target: Option<String>,
    /// Output directory used when `--output` is omitted
    pub output: Option<PathBuf>,
    /// Warn about collapsed duplicate overloads
    pub strict: Option<bool>,
}

impl ProjectConfig {
    /// Load an explicit config file, or `loom.toml` in `dir` when present
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = dir.join(CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded project config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ProjectConfig::load(None, dir.path()).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[generate]\ntarget = \"python\"\noutput = \"out/py\"\nstrict = true\n",
        )
        .unwrap();

        let config = ProjectConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.generate.target.as_deref(), Some("python"));
        assert_eq!(config.generate.output, Some(PathBuf::from("out/py")));
        assert_eq!(config.generate.strict, Some(true));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("custom.toml");
        let err = ProjectConfig::load(Some(&missing), dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config at"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[generate\n").unwrap();
        let err = ProjectConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config at"));
    }

    #[test]
    fn test_empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "").unwrap();
        assert_eq!(ProjectConfig::from_file(&path).unwrap(), ProjectConfig::default());
    }
}
