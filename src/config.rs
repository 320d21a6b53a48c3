//! Configuration for iconified paths and index settings.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ICONIFIED_HOME, ICONIFIED_FILESIZE_LIMIT)
//! 2. Config file (.iconified/config.yaml)
//! 3. Defaults (~/.iconified, 5 MB warning threshold, pdf previews)
//!
//! Config file discovery:
//! - Searches current directory and parents for .iconified/config.yaml
//! - Paths in config file are relative to the .iconified/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::format::DEFAULT_FILESIZE_LIMIT;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".iconified";
const STORE_FILE: &str = "site.json";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub index: Option<IndexConfig>,
    #[serde(default)]
    pub preview: Option<PreviewConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .iconified/)
    pub home: Option<String>,
    /// Site snapshot file (relative to .iconified/)
    pub store: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub filesize_limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    pub convertible_types: Option<Vec<String>>,
}

/// Settings consumed by the index builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Size in bytes above which a file raises a warning
    pub filesize_limit: u64,
    /// File extensions the preview service converts
    pub convertible_types: Vec<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            filesize_limit: DEFAULT_FILESIZE_LIMIT,
            convertible_types: vec!["pdf".to_string()],
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Site snapshot file
    pub store_path: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Index settings
    pub index: IndexSettings,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn env_filesize_limit() -> Result<Option<u64>> {
    match std::env::var("ICONIFIED_FILESIZE_LIMIT") {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid ICONIFIED_FILESIZE_LIMIT: {}", raw)),
        Err(_) => Ok(None),
    }
}

/// Merge a parsed config file over the defaults (env vars not applied)
fn resolve_file(default_home: PathBuf, config_path: &Path, config: ConfigFile) -> ResolvedConfig {
    let config_dir = config_path.parent().unwrap_or(Path::new("."));

    let home = config
        .paths
        .home
        .as_ref()
        .map(|home| resolve_path(config_dir, home))
        .unwrap_or(default_home);
    let store_path = config
        .paths
        .store
        .as_ref()
        .map(|store| resolve_path(config_dir, store))
        .unwrap_or_else(|| home.join(STORE_FILE));

    let defaults = IndexSettings::default();
    let index = IndexSettings {
        filesize_limit: config
            .index
            .as_ref()
            .and_then(|i| i.filesize_limit)
            .unwrap_or(defaults.filesize_limit),
        convertible_types: config
            .preview
            .and_then(|p| p.convertible_types)
            .unwrap_or(defaults.convertible_types),
    };

    ResolvedConfig {
        home,
        store_path,
        config_file: Some(config_path.to_path_buf()),
        index,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let mut resolved = match find_config_file() {
        Some(config_path) => {
            let config = load_config_file(&config_path)?;
            resolve_file(default_home, &config_path, config)
        }
        None => ResolvedConfig {
            store_path: default_home.join(STORE_FILE),
            home: default_home,
            config_file: None,
            index: IndexSettings::default(),
        },
    };

    if let Ok(env_home) = std::env::var("ICONIFIED_HOME") {
        let home = PathBuf::from(env_home);
        resolved.store_path = home.join(STORE_FILE);
        resolved.home = home;
    }
    if let Some(limit) = env_filesize_limit()? {
        resolved.index.filesize_limit = limit;
    }

    Ok(resolved)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the iconified home directory
pub fn iconified_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the site snapshot path ($ICONIFIED_HOME/site.json)
pub fn store_path() -> Result<PathBuf> {
    Ok(config()?.store_path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(temp: &TempDir, body: &str) -> PathBuf {
        let dir = temp.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", body).unwrap();
        config_path
    }

    #[test]
    fn test_default_index_settings() {
        let settings = IndexSettings::default();
        assert_eq!(settings.filesize_limit, 5_000_000);
        assert_eq!(settings.convertible_types, vec!["pdf".to_string()]);
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
paths:
  home: ./state
index:
  filesize_limit: 1000
preview:
  convertible_types: [pdf, odt, docx]
"#,
        );

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./state".to_string()));
        assert_eq!(config.index.unwrap().filesize_limit, Some(1000));
        assert_eq!(
            config.preview.unwrap().convertible_types.unwrap().len(),
            3
        );
    }

    #[test]
    fn test_resolve_file_relative_to_config_dir() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
paths:
  home: /srv/iconified
index:
  filesize_limit: 42
"#,
        );
        let config = load_config_file(&config_path).unwrap();

        let resolved = resolve_file(PathBuf::from("/default"), &config_path, config);
        assert_eq!(resolved.home, PathBuf::from("/srv/iconified"));
        assert_eq!(resolved.store_path, PathBuf::from("/srv/iconified/site.json"));
        assert_eq!(resolved.index.filesize_limit, 42);
        assert_eq!(resolved.index.convertible_types, vec!["pdf".to_string()]);
        assert_eq!(resolved.config_file.as_deref(), Some(config_path.as_path()));
    }

    #[test]
    fn test_resolve_file_defaults_home() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(&temp, "version: \"1.0\"");
        let config = load_config_file(&config_path).unwrap();

        let resolved = resolve_file(PathBuf::from("/default"), &config_path, config);
        assert_eq!(resolved.home, PathBuf::from("/default"));
        assert_eq!(resolved.store_path, PathBuf::from("/default/site.json"));
        assert_eq!(resolved.index, IndexSettings::default());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
