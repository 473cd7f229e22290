//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.skillshell/config.json`) and environment.
//! Paths are resolved here once and injected into the stores; nothing below this module
//! reads the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the dashboard document inside the data directory.
pub const DEFAULT_DASHBOARD_FILE: &str = "skill_dashboard.json";

/// File name of the local catalog's skillset/persona document inside the data directory.
pub const CATALOG_FILE: &str = "skill_catalog.json";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base storage directory for the dashboard and catalog documents. Overridden by
    /// SKILLSHELL_DATA_DIR. Relative paths are resolved against the config file's parent.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Skills load paths.
    #[serde(default)]
    pub skills: SkillsConfig,

    /// Command router settings.
    #[serde(default)]
    pub shell: ShellConfig,

    /// Dashboard document settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Skills load config (primary dir and read-only extra dirs).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsConfig {
    /// Override the default skill root. New skills are created here. Relative paths are resolved against the config file's parent. Omit to use the `skills` subdirectory of the config directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Extra skill directories (lowest precedence, never written to).
    #[serde(default)]
    pub extra_dirs: Vec<PathBuf>,
}

/// Router settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellConfig {
    /// Upper bound for one operation's blocking work (storage I/O, engine call), in milliseconds (default 10000).
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

fn default_operation_timeout_ms() -> u64 {
    10_000
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl ShellConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms.max(1))
    }
}

/// Dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    /// File name inside the data directory (default "skill_dashboard.json").
    #[serde(default = "default_dashboard_file")]
    pub file_name: String,
}

fn default_dashboard_file() -> String {
    DEFAULT_DASHBOARD_FILE.to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            file_name: default_dashboard_file(),
        }
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SKILLSHELL_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".skillshell").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default path). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

fn config_parent(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn resolve_against(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Resolve the data directory: env SKILLSHELL_DATA_DIR, then `config.dataDir`, then the
/// `data` subdirectory of the config directory. The directory need not exist yet.
pub fn resolve_data_dir(config: &Config, config_path: &Path) -> PathBuf {
    let from_env = std::env::var("SKILLSHELL_DATA_DIR")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);
    data_dir_with_override(config, config_path, from_env)
}

fn data_dir_with_override(
    config: &Config,
    config_path: &Path,
    env_override: Option<PathBuf>,
) -> PathBuf {
    let parent = config_parent(config_path);
    match env_override.or_else(|| config.data_dir.clone()) {
        Some(d) if !d.as_os_str().is_empty() => resolve_against(parent, &d),
        _ => parent.join("data"),
    }
}

/// Default skill root when no override is set: `skills` subdirectory of the config file's parent.
pub fn skills_dir(config_path: &Path) -> PathBuf {
    config_parent(config_path).join("skills")
}

/// Resolve the primary skill root: uses `config.skills.directory` if set (relative paths resolved against the config file's parent), otherwise the default `skills` subdirectory.
pub fn resolve_skills_dir(config: &Config, config_path: &Path) -> PathBuf {
    match &config.skills.directory {
        Some(d) if !d.as_os_str().is_empty() => resolve_against(config_parent(config_path), d),
        _ => skills_dir(config_path),
    }
}

/// Resolve extra skill dirs against the config file's parent.
pub fn resolve_extra_skill_dirs(config: &Config, config_path: &Path) -> Vec<PathBuf> {
    let parent = config_parent(config_path);
    config
        .skills
        .extra_dirs
        .iter()
        .filter(|d| !d.as_os_str().is_empty())
        .map(|d| resolve_against(parent, d))
        .collect()
}

/// Full path of the dashboard document.
pub fn resolve_dashboard_path(config: &Config, config_path: &Path) -> PathBuf {
    let name = config.dashboard.file_name.trim();
    let name = if name.is_empty() {
        DEFAULT_DASHBOARD_FILE
    } else {
        name
    };
    resolve_data_dir(config, config_path).join(name)
}
