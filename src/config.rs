// src/config.rs
//! Process configuration: Lark credentials and port from the environment, the
//! source table from TOML (or the built-in CIMB/BCA table).

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::{FIRST_SOURCE_COL, ROW_WIDTH};
use crate::error::ConfigError;
use crate::sources::fetcher::FetchTimeouts;
use crate::sources::types::{default_sources, SourceConfig};

pub const ENV_APP_ID: &str = "LARK_APP_ID";
pub const ENV_APP_SECRET: &str = "LARK_APP_SECRET";
pub const ENV_SPREADSHEET_TOKEN: &str = "LARK_SPREADSHEET_TOKEN";
pub const ENV_API_BASE: &str = "LARK_API_BASE";
pub const ENV_PORT: &str = "PORT";
pub const ENV_SOURCES_PATH: &str = "SOURCES_CONFIG_PATH";
pub const ENV_PAGE_TIMEOUT: &str = "FETCH_PAGE_TIMEOUT_SECS";
pub const ENV_SELECTOR_TIMEOUT: &str = "FETCH_SELECTOR_TIMEOUT_SECS";

pub const DEFAULT_API_BASE: &str = "https://open.larksuite.com/open-apis";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";

#[derive(Clone)]
pub struct LarkConfig {
    pub app_id: String,
    pub app_secret: String,
    pub spreadsheet_token: String,
    pub api_base: String,
}

impl fmt::Debug for LarkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LarkConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("spreadsheet_token", &self.spreadsheet_token)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub lark: LarkConfig,
    pub port: u16,
    pub sources: Vec<SourceConfig>,
    pub timeouts: FetchTimeouts,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup. Blank values count as absent.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |k: &'static str| var(k).ok_or(ConfigError::Missing(k));

        let lark = LarkConfig {
            app_id: required(ENV_APP_ID)?,
            app_secret: required(ENV_APP_SECRET)?,
            spreadsheet_token: required(ENV_SPREADSHEET_TOKEN)?,
            api_base: var(ENV_API_BASE).unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        };

        let port = match var(ENV_PORT) {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid(format!("{ENV_PORT}='{p}' is not a port")))?,
            None => DEFAULT_PORT,
        };

        let defaults = FetchTimeouts::default();
        let timeouts = FetchTimeouts {
            page_load: secs_or(var(ENV_PAGE_TIMEOUT), ENV_PAGE_TIMEOUT, defaults.page_load)?,
            selector_wait: secs_or(
                var(ENV_SELECTOR_TIMEOUT),
                ENV_SELECTOR_TIMEOUT,
                defaults.selector_wait,
            )?,
        };

        let sources = load_sources(var(ENV_SOURCES_PATH).map(PathBuf::from))?;

        Ok(Self {
            lark,
            port,
            sources,
            timeouts,
        })
    }
}

fn secs_or(raw: Option<String>, key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match raw {
        Some(s) => s
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| ConfigError::Invalid(format!("{key}='{s}' is not a positive number"))),
        None => Ok(default),
    }
}

/// Source table lookup order:
/// 1) explicit path (must exist)
/// 2) config/sources.toml
/// 3) built-in CIMB + BCA
pub fn load_sources(explicit: Option<PathBuf>) -> Result<Vec<SourceConfig>, ConfigError> {
    if let Some(p) = explicit {
        if !p.exists() {
            return Err(ConfigError::Invalid(format!(
                "{ENV_SOURCES_PATH} points to non-existent path {}",
                p.display()
            )));
        }
        return load_sources_from(&p);
    }
    let fallback = PathBuf::from(DEFAULT_SOURCES_PATH);
    if fallback.exists() {
        return load_sources_from(&fallback);
    }
    let sources = default_sources();
    validate_sources(&sources)?;
    Ok(sources)
}

pub fn load_sources_from(path: &Path) -> Result<Vec<SourceConfig>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let sources = parse_sources(&content).map_err(|reason| ConfigError::Parse {
        path: path.display().to_string(),
        reason,
    })?;
    validate_sources(&sources)?;
    Ok(sources)
}

fn parse_sources(s: &str) -> Result<Vec<SourceConfig>, String> {
    #[derive(serde::Deserialize)]
    struct SourcesFile {
        sources: Vec<SourceConfig>,
    }
    let f: SourcesFile = toml::from_str(s).map_err(|e| e.to_string())?;
    Ok(f.sources)
}

pub fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::Invalid("no sources configured".to_string()));
    }
    let mut names = HashSet::new();
    let mut columns = HashSet::new();
    for s in sources {
        let name = s.name.trim();
        if name.is_empty() || s.url.trim().is_empty() || s.selector.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "source '{}' needs a name, url and selector",
                s.name
            )));
        }
        if !names.insert(name.to_string()) {
            return Err(ConfigError::Invalid(format!("duplicate source '{name}'")));
        }
        if !(FIRST_SOURCE_COL..ROW_WIDTH).contains(&s.sheet_column) {
            return Err(ConfigError::Invalid(format!(
                "source '{name}': sheet_column {} outside {FIRST_SOURCE_COL}..{ROW_WIDTH}",
                s.sheet_column
            )));
        }
        if !columns.insert(s.sheet_column) {
            return Err(ConfigError::Invalid(format!(
                "source '{name}': sheet_column {} already taken",
                s.sheet_column
            )));
        }
    }
    Ok(())
}
