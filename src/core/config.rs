use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::constants::{
    API_KEY_ENV_VARS, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_SYSTEM_INSTRUCTION,
};
use crate::core::session::SessionSettings;

/// Optional overrides read from `config.toml`. Anything left unset falls back
/// to the built-in defaults.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Gemini model identifier (e.g., "gemini-flash-lite-latest")
    pub model: Option<String>,
    /// System instruction sent with every request
    pub system_instruction: Option<String>,
    /// API root, without the `models/...` suffix
    pub base_url: Option<String>,
}

/// Settings after applying command-line flags, the config file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub model: String,
    pub system_instruction: String,
    pub base_url: String,
}

impl ResolvedSettings {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            model: self.model.clone(),
            system_instruction: self.system_instruction.clone(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        match Self::default_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read {}: {e}", config_path.display()))?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| format!("Invalid config file {}: {e}", config_path.display()))?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "flint", "flint").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn resolve(&self, model_override: Option<&str>) -> ResolvedSettings {
        let model = model_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| non_blank(self.model.as_deref()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let system_instruction = non_blank(self.system_instruction.as_deref())
            .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string());

        let base_url = non_blank(self.base_url.as_deref())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        ResolvedSettings {
            model,
            system_instruction,
            base_url,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Look up the API credential, trying each supported variable in order.
pub fn api_key_from<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_ENV_VARS
        .iter()
        .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
}

pub fn api_key_from_env() -> Option<String> {
    api_key_from(|name| std::env::var(name).ok())
}

pub fn print_effective(settings: &ResolvedSettings, config_path: Option<&Path>, has_api_key: bool) {
    println!("Current configuration:");
    match config_path {
        Some(path) => println!("  config-file: {}", path.display()),
        None => println!("  config-file: (unavailable)"),
    }
    println!("  model: {}", settings.model);
    println!("  base-url: {}", settings.base_url);
    println!("  system-instruction:");
    for line in settings.system_instruction.lines() {
        println!("    {}", line.trim_end());
    }
    if has_api_key {
        println!("  api-key: set");
    } else {
        println!("  api-key: missing (set {})", API_KEY_ENV_VARS[0]);
    }
}
