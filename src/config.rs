use std::path::{Path, PathBuf};

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub platform: PlatformConfig,
  /// Custom title for the header (defaults to the platform domain if not set)
  pub title: Option<String>,
  /// Page size for paginated list views
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Ceiling for every outbound request, in seconds
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
  /// How long cached server resources stay fresh, in seconds
  #[serde(default = "default_stale_after_secs")]
  pub stale_after_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
  /// Base URL of the platform API, e.g. https://api.tavern.example
  pub url: String,
  /// Account email used for login
  pub email: String,
}

fn default_page_size() -> u32 {
  20
}

fn default_request_timeout_secs() -> u64 {
  10
}

fn default_stale_after_secs() -> i64 {
  300
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./tavern.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/tavern/config.yaml
  /// 4. ~/.config/tavern/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/tavern/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("tavern.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("tavern").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the account password from environment variables.
  ///
  /// Checks TAVERN_PASSWORD first, then TAVERN_PLATFORM_PASSWORD as fallback.
  pub fn get_password() -> Result<String> {
    std::env::var("TAVERN_PASSWORD")
      .or_else(|_| std::env::var("TAVERN_PLATFORM_PASSWORD"))
      .map_err(|_| {
        eyre!("Account password not found. Set TAVERN_PASSWORD environment variable.")
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parses_minimal_config_with_defaults() {
    let yaml = r#"
platform:
  url: https://api.tavern.example
  email: aldric@example.com
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.platform.url, "https://api.tavern.example");
    assert_eq!(config.page_size, 20);
    assert_eq!(config.request_timeout_secs, 10);
    assert_eq!(config.stale_after_secs, 300);
    assert!(config.title.is_none());
  }

  #[test]
  fn test_overrides_defaults() {
    let yaml = r#"
platform:
  url: https://api.tavern.example
  email: aldric@example.com
title: My Tavern
page_size: 50
stale_after_secs: 60
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.title.as_deref(), Some("My Tavern"));
    assert_eq!(config.page_size, 50);
    assert_eq!(config.stale_after_secs, 60);
  }
}
