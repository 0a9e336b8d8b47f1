use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::constants;
use crate::model::ContentKind;

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  /// Video platform API key. Without it the metadata client uses the embed-info fallback.
  pub api_key: Option<String>,
  pub cache_ttl_secs: Option<u64>,
  pub items_per_page: Option<usize>,
  /// Default library file used when the CLI is not given `--library`.
  pub library_path: Option<PathBuf>,
  /// Log filter directive, e.g. `info` or `al_rawi=debug`. `RUST_LOG` wins when set.
  pub log_level: Option<String>,
  /// Statuses pre-selected in the status filter, keyed by content kind label.
  #[serde(default)]
  pub default_statuses: BTreeMap<String, Vec<String>>,
}

impl Config {
  fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "al-rawi")
  }

  pub fn load() -> Self {
    if let Some(proj_dirs) = Self::project_dirs() {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(config_file)
        && let Some(config) = Self::from_toml_str(&content)
      {
        return config;
      }
    }
    Self::default()
  }

  pub fn from_toml_str(content: &str) -> Option<Self> {
    toml::from_str(content).ok()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = Self::project_dirs() {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }

  /// Directory for rolling log files.
  pub fn log_dir() -> Option<PathBuf> {
    Self::project_dirs().map(|d| d.data_dir().join("logs"))
  }

  /// Configured library file, else `library.json` in the platform data dir.
  pub fn library_path(&self) -> Option<PathBuf> {
    self.library_path.clone().or_else(|| Self::project_dirs().map(|d| d.data_dir().join("library.json")))
  }

  /// Non-empty API key, if configured.
  pub fn api_key(&self) -> Option<&str> {
    self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
  }

  pub fn cache_ttl(&self) -> Duration {
    Duration::from_secs(self.cache_ttl_secs.unwrap_or(constants().cache_ttl_secs))
  }

  pub fn items_per_page(&self) -> usize {
    self.items_per_page.filter(|n| *n > 0).unwrap_or(constants().items_per_page)
  }

  pub fn default_statuses_for(&self, kind: ContentKind) -> Vec<String> {
    self.default_statuses.get(kind.label()).cloned().unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_uses_constants() {
    let config = Config::default();
    assert_eq!(config.cache_ttl(), Duration::from_secs(constants().cache_ttl_secs));
    assert_eq!(config.items_per_page(), constants().items_per_page);
    assert!(config.api_key().is_none());
  }

  #[test]
  fn parses_prefs_toml() {
    let config = Config::from_toml_str(
      r#"
api_key = "abc"
cache_ttl_secs = 60
items_per_page = 5

[default_statuses]
video = ["watching", "todo"]
"#,
    )
    .unwrap();
    assert_eq!(config.api_key(), Some("abc"));
    assert_eq!(config.cache_ttl(), Duration::from_secs(60));
    assert_eq!(config.items_per_page(), 5);
    assert_eq!(config.default_statuses_for(ContentKind::Video), vec!["watching", "todo"]);
    assert!(config.default_statuses_for(ContentKind::Book).is_empty());
  }

  #[test]
  fn blank_api_key_is_ignored() {
    let config = Config { api_key: Some("   ".to_string()), ..Config::default() };
    assert!(config.api_key().is_none());
  }

  #[test]
  fn zero_items_per_page_falls_back() {
    let config = Config { items_per_page: Some(0), ..Config::default() };
    assert_eq!(config.items_per_page(), constants().items_per_page);
  }

  #[test]
  fn explicit_library_path_wins() {
    let config = Config { library_path: Some(PathBuf::from("/tmp/kb.json")), ..Config::default() };
    assert_eq!(config.library_path(), Some(PathBuf::from("/tmp/kb.json")));
  }

  #[test]
  fn malformed_toml_is_rejected() {
    assert!(Config::from_toml_str("api_key = [").is_none());
  }

  #[test]
  fn round_trips_through_toml() {
    let mut config = Config { api_key: Some("k".to_string()), log_level: Some("debug".to_string()), ..Config::default() };
    config.default_statuses.insert("book".to_string(), vec!["reading".to_string()]);
    let text = toml::to_string(&config).unwrap();
    assert_eq!(Config::from_toml_str(&text), Some(config));
  }
}
