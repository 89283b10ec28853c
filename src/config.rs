use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::cache::{CacheIntervals, MAX_INTERVAL_SECS};
use crate::services::Sorting;

const GITHUB_URL: &str = "https://github.com";
const MAX_AGE_DAYS: u32 = 365;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Seconds during which the statuses model is served without api calls
  #[serde(default = "default_update_time")]
  pub status_cache_update_time: u64,
  /// Seconds between full refreshes of the statuses model
  #[serde(default = "default_refresh_time")]
  pub status_cache_refresh_time: u64,
  /// Root of the provider snapshots (default: next to the config file)
  pub snapshot_dir: Option<PathBuf>,
  /// Hide work items not updated for more than this number of days, 0 shows all
  #[serde(default)]
  pub max_age: u32,
  #[serde(default)]
  pub sorting: Sorting,
  #[serde(default)]
  pub providers: Vec<ProviderConfig>,
}

fn default_update_time() -> u64 {
  30
}

fn default_refresh_time() -> u64 {
  3600
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash)]
pub enum ProviderKind {
  #[serde(rename = "GitHub", alias = "github")]
  GitHub,
  #[serde(rename = "GitLab", alias = "gitlab")]
  GitLab,
}

impl ProviderKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ProviderKind::GitHub => "GitHub",
      ProviderKind::GitLab => "GitLab",
    }
  }

  pub fn lowercase(&self) -> &'static str {
    match self {
      ProviderKind::GitHub => "github",
      ProviderKind::GitLab => "gitlab",
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
  pub provider: ProviderKind,
  pub user: String,
  #[serde(default)]
  pub url: String,
  #[serde(default = "default_true")]
  pub enabled: bool,
  #[serde(default = "default_true")]
  pub enable_notifications: bool,
  /// User of another provider (same url) that supplies the statuses of this one
  #[serde(default)]
  pub status_surrogate_user: String,
  /// Work items carrying this label are hidden
  #[serde(default)]
  pub filter_if_label: String,
  /// Assigned on load: `<index>-<provider>`
  #[serde(skip)]
  pub uid: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./gitdash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/gitdash/config.yaml
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
        "No configuration file found. Create one at ~/.config/gitdash/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("gitdash.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("gitdash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  pub fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let mut config = Self::from_yaml_str(&contents)
      .map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))?;

    // relative snapshot dirs are resolved against the config file
    if let (Some(dir), Some(parent)) = (&config.snapshot_dir, path.parent()) {
      if dir.is_relative() {
        config.snapshot_dir = Some(parent.join(dir));
      }
    }
    Ok(config)
  }

  /// Parse, assign provider ids, apply defaults and validate.
  pub fn from_yaml_str(contents: &str) -> Result<Self> {
    let mut config: Config =
      serde_yaml::from_str(contents).map_err(|e| eyre!("Failed to parse config: {}", e))?;

    for (name, value) in [
      ("status_cache_update_time", config.status_cache_update_time),
      ("status_cache_refresh_time", config.status_cache_refresh_time),
    ] {
      if value == 0 || value > MAX_INTERVAL_SECS {
        return Err(eyre!(
          "{} must be between 1 and {} seconds, got {}",
          name,
          MAX_INTERVAL_SECS,
          value
        ));
      }
    }
    if config.max_age > MAX_AGE_DAYS {
      return Err(eyre!(
        "max_age must be at most {} days, got {}",
        MAX_AGE_DAYS,
        config.max_age
      ));
    }

    for (index, provider) in config.providers.iter_mut().enumerate() {
      provider.uid = format!("{}-{}", index, provider.provider.lowercase());
      if provider.url.is_empty() {
        match provider.provider {
          ProviderKind::GitHub => provider.url = GITHUB_URL.to_string(),
          ProviderKind::GitLab => {
            return Err(eyre!("Provider {}: GitLab requires an url", provider.uid));
          }
        }
      }
      Url::parse(&provider.url)
        .map_err(|e| eyre!("Provider {}: invalid url {}: {}", provider.uid, provider.url, e))?;
      if provider.user.is_empty() {
        return Err(eyre!("Provider {}: user is required", provider.uid));
      }
    }

    Ok(config)
  }

  pub fn cache_intervals(&self) -> CacheIntervals {
    CacheIntervals::from_secs(self.status_cache_update_time, self.status_cache_refresh_time)
  }

  /// Ids of every configured provider, enabled or not.
  pub fn provider_ids(&self) -> Vec<String> {
    self.providers.iter().map(|p| p.uid.clone()).collect()
  }

  pub fn provider(&self, uid: &str) -> Option<&ProviderConfig> {
    self.providers.iter().find(|p| p.uid == uid)
  }

  pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
    self.providers.iter().filter(|p| p.enabled)
  }

  /// Provider that supplies the statuses of `uid`, if any.
  pub fn status_surrogate(&self, uid: &str) -> Option<&ProviderConfig> {
    let provider = self.provider(uid)?;
    if provider.status_surrogate_user.is_empty() {
      return None;
    }
    self.enabled_providers().find(|p| {
      p.uid != provider.uid
        && p.user == provider.status_surrogate_user
        && p.url == provider.url
    })
  }

  /// Providers whose statuses are supplied by `uid`.
  pub fn status_surrogated_ids(&self, uid: &str) -> Vec<String> {
    self
      .enabled_providers()
      .filter(|p| {
        self
          .status_surrogate(&p.uid)
          .is_some_and(|surrogate| surrogate.uid == uid)
      })
      .map(|p| p.uid.clone())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  const SAMPLE: &str = r#"
providers:
  - provider: GitHub
    user: usr1
  - provider: GitLab
    user: usr2
    url: https://gitlab.com
    enable_notifications: false
  - provider: GitLab
    user: bot
    url: https://gitlab.com
    status_surrogate_user: usr2
"#;

  #[test]
  fn test_defaults_and_uids() {
    let config = Config::from_yaml_str(SAMPLE).unwrap();
    assert_eq!(config.status_cache_update_time, 30);
    assert_eq!(config.status_cache_refresh_time, 3600);
    assert_eq!(config.cache_intervals(), CacheIntervals::default());
    assert_eq!(config.provider_ids(), vec!["0-github", "1-gitlab", "2-gitlab"]);

    let github = config.provider("0-github").unwrap();
    assert_eq!(github.url, "https://github.com");
    assert!(github.enabled);
    assert!(github.enable_notifications);
    assert!(!config.provider("1-gitlab").unwrap().enable_notifications);
  }

  #[test]
  fn test_status_surrogates() {
    let config = Config::from_yaml_str(SAMPLE).unwrap();
    assert_eq!(
      config.status_surrogate("2-gitlab").map(|p| p.uid.as_str()),
      Some("1-gitlab")
    );
    assert!(config.status_surrogate("1-gitlab").is_none());
    assert_eq!(config.status_surrogated_ids("1-gitlab"), vec!["2-gitlab"]);
    assert!(config.status_surrogated_ids("0-github").is_empty());
  }

  #[test]
  fn test_validation_errors() {
    let no_url = "providers:\n  - provider: GitLab\n    user: u\n";
    assert!(Config::from_yaml_str(no_url).is_err());

    let bad_url = "providers:\n  - provider: GitHub\n    user: u\n    url: not a url\n";
    assert!(Config::from_yaml_str(bad_url).is_err());

    let zero = "status_cache_update_time: 0\n";
    assert!(Config::from_yaml_str(zero).is_err());

    let old_age = "max_age: 366\n";
    assert!(Config::from_yaml_str(old_age).is_err());

    let unknown = "providers:\n  - provider: Gitea\n    user: u\n";
    assert!(Config::from_yaml_str(unknown).is_err());
  }

  #[test]
  fn test_intervals_above_one_year_are_rejected() {
    let huge = "status_cache_refresh_time: 10000000000000\n";
    let err = Config::from_yaml_str(huge).unwrap_err();
    assert!(err.to_string().contains("status_cache_refresh_time"));

    let max = "status_cache_update_time: 18446744073709551615\n";
    assert!(Config::from_yaml_str(max).is_err());

    let year = "status_cache_update_time: 31536000\nstatus_cache_refresh_time: 31536000\n";
    let config = Config::from_yaml_str(year).unwrap();
    assert_eq!(config.cache_intervals().refresh, chrono::Duration::days(365));
  }

  #[test]
  fn test_work_item_filters() {
    let yaml = r#"
max_age: 30
sorting: descending,updated_at
providers:
  - provider: GitHub
    user: usr1
    filter_if_label: wontfix
  - provider: GitHub
    user: usr2
"#;
    let config = Config::from_yaml_str(yaml).unwrap();
    assert_eq!(config.max_age, 30);
    assert_eq!(config.sorting, Sorting::DescendingUpdatedAt);
    assert_eq!(config.providers[0].filter_if_label, "wontfix");
    assert_eq!(config.providers[1].filter_if_label, "");

    let defaults = Config::from_yaml_str(SAMPLE).unwrap();
    assert_eq!(defaults.max_age, 0);
    assert_eq!(defaults.sorting, Sorting::AscendingCreatedAt);
  }

  #[test]
  fn test_lowercase_provider_alias() {
    let config =
      Config::from_yaml_str("status_cache_update_time: 5\nproviders:\n  - provider: github\n    user: u\n")
        .unwrap();
    assert_eq!(config.providers[0].provider, ProviderKind::GitHub);
    assert_eq!(config.status_cache_update_time, 5);
  }

  #[test]
  fn test_load_from_path_resolves_snapshot_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gitdash.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "snapshot_dir: snaps\nproviders: []").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.snapshot_dir, Some(dir.path().join("snaps")));
    assert!(config.providers.is_empty());
  }

  #[test]
  fn test_explicit_path_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("missing.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
