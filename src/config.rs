use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Default base URL of the remote catalog endpoint.
pub const BASE_ENDPOINT_URL: &str = "https://2873199.youcanlearnit.net/";
/// Resource path of the catalog document under the base URL.
pub const CATALOG_RESOURCE: &str = "olive_oils_with_images_data.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub endpoint: EndpointConfig,
  /// Directory holding the SQLite stores (defaults to the platform
  /// data directory).
  pub data_dir: Option<PathBuf>,
  /// External storage root for the file mirror. Unset means the
  /// mirror is unavailable.
  pub external_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
  pub url: String,
  pub resource: String,
}

impl Default for EndpointConfig {
  fn default() -> Self {
    Self {
      url: BASE_ENDPOINT_URL.to_string(),
      resource: CATALOG_RESOURCE.to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./oliva.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/oliva/config.yaml
  /// 4. Built-in defaults
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
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("oliva.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("oliva").join("config.yaml");
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

  /// Full URL of the catalog document.
  pub fn endpoint_url(&self) -> Result<Url> {
    let base = Url::parse(&self.endpoint.url)
      .map_err(|e| eyre!("Invalid endpoint URL {}: {}", self.endpoint.url, e))?;

    base
      .join(&self.endpoint.resource)
      .map_err(|e| eyre!("Invalid catalog resource {}: {}", self.endpoint.resource, e))
  }

  /// Directory holding the SQLite stores.
  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.data_dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("oliva"))
  }

  /// Path of the product cache database.
  pub fn product_store_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("products.db"))
  }

  /// Path of the settings database.
  pub fn settings_store_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("settings.db"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_endpoint_url() {
    let config = Config::default();

    assert_eq!(
      config.endpoint_url().unwrap().as_str(),
      "https://2873199.youcanlearnit.net/olive_oils_with_images_data.json"
    );
  }

  #[test]
  fn test_yaml_overrides_defaults() {
    let config: Config = serde_yaml::from_str(
      r#"
endpoint:
  url: http://localhost:8080/
data_dir: /tmp/oliva
external_dir: /media/usb
"#,
    )
    .unwrap();

    assert_eq!(
      config.endpoint_url().unwrap().as_str(),
      "http://localhost:8080/olive_oils_with_images_data.json"
    );
    assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/oliva"));
    assert_eq!(config.external_dir, Some(PathBuf::from("/media/usb")));
  }

  #[test]
  fn test_store_paths_under_data_dir() {
    let config: Config = serde_yaml::from_str("data_dir: /tmp/oliva").unwrap();

    assert_eq!(
      config.product_store_path().unwrap(),
      PathBuf::from("/tmp/oliva/products.db")
    );
    assert_eq!(
      config.settings_store_path().unwrap(),
      PathBuf::from("/tmp/oliva/settings.db")
    );
  }
}
