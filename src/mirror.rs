//! Best-effort catalog mirror on external storage.

use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::catalog::Product;

/// Fixed location under the external storage root.
const MIRROR_DIR: &str = "products";
const MIRROR_FILE: &str = "products.json";

/// JSON file mirror of the catalog on removable storage.
///
/// The file uses the same schema as the remote endpoint, so an export
/// can be imported back unchanged. Both operations are gated on the
/// storage root being present.
pub struct FileMirror {
  root: Option<PathBuf>,
}

impl FileMirror {
  /// Create a mirror rooted at the given external storage directory.
  /// `None` means no external storage is configured.
  pub fn new(root: Option<PathBuf>) -> Self {
    Self { root }
  }

  /// Whether the external storage root is configured and mounted.
  pub fn is_available(&self) -> bool {
    self.available_root().is_some()
  }

  /// Serialize the catalog to the mirror file, overwriting any
  /// previous contents. No-op when storage is unavailable; I/O errors
  /// propagate.
  pub fn export(&self, products: &[Product]) -> Result<()> {
    let root = match self.available_root() {
      Some(root) => root,
      None => return Ok(()),
    };

    let path = root.join(MIRROR_DIR).join(MIRROR_FILE);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create mirror directory: {}", e))?;
    }

    let contents = serde_json::to_string(products)
      .map_err(|e| eyre!("Failed to serialize catalog: {}", e))?;
    std::fs::write(&path, contents)
      .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;

    Ok(())
  }

  /// Read the catalog back from the mirror file. Unavailable storage,
  /// a missing file, and undecodable contents all yield an empty
  /// catalog; only read errors on an existing file propagate.
  pub fn import(&self) -> Result<Vec<Product>> {
    let root = match self.available_root() {
      Some(root) => root,
      None => return Ok(Vec::new()),
    };

    let path = root.join(MIRROR_DIR).join(MIRROR_FILE);
    if !path.exists() {
      return Ok(Vec::new());
    }

    let contents = std::fs::read_to_string(&path)
      .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;

    match serde_json::from_str(&contents) {
      Ok(products) => Ok(products),
      Err(e) => {
        warn!("mirror file {} is not a valid catalog: {}", path.display(), e);
        Ok(Vec::new())
      }
    }
  }

  fn available_root(&self) -> Option<&Path> {
    self.root.as_deref().filter(|root| root.is_dir())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn product(name: &str) -> Product {
    Product {
      name: name.to_string(),
      description: format!("{} description", name),
      image_url: format!("{}.png", name.to_lowercase()),
    }
  }

  #[test]
  fn test_export_import_round_trip() {
    let dir = TempDir::new().unwrap();
    let mirror = FileMirror::new(Some(dir.path().to_path_buf()));
    let products = vec![product("Picual"), product("Arbequina")];

    mirror.export(&products).unwrap();

    assert_eq!(mirror.import().unwrap(), products);
  }

  #[test]
  fn test_unavailable_storage_is_noop() {
    let unconfigured = FileMirror::new(None);
    assert!(!unconfigured.is_available());
    unconfigured.export(&[product("Picual")]).unwrap();
    assert!(unconfigured.import().unwrap().is_empty());

    let unmounted = FileMirror::new(Some(PathBuf::from("/nonexistent/mount")));
    assert!(!unmounted.is_available());
    unmounted.export(&[product("Picual")]).unwrap();
    assert!(unmounted.import().unwrap().is_empty());
  }

  #[test]
  fn test_missing_file_imports_empty() {
    let dir = TempDir::new().unwrap();
    let mirror = FileMirror::new(Some(dir.path().to_path_buf()));

    assert!(mirror.is_available());
    assert!(mirror.import().unwrap().is_empty());
  }

  #[test]
  fn test_corrupt_file_imports_empty() {
    let dir = TempDir::new().unwrap();
    let mirror_dir = dir.path().join(MIRROR_DIR);
    std::fs::create_dir_all(&mirror_dir).unwrap();
    std::fs::write(mirror_dir.join(MIRROR_FILE), "not json").unwrap();

    let mirror = FileMirror::new(Some(dir.path().to_path_buf()));
    assert!(mirror.import().unwrap().is_empty());
  }

  #[test]
  fn test_export_overwrites() {
    let dir = TempDir::new().unwrap();
    let mirror = FileMirror::new(Some(dir.path().to_path_buf()));

    mirror.export(&[product("Picual"), product("Arbequina")]).unwrap();
    mirror.export(&[product("Koroneiki")]).unwrap();

    let imported = mirror.import().unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].name, "Koroneiki");
  }
}
