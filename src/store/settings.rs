//! Key-value settings storage.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::watch;

/// Setting keys.
const NUM_BOTTLES: &str = "num_of_bottles";
const IS_SUBSCRIBED: &str = "is_subscribed";

/// Schema for the settings table.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
"#;

/// Durable store for the two user preferences: the bottle count and
/// the newsletter subscription flag.
///
/// Each edit is a read-modify-write sequence serialized by the
/// connection lock, so concurrent increments never lose updates.
pub struct SettingsStore {
  conn: Mutex<Connection>,
  quantity_tx: watch::Sender<u32>,
  subscribed_tx: watch::Sender<bool>,
}

impl SettingsStore {
  /// Open or create the store at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create store directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open settings store at {}: {}", path.display(), e))?;
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| eyre!("Failed to run settings store migrations: {}", e))?;

    let quantity = read_value(&conn, NUM_BOTTLES)?.unwrap_or(0) as u32;
    let subscribed = read_value(&conn, IS_SUBSCRIBED)?.unwrap_or(0) != 0;

    let (quantity_tx, _) = watch::channel(quantity);
    let (subscribed_tx, _) = watch::channel(subscribed);

    Ok(Self {
      conn: Mutex::new(conn),
      quantity_tx,
      subscribed_tx,
    })
  }

  /// Current bottle count (0 when never set).
  pub fn quantity(&self) -> Result<u32> {
    let conn = self.lock()?;
    Ok(read_value(&conn, NUM_BOTTLES)?.unwrap_or(0) as u32)
  }

  /// Current subscription state (false when never set).
  pub fn subscribed(&self) -> Result<bool> {
    let conn = self.lock()?;
    Ok(read_value(&conn, IS_SUBSCRIBED)?.unwrap_or(0) != 0)
  }

  /// Subscribe to the bottle count.
  pub fn quantity_stream(&self) -> watch::Receiver<u32> {
    self.quantity_tx.subscribe()
  }

  /// Subscribe to the subscription flag.
  pub fn subscribed_stream(&self) -> watch::Receiver<bool> {
    self.subscribed_tx.subscribe()
  }

  /// Add one bottle.
  pub async fn increment(&self) -> Result<()> {
    self.edit_quantity(|current| Some(current + 1)).await
  }

  /// Remove one bottle. A count of zero is left unchanged; no write
  /// occurs.
  pub async fn decrement(&self) -> Result<()> {
    self
      .edit_quantity(|current| if current > 0 { Some(current - 1) } else { None })
      .await
  }

  /// Set the newsletter subscription. There is no unsubscribe.
  pub async fn mark_subscribed(&self) -> Result<()> {
    {
      let conn = self.lock()?;
      write_value(&conn, IS_SUBSCRIBED, 1)?;
    }
    self.subscribed_tx.send_replace(true);
    Ok(())
  }

  /// Apply one serialized edit to the bottle count. A `None` from the
  /// transform skips the write.
  async fn edit_quantity(&self, transform: impl FnOnce(u32) -> Option<u32>) -> Result<()> {
    let updated = {
      let conn = self.lock()?;
      let current = read_value(&conn, NUM_BOTTLES)?.unwrap_or(0) as u32;
      match transform(current) {
        Some(next) => {
          write_value(&conn, NUM_BOTTLES, next as i64)?;
          Some(next)
        }
        None => None,
      }
    };

    if let Some(next) = updated {
      self.quantity_tx.send_replace(next);
    }
    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

fn read_value(conn: &Connection, key: &str) -> Result<Option<i64>> {
  conn
    .query_row(
      "SELECT value FROM settings WHERE key = ?",
      params![key],
      |row| row.get(0),
    )
    .optional()
    .map_err(|e| eyre!("Failed to read setting {}: {}", key, e))
}

fn write_value(conn: &Connection, key: &str, value: i64) -> Result<()> {
  conn
    .execute(
      "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
      params![key, value],
    )
    .map_err(|e| eyre!("Failed to write setting {}: {}", key, e))?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn open_store(dir: &TempDir) -> SettingsStore {
    SettingsStore::open(&dir.path().join("settings.db")).unwrap()
  }

  #[tokio::test]
  async fn test_defaults_when_unset() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    assert_eq!(store.quantity().unwrap(), 0);
    assert!(!store.subscribed().unwrap());
    assert_eq!(*store.quantity_stream().borrow(), 0);
    assert!(!*store.subscribed_stream().borrow());
  }

  #[tokio::test]
  async fn test_increment_accumulates() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    for _ in 0..5 {
      store.increment().await.unwrap();
    }

    assert_eq!(store.quantity().unwrap(), 5);
  }

  #[tokio::test]
  async fn test_decrement_stops_at_zero() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.decrement().await.unwrap();
    assert_eq!(store.quantity().unwrap(), 0);

    store.increment().await.unwrap();
    store.decrement().await.unwrap();
    store.decrement().await.unwrap();
    assert_eq!(store.quantity().unwrap(), 0);
  }

  #[tokio::test]
  async fn test_decrement_at_zero_skips_write() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut rx = store.quantity_stream();
    rx.borrow_and_update();

    store.decrement().await.unwrap();
    assert!(!rx.has_changed().unwrap());
  }

  #[tokio::test]
  async fn test_mark_subscribed_is_one_way() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.mark_subscribed().await.unwrap();
    assert!(store.subscribed().unwrap());

    store.mark_subscribed().await.unwrap();
    assert!(store.subscribed().unwrap());
  }

  #[tokio::test]
  async fn test_streams_follow_edits() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut quantity_rx = store.quantity_stream();
    let mut subscribed_rx = store.subscribed_stream();

    store.increment().await.unwrap();
    assert_eq!(*quantity_rx.borrow_and_update(), 1);

    store.mark_subscribed().await.unwrap();
    assert!(*subscribed_rx.borrow_and_update());
  }

  #[tokio::test]
  async fn test_reopen_keeps_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.db");

    {
      let store = SettingsStore::open(&path).unwrap();
      store.increment().await.unwrap();
      store.increment().await.unwrap();
      store.mark_subscribed().await.unwrap();
    }

    let store = SettingsStore::open(&path).unwrap();
    assert_eq!(store.quantity().unwrap(), 2);
    assert!(store.subscribed().unwrap());
  }
}
