//! SQLite-backed product cache.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::watch;

use crate::catalog::Product;

/// Schema for the product cache.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    image_url TEXT NOT NULL DEFAULT '',
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Relational cache for the product catalog.
///
/// Rows are only ever written by [`ProductStore::insert_all`], so the
/// cache is either empty or holds a full fetch result.
pub struct ProductStore {
  conn: Mutex<Connection>,
  watch_tx: watch::Sender<Vec<Product>>,
}

impl ProductStore {
  /// Open or create the store at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create store directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open product store at {}: {}", path.display(), e))?;
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| eyre!("Failed to run product store migrations: {}", e))?;

    let initial = read_all(&conn)?;
    let (watch_tx, _) = watch::channel(initial);

    Ok(Self {
      conn: Mutex::new(conn),
      watch_tx,
    })
  }

  /// Number of cached products.
  pub fn count(&self) -> Result<usize> {
    let conn = self.lock()?;

    let count: i64 = conn
      .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to count products: {}", e))?;

    Ok(count as usize)
  }

  /// Insert a full fetch result in one transaction.
  pub fn insert_all(&self, products: &[Product]) -> Result<()> {
    let mut conn = self.lock()?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for product in products {
      tx.execute(
        "INSERT INTO products (name, description, image_url) VALUES (?, ?, ?)",
        params![product.name, product.description, product.image_url],
      )
      .map_err(|e| eyre!("Failed to insert product: {}", e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit products: {}", e))?;

    let all = read_all(&conn)?;
    self.watch_tx.send_replace(all);

    Ok(())
  }

  /// All cached products in insertion order.
  pub fn all(&self) -> Result<Vec<Product>> {
    let conn = self.lock()?;
    read_all(&conn)
  }

  /// Subscribe to the cached catalog. The receiver starts at the
  /// current contents and follows committed writes.
  pub fn watch(&self) -> watch::Receiver<Vec<Product>> {
    self.watch_tx.subscribe()
  }

  /// When the newest cached row was written, if any.
  pub fn last_cached_at(&self) -> Result<Option<DateTime<Utc>>> {
    let conn = self.lock()?;

    let latest: Option<String> = conn
      .query_row("SELECT MAX(cached_at) FROM products", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to read cache timestamp: {}", e))?;

    latest.map(|s| parse_datetime(&s)).transpose()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

fn read_all(conn: &Connection) -> Result<Vec<Product>> {
  let mut stmt = conn
    .prepare("SELECT name, description, image_url FROM products ORDER BY id")
    .map_err(|e| eyre!("Failed to prepare product query: {}", e))?;

  let products = stmt
    .query_map([], |row| {
      Ok(Product {
        name: row.get(0)?,
        description: row.get(1)?,
        image_url: row.get(2)?,
      })
    })
    .map_err(|e| eyre!("Failed to query products: {}", e))?
    .collect::<rusqlite::Result<Vec<_>>>()
    .map_err(|e| eyre!("Failed to read product row: {}", e))?;

  Ok(products)
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
