//! Cache-first synchronization between the remote catalog and the
//! local product store.

use color_eyre::Result;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::store::ProductStore;

use super::remote::CatalogSource;
use super::types::Product;

/// Outcome of a [`ProductRepository::load_catalog`] call.
///
/// Network failures never escape the policy as errors; they are folded
/// into `FetchFailed` so callers can still render an offline state.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
  /// The cache already held data; the remote was not consulted.
  AlreadyCached,
  /// The remote was fetched and `count` products were stored. A count
  /// of zero means the endpoint returned an empty catalog and nothing
  /// was written; the next call fetches again.
  Fetched { count: usize },
  /// The fetch failed; the cache is unchanged (still empty).
  FetchFailed(String),
}

/// Product repository with a cache-first load policy.
///
/// A non-empty local store pre-empts any remote fetch; the remote is
/// only consulted to populate an empty cache, and its result is
/// written in one bulk insert.
#[derive(Clone)]
pub struct ProductRepository<S: CatalogSource> {
  source: S,
  store: Arc<ProductStore>,
  /// Collapses concurrent loads on an empty cache into one fetch.
  load_guard: Arc<Mutex<()>>,
}

impl<S: CatalogSource> ProductRepository<S> {
  pub fn new(source: S, store: Arc<ProductStore>) -> Self {
    Self {
      source,
      store,
      load_guard: Arc::new(Mutex::new(())),
    }
  }

  /// Load the catalog, fetching from the remote only when the local
  /// cache is empty.
  ///
  /// Storage errors propagate; fetch errors are reported through the
  /// returned [`LoadOutcome`].
  pub async fn load_catalog(&self) -> Result<LoadOutcome> {
    let _guard = self.load_guard.lock().await;

    if self.store.count()? > 0 {
      debug!("catalog already cached, skipping remote fetch");
      return Ok(LoadOutcome::AlreadyCached);
    }

    let products = match self.source.fetch_catalog().await {
      Ok(products) => products,
      Err(e) => {
        warn!("catalog fetch failed: {}", e);
        return Ok(LoadOutcome::FetchFailed(e.to_string()));
      }
    };

    if !products.is_empty() {
      self.store.insert_all(&products)?;
    }
    info!("loaded {} products from webservice", products.len());

    Ok(LoadOutcome::Fetched {
      count: products.len(),
    })
  }

  /// Continuously-updated view over the cached catalog. An empty list
  /// is a valid steady state.
  pub fn catalog(&self) -> watch::Receiver<Vec<Product>> {
    self.store.watch()
  }
}
