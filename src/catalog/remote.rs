//! Remote catalog endpoint client.

use color_eyre::{eyre::eyre, Result};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use url::Url;

use crate::config::Config;

use super::types::Product;

/// HTTP client timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of the full product catalog.
///
/// The repository is generic over this trait so tests can substitute a
/// scripted source for the network client.
pub trait CatalogSource: Send + Sync {
  /// Fetch the complete catalog from the source.
  fn fetch_catalog(&self) -> impl Future<Output = Result<Vec<Product>>> + Send;
}

/// Client for the remote JSON endpoint.
///
/// Performs a single unauthenticated GET of the catalog document and
/// decodes the response as a JSON array of products.
#[derive(Clone)]
pub struct RemoteCatalog {
  http: Client,
  endpoint: Url,
}

impl RemoteCatalog {
  pub fn new(config: &Config) -> Result<Self> {
    let endpoint = config.endpoint_url()?;

    let http = Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { http, endpoint })
  }
}

impl CatalogSource for RemoteCatalog {
  async fn fetch_catalog(&self) -> Result<Vec<Product>> {
    let response = self
      .http
      .get(self.endpoint.clone())
      .send()
      .await
      .map_err(|e| eyre!("Catalog request failed: {}", e))?;

    let status = response.status();
    if !status.is_success() {
      return Err(eyre!("Catalog endpoint returned {}", status));
    }

    let body = response
      .text()
      .await
      .map_err(|e| eyre!("Failed to read catalog response: {}", e))?;

    // An absent body means "no data", not a malformed response.
    if body.trim().is_empty() {
      return Ok(Vec::new());
    }

    serde_json::from_str(&body).map_err(|e| eyre!("Failed to parse catalog response: {}", e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_catalog_decodes_with_missing_fields() {
    let body = r#"[{"name":"Picual"},{"name":"Arbequina","description":"mild","image_url":"arbequina.png"}]"#;

    let products: Vec<Product> = serde_json::from_str(body).unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].name, "Picual");
    assert_eq!(products[0].description, "");
    assert_eq!(products[0].image_url, "");
    assert_eq!(products[1].description, "mild");
  }

  #[test]
  fn test_remote_uses_configured_endpoint() {
    let config = Config::default();
    let remote = RemoteCatalog::new(&config).unwrap();

    assert_eq!(
      remote.endpoint.as_str(),
      "https://2873199.youcanlearnit.net/olive_oils_with_images_data.json"
    );
  }
}
