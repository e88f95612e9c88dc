use serde::{Deserialize, Serialize};

/// One catalog item, in the shape the remote endpoint serves.
///
/// The file mirror uses the same schema, so an exported file can be
/// read back without conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub image_url: String,
}
