//! SQLite-backed persistence: the relational product cache and the
//! key-value settings store, each behind its own connection.

mod products;
mod settings;

pub use products::ProductStore;
pub use settings::SettingsStore;
