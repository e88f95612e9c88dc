//! Offline-first data layer for the Two Trees olive oil catalog.
//!
//! Fetches the product catalog from a remote JSON endpoint, caches it
//! in a local SQLite store behind a cache-first load policy, keeps the
//! bottle count and newsletter subscription in a key-value settings
//! store, and can mirror the catalog to a JSON file on external
//! storage.

pub mod catalog;
pub mod config;
pub mod mirror;
pub mod store;
