//! Firescope Store - Adapters for the storage ports
//!
//! In-memory and PostgreSQL implementations of `FeatureStore` and
//! `TableEngine`, plus the `BoundedRemoteFetcher` built on top of them.

pub mod fetcher;
pub mod memory;
pub mod postgres;

pub use fetcher::{BoundedRemoteFetcher, FetchSummary};
pub use memory::{MemoryEngine, MemoryFeatureStore};
pub use postgres::{PostgresConfig, PostgresStore};
