//! SQLite-backed response stores.
//!
//! This module provides the persistent key-value store the offline worker
//! keeps its static and dynamic caches in:
//!
//! - Named stores, enumerable and deletable as a unit
//! - Entries keyed by SHA-256 of method and canonical URL, with `Vary` matching
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use stores::StoredEntry;
