//! Cache-related MCP tools.
//!
//! This module provides read access to the named response stores.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::{CacheListParams, list_impl};
