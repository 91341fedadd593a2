//! Client code for sworker.
//!
//! This crate provides the reqwest-backed [`Network`](sworker_core::Network)
//! the worker fetches through, plus URL canonicalization for page requests.

pub mod fetch;

pub use fetch::{FetchConfig, HttpNetwork, UrlError, canonicalize, same_origin};
