//! Core types and shared functionality for sworker.
//!
//! This crate provides:
//! - SQLite-backed named response stores
//! - The offline cache worker and its lifecycle
//! - Unified error types
//! - Configuration structures
//! - The deferred install-prompt controller

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod prompt;
pub mod worker;

pub use cache::{CacheDb, StoredEntry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use prompt::{DeferredPrompt, InstallPromptController, PromptOutcome};
pub use http::{Headers, Request, RequestMode, Response, ResponseType};
pub use worker::{ControlMessage, FetchOutcome, Generation, Network, NetworkError, Registration, ResponseSource};
