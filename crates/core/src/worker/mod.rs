//! The offline cache worker.
//!
//! A worker is bound to one deployment generation. It precaches the static
//! manifest on install, garbage-collects stores from older generations on
//! activate, and answers every intercepted request through a fixed strategy:
//!
//! - non-`GET` requests go straight to the network
//! - same-origin static assets are cache-first against the static store
//! - everything else is network-first, learning successful same-origin
//!   responses into the dynamic store and falling back to it (then to the
//!   offline page, then to a synthetic 503) when the network fails
//!
//! [`Registration`] hosts workers across generations and drives the lifecycle.

pub mod lifecycle;
pub mod manager;
pub mod manifest;
pub mod message;
pub mod names;
pub mod network;
pub mod registration;
pub mod scope;

pub use lifecycle::{WorkerInfo, WorkerState};
pub use manager::{ActivateReport, FetchOutcome, Generation, InstallReport, OfflineCacheManager, ResponseSource};
pub use manifest::Manifest;
pub use message::ControlMessage;
pub use names::CacheNames;
pub use network::{Network, NetworkError};
pub use registration::{MessageOutcome, RegisterReport, Registration, RegistrationStatus};
pub use scope::{Route, Scope};
