//! Worker lifecycle MCP tools.

pub mod clients;
pub mod fetch;
pub mod install;
pub mod message;
pub mod status;

pub use clients::{ClientAction, WorkerClientsParams, clients_impl};
pub use fetch::{WorkerFetchParams, fetch_impl};
pub use install::{WorkerInstallParams, install_impl};
pub use message::{WorkerMessageParams, message_impl};
pub use status::status_impl;
