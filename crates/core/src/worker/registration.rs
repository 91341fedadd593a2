//! Worker registration: hosts the active and waiting workers and drives
//! their lifecycle.
//!
//! Lifecycle operations (register, messages, session changes) are serialized,
//! so an install always finishes before the matching activation starts and
//! activation finishes before sessions are claimed. Fetches are not
//! serialized: each one runs as its own task against whichever worker is
//! active when it arrives.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use super::lifecycle::{Worker, WorkerInfo, WorkerState};
use super::manager::{ActivateReport, FetchOutcome, Generation, InstallReport, OfflineCacheManager, ResponseSource};
use super::message::ControlMessage;
use super::network::Network;
use crate::Error;
use crate::cache::CacheDb;
use crate::http::{Request, Response};

#[derive(Default)]
struct Slots {
    active: Option<Worker>,
    waiting: Option<Worker>,
    /// Connected page sessions.
    clients: usize,
    /// Sessions controlled by the active worker.
    controlled: usize,
}

/// Result of registering a generation.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RegisterReport {
    pub worker: WorkerInfo,
    pub install: InstallReport,
    /// Present when the worker activated immediately.
    pub activation: Option<ActivateReport>,
}

/// Result of posting a control message.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    Activated { worker: WorkerInfo, activation: ActivateReport },
    NoWaitingWorker,
}

/// Serializable snapshot of the registration.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RegistrationStatus {
    pub active: Option<WorkerInfo>,
    pub waiting: Option<WorkerInfo>,
    pub clients: usize,
    pub controlled: usize,
    pub stores: Vec<String>,
}

pub struct Registration {
    db: CacheDb,
    network: Arc<dyn Network>,
    lifecycle: Mutex<()>,
    slots: RwLock<Slots>,
    next_id: AtomicU64,
}

impl Registration {
    pub fn new(db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self { db, network, lifecycle: Mutex::new(()), slots: RwLock::new(Slots::default()), next_id: AtomicU64::new(1) }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Install a worker for `generation`.
    ///
    /// On install failure the new worker is discarded and the active worker
    /// keeps serving. On success the worker activates right away when
    /// `skip_waiting` is set, nothing is active yet, or no sessions are
    /// connected; otherwise it waits.
    pub async fn register(&self, generation: Generation, skip_waiting: bool) -> Result<RegisterReport, Error> {
        let _lifecycle = self.lifecycle.lock().await;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let manager = OfflineCacheManager::new(self.db.clone(), self.network.clone(), generation);
        let mut worker = Worker::new(id, manager, skip_waiting);

        worker.transition(WorkerState::Installing)?;
        let install = match worker.manager.install().await {
            Ok(report) => report,
            Err(e) => {
                worker.transition(WorkerState::Redundant)?;
                return Err(e);
            }
        };
        worker.transition(WorkerState::Installed)?;

        let mut slots = self.slots.write().await;
        if let Some(mut replaced) = slots.waiting.take() {
            replaced.transition(WorkerState::Redundant)?;
        }

        let activate_now = worker.skip_waiting || slots.active.is_none() || slots.clients == 0;
        slots.waiting = Some(worker);

        let activation = if activate_now { Some(activate_waiting(&mut slots).await?) } else { None };
        let info = slots
            .active
            .iter()
            .chain(slots.waiting.iter())
            .find(|w| w.id == id)
            .map(Worker::info)
            .ok_or_else(|| Error::InvalidState(format!("worker {id} vanished during registration")))?;

        if activation.is_none() {
            tracing::info!(worker = id, clients = slots.clients, "worker installed and waiting");
        }

        Ok(RegisterReport { worker: info, install, activation })
    }

    /// Deliver a control message to the waiting worker.
    pub async fn post_message(&self, message: ControlMessage) -> Result<MessageOutcome, Error> {
        let _lifecycle = self.lifecycle.lock().await;
        let mut slots = self.slots.write().await;

        match message {
            ControlMessage::SkipWaiting => {
                let Some(waiting) = slots.waiting.as_mut() else {
                    return Ok(MessageOutcome::NoWaitingWorker);
                };
                waiting.skip_waiting = true;
                let activation = activate_waiting(&mut slots).await?;
                let worker = slots
                    .active
                    .as_ref()
                    .map(Worker::info)
                    .ok_or_else(|| Error::InvalidState("no active worker after activation".into()))?;
                Ok(MessageOutcome::Activated { worker, activation })
            }
        }
    }

    /// A page session opened. Sessions opened under an active worker are
    /// controlled by it from the start.
    pub async fn connect_client(&self) -> usize {
        let _lifecycle = self.lifecycle.lock().await;
        let mut slots = self.slots.write().await;
        slots.clients += 1;
        if slots.active.is_some() {
            slots.controlled += 1;
        }
        slots.clients
    }

    /// A page session closed. When the last one goes, a waiting worker
    /// activates.
    pub async fn disconnect_client(&self) -> Result<Option<ActivateReport>, Error> {
        let _lifecycle = self.lifecycle.lock().await;
        let mut slots = self.slots.write().await;

        if slots.clients == 0 {
            return Err(Error::InvalidState("no connected clients".into()));
        }
        slots.clients -= 1;
        slots.controlled = slots.controlled.min(slots.clients);

        if slots.clients == 0 && slots.waiting.is_some() {
            return activate_waiting(&mut slots).await.map(Some);
        }
        Ok(None)
    }

    /// Route one request through the active worker in its own task. Without
    /// an active worker the request goes straight to the network.
    pub async fn fetch(&self, request: Request) -> FetchOutcome {
        let manager = self.slots.read().await.active.as_ref().map(|w| w.manager.clone());

        let Some(manager) = manager else {
            return match self.network.fetch(&request).await {
                Ok(response) => FetchOutcome { response, source: ResponseSource::Passthrough },
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "uncontrolled fetch failed");
                    FetchOutcome { response: Response::network_error(), source: ResponseSource::Passthrough }
                }
            };
        };

        let url = request.url.clone();
        match tokio::spawn(async move { manager.handle_fetch(&request).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "fetch task failed");
                FetchOutcome::unavailable()
            }
        }
    }

    /// Wait for the active worker's pending cache writes.
    pub async fn settle(&self) {
        let manager = self.slots.read().await.active.as_ref().map(|w| w.manager.clone());
        if let Some(manager) = manager {
            manager.settle().await;
        }
    }

    pub async fn status(&self) -> Result<RegistrationStatus, Error> {
        let (active, waiting, clients, controlled) = {
            let slots = self.slots.read().await;
            (slots.active.as_ref().map(Worker::info), slots.waiting.as_ref().map(Worker::info), slots.clients, slots.controlled)
        };
        let stores = self.db.store_names().await?;
        Ok(RegistrationStatus { active, waiting, clients, controlled, stores })
    }
}

/// Promote the waiting worker: run its activate step, retire the old active
/// worker, and claim every connected session.
///
/// A failed activate step is logged but does not block activation; the stale
/// stores are retried on the next generation's activation.
async fn activate_waiting(slots: &mut Slots) -> Result<ActivateReport, Error> {
    let mut worker = slots
        .waiting
        .take()
        .ok_or_else(|| Error::InvalidState("no waiting worker".into()))?;

    worker.transition(WorkerState::Activating)?;
    let report = match worker.manager.activate().await {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(worker = worker.id, error = %e, "activate step failed; stale caches kept");
            ActivateReport::default()
        }
    };

    if let Some(mut previous) = slots.active.take() {
        previous.manager.settle().await;
        previous.transition(WorkerState::Redundant)?;
    }
    worker.transition(WorkerState::Activated)?;

    slots.controlled = slots.clients;
    tracing::info!(worker = worker.id, claimed = slots.controlled, "worker activated and claimed clients");
    slots.active = Some(worker);

    Ok(report)
}
