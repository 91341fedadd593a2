//! Offline cache manager: install, activate, and fetch interception for one
//! generation.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use url::Url;

use super::manifest::Manifest;
use super::names::CacheNames;
use super::network::{Network, NetworkError};
use super::scope::{Route, Scope};
use crate::Error;
use crate::cache::CacheDb;
use crate::http::{Request, Response};

/// Everything that identifies one deployment generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub names: CacheNames,
    pub manifest: Manifest,
    pub scope: Scope,
    pub offline_page: Url,
}

/// Result of a successful precache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub cache_name: String,
    pub urls: Vec<String>,
}

/// Stores removed during activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Not intercepted; the network answered (or failed) directly.
    Passthrough,
    Network,
    StaticCache,
    DynamicCache,
    OfflinePage,
    /// Every fallback missed; synthetic 503.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: ResponseSource,
}

impl FetchOutcome {
    fn new(response: Response, source: ResponseSource) -> Self {
        Self { response, source }
    }

    pub fn unavailable() -> Self {
        Self::new(Response::service_unavailable(), ResponseSource::Unavailable)
    }
}

/// Cache manager bound to one generation's stores.
pub struct OfflineCacheManager {
    db: CacheDb,
    network: Arc<dyn Network>,
    generation: Generation,
    writes: Mutex<JoinSet<()>>,
}

impl OfflineCacheManager {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, generation: Generation) -> Self {
        Self { db, network, generation, writes: Mutex::new(JoinSet::new()) }
    }

    pub fn names(&self) -> &CacheNames {
        &self.generation.names
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Precache every manifest URL into the static store.
    ///
    /// All URLs are fetched before anything is written. One rejected fetch or
    /// non-2xx status fails the whole install and leaves the store untouched.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let cache_name = self.names().static_name();
        tracing::info!(cache = cache_name, urls = self.generation.manifest.len(), "precaching static manifest");

        self.db.open_store(cache_name).await?;

        let fetches = self.generation.manifest.urls().iter().map(|url| self.precache_one(url.clone()));
        let pairs = match try_join_all(fetches).await {
            Ok(pairs) => pairs,
            Err(e) => {
                tracing::error!(cache = cache_name, error = %e, "install failed");
                return Err(e);
            }
        };

        self.db.put_all(cache_name, &pairs).await?;

        Ok(InstallReport {
            cache_name: cache_name.to_string(),
            urls: pairs.iter().map(|(req, _)| req.url.to_string()).collect(),
        })
    }

    async fn precache_one(&self, url: Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url);
        let response = self.network.fetch(&request).await.map_err(|e| Error::PrecacheFailed {
            url: request.url.to_string(),
            reason: e.to_string(),
        })?;

        if !response.is_ok() {
            return Err(Error::PrecacheFailed {
                url: request.url.to_string(),
                reason: format!("status {}", response.status),
            });
        }

        Ok((request, response))
    }

    /// Delete every store that belongs to neither of this generation's names.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let mut report = ActivateReport::default();

        for name in self.db.store_names().await? {
            if self.names().is_current(&name) {
                continue;
            }
            if self.db.delete_store(&name).await? {
                tracing::info!(cache = %name, "deleted stale cache");
                report.deleted.push(name);
            }
        }

        Ok(report)
    }

    /// Answer one intercepted request. Never fails: network errors are
    /// recovered through the fallback chain.
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        match self.generation.scope.route(request) {
            Route::Passthrough => self.passthrough(request).await,
            Route::StaticAsset => self.cache_first(request).await,
            Route::Dynamic => self.network_first(request).await,
        }
    }

    async fn passthrough(&self, request: &Request) -> FetchOutcome {
        match self.network.fetch(request).await {
            Ok(response) => FetchOutcome::new(response, ResponseSource::Passthrough),
            Err(e) => {
                tracing::debug!(method = %request.method, url = %request.url, error = %e, "passthrough failed");
                FetchOutcome::new(Response::network_error(), ResponseSource::Passthrough)
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> FetchOutcome {
        let cache_name = self.names().static_name();
        match self.db.match_request(cache_name, request).await {
            Ok(Some(response)) => {
                tracing::debug!(url = %request.url, "static cache hit");
                return FetchOutcome::new(response, ResponseSource::StaticCache);
            }
            Ok(None) => tracing::debug!(url = %request.url, "static cache miss"),
            Err(e) => tracing::warn!(url = %request.url, error = %e, "static cache read failed"),
        }

        match self.network.fetch(request).await {
            Ok(response) => FetchOutcome::new(response, ResponseSource::Network),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "static asset unavailable");
                FetchOutcome::unavailable()
            }
        }
    }

    async fn network_first(&self, request: &Request) -> FetchOutcome {
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_storable() {
                    self.store_in_background(request.clone(), response.clone());
                }
                FetchOutcome::new(response, ResponseSource::Network)
            }
            Err(e) => self.offline_fallback(request, &e).await,
        }
    }

    async fn offline_fallback(&self, request: &Request, cause: &NetworkError) -> FetchOutcome {
        tracing::debug!(url = %request.url, error = %cause, "network failed, trying caches");

        match self.db.match_request(self.names().dynamic_name(), request).await {
            Ok(Some(response)) => return FetchOutcome::new(response, ResponseSource::DynamicCache),
            Ok(None) => {}
            Err(e) => tracing::warn!(url = %request.url, error = %e, "dynamic cache read failed"),
        }

        if request.accepts_html() {
            let page = Request::get(self.generation.offline_page.clone());
            match self.db.match_any(&page).await {
                Ok(Some(response)) => return FetchOutcome::new(response, ResponseSource::OfflinePage),
                Ok(None) => tracing::warn!(page = %page.url, "offline page not cached"),
                Err(e) => tracing::warn!(page = %page.url, error = %e, "offline page read failed"),
            }
        }

        FetchOutcome::unavailable()
    }

    /// Write a learned response to the dynamic store without delaying the
    /// caller. Failures are logged and dropped.
    fn store_in_background(&self, request: Request, response: Response) {
        let db = self.db.clone();
        let cache_name = self.names().dynamic_name().to_string();

        let mut writes = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
        while writes.try_join_next().is_some() {}
        writes.spawn(async move {
            match db.put(&cache_name, &request, &response).await {
                Ok(()) => tracing::debug!(cache = %cache_name, url = %request.url, "stored dynamic response"),
                Err(e) => tracing::warn!(cache = %cache_name, url = %request.url, error = %e, "dynamic cache write failed"),
            }
        });
    }

    /// Wait for every in-flight dynamic write.
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *self.writes.lock().unwrap_or_else(PoisonError::into_inner));
        while pending.join_next().await.is_some() {}
    }
}
