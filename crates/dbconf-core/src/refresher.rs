//! Refresher abstraction and fan-out
//!
//! A request pipeline hook, a timer, or an admin endpoint holds a
//! `RefresherSet` and calls `refresh_all` to nudge every registered source.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::engine::{ConfigurationProvider, RefreshOutcome};
use crate::error::{SourceError, SourceResult};
use crate::types::CancellationToken;

/// Something whose configuration can be refreshed on demand
#[async_trait]
pub trait ConfigurationRefresher: Send + Sync {
    /// Refresh, logging and returning failures as errors
    async fn refresh(&self, token: &CancellationToken) -> SourceResult<RefreshOutcome>;

    /// Refresh, reporting failures as `false`
    async fn try_refresh(&self, token: &CancellationToken) -> bool;
}

#[async_trait]
impl ConfigurationRefresher for ConfigurationProvider {
    async fn refresh(&self, token: &CancellationToken) -> SourceResult<RefreshOutcome> {
        ConfigurationProvider::refresh(self, token).await
    }

    async fn try_refresh(&self, token: &CancellationToken) -> bool {
        ConfigurationProvider::try_refresh(self, token).await
    }
}

/// Non-empty collection of refreshers
pub struct RefresherSet {
    refreshers: Vec<Arc<dyn ConfigurationRefresher>>,
}

impl RefresherSet {
    /// Fails with `SourceError::NoRefreshers` when `refreshers` is empty
    pub fn new(refreshers: Vec<Arc<dyn ConfigurationRefresher>>) -> SourceResult<Self> {
        if refreshers.is_empty() {
            return Err(SourceError::NoRefreshers);
        }
        Ok(Self { refreshers })
    }

    pub fn refreshers(&self) -> &[Arc<dyn ConfigurationRefresher>] {
        &self.refreshers
    }

    pub fn len(&self) -> usize {
        self.refreshers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refreshers.is_empty()
    }

    /// Run `try_refresh` on every refresher concurrently
    ///
    /// Results are in registration order.
    pub async fn refresh_all(&self, token: &CancellationToken) -> Vec<bool> {
        join_all(self.refreshers.iter().map(|r| r.try_refresh(token))).await
    }
}

impl std::fmt::Debug for RefresherSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefresherSet")
            .field("refreshers", &format!("[{} refreshers]", self.refreshers.len()))
            .finish()
    }
}
