use crate::api::{ApiClient, NewWorker, Worker, WorkerUpdate};
use crate::dashboard::{DashboardFetcher, RefreshReport};
use crate::error::Result;
use crate::session::SessionHolder;
use std::sync::Arc;

pub const SAVE_FALLBACK: &str = "Failed to save worker. Please try again.";
pub const DELETE_FALLBACK: &str = "Failed to delete worker. Please try again.";

/// Skills offered when adding or editing a worker.
pub const SKILL_OPTIONS: [&str; 8] = [
    "AC Repair",
    "Plumbing",
    "Electrical",
    "General Maintenance",
    "Carpentry",
    "Painting",
    "Pest Control",
    "Refrigerator Repair",
];

/// Outcome of a confirmed roster write.
#[derive(Debug)]
pub struct RosterChange {
    /// The worker as the server returned it; `None` after a delete.
    pub worker: Option<Worker>,
    pub refresh: RefreshReport,
}

/// Creates, edits and removes workers, re-reading the roster after each
/// confirmed write.
pub struct RosterManager {
    api: Arc<ApiClient>,
    session: Arc<SessionHolder>,
    fetcher: Arc<DashboardFetcher>,
}

impl RosterManager {
    pub fn new(
        api: Arc<ApiClient>,
        session: Arc<SessionHolder>,
        fetcher: Arc<DashboardFetcher>,
    ) -> Self {
        Self {
            api,
            session,
            fetcher,
        }
    }

    pub async fn create_worker(&self, worker: &NewWorker) -> Result<RosterChange> {
        let token = self.session.bearer().await?;
        match self.api.create_worker(&token, worker).await {
            Ok(created) => {
                tracing::info!(worker_id = %created.id, name = %created.name, "Worker created");
                self.changed(Some(created)).await
            }
            Err(e) => {
                tracing::warn!(name = %worker.name, error = %e, "Failed to create worker");
                Err(e)
            }
        }
    }

    /// Applies the set fields of `update`. An empty update sends nothing and
    /// returns the worker as currently stored.
    pub async fn update_worker(&self, worker_id: &str, update: &WorkerUpdate) -> Result<RosterChange> {
        let token = self.session.bearer().await?;
        if update.is_empty() {
            tracing::debug!(worker_id = %worker_id, "Empty worker update, nothing to send");
            let worker = self.api.get_worker(&token, worker_id).await?;
            return Ok(RosterChange {
                worker: Some(worker),
                refresh: RefreshReport::default(),
            });
        }

        match self.api.update_worker(&token, worker_id, update).await {
            Ok(updated) => {
                tracing::info!(worker_id = %worker_id, "Worker updated");
                self.changed(Some(updated)).await
            }
            Err(e) => {
                tracing::warn!(worker_id = %worker_id, error = %e, "Failed to update worker");
                Err(e)
            }
        }
    }

    pub async fn delete_worker(&self, worker_id: &str) -> Result<RosterChange> {
        let token = self.session.bearer().await?;
        match self.api.delete_worker(&token, worker_id).await {
            Ok(()) => {
                tracing::info!(worker_id = %worker_id, "Worker deleted");
                self.changed(None).await
            }
            Err(e) => {
                tracing::warn!(worker_id = %worker_id, error = %e, "Failed to delete worker");
                Err(e)
            }
        }
    }

    async fn changed(&self, worker: Option<Worker>) -> Result<RosterChange> {
        let refresh = self.fetcher.refresh_roster().await;
        Ok(RosterChange { worker, refresh })
    }
}
