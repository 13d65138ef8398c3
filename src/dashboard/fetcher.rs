use super::filter::{TaskFilter, WorkerFilter};
use super::snapshot::{DashboardSnapshot, RefreshReport, Slice};
use crate::api::{ApiClient, Task};
use crate::error::{ConsoleError, Result};
use crate::session::SessionHolder;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

type SliceOutcome = std::result::Result<Slice, (Slice, ConsoleError)>;

/// Sole writer of the [`DashboardSnapshot`].
///
/// Reads are issued concurrently and each response is written into its own
/// slice as soon as it arrives, under a separate lock acquisition. A failed
/// read leaves its slice as it was.
pub struct DashboardFetcher {
    api: Arc<ApiClient>,
    session: Arc<SessionHolder>,
    snapshot: Arc<RwLock<DashboardSnapshot>>,
    worker_filter: Arc<RwLock<WorkerFilter>>,
}

impl DashboardFetcher {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionHolder>) -> Self {
        Self {
            api,
            session,
            snapshot: Arc::new(RwLock::new(DashboardSnapshot::default())),
            worker_filter: Arc::new(RwLock::new(WorkerFilter::default())),
        }
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn worker_filter(&self) -> WorkerFilter {
        *self.worker_filter.read().await
    }

    /// Changes which workers the next read asks for. Does not fetch.
    pub async fn set_worker_filter(&self, filter: WorkerFilter) {
        *self.worker_filter.write().await = filter;
    }

    /// Tasks from the current snapshot that pass `filter`.
    pub async fn visible_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        filter.apply(&self.snapshot.read().await.tasks)
    }

    /// Full dashboard read: stats, tasks, worker stats and workers.
    pub async fn refresh(&self) -> RefreshReport {
        let token = match self.session.bearer().await {
            Ok(token) => token,
            Err(_) => {
                tracing::warn!("Skipping dashboard refresh: not authenticated");
                return RefreshReport::unauthenticated(&Slice::DASHBOARD);
            }
        };
        let filter = self.worker_filter().await;

        let outcomes = futures::join!(
            async {
                let result = self.api.dashboard_stats(&token).await;
                self.apply(Slice::Stats, result, |s, v| s.stats = Some(v)).await
            },
            async {
                let result = self.api.list_tasks(&token).await;
                self.apply(Slice::Tasks, result, |s, v| s.tasks = v).await
            },
            async {
                let result = self.api.worker_stats(&token).await;
                self.apply(Slice::WorkerStats, result, |s, v| s.worker_stats = Some(v))
                    .await
            },
            async {
                let result = self.api.list_workers(&token, filter.status()).await;
                self.apply(Slice::Workers, result, |s, v| s.workers = v).await
            },
        );

        let (stats, tasks, worker_stats, workers) = outcomes;
        self.finish(vec![stats, tasks, worker_stats, workers]).await
    }

    /// Worker roster read: workers under the current filter plus worker stats.
    pub async fn refresh_roster(&self) -> RefreshReport {
        let token = match self.session.bearer().await {
            Ok(token) => token,
            Err(_) => {
                tracing::warn!("Skipping roster refresh: not authenticated");
                return RefreshReport::unauthenticated(&Slice::ROSTER);
            }
        };
        let filter = self.worker_filter().await;

        let (workers, worker_stats) = futures::join!(
            async {
                let result = self.api.list_workers(&token, filter.status()).await;
                self.apply(Slice::Workers, result, |s, v| s.workers = v).await
            },
            async {
                let result = self.api.worker_stats(&token).await;
                self.apply(Slice::WorkerStats, result, |s, v| s.worker_stats = Some(v))
                    .await
            },
        );

        self.finish(vec![workers, worker_stats]).await
    }

    async fn apply<T>(
        &self,
        slice: Slice,
        result: Result<T>,
        write: impl FnOnce(&mut DashboardSnapshot, T),
    ) -> SliceOutcome {
        match result {
            Ok(value) => {
                let mut snapshot = self.snapshot.write().await;
                write(&mut snapshot, value);
                tracing::debug!(slice = %slice, "Snapshot slice updated");
                Ok(slice)
            }
            Err(e) => {
                tracing::warn!(slice = %slice, error = %e, "Failed to fetch dashboard data");
                Err((slice, e))
            }
        }
    }

    async fn finish(&self, outcomes: Vec<SliceOutcome>) -> RefreshReport {
        let mut report = RefreshReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(slice) => report.updated.push(slice),
                Err(failure) => report.failed.push(failure),
            }
        }

        if !report.updated.is_empty() {
            self.snapshot.write().await.refreshed_at = Some(Utc::now());
        }
        report
    }
}
