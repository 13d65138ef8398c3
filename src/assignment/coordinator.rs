use super::types::*;
use crate::api::{ApiClient, AssignmentReceipt, TaskStatus};
use crate::config::ConsoleConfig;
use crate::dashboard::{DashboardFetcher, RefreshReport, Slice};
use crate::error::{ConsoleError, Result};
use crate::session::SessionHolder;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Requests worker assignment and task lifecycle changes, then re-syncs the
/// dashboard.
///
/// The coordinator never edits the snapshot. Every confirmed mutation is
/// followed by a full [`DashboardFetcher::refresh`], so the assignee shown,
/// worker loads and aggregate counters all come from the server in one pass.
/// At most one assignment request per task is in flight from this instance;
/// other tasks stay actionable while it is.
pub struct AssignmentCoordinator {
    api: Arc<ApiClient>,
    session: Arc<SessionHolder>,
    fetcher: Arc<DashboardFetcher>,
    pending: Arc<Mutex<HashSet<String>>>,
    last_errors: Arc<Mutex<HashMap<String, String>>>,
    timeout: Duration,
}

/// Holds a task's pending marker and releases it on drop, so the marker is
/// cleared on success, failure, timeout and cancellation alike.
struct PendingGuard {
    task_id: String,
    pending: Arc<Mutex<HashSet<String>>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.task_id);
    }
}

impl AssignmentCoordinator {
    pub fn new(
        api: Arc<ApiClient>,
        session: Arc<SessionHolder>,
        fetcher: Arc<DashboardFetcher>,
        config: &ConsoleConfig,
    ) -> Self {
        Self {
            api,
            session,
            fetcher,
            pending: Arc::new(Mutex::new(HashSet::new())),
            last_errors: Arc::new(Mutex::new(HashMap::new())),
            timeout: config.assignment_timeout(),
        }
    }

    pub async fn auto_assign(&self, task_id: &str) -> Result<Assignment> {
        self.assign(task_id, AssignmentMode::Auto).await
    }

    pub async fn manual_assign(&self, task_id: &str, worker_id: &str) -> Result<Assignment> {
        self.assign(task_id, AssignmentMode::manual(worker_id)).await
    }

    pub async fn assign(&self, task_id: &str, mode: AssignmentMode) -> Result<Assignment> {
        let _guard = self.begin(task_id)?;
        self.clear_error(task_id);

        let result: Result<AssignmentReceipt> = async {
            let token = self.session.bearer().await?;
            self.bounded(async {
                match &mode {
                    AssignmentMode::Auto => self.api.auto_assign(&token, task_id).await,
                    AssignmentMode::Manual { worker_id } => {
                        self.api.assign_worker(&token, task_id, worker_id).await
                    }
                }
            })
            .await
        }
        .await;

        match result {
            Ok(receipt) => {
                tracing::info!(
                    task_id = %task_id,
                    worker_id = %receipt.worker_id,
                    mode = mode.label(),
                    "Task assigned"
                );
                // Marker stays held until the new snapshot is in, so the row
                // cannot be re-submitted against stale data.
                let refresh = self.refresh().await;
                Ok(Assignment { receipt, refresh })
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, mode = mode.label(), error = %e, "Failed to assign task");
                self.record_error(task_id, e.operator_message(ASSIGN_FALLBACK));
                Err(e)
            }
        }
    }

    /// Sets a task's lifecycle status. Nothing changes locally until the
    /// server confirms.
    pub async fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<RefreshReport> {
        let token = self.session.bearer().await?;
        let result = self
            .bounded(self.api.update_task_status(&token, task_id, status))
            .await;
        self.after_mutation("update_status", task_id, result).await
    }

    pub async fn escalate(&self, task_id: &str, reason: &str) -> Result<RefreshReport> {
        let token = self.session.bearer().await?;
        let result = self
            .bounded(self.api.escalate_task(&token, task_id, reason))
            .await;
        self.after_mutation("escalate", task_id, result).await
    }

    pub async fn complete(&self, task_id: &str, rating: Option<f64>) -> Result<RefreshReport> {
        let token = self.session.bearer().await?;
        let result = self
            .bounded(self.api.complete_task(&token, task_id, rating))
            .await;
        self.after_mutation("complete", task_id, result).await
    }

    pub fn is_pending(&self, task_id: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(task_id)
    }

    /// Whether the row's assign control should be enabled.
    pub fn is_action_enabled(&self, task_id: &str) -> bool {
        !self.is_pending(task_id)
    }

    pub fn pending_tasks(&self) -> Vec<String> {
        let mut tasks: Vec<String> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        tasks.sort();
        tasks
    }

    pub fn last_error(&self, task_id: &str) -> Option<String> {
        self.last_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_id)
            .cloned()
    }

    pub async fn state_of(&self, task_id: &str) -> AssignmentState {
        if self.is_pending(task_id) {
            return AssignmentState::Assigning;
        }

        let snapshot = self.fetcher.snapshot().await;
        if let Some(name) = snapshot
            .task(task_id)
            .and_then(|t| t.assigned_worker_name.clone())
            .filter(|name| !name.is_empty())
        {
            return AssignmentState::Assigned { worker_name: name };
        }

        match self.last_error(task_id) {
            Some(message) => AssignmentState::Failed(message),
            None => AssignmentState::Unassigned,
        }
    }

    fn begin(&self, task_id: &str) -> Result<PendingGuard> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(task_id.to_string()) {
            tracing::debug!(task_id = %task_id, "Assignment already in flight");
            return Err(ConsoleError::AssignmentPending(task_id.to_string()));
        }
        Ok(PendingGuard {
            task_id: task_id.to_string(),
            pending: self.pending.clone(),
        })
    }

    async fn bounded<T>(&self, request: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ConsoleError::Timeout(self.timeout.as_secs()))?
    }

    async fn after_mutation(
        &self,
        action: &'static str,
        task_id: &str,
        result: Result<()>,
    ) -> Result<RefreshReport> {
        match result {
            Ok(()) => {
                tracing::info!(task_id = %task_id, action, "Task updated");
                Ok(self.refresh().await)
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, action, error = %e, "Failed to update task");
                Err(e)
            }
        }
    }

    /// Full dashboard refresh. Errors for tasks the server no longer lists
    /// are dropped once a fresh task list is in.
    async fn refresh(&self) -> RefreshReport {
        let report = self.fetcher.refresh().await;
        if report.updated.contains(&Slice::Tasks) {
            let snapshot = self.fetcher.snapshot().await;
            self.last_errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|task_id, _| snapshot.task(task_id).is_some());
        }
        report
    }

    fn record_error(&self, task_id: &str, message: String) {
        self.last_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_id.to_string(), message);
    }

    fn clear_error(&self, task_id: &str) {
        self.last_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(task_id);
    }
}
