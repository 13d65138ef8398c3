use crate::api::{DashboardStats, Task, Worker, WorkerStats};
use crate::error::ConsoleError;
use chrono::{DateTime, Utc};
use std::fmt;

/// Point-in-time copy of server state. Each slice is replaced whole by the
/// response that carries it; slices are never merged.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub stats: Option<DashboardStats>,
    pub tasks: Vec<Task>,
    pub worker_stats: Option<WorkerStats>,
    pub workers: Vec<Worker>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl DashboardSnapshot {
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn worker(&self, worker_id: &str) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id == worker_id)
    }

    pub fn unassigned_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.is_assigned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slice {
    Stats,
    Tasks,
    WorkerStats,
    Workers,
}

impl Slice {
    pub const DASHBOARD: [Slice; 4] = [Slice::Stats, Slice::Tasks, Slice::WorkerStats, Slice::Workers];
    pub const ROSTER: [Slice; 2] = [Slice::Workers, Slice::WorkerStats];
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slice::Stats => "dashboard_stats",
            Slice::Tasks => "tasks",
            Slice::WorkerStats => "worker_stats",
            Slice::Workers => "workers",
        };
        f.write_str(name)
    }
}

/// What a refresh managed to update. Failed slices kept their previous value.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub updated: Vec<Slice>,
    pub failed: Vec<(Slice, ConsoleError)>,
}

impl RefreshReport {
    pub fn unauthenticated(slices: &[Slice]) -> Self {
        Self {
            updated: Vec::new(),
            failed: slices
                .iter()
                .map(|slice| (*slice, ConsoleError::NotAuthenticated))
                .collect(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_slices(&self) -> Vec<Slice> {
        self.failed.iter().map(|(slice, _)| *slice).collect()
    }

    /// True when any failure was an authorization rejection, which usually
    /// means the stored token has expired.
    pub fn needs_login(&self) -> bool {
        self.failed.iter().any(|(_, err)| err.is_unauthorized())
    }
}
