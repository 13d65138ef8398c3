use crate::api::{Task, TaskStatus, WorkerStatus};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TaskStatus),
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            other => other.parse().map(StatusFilter::Only),
        }
    }
}

/// Client-side view over the held task list. Purely derived: applying it
/// never touches the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub search: String,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let StatusFilter::Only(status) = self.status {
            if task.status != status {
                return false;
            }
        }

        let needle = self.search.to_lowercase();
        if needle.is_empty() {
            return true;
        }

        [&task.issue, &task.intent, &task.customer_phone]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        tasks.iter().filter(|t| self.matches(t)).cloned().collect()
    }
}

/// Which workers the worker list read asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerFilter {
    All,
    Status(WorkerStatus),
}

impl WorkerFilter {
    pub fn status(&self) -> Option<WorkerStatus> {
        match self {
            WorkerFilter::All => None,
            WorkerFilter::Status(status) => Some(*status),
        }
    }
}

impl Default for WorkerFilter {
    /// The dashboard only offers workers that can take a task.
    fn default() -> Self {
        WorkerFilter::Status(WorkerStatus::Available)
    }
}

impl FromStr for WorkerFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(WorkerFilter::All),
            other => other.parse().map(WorkerFilter::Status),
        }
    }
}
