use crate::api::AssignmentReceipt;
use crate::dashboard::RefreshReport;
use serde::{Deserialize, Serialize};

pub const ASSIGN_FALLBACK: &str = "Failed to assign task";
pub const STATUS_FALLBACK: &str = "Failed to update task";
pub const ESCALATE_FALLBACK: &str = "Failed to escalate task";
pub const COMPLETE_FALLBACK: &str = "Failed to complete task";

/// Assignment state of one task as the operator sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AssignmentState {
    Unassigned,
    /// A request for this task is in flight; its action is disabled.
    Assigning,
    Assigned { worker_name: String },
    /// The last attempt failed with this operator-facing message.
    Failed(String),
}

impl AssignmentState {
    pub fn is_actionable(&self) -> bool {
        !matches!(self, AssignmentState::Assigning)
    }
}

/// How the worker is picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentMode {
    /// The server chooses the best-fit worker.
    Auto,
    Manual { worker_id: String },
}

impl AssignmentMode {
    pub fn manual(worker_id: impl Into<String>) -> Self {
        AssignmentMode::Manual {
            worker_id: worker_id.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssignmentMode::Auto => "auto",
            AssignmentMode::Manual { .. } => "manual",
        }
    }
}

/// Result of a successful assignment: the server's receipt and the outcome
/// of the re-fetch that followed it.
#[derive(Debug)]
pub struct Assignment {
    pub receipt: AssignmentReceipt,
    pub refresh: RefreshReport,
}
