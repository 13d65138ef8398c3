use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    New,
    InProgress,
    Escalated,
    Closed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::New,
        TaskStatus::InProgress,
        TaskStatus::Escalated,
        TaskStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Escalated => "escalated",
            TaskStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                "Invalid status. Must be one of: new, in_progress, escalated, closed".to_string()
            })
    }
}

/// Urgency of a task, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Available,
    Busy,
    Offline,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Available => "available",
            WorkerStatus::Busy => "busy",
            WorkerStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(WorkerStatus::Available),
            "busy" => Ok(WorkerStatus::Busy),
            "offline" => Ok(WorkerStatus::Offline),
            other => Err(format!("Unknown worker status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    #[serde(alias = "id")]
    pub task_id: String,
    pub intent: String,
    pub issue: String,
    pub urgency: Urgency,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub preferred_time: Option<String>,
    pub confidence: f64,
    pub status: TaskStatus,
    pub customer_phone: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub assigned_worker_name: Option<String>,
}

impl Task {
    pub fn is_assigned(&self) -> bool {
        self.assigned_worker_name
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub status: WorkerStatus,
    #[serde(default)]
    pub current_tasks: u32,
    #[serde(default)]
    pub max_tasks: u32,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub total_jobs: u32,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Worker {
    /// Free slots as reported. The server owns the capacity invariant, so an
    /// over-committed worker reads as zero instead of underflowing.
    pub fn remaining_capacity(&self) -> u32 {
        self.max_tasks.saturating_sub(self.current_tasks)
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_calls: u64,
    #[serde(default)]
    pub tasks_created: u64,
    #[serde(default)]
    pub escalations: u64,
    #[serde(default)]
    pub failures: u64,
    #[serde(default)]
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkerStats {
    #[serde(default)]
    pub total_workers: u64,
    #[serde(default)]
    pub available: u64,
    #[serde(default)]
    pub busy: u64,
    #[serde(default)]
    pub offline: u64,
    #[serde(default, alias = "total_jobsdone")]
    pub total_jobs_done: u64,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentReceipt {
    pub task_id: String,
    pub worker_id: String,
    pub worker_name: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub business_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessIdentity {
    pub business_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboundCall {
    pub phone_number: String,
    pub voice_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EscalationRequest {
    pub task_id: String,
    pub reason: String,
}

/// Entry from `GET /api/logs/failures`, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureLog {
    pub id: String,
    pub error_message: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// Body for `POST /api/workers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewWorker {
    pub name: String,
    pub phone: String,
    pub skills: Vec<String>,
    pub max_tasks: u32,
    pub status: WorkerStatus,
}

impl NewWorker {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            skills: Vec::new(),
            max_tasks: 5,
            status: WorkerStatus::Available,
        }
    }

    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.push(skill.into());
        self
    }

    pub fn with_max_tasks(mut self, max_tasks: u32) -> Self {
        self.max_tasks = max_tasks;
        self
    }

    /// Scalar fields as query pairs; the backend binds these from the query
    /// string and only `skills` from the body.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("phone", self.phone.clone()),
            ("max_tasks", self.max_tasks.to_string()),
            ("status", self.status.as_str().to_string()),
        ]
    }
}

/// Body for `PATCH /api/workers/{id}`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct WorkerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tasks: Option<u32>,
}

impl WorkerUpdate {
    pub fn is_empty(&self) -> bool {
        self == &WorkerUpdate::default()
    }

    /// Set scalar fields as query pairs.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.name {
            pairs.push(("name", name.clone()));
        }
        if let Some(phone) = &self.phone {
            pairs.push(("phone", phone.clone()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(max_tasks) = self.max_tasks {
            pairs.push(("max_tasks", max_tasks.to_string()));
        }
        pairs
    }
}

/// Error body the backend sends with non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Only string details are surfaced; validation errors arrive as arrays
    /// and are treated as "no detail".
    pub fn into_message(self) -> Option<String> {
        match self.detail {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// Timestamps from the backend are either RFC 3339 or naive ISO-8601 written
/// in UTC.
pub(crate) mod timestamp {
    use super::*;

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
            None => Ok(None),
        }
    }
}
