use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::analysis::DashboardInsight;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Scan,
    Rename,
    Move,
    Delete,
    Consult,
    Refine,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scan => write!(f, "scan"),
            Self::Rename => write!(f, "rename"),
            Self::Move => write!(f, "move"),
            Self::Delete => write!(f, "delete"),
            Self::Consult => write!(f, "consult"),
            Self::Refine => write!(f, "refine"),
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scan" => Ok(Self::Scan),
            "rename" => Ok(Self::Rename),
            "move" => Ok(Self::Move),
            "delete" => Ok(Self::Delete),
            "consult" => Ok(Self::Consult),
            "refine" => Ok(Self::Refine),
            _ => Err(format!("unknown action kind: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Failed,
    Pending,
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

impl std::str::FromStr for ActionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "pending" => Ok(Self::Pending),
            _ => Err(format!("unknown action status: {s}")),
        }
    }
}

/// Immutable audit record. Appended for every scan, analysis and file
/// operation; retrieved newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: ActionKind,
    pub details: String,
    pub status: ActionStatus,
}

impl ActivityLogEntry {
    pub fn new(action: ActionKind, details: impl Into<String>, status: ActionStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            details: details.into(),
            status,
        }
    }
}

/// Outcome counts of one executor pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub files_moved: u64,
    pub junk_moved: u64,
    pub folders_created: u64,
    pub failed: u64,
}

/// Cumulative dashboard counters. Loaded once at startup, folded forward
/// after every completed reorganization cycle, persisted on every mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppStats {
    pub files_analyzed: u64,
    pub junk_found: u64,
    pub space_analyzed: u64,
    pub folders_created: u64,
    #[serde(default)]
    pub ai_insights: Vec<DashboardInsight>,
}

impl AppStats {
    /// Fold one execution summary into the counters. `scanned_bytes` is the
    /// total size of the scan generation the cycle ran against.
    pub fn absorb(&self, summary: &ExecutionSummary, scanned_bytes: u64) -> Self {
        Self {
            files_analyzed: self.files_analyzed + summary.files_moved,
            junk_found: self.junk_found + summary.junk_moved,
            space_analyzed: self.space_analyzed + scanned_bytes,
            folders_created: self.folders_created + summary.folders_created,
            ai_insights: self.ai_insights.clone(),
        }
    }
}
