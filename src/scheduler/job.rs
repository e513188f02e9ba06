use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cron::CronEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Running => write!(f, "running"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// A job-submission payload as received from a client. For crontab batches,
/// every descriptor carries the cron entry derived from its schedule lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub name: String,
    pub command: String,
    pub user_id: u32,
    pub group_id: u32,
    pub cpus: u32,
    pub memory_mb: u64,
    /// Earliest time the job becomes eligible to run. Filled in during
    /// submission from the cron entry; client-supplied values are discarded.
    pub begin_time: Option<DateTime<Utc>>,
    pub cron_entry: Option<CronEntry>,
}

impl JobDescriptor {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            user_id: 0,
            group_id: 0,
            cpus: 1,
            memory_mb: 128,
            begin_time: None,
            cron_entry: None,
        }
    }

    pub fn with_cron_entry(mut self, entry: CronEntry) -> Self {
        self.cron_entry = Some(entry);
        self
    }
}

/// Substructure of a record that outlives the submission request. Takes
/// ownership of the descriptor's cron entry once the job is admitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDetails {
    pub cron_entry: Option<CronEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub name: String,
    pub command: String,
    pub user_id: u32,
    pub group_id: u32,
    pub cpus: u32,
    pub memory_mb: u64,
    pub state: JobState,
    pub begin_time: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub protocol_version: u16,
    pub details: JobDetails,
}

impl JobRecord {
    pub fn from_descriptor(desc: &JobDescriptor, protocol_version: u16) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: desc.name.clone(),
            command: desc.command.clone(),
            user_id: desc.user_id,
            group_id: desc.group_id,
            cpus: desc.cpus,
            memory_mb: desc.memory_mb,
            state: JobState::Pending,
            begin_time: desc.begin_time,
            submitted_at: Utc::now(),
            protocol_version,
            details: JobDetails::default(),
        }
    }
}
