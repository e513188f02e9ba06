use std::collections::HashMap;

use uuid::Uuid;

use crate::config::AdmissionLimits;
use crate::crontab::ReturnCode;
use crate::scheduler::job::{JobDescriptor, JobRecord, JobState};

/// Outcome of one allocation attempt.
///
/// The engine may refuse outright, or record the job and then fail it under
/// policy; only `RecordedOk` counts as an admitted job.
pub enum AllocationResult<'a> {
    /// No record was created.
    Rejected { code: ReturnCode, message: String },
    /// A record exists but is in the terminal failed state.
    RecordedFailed {
        record: &'a mut JobRecord,
        message: String,
    },
    RecordedOk { record: &'a mut JobRecord },
}

/// The job-table interface the submission transaction depends on. The real
/// table lives in the controller; tests install fakes.
pub trait JobAdmission {
    fn allocate(
        &mut self,
        desc: &JobDescriptor,
        uid: u32,
        protocol_version: u16,
    ) -> AllocationResult<'_>;

    /// Permanently remove a record. Returns false if no such record exists.
    fn purge(&mut self, id: Uuid) -> bool;
}

/// The controller's job table and allocation engine.
#[derive(Debug)]
pub struct JobTable {
    jobs: HashMap<Uuid, JobRecord>,
    limits: AdmissionLimits,
}

impl JobTable {
    pub fn new(limits: AdmissionLimits) -> Self {
        Self {
            jobs: HashMap::new(),
            limits,
        }
    }

    pub fn get_job(&self, id: &Uuid) -> Option<&JobRecord> {
        self.jobs.get(id)
    }

    /// All records sorted chronologically by submission time
    pub fn all_jobs(&self) -> Vec<&JobRecord> {
        let mut jobs: Vec<&JobRecord> = self.jobs.values().collect();
        jobs.sort_by_key(|j| j.submitted_at);
        jobs
    }

    pub fn jobs_for_user(&self, uid: u32) -> Vec<&JobRecord> {
        self.jobs.values().filter(|j| j.user_id == uid).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.limits.max_jobs
    }

    fn policy_violation(&self, desc: &JobDescriptor) -> Option<String> {
        if desc.cpus > self.limits.max_cpus_per_job {
            return Some(format!(
                "requested {} cpus exceeds per-job limit {}",
                desc.cpus, self.limits.max_cpus_per_job
            ));
        }
        if desc.memory_mb > self.limits.max_memory_mb_per_job {
            return Some(format!(
                "requested {} MiB exceeds per-job limit {} MiB",
                desc.memory_mb, self.limits.max_memory_mb_per_job
            ));
        }
        None
    }
}

impl JobAdmission for JobTable {
    fn allocate(
        &mut self,
        desc: &JobDescriptor,
        uid: u32,
        protocol_version: u16,
    ) -> AllocationResult<'_> {
        if self.is_full() {
            return AllocationResult::Rejected {
                code: ReturnCode::AllocationError,
                message: "job table is at capacity".to_string(),
            };
        }

        let mut record = JobRecord::from_descriptor(desc, protocol_version);

        if let Some(message) = self.policy_violation(desc) {
            record.state = JobState::Failed;
            tracing::debug!(job_id = %record.id, uid, %message, "Job recorded but failed admission");
            let record = self.jobs.entry(record.id).or_insert(record);
            return AllocationResult::RecordedFailed { record, message };
        }

        tracing::debug!(job_id = %record.id, uid, name = %record.name, "Job record allocated");
        let record = self.jobs.entry(record.id).or_insert(record);
        AllocationResult::RecordedOk { record }
    }

    fn purge(&mut self, id: Uuid) -> bool {
        let removed = self.jobs.remove(&id).is_some();
        if removed {
            tracing::debug!(job_id = %id, "Job record purged");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_limits() -> AdmissionLimits {
        AdmissionLimits {
            max_jobs: 2,
            max_cpus_per_job: 4,
            max_memory_mb_per_job: 1024,
        }
    }

    #[test]
    fn allocate_records_pending_job() {
        let mut table = JobTable::new(small_limits());
        let desc = JobDescriptor::new("job", "echo hello");

        match table.allocate(&desc, 1000, 1) {
            AllocationResult::RecordedOk { record } => {
                assert_eq!(record.state, JobState::Pending);
                assert_eq!(record.name, "job");
                assert_eq!(record.protocol_version, 1);
            }
            _ => panic!("expected RecordedOk"),
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn allocate_rejects_at_capacity() {
        let mut table = JobTable::new(AdmissionLimits {
            max_jobs: 0,
            ..small_limits()
        });
        let desc = JobDescriptor::new("job", "echo hello");

        match table.allocate(&desc, 1000, 1) {
            AllocationResult::Rejected { code, message } => {
                assert_eq!(code, ReturnCode::AllocationError);
                assert_eq!(message, "job table is at capacity");
            }
            _ => panic!("expected Rejected"),
        }
        assert!(table.is_empty());
    }

    #[test]
    fn allocate_records_failed_job_over_cpu_limit() {
        let mut table = JobTable::new(small_limits());
        let mut desc = JobDescriptor::new("greedy", "echo hello");
        desc.cpus = 8;

        let id = match table.allocate(&desc, 1000, 1) {
            AllocationResult::RecordedFailed { record, message } => {
                assert_eq!(record.state, JobState::Failed);
                assert!(message.contains("cpus"));
                record.id
            }
            _ => panic!("expected RecordedFailed"),
        };
        // The failed record is visible in the table until purged.
        assert_eq!(table.get_job(&id).unwrap().state, JobState::Failed);
    }

    #[test]
    fn allocate_records_failed_job_over_memory_limit() {
        let mut table = JobTable::new(small_limits());
        let mut desc = JobDescriptor::new("greedy", "echo hello");
        desc.memory_mb = 4096;

        match table.allocate(&desc, 1000, 1) {
            AllocationResult::RecordedFailed { message, .. } => {
                assert!(message.contains("MiB"));
            }
            _ => panic!("expected RecordedFailed"),
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn purge_removes_record() {
        let mut table = JobTable::new(small_limits());
        let desc = JobDescriptor::new("job", "echo hello");

        let id = match table.allocate(&desc, 1000, 1) {
            AllocationResult::RecordedOk { record } => record.id,
            _ => panic!("expected RecordedOk"),
        };

        assert!(table.purge(id));
        assert!(table.is_empty());
        assert!(!table.purge(id));
    }

    #[test]
    fn jobs_for_user_filters_by_uid() {
        let mut table = JobTable::new(small_limits());
        let mut desc = JobDescriptor::new("a", "echo a");
        desc.user_id = 1000;
        table.allocate(&desc, 1000, 1);
        let mut desc = JobDescriptor::new("b", "echo b");
        desc.user_id = 2000;
        table.allocate(&desc, 2000, 1);

        assert_eq!(table.jobs_for_user(1000).len(), 1);
        assert_eq!(table.jobs_for_user(2000).len(), 1);
        assert_eq!(table.jobs_for_user(3000).len(), 0);
    }
}
