use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cron;
use crate::crontab::{CrontabStore, CrontabUpdateRequest, CrontabUpdateResponse, ReturnCode};
use crate::scheduler::{AllocationResult, JobAdmission, JobDescriptor, SubmitHook};

/// Accumulated result of one batch walk, including the ids of every record
/// the walk created (rollback bookkeeping only, never exposed to clients).
#[derive(Debug)]
pub struct BatchOutcome {
    pub return_code: ReturnCode,
    pub err_msg: Option<String>,
    pub failed_lines: Option<String>,
    created: Vec<Uuid>,
}

impl BatchOutcome {
    fn success() -> Self {
        Self {
            return_code: ReturnCode::Success,
            err_msg: None,
            failed_lines: None,
            created: Vec::new(),
        }
    }

    /// Record ids created during this batch, in descriptor order.
    pub fn created_jobs(&self) -> &[Uuid] {
        &self.created
    }
}

struct EntryFailure {
    code: ReturnCode,
    message: String,
    lines: Option<String>,
}

/// Walks a batch of job descriptors in file order, stopping at the first
/// failure.
///
/// Each entry gets its begin time computed from its cron entry, its identity
/// overwritten with the authenticated request identity, and a pass through
/// the submit hook before allocation. Every record the allocation engine
/// produces is tracked so a failed batch can be purged in full.
pub struct EntrySubmitter<'a, T: JobAdmission + ?Sized, H: SubmitHook + ?Sized> {
    table: &'a mut T,
    hook: &'a H,
    uid: u32,
    gid: u32,
    protocol_version: u16,
    now: DateTime<Utc>,
    created: Vec<Uuid>,
}

impl<'a, T, H> EntrySubmitter<'a, T, H>
where
    T: JobAdmission + ?Sized,
    H: SubmitHook + ?Sized,
{
    pub fn new(
        table: &'a mut T,
        hook: &'a H,
        uid: u32,
        gid: u32,
        protocol_version: u16,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            table,
            hook,
            uid,
            gid,
            protocol_version,
            now,
            created: Vec::new(),
        }
    }

    pub fn submit(mut self, jobs: &mut [JobDescriptor]) -> BatchOutcome {
        let mut outcome = BatchOutcome::success();

        for job in jobs.iter_mut() {
            if let Err(failure) = self.submit_entry(job) {
                outcome.return_code = failure.code;
                outcome.err_msg = Some(failure.message);
                outcome.failed_lines = failure.lines;
                break;
            }
        }

        outcome.created = self.created;
        outcome
    }

    fn submit_entry(&mut self, job: &mut JobDescriptor) -> Result<(), EntryFailure> {
        let (lines, spec) = match &job.cron_entry {
            Some(entry) => (entry.line_range(), entry.spec.clone()),
            None => {
                tracing::error!(name = %job.name, "Crontab submission failed: descriptor carries no cron entry");
                return Err(EntryFailure {
                    code: ReturnCode::MissingCronEntry,
                    message: "job descriptor carries no cron entry".to_string(),
                    lines: None,
                });
            }
        };

        // The begin time gates when the job can next run. On requeue the next
        // valid interval is recomputed from the same entry.
        job.begin_time = match cron::next_run_after(&spec, self.now) {
            Ok(t) => Some(t),
            Err(e) => {
                return Err(EntryFailure {
                    code: ReturnCode::InvalidSchedule,
                    message: e.to_string(),
                    lines: Some(lines),
                });
            }
        };

        // Always use the authenticated identity from the request.
        job.user_id = self.uid;
        job.group_id = self.gid;

        if let Err(rejection) = self.hook.validate(job, self.uid) {
            return Err(EntryFailure {
                code: ReturnCode::ValidationRejected,
                message: rejection.message,
                lines: Some(lines),
            });
        }

        match self.table.allocate(job, self.uid, self.protocol_version) {
            AllocationResult::Rejected { code, message } => Err(EntryFailure {
                code,
                message,
                lines: Some(lines),
            }),
            AllocationResult::RecordedFailed { record, message } => {
                self.created.push(record.id);
                Err(EntryFailure {
                    code: ReturnCode::JobRecordedFailed,
                    message,
                    lines: Some(lines),
                })
            }
            AllocationResult::RecordedOk { record } => {
                self.created.push(record.id);
                // The record's details take sole ownership of the entry.
                record.details.cron_entry = job.cron_entry.take();
                Ok(())
            }
        }
    }
}

fn rollback_batch<T: JobAdmission + ?Sized>(table: &mut T, created: &[Uuid]) -> usize {
    let mut purged = 0;
    for id in created {
        if table.purge(*id) {
            purged += 1;
        }
    }
    purged
}

/// The batch crontab submission transaction.
///
/// Persists (or removes) the schedule text first, then submits the derived
/// jobs in order. If any entry is refused, every record created in this batch
/// is purged, leaving the job table as it was before the call.
pub fn crontab_submit<T, H>(
    mut request: CrontabUpdateRequest,
    store: &CrontabStore,
    table: &mut T,
    hook: &H,
) -> CrontabUpdateResponse
where
    T: JobAdmission + ?Sized,
    H: SubmitHook + ?Sized,
{
    let uid = request.uid;

    let Some(text) = request.crontab.take() else {
        tracing::debug!(uid, "Removing crontab");
        if let Err(e) = store.remove(uid) {
            tracing::warn!(uid, error = %e, "Failed to remove crontab file");
        }
        // Deletion requests never reach job submission.
        return CrontabUpdateResponse::success();
    };

    tracing::debug!(uid, "Updating crontab");

    if let Err(e) = store.save(uid, &text) {
        tracing::error!(uid, error = %e, "Failed to save crontab file");
        return CrontabUpdateResponse {
            return_code: ReturnCode::WriteFailure,
            err_msg: Some(format!("failed to save crontab: {e}")),
            failed_lines: None,
        };
    }

    if request.jobs.is_empty() {
        tracing::debug!(uid, "No jobs submitted alongside crontab");
        return CrontabUpdateResponse::success();
    }

    let submitter = EntrySubmitter::new(
        table,
        hook,
        uid,
        request.gid,
        request.protocol_version,
        Utc::now(),
    );
    let outcome = submitter.submit(&mut request.jobs);

    if !outcome.return_code.is_success() {
        let purged = rollback_batch(table, outcome.created_jobs());
        tracing::debug!(uid, purged, "Failed crontab submission, purged new records");
    }

    CrontabUpdateResponse {
        return_code: outcome.return_code,
        err_msg: outcome.err_msg,
        failed_lines: outcome.failed_lines,
    }
}
