use std::sync::Arc;

use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

use crate::cron::CronEntry;
use crate::crontab::{crontab_submit, CrontabStore, CrontabUpdateRequest};
use crate::proto::crontab_service_server::CrontabService;
use crate::proto::{UpdateCrontabRequest, UpdateCrontabResponse};
use crate::scheduler::{JobDescriptor, JobTable, SubmitHook};

/// gRPC service for the controller's client-facing crontab API.
pub struct ControllerService {
    store: CrontabStore,
    table: Arc<RwLock<JobTable>>,
    hook: Box<dyn SubmitHook>,
}

impl ControllerService {
    pub fn new(store: CrontabStore, table: Arc<RwLock<JobTable>>, hook: Box<dyn SubmitHook>) -> Self {
        Self { store, table, hook }
    }
}

#[tonic::async_trait]
impl CrontabService for ControllerService {
    async fn update_crontab(
        &self,
        request: Request<UpdateCrontabRequest>,
    ) -> Result<Response<UpdateCrontabResponse>, Status> {
        let req = request.into_inner();

        let protocol_version = u16::try_from(req.protocol_version)
            .map_err(|_| Status::invalid_argument("Invalid protocol version"))?;

        let jobs: Vec<JobDescriptor> = req.jobs.into_iter().map(descriptor_from_proto).collect();

        let update = CrontabUpdateRequest {
            uid: req.uid,
            gid: req.gid,
            crontab: req.crontab,
            jobs,
            protocol_version,
        };

        let uid = update.uid;
        let job_count = update.jobs.len();

        // Hold the write half for the whole transaction so no other request
        // mutates the job table mid-batch.
        let mut table = self.table.write().await;
        let outcome = crontab_submit(update, &self.store, &mut *table, self.hook.as_ref());
        drop(table);

        tracing::info!(
            uid,
            job_count,
            return_code = %outcome.return_code,
            "Crontab update processed"
        );

        Ok(Response::new(UpdateCrontabResponse {
            return_code: outcome.return_code.code(),
            err_msg: outcome.err_msg.unwrap_or_default(),
            failed_lines: outcome.failed_lines.unwrap_or_default(),
        }))
    }
}

fn descriptor_from_proto(job: crate::proto::JobDescriptor) -> JobDescriptor {
    JobDescriptor {
        name: job.name,
        command: job.command,
        user_id: job.user_id,
        group_id: job.group_id,
        cpus: job.cpus,
        memory_mb: job.memory_mb,
        begin_time: None,
        cron_entry: job
            .cron_entry
            .map(|e| CronEntry::new(e.line_start, e.line_end, e.spec)),
    }
}
