use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::config::ControllerConfig;
use crate::crontab::CrontabStore;
use crate::error::Result;
use crate::grpc::controller_service::ControllerService;
use crate::proto::crontab_service_server::CrontabServiceServer;
use crate::scheduler::{JobTable, SubmitHook};

pub struct GrpcServer {
    addr: SocketAddr,
    config: ControllerConfig,
    table: Arc<RwLock<JobTable>>,
    hook: Box<dyn SubmitHook>,
}

impl GrpcServer {
    pub fn new(
        config: ControllerConfig,
        table: Arc<RwLock<JobTable>>,
        hook: Box<dyn SubmitHook>,
    ) -> Self {
        Self {
            addr: config.listen_addr,
            config,
            table,
            hook,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let store = CrontabStore::new(&self.config.state_save_location);
        store.ensure_dir()?;

        let service = ControllerService::new(store, self.table, self.hook);

        tracing::info!(addr = %self.addr, "Starting gRPC server");

        Server::builder()
            .add_service(CrontabServiceServer::new(service))
            .serve_with_shutdown(self.addr, shutdown.cancelled_owned())
            .await?;

        Ok(())
    }
}
