pub mod config;
pub mod cron;
pub mod crontab;
pub mod error;
pub mod grpc;
pub mod scheduler;
pub mod shutdown;

// Re-export generated protobuf types
pub mod proto {
    tonic::include_proto!("crontab");
}
