use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::transport::Channel;
use tracing_subscriber::EnvFilter;

use crond_lite::config::{AdmissionLimits, ControllerConfig};
use crond_lite::crontab::ReturnCode;
use crond_lite::grpc::GrpcServer;
use crond_lite::proto::crontab_service_client::CrontabServiceClient;
use crond_lite::proto::{CronEntry, JobDescriptor, UpdateCrontabRequest, UpdateCrontabResponse};
use crond_lite::scheduler::{DefaultSubmitHook, JobTable};
use crond_lite::shutdown::install_shutdown_handler;

const PROTOCOL_VERSION: u32 = 1;

#[derive(Parser, Debug)]
#[command(name = "crond-lite")]
#[command(version)]
#[command(about = "A cluster workload controller with crontab-driven job submission")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start a crond-lite controller
    Server(ServerArgs),

    /// Crontab management commands
    Crontab {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: CrontabCommands,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Port to listen on for gRPC
    #[arg(long, default_value = "50051")]
    port: u16,

    /// Directory for the controller's durable state
    #[arg(long, default_value = "/var/spool/crond-lite")]
    state_dir: PathBuf,

    /// Maximum number of records in the job table
    #[arg(long, default_value = "10000")]
    max_jobs: usize,

    /// Per-job CPU limit
    #[arg(long, default_value = "64")]
    max_cpus: u32,

    /// Per-job memory limit in MiB
    #[arg(long, default_value = "262144")]
    max_memory_mb: u64,
}

// =============================================================================
// Client Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Controller address
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:50051")]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum CrontabCommands {
    /// Upload a crontab file and submit its jobs as one batch
    Set {
        /// Path to the crontab file
        file: PathBuf,

        /// Owner uid for the schedule
        #[arg(long)]
        uid: u32,

        /// Owner gid for the schedule
        #[arg(long)]
        gid: u32,
    },
    /// Remove a user's crontab
    Remove {
        /// Owner uid for the schedule
        #[arg(long)]
        uid: u32,
    },
}

#[derive(Serialize)]
struct CrontabUpdateOutput {
    return_code: i32,
    status: String,
    err_msg: Option<String>,
    failed_lines: Option<String>,
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Derive one job descriptor per schedule line. Blank lines and comments are
/// skipped; everything past the five cron fields is the job command.
fn derive_jobs(text: &str) -> Vec<JobDescriptor> {
    let mut jobs = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let (spec_fields, command_fields) = fields.split_at(fields.len().min(5));
        jobs.push(JobDescriptor {
            name: format!("crontab.{line_no}"),
            command: command_fields.join(" "),
            user_id: 0,
            group_id: 0,
            cpus: 1,
            memory_mb: 128,
            cron_entry: Some(CronEntry {
                line_start: line_no,
                line_end: line_no,
                spec: spec_fields.join(" "),
            }),
        });
    }
    jobs
}

fn print_response(
    resp: UpdateCrontabResponse,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = match ReturnCode::from_code(resp.return_code) {
        Some(code) => code.to_string(),
        None => format!("unknown code {}", resp.return_code),
    };

    match output {
        OutputFormat::Json => {
            let out = CrontabUpdateOutput {
                return_code: resp.return_code,
                status,
                err_msg: (!resp.err_msg.is_empty()).then(|| resp.err_msg.clone()),
                failed_lines: (!resp.failed_lines.is_empty()).then(|| resp.failed_lines.clone()),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            if resp.return_code == 0 {
                println!("Crontab updated successfully!");
            } else {
                println!("Crontab update failed: {}", status);
                if !resp.err_msg.is_empty() {
                    println!("Error: {}", resp.err_msg);
                }
                if !resp.failed_lines.is_empty() {
                    println!("Failed lines: {}", resp.failed_lines);
                }
            }
        }
    }

    if resp.return_code != 0 {
        std::process::exit(1);
    }
    Ok(())
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let listen_addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    let config = ControllerConfig::new(listen_addr, args.state_dir).with_limits(AdmissionLimits {
        max_jobs: args.max_jobs,
        max_cpus_per_job: args.max_cpus,
        max_memory_mb_per_job: args.max_memory_mb,
    });

    tracing::info!(
        listen_addr = %config.listen_addr,
        state_dir = %config.state_save_location.display(),
        max_jobs = config.limits.max_jobs,
        "Starting crond-lite controller"
    );

    let table = Arc::new(RwLock::new(JobTable::new(config.limits.clone())));
    let shutdown = install_shutdown_handler();

    let server = GrpcServer::new(config, table, Box::new(DefaultSubmitHook));
    server.run(shutdown).await?;

    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn handle_crontab_set(
    client: &mut CrontabServiceClient<Channel>,
    file: PathBuf,
    uid: u32,
    gid: u32,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = tokio::fs::read_to_string(&file).await?;
    let jobs = derive_jobs(&text);

    let response = client
        .update_crontab(UpdateCrontabRequest {
            uid,
            gid,
            crontab: Some(text),
            jobs,
            protocol_version: PROTOCOL_VERSION,
        })
        .await?
        .into_inner();

    print_response(response, output)
}

async fn handle_crontab_remove(
    client: &mut CrontabServiceClient<Channel>,
    uid: u32,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client
        .update_crontab(UpdateCrontabRequest {
            uid,
            gid: 0,
            crontab: None,
            jobs: Vec::new(),
            protocol_version: PROTOCOL_VERSION,
        })
        .await?
        .into_inner();

    print_response(response, output)
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
        Commands::Crontab { client, command } => {
            let mut grpc_client = CrontabServiceClient::connect(client.addr.clone()).await?;

            match command {
                CrontabCommands::Set { file, uid, gid } => {
                    handle_crontab_set(&mut grpc_client, file, uid, gid, &client.output).await?;
                }
                CrontabCommands::Remove { uid } => {
                    handle_crontab_remove(&mut grpc_client, uid, &client.output).await?;
                }
            }
        }
    }

    Ok(())
}
