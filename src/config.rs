use std::net::SocketAddr;
use std::path::PathBuf;

/// Admission policy applied by the job table.
#[derive(Debug, Clone)]
pub struct AdmissionLimits {
    /// Maximum number of records in the job table
    pub max_jobs: usize,
    /// Per-job CPU ceiling
    pub max_cpus_per_job: u32,
    /// Per-job memory ceiling in MiB
    pub max_memory_mb_per_job: u64,
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Self {
            max_jobs: 10_000,
            max_cpus_per_job: 64,
            max_memory_mb_per_job: 262_144,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub listen_addr: SocketAddr,

    /// Root of the controller's durable state. Crontab text is persisted in a
    /// `crontab/` subdirectory, one file per owning uid.
    pub state_save_location: PathBuf,

    pub limits: AdmissionLimits,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "127.0.0.1:50051"
                .parse()
                .expect("default listen address is valid"),
            state_save_location: PathBuf::from("/var/spool/crond-lite"),
            limits: AdmissionLimits::default(),
        }
    }
}

impl ControllerConfig {
    pub fn new(listen_addr: SocketAddr, state_save_location: PathBuf) -> Self {
        Self {
            listen_addr,
            state_save_location,
            ..Default::default()
        }
    }

    pub fn with_limits(mut self, limits: AdmissionLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_limits_default() {
        let limits = AdmissionLimits::default();
        assert_eq!(limits.max_jobs, 10_000);
        assert_eq!(limits.max_cpus_per_job, 64);
        assert_eq!(limits.max_memory_mb_per_job, 262_144);
    }

    #[test]
    fn controller_config_default() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:50051");
        assert_eq!(
            cfg.state_save_location,
            PathBuf::from("/var/spool/crond-lite")
        );
        assert_eq!(cfg.limits.max_jobs, 10_000);
    }

    #[test]
    fn controller_config_new() {
        let addr: SocketAddr = "10.0.0.1:9000".parse().unwrap();
        let cfg = ControllerConfig::new(addr, PathBuf::from("/tmp/state"));
        assert_eq!(cfg.listen_addr, addr);
        assert_eq!(cfg.state_save_location, PathBuf::from("/tmp/state"));
    }

    #[test]
    fn controller_config_with_limits() {
        let cfg = ControllerConfig::default().with_limits(AdmissionLimits {
            max_jobs: 5,
            max_cpus_per_job: 2,
            max_memory_mb_per_job: 512,
        });
        assert_eq!(cfg.limits.max_jobs, 5);
        assert_eq!(cfg.limits.max_cpus_per_job, 2);
        assert_eq!(cfg.limits.max_memory_mb_per_job, 512);
    }
}
