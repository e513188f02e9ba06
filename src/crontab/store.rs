use std::fs;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

/// Persists raw crontab text under `{state_dir}/crontab/crontab.{uid}`.
#[derive(Debug, Clone)]
pub struct CrontabStore {
    dir: PathBuf,
}

impl CrontabStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: state_dir.as_ref().join("crontab"),
        }
    }

    pub fn path_for(&self, uid: u32) -> PathBuf {
        self.dir.join(format!("crontab.{uid}"))
    }

    /// Create the crontab directory if missing. Owner-only access.
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&self.dir)
    }

    /// Write a user's crontab text, replacing any previous version. The text
    /// lands via a sibling temp file and a rename.
    pub fn save(&self, uid: u32, text: &str) -> io::Result<()> {
        self.ensure_dir()?;
        let tmp = self.dir.join(format!("crontab.{uid}.tmp"));
        fs::write(&tmp, text)?;
        fs::rename(&tmp, self.path_for(uid))
    }

    /// Remove a user's crontab. Removing a missing file is not an error.
    pub fn remove(&self, uid: u32) -> io::Result<()> {
        match fs::remove_file(self.path_for(uid)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
