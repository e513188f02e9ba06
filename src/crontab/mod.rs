//! The batch crontab submission transaction: persist a user's schedule text,
//! admit the derived jobs as one unit, and roll the whole batch back if any
//! entry is refused.

pub mod store;
pub mod submit;

pub use store::CrontabStore;
pub use submit::{crontab_submit, BatchOutcome, EntrySubmitter};

use serde::{Deserialize, Serialize};

use crate::scheduler::JobDescriptor;

/// Status codes reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ReturnCode {
    Success = 0,
    /// Persisting the schedule text failed; no job was considered.
    WriteFailure = 1,
    /// A descriptor in a schedule submission carried no cron entry.
    MissingCronEntry = 2,
    /// The entry's schedule spec could not produce a future run time.
    InvalidSchedule = 3,
    /// The submit hook refused the job; nothing was allocated.
    ValidationRejected = 4,
    /// The allocation engine refused the job outright.
    AllocationError = 5,
    /// A record was created but landed in the terminal failed state.
    JobRecordedFailed = 6,
}

impl ReturnCode {
    pub fn is_success(self) -> bool {
        self == ReturnCode::Success
    }

    /// Wire encoding of this code.
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ReturnCode::Success),
            1 => Some(ReturnCode::WriteFailure),
            2 => Some(ReturnCode::MissingCronEntry),
            3 => Some(ReturnCode::InvalidSchedule),
            4 => Some(ReturnCode::ValidationRejected),
            5 => Some(ReturnCode::AllocationError),
            6 => Some(ReturnCode::JobRecordedFailed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnCode::Success => write!(f, "success"),
            ReturnCode::WriteFailure => write!(f, "write failure"),
            ReturnCode::MissingCronEntry => write!(f, "missing cron entry"),
            ReturnCode::InvalidSchedule => write!(f, "invalid schedule"),
            ReturnCode::ValidationRejected => write!(f, "validation rejected"),
            ReturnCode::AllocationError => write!(f, "allocation error"),
            ReturnCode::JobRecordedFailed => write!(f, "job recorded but failed"),
        }
    }
}

/// One schedule update: the raw crontab text (absent means delete) and the
/// jobs derived from it, in file order. Identity fields are authenticated
/// upstream.
#[derive(Debug, Clone)]
pub struct CrontabUpdateRequest {
    pub uid: u32,
    pub gid: u32,
    pub crontab: Option<String>,
    pub jobs: Vec<JobDescriptor>,
    pub protocol_version: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrontabUpdateResponse {
    pub return_code: ReturnCode,
    pub err_msg: Option<String>,
    /// Source line range of the offending entry, as `"start-end"`.
    pub failed_lines: Option<String>,
}

impl CrontabUpdateResponse {
    pub fn success() -> Self {
        Self {
            return_code: ReturnCode::Success,
            err_msg: None,
            failed_lines: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_code_round_trips_through_wire_encoding() {
        for code in [
            ReturnCode::Success,
            ReturnCode::WriteFailure,
            ReturnCode::MissingCronEntry,
            ReturnCode::InvalidSchedule,
            ReturnCode::ValidationRejected,
            ReturnCode::AllocationError,
            ReturnCode::JobRecordedFailed,
        ] {
            assert_eq!(ReturnCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ReturnCode::from_code(99), None);
    }
}
