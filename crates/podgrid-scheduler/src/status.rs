//! Step, phase and plan status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Progress of a unit of deployment work.
///
/// Steps move `Pending → Prepared → Starting → Complete`; `Error` can be
/// reached from any state but `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Waiting for its turn to be offered resources.
    Pending,
    /// Offered resources in the current pass; nothing accepted yet.
    Prepared,
    /// Offers accepted, tasks launching.
    Starting,
    Complete,
    Error,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Complete | Status::Error)
    }

    /// Aggregate the statuses of child units. No children counts as complete.
    pub fn aggregate<I>(statuses: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        let statuses: Vec<Status> = statuses.into_iter().collect();
        let all = |s: Status| statuses.iter().all(|x| *x == s);
        let any = |s: Status| statuses.iter().any(|x| *x == s);

        if all(Status::Complete) {
            Status::Complete
        } else if any(Status::Error) {
            Status::Error
        } else if all(Status::Pending) {
            Status::Pending
        } else if any(Status::Starting) || any(Status::Complete) {
            Status::Starting
        } else {
            Status::Prepared
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pending => "PENDING",
            Status::Prepared => "PREPARED",
            Status::Starting => "STARTING",
            Status::Complete => "COMPLETE",
            Status::Error => "ERROR",
        };
        f.write_str(s)
    }
}
