use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

/// Operations that leave the state owner to talk to the gateway, the
/// mapping provider or the position source. At most one of each kind is in
/// flight at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Authenticate,
    Locate,
    Route,
    Suggest,
    Submit,
    Refresh,
    Accept,
    Complete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Operation::Authenticate => "authenticate",
            Operation::Locate => "locate",
            Operation::Route => "calculate a route",
            Operation::Suggest => "suggest destinations",
            Operation::Submit => "submit a request",
            Operation::Refresh => "refresh the feed",
            Operation::Accept => "accept a request",
            Operation::Complete => "complete a job",
        };
        f.write_str(name)
    }
}

/// Identifies one started operation. A result is only applied while its
/// ticket is still the current one for that operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub operation: Operation,
    pub serial: u64,
}

/// The I/O half of an operation. It owns everything it needs, so it can run
/// while the state owner keeps handling other commands.
#[async_trait]
pub trait Effect: Send + 'static {
    type Output: Send + 'static;

    fn ticket(&self) -> Ticket;

    async fn run(self) -> Self::Output;
}
