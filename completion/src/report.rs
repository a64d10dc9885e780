use std::fmt::Display;

use itertools::Itertools;
use types::{Offset, Provider};
use uuid::Uuid;

use crate::AbortReason;

/// Driver states for one provider run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Scanning,
    Fetching,
    Merging,
    Persisting,
    Complete,
    Aborted,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Scanning => "scanning",
            Phase::Fetching => "fetching",
            Phase::Merging => "merging",
            Phase::Persisting => "persisting",
            Phase::Complete => "complete",
            Phase::Aborted => "aborted",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The checkpoint already covered every game; nothing was fetched.
    AlreadyComplete,
    Complete,
    Aborted(AbortReason),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, RunOutcome::Aborted(_))
    }

    pub fn final_phase(&self) -> Phase {
        match self {
            RunOutcome::Aborted(_) => Phase::Aborted,
            _ => Phase::Complete,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub provider: Provider,
    pub outcome: RunOutcome,
    pub resumed: bool,
    pub total_games: Option<u64>,
    pub games_fetched: u64,
    pub batches: usize,
    pub fetch_attempts: usize,
    pub failed_attempts: usize,
    pub completed_offsets: Vec<Offset>,
    pub exhausted_offsets: Vec<Offset>,
}

impl Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = self
            .total_games
            .map_or_else(|| "?".to_string(), |t| t.to_string());
        write!(
            f,
            "{}: {}/{} games in {} batches ({} attempts, {} failed)",
            self.provider, self.games_fetched, total, self.batches, self.fetch_attempts, self.failed_attempts
        )?;
        match &self.outcome {
            RunOutcome::AlreadyComplete => write!(f, " - already complete"),
            RunOutcome::Complete => write!(f, " - complete"),
            RunOutcome::Aborted(reason) => {
                write!(f, " - aborted: {reason}")?;
                if !self.exhausted_offsets.is_empty() {
                    write!(
                        f,
                        " [exhausted: {}]",
                        self.exhausted_offsets.iter().join(", ")
                    )?;
                }
                Ok(())
            }
        }
    }
}
