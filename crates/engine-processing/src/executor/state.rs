use std::fmt;

/// Lifecycle of one chunk inside the executor.
///
/// `Pending -> Attempting -> Committed | Retrying | FailedTerminal`, with
/// `Retrying -> Attempting` for the next attempt. `Aborted` is reachable from
/// `Pending` and `Retrying` only, an attempt in flight always finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    Attempting { attempt: usize },
    Retrying { attempt: usize },
    Committed,
    FailedTerminal,
    Aborted,
}

impl ChunkState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChunkState::Committed | ChunkState::FailedTerminal | ChunkState::Aborted
        )
    }

    pub fn can_transition_to(&self, next: &ChunkState) -> bool {
        use ChunkState::*;

        match (self, next) {
            (Pending, Attempting { attempt: 1 }) => true,
            (Retrying { attempt: prev }, Attempting { attempt }) => *attempt == prev + 1,
            (Attempting { attempt: a }, Retrying { attempt: b }) => a == b,
            (Attempting { .. }, Committed | FailedTerminal) => true,
            (Pending | Retrying { .. }, Aborted) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ChunkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkState::Pending => f.write_str("pending"),
            ChunkState::Attempting { attempt } => write!(f, "attempting({attempt})"),
            ChunkState::Retrying { attempt } => write!(f, "retrying({attempt})"),
            ChunkState::Committed => f.write_str("committed"),
            ChunkState::FailedTerminal => f.write_str("failed"),
            ChunkState::Aborted => f.write_str("aborted"),
        }
    }
}
