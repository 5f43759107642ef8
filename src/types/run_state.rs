//! Run-level state machine of one scheduled day.
//!
//! ```text
//! Scheduled -> Fetching -> FetchFailed
//!                       -> Fetched -> Loading -> LoadFailed
//!                                             -> Done
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Scheduled,
    Fetching,
    FetchFailed,
    Fetched,
    Loading,
    LoadFailed,
    Done,
}

impl RunState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Scheduled, RunState::Fetching)
                | (RunState::Fetching, RunState::FetchFailed)
                | (RunState::Fetching, RunState::Fetched)
                | (RunState::Fetched, RunState::Loading)
                | (RunState::Loading, RunState::LoadFailed)
                | (RunState::Loading, RunState::Done)
        )
    }

    /// Terminal states are reported to the scheduler; nothing in this crate
    /// moves a run out of one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::FetchFailed | RunState::LoadFailed | RunState::Done
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Scheduled => "SCHEDULED",
            RunState::Fetching => "FETCHING",
            RunState::FetchFailed => "FETCH_FAILED",
            RunState::Fetched => "FETCHED",
            RunState::Loading => "LOADING",
            RunState::LoadFailed => "LOAD_FAILED",
            RunState::Done => "DONE",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
