//! Step state (C6): the per-step runtime record plus the bit-mask status
//! type it's built on. Grounded in `pydecider/state_status.py`'s
//! `StepStateStatus` enum and `ct/state.py`'s `StepState` class.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Bit-mask lifecycle status. `completed` is an umbrella bit set by every
/// terminal-successful-or-not status; `means`/`satisfies` is subset
/// inclusion, exactly as in the source this was distilled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepStatus(u32);

impl StepStatus {
    pub const PENDING: StepStatus = StepStatus(0);
    pub const READY: StepStatus = StepStatus(1);
    pub const RUNNING: StepStatus = StepStatus(2);
    pub const COMPLETED: StepStatus = StepStatus(4);
    pub const ABORTED: StepStatus = StepStatus(8);
    pub const SUCCEEDED: StepStatus = StepStatus(Self::COMPLETED.0 | 16);
    pub const FAILED: StepStatus = StepStatus(Self::COMPLETED.0 | 32);
    pub const SKIPPED: StepStatus = StepStatus(Self::COMPLETED.0 | 64);

    /// Does `self` satisfy a requirement of `required`? Subset-mask
    /// inclusion: e.g. `SUCCEEDED.means(COMPLETED)` is true.
    pub fn means(self, required: StepStatus) -> bool {
        (self.0 & required.0) == required.0
    }

    pub fn is_terminal(self) -> bool {
        self.means(StepStatus::COMPLETED) || self == StepStatus::ABORTED
    }

    pub fn parse(name: &str) -> Option<StepStatus> {
        match name {
            "pending" => Some(Self::PENDING),
            "ready" => Some(Self::READY),
            "running" => Some(Self::RUNNING),
            "completed" => Some(Self::COMPLETED),
            "succeeded" => Some(Self::SUCCEEDED),
            "failed" => Some(Self::FAILED),
            "skipped" => Some(Self::SKIPPED),
            "aborted" => Some(Self::ABORTED),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PENDING => "pending",
            Self::READY => "ready",
            Self::RUNNING => "running",
            Self::SUCCEEDED => "succeeded",
            Self::FAILED => "failed",
            Self::SKIPPED => "skipped",
            Self::ABORTED => "aborted",
            Self::COMPLETED => "completed",
            _ => "unknown",
        }
    }
}

/// What kind of node this StepState represents: a real plan step (backed
/// by an Activity or a pure eval block) or one of the synthetic sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Activity,
    Templated,
    InitSentinel,
    EndSentinel,
}

/// Mutable per-decision runtime record for one step. Owned exclusively by
/// the Workflow state's name -> StepState map; `parents`/`children` here
/// are non-owning name references into that same map.
#[derive(Debug, Clone)]
pub struct StepState {
    pub name: String,
    pub kind: StepKind,
    pub status: StepStatus,
    /// Required terminal status per parent name; mutated in place for
    /// `$end`, which grows a new entry on every step insertion.
    pub requires: HashMap<String, StepStatus>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    /// Projection of `output` via the activity's `outputs_spec` (or, for
    /// `$init`, the raw workflow input): a whole JSON value, not
    /// necessarily an object — `$init`'s attrs may be `null`.
    pub attrs: Value,
    pub parents: HashSet<String>,
    pub children: HashSet<String>,
    pub history: Vec<(StepStatus, u64)>,
}

impl StepState {
    pub fn new(name: impl Into<String>, kind: StepKind, context: u64) -> Self {
        let name = name.into();
        Self {
            name,
            kind,
            status: StepStatus::PENDING,
            requires: HashMap::new(),
            input: None,
            output: None,
            attrs: Value::Null,
            parents: HashSet::new(),
            children: HashSet::new(),
            history: vec![(StepStatus::PENDING, context)],
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.means(StepStatus::COMPLETED)
    }

    pub fn record_transition(&mut self, new_status: StepStatus, context: u64) {
        self.status = new_status;
        self.history.push((new_status, context));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeded_means_completed_but_not_vice_versa() {
        assert!(StepStatus::SUCCEEDED.means(StepStatus::COMPLETED));
        assert!(!StepStatus::COMPLETED.means(StepStatus::SUCCEEDED));
    }

    #[test]
    fn failed_means_completed_and_itself() {
        assert!(StepStatus::FAILED.means(StepStatus::COMPLETED));
        assert!(StepStatus::FAILED.means(StepStatus::FAILED));
        assert!(!StepStatus::FAILED.means(StepStatus::SUCCEEDED));
    }

    #[test]
    fn aborted_is_terminal_but_not_completed() {
        assert!(StepStatus::ABORTED.is_terminal());
        assert!(!StepStatus::ABORTED.means(StepStatus::COMPLETED));
    }

    #[test]
    fn parse_round_trips_all_status_names() {
        for name in [
            "pending", "ready", "running", "completed", "succeeded", "failed", "skipped",
            "aborted",
        ] {
            let status = StepStatus::parse(name).unwrap();
            assert_eq!(status.name(), name);
        }
        assert!(StepStatus::parse("bogus").is_none());
    }
}
