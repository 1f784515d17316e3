//! Step run results: what `eval` accumulates per tick and hands back to
//! the external collaborator for conversion into scheduling decisions.
//! Grounded in `ct/step_results.py` / `swf_decider.py`'s result consumption.

use serde_json::Value;

/// An activity ready to be scheduled: the step name, the activity's name
/// and version (for the `ScheduleActivity` decision), task list and
/// timeouts, and the rendered input document (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityStepResult {
    pub name: String,
    pub activity_name: String,
    pub activity_version: String,
    pub task_list: String,
    pub heartbeat_timeout: String,
    pub schedule_to_start_timeout: String,
    pub schedule_to_close_timeout: String,
    pub start_to_close_timeout: String,
    pub input: Option<Value>,
}

/// `TemplatedStep` results are a reserved extension point (Open Question
/// 3): every code path that would schedule one fails fast with
/// [`crate::error::CoreError::NotImplemented`] instead of producing this.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatedStepResult;
