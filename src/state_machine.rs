//! Event-replay state machine (C8): consumes an ordered event stream,
//! dispatches per-event-type handlers into the Workflow state, then asks
//! it for ready steps and returns their results. Grounded in
//! `pydecider/state_machine.py`.

use crate::context::MutationContext;
use crate::error::{CoreError, CoreResult};
use crate::events::RawEvent;
use crate::plan::Plan;
use crate::result::ActivityStepResult;
use crate::step_state::StepStatus;
use crate::workflow_state::{WorkflowState, WorkflowStatus};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Stateless driver over one Plan. `eval` is pure: a fresh [`WorkflowState`]
/// is built on every call, so nothing here carries over between ticks.
pub struct StateMachine {
    plan: Arc<Plan>,
}

impl StateMachine {
    pub fn new(plan: Plan) -> Self {
        Self {
            plan: Arc::new(plan),
        }
    }

    /// Replay `events` against a fresh Workflow state and return the
    /// ready-to-schedule activities as of the *last* processed event.
    pub fn eval(&self, events: &[Value]) -> CoreResult<Vec<ActivityStepResult>> {
        let mut workflow = WorkflowState::new(Arc::clone(&self.plan));
        let mut scheduled: HashMap<u64, String> = HashMap::new();

        let mut ctx_slot: Option<u64> = None;
        {
            let ctx = MutationContext::acquire(&mut ctx_slot, 0);
            workflow.load_plan(&ctx);
        }

        let mut results = Vec::new();
        for (seq, raw) in events.iter().enumerate() {
            let event = match RawEvent::from_value(raw) {
                Ok(event) => event,
                Err(e) => {
                    // Malformed event: recoverable per §7's RuntimeAbort
                    // taxonomy — the workflow fails, but eval keeps
                    // replaying the remaining events rather than
                    // unwinding the whole tick.
                    log::warn!("event at position {} is malformed: {}", seq, e);
                    workflow.set_abort();
                    results = Vec::new();
                    continue;
                }
            };
            ctx_slot = None;
            let ctx = MutationContext::acquire(&mut ctx_slot, event.event_id);
            results = self.dispatch(&mut workflow, &mut scheduled, &event, &ctx)?;
        }

        log::info!(
            "eval: {} events processed, {} decision(s) emitted",
            events.len(),
            results.len()
        );
        Ok(results)
    }

    fn dispatch(
        &self,
        workflow: &mut WorkflowState,
        scheduled: &mut HashMap<u64, String>,
        event: &RawEvent,
        ctx: &MutationContext,
    ) -> CoreResult<Vec<ActivityStepResult>> {
        match event.event_type.as_str() {
            "WorkflowExecutionStarted" => {
                let input = event.get("input").cloned().unwrap_or(Value::Null);
                match self.plan.check_input(&input) {
                    Ok(()) => workflow.set_input(ctx, input),
                    Err(reason) => {
                        log::warn!("workflow input failed schema validation: {}", reason);
                        workflow.set_abort();
                    }
                }
            }

            "DecisionTaskScheduled"
            | "DecisionTaskStarted"
            | "DecisionTaskCompleted"
            | "DecisionTaskTimedOut"
            | "ActivityTaskStarted" => {
                // Ignored per §4.4's event handler table.
            }

            "ActivityTaskScheduled" => match event.get_str("activityId") {
                Some(step_name) => {
                    if workflow.step_update(ctx, step_name, StepStatus::RUNNING, None) {
                        scheduled.insert(event.event_id, step_name.to_string());
                    } else {
                        log::warn!(
                            "ActivityTaskScheduled references unknown step '{}'; aborting workflow",
                            step_name
                        );
                        workflow.set_abort();
                    }
                }
                None => {
                    log::warn!("ActivityTaskScheduled missing 'activityId'; aborting workflow");
                    workflow.set_abort();
                }
            },

            "ActivityTaskCompleted" => {
                let step_name = event
                    .get_u64("scheduledEventId")
                    .and_then(|id| scheduled.get(&id).cloned());
                match step_name {
                    Some(step_name) => {
                        let result = event.get("result").cloned().unwrap_or(Value::Null);
                        workflow.step_update(ctx, &step_name, StepStatus::SUCCEEDED, Some(result));
                    }
                    None => {
                        log::warn!(
                            "ActivityTaskCompleted does not reference a known scheduled step; aborting workflow"
                        );
                        workflow.set_abort();
                    }
                }
            }

            other => {
                log::warn!("{}", CoreError::UnknownEvent(other.to_string()));
                workflow.set_abort();
            }
        }

        if workflow.is_in_state(WorkflowStatus::COMPLETED) {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for name in workflow.step_next() {
            out.push(workflow.activity_result(&name)?);
        }
        Ok(out)
    }
}
