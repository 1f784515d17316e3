//! Workflow state (C7): the collection of step states, the top-level
//! lifecycle status, the orphan queue, and the synthetic `$init`/`$end`
//! sentinels. Grounded in `ct/state.py`'s `State` class.
//!
//! Context discipline: callers own the `Option<u64>` context slot and
//! acquire a [`MutationContext`] over it before calling any mutating
//! method here, exactly once per incoming event (see `state_machine.rs`).
//! The slot lives outside `WorkflowState` itself so the guard never
//! overlaps a `&mut WorkflowState` borrow.

use crate::context::MutationContext;
use crate::error::CoreError;
use crate::plan::Plan;
use crate::step;
use crate::step_state::{StepKind, StepState, StepStatus};
use crate::template::SELF_INPUT_VAR;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const INIT_STEP: &str = "$init";
pub const END_STEP: &str = "$end";

/// Bit-mask lifecycle status for the workflow as a whole. Same
/// subset-masking trick as [`StepStatus`]: `succeeded` and `failed` both
/// satisfy `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowStatus(u32);

impl WorkflowStatus {
    pub const INIT: WorkflowStatus = WorkflowStatus(0);
    pub const RUNNING: WorkflowStatus = WorkflowStatus(1);
    pub const COMPLETED: WorkflowStatus = WorkflowStatus(2);
    pub const SUCCEEDED: WorkflowStatus = WorkflowStatus(Self::COMPLETED.0 | 4);
    pub const FAILED: WorkflowStatus = WorkflowStatus(Self::COMPLETED.0 | 8);

    pub fn means(self, required: WorkflowStatus) -> bool {
        (self.0 & required.0) == required.0
    }
}

/// Owns every StepState for one decision tick. Constructed fresh on every
/// `eval` call; never persisted across ticks.
pub struct WorkflowState {
    pub status: WorkflowStatus,
    pub step_states: HashMap<String, StepState>,
    /// missing-parent-name -> names of steps waiting for it to appear.
    pub orphans: HashMap<String, HashSet<String>>,
    plan: Arc<Plan>,
}

impl WorkflowState {
    pub fn new(plan: Arc<Plan>) -> Self {
        let mut step_states = HashMap::new();
        step_states.insert(
            INIT_STEP.to_string(),
            StepState::new(INIT_STEP, StepKind::InitSentinel, 0),
        );
        step_states.insert(
            END_STEP.to_string(),
            StepState::new(END_STEP, StepKind::EndSentinel, 0),
        );
        Self {
            status: WorkflowStatus::INIT,
            step_states,
            orphans: HashMap::new(),
            plan,
        }
    }

    pub fn is_in_state(&self, required: WorkflowStatus) -> bool {
        self.status.means(required)
    }

    /// Insert every plan step, in order. Steps whose parents aren't wired
    /// in yet land in `orphans` and are retried once their parent appears.
    pub fn load_plan(&mut self, ctx: &MutationContext) {
        let plan = Arc::clone(&self.plan);
        for step_def in plan.steps.iter() {
            self.try_insert(ctx.event_id(), step_def);
        }
    }

    fn try_insert(&mut self, event_id: u64, step_def: &step::StepDef) -> bool {
        let effective_requires = if step_def.requires.is_empty() {
            let mut m = HashMap::new();
            m.insert(INIT_STEP.to_string(), StepStatus::COMPLETED);
            m
        } else {
            step_def.requires.clone()
        };

        let missing: Vec<String> = effective_requires
            .keys()
            .filter(|p| !self.step_states.contains_key(*p))
            .cloned()
            .collect();
        if !missing.is_empty() {
            log::debug!("step '{}' deferred to orphans: {:?}", step_def.name, missing);
            for parent_name in missing {
                self.orphans
                    .entry(parent_name)
                    .or_default()
                    .insert(step_def.name.clone());
            }
            return false;
        }

        let kind = match &step_def.kind {
            step::StepKind::Activity { .. } => StepKind::Activity,
            step::StepKind::Templated { .. } => StepKind::Templated,
        };
        let mut new_state = StepState::new(step_def.name.clone(), kind, event_id);
        new_state.requires = effective_requires.clone();
        new_state.parents = effective_requires.keys().cloned().collect();
        self.step_states.insert(step_def.name.clone(), new_state);
        log::debug!("step '{}' wired into graph", step_def.name);

        for parent_name in effective_requires.keys() {
            self.step_states
                .get_mut(parent_name)
                .expect("parent wired above")
                .children
                .insert(step_def.name.clone());
        }

        self.step_states
            .get_mut(&step_def.name)
            .unwrap()
            .children
            .insert(END_STEP.to_string());
        let end = self.step_states.get_mut(END_STEP).unwrap();
        end.parents.insert(step_def.name.clone());
        end.requires
            .insert(step_def.name.clone(), StepStatus::COMPLETED);

        if let Some(waiters) = self.orphans.remove(&step_def.name) {
            let plan = Arc::clone(&self.plan);
            for waiter_name in waiters {
                if let Some(waiter_def) = plan.step(&waiter_name) {
                    self.try_insert(event_id, waiter_def);
                }
            }
        }

        true
    }

    /// Transition `$init` to `completed` with `input_data` as its attrs,
    /// and the workflow to `running`. Permitted only from `init`.
    pub fn set_input(&mut self, ctx: &MutationContext, input_data: Value) {
        assert_eq!(
            self.status,
            WorkflowStatus::INIT,
            "set_input only permitted from workflow status init"
        );
        self.step_update(ctx, INIT_STEP, StepStatus::COMPLETED, Some(input_data));
        self.status = WorkflowStatus::RUNNING;
    }

    pub fn set_abort(&mut self) {
        self.status = WorkflowStatus::FAILED;
    }

    /// Apply a status transition and propagate to children, per §4.3.
    /// `name` must already be wired into `step_states` for every status
    /// except `running` — the `running` transition is the one that can be
    /// driven by an externally-supplied, event-controlled step name (an
    /// `ActivityTaskScheduled.activityId` naming no real step), so it alone
    /// degrades to `false` instead of panicking; the caller is expected to
    /// fold that into a workflow-level abort (see `state_machine.rs`).
    /// Every other status is only ever reached with a name this state
    /// itself already produced, so an unknown name there remains a
    /// programming-error panic.
    pub fn step_update(
        &mut self,
        ctx: &MutationContext,
        name: &str,
        new_status: StepStatus,
        data: Option<Value>,
    ) -> bool {
        match new_status {
            StepStatus::READY => match self.prepare(name) {
                Ok(input) => {
                    log::debug!("step '{}' -> ready (event {})", name, ctx.event_id());
                    let state = self.step_states.get_mut(name).unwrap();
                    state.input = input;
                    state.record_transition(new_status, ctx.event_id());

                    if name == END_STEP && !self.status.means(WorkflowStatus::FAILED) {
                        self.status = WorkflowStatus::SUCCEEDED;
                    }
                    true
                }
                Err(reason) => {
                    log::warn!("step '{}' aborted while preparing input: {}", name, reason);
                    self.step_update(ctx, name, StepStatus::ABORTED, None)
                }
            },
            StepStatus::RUNNING => match self.step_states.get_mut(name) {
                Some(state) => {
                    log::debug!("step '{}' -> running (event {})", name, ctx.event_id());
                    state.record_transition(new_status, ctx.event_id());
                    true
                }
                None => {
                    log::warn!("running transition for unknown step '{}'", name);
                    false
                }
            },
            StepStatus::ABORTED => {
                log::debug!("step '{}' -> aborted (event {})", name, ctx.event_id());
                self.step_states
                    .get_mut(name)
                    .unwrap()
                    .record_transition(new_status, ctx.event_id());
                self.status = WorkflowStatus::FAILED;
                true
            }
            other if other.means(StepStatus::COMPLETED) => {
                log::debug!(
                    "step '{}' -> {} (event {})",
                    name,
                    other.name(),
                    ctx.event_id()
                );
                let attrs = self.compute_attrs(name, data.as_ref());
                {
                    let state = self.step_states.get_mut(name).unwrap();
                    state.output = data;
                    state.attrs = attrs;
                    state.record_transition(other, ctx.event_id());
                }

                let children: Vec<String> = self
                    .step_states
                    .get(name)
                    .unwrap()
                    .children
                    .iter()
                    .cloned()
                    .collect();
                for child in children {
                    self.check_requirements(ctx, &child);
                }
                true
            }
            _ => panic!("invalid step transition for '{}' to {:?}", name, new_status),
        }
    }

    fn compute_attrs(&self, name: &str, data: Option<&Value>) -> Value {
        match self.step_states.get(name).unwrap().kind {
            StepKind::InitSentinel => data.cloned().unwrap_or(Value::Null),
            StepKind::EndSentinel | StepKind::Templated => Value::Object(Default::default()),
            StepKind::Activity => {
                let step_def = match self.plan.step(name) {
                    Some(s) => s,
                    None => return Value::Object(Default::default()),
                };
                let activity_name = match &step_def.kind {
                    step::StepKind::Activity { activity, .. } => activity,
                    _ => return Value::Object(Default::default()),
                };
                let activity = self
                    .plan
                    .activities
                    .get(activity_name)
                    .expect("activity reference validated at load time");
                let output = data.cloned().unwrap_or(Value::Null);
                let projected = activity.render_output(&output);
                Value::Object(projected.into_iter().collect())
            }
        }
    }

    /// `check_requirements(context)`: if every parent is terminal and
    /// satisfies its required status, transition to `ready`; if any
    /// terminal parent fails to satisfy its requirement, abort
    /// immediately. A no-op if the step isn't `pending`.
    fn check_requirements(&mut self, ctx: &MutationContext, name: &str) {
        if self.step_states.get(name).unwrap().status != StepStatus::PENDING {
            return;
        }

        let requires = self.step_states.get(name).unwrap().requires.clone();
        let mut ready = true;
        for (parent_name, required_status) in &requires {
            let parent = self.step_states.get(parent_name).unwrap();
            if !parent.is_completed() {
                ready = false;
                continue;
            }
            if !parent.status.means(*required_status) {
                self.step_update(ctx, name, StepStatus::ABORTED, None);
                return;
            }
        }
        if ready {
            self.step_update(ctx, name, StepStatus::READY, None);
        }
    }

    fn prepare(&self, name: &str) -> Result<Option<Value>, String> {
        let state = self.step_states.get(name).unwrap();
        if matches!(state.kind, StepKind::InitSentinel | StepKind::EndSentinel) {
            return Ok(None);
        }

        let step_def = self
            .plan
            .step(name)
            .ok_or_else(|| format!("no such step '{}' in plan", name))?;

        let mut context: HashMap<String, Value> = HashMap::new();
        for parent_name in &state.parents {
            let parent = self.step_states.get(parent_name).unwrap();
            let key = if parent_name == INIT_STEP {
                SELF_INPUT_VAR.to_string()
            } else {
                parent_name.clone()
            };
            context.insert(key, parent.attrs.clone());
        }

        match &step_def.kind {
            step::StepKind::Activity {
                activity,
                input_template,
            } => {
                let input = match input_template {
                    None => None,
                    Some(template) => {
                        let rendered = template.render(&context);
                        let parsed: Value = serde_json::from_str(&rendered)
                            .map_err(|e| format!("template did not render valid JSON: {}", e))?;
                        Some(parsed)
                    }
                };
                if let Some(ref document) = input {
                    let activity_def = self
                        .plan
                        .activities
                        .get(activity)
                        .expect("activity reference validated at load time");
                    activity_def.check_input(document)?;
                }
                Ok(input)
            }
            step::StepKind::Templated { eval_block } => Ok(Some(Value::String(eval_block.clone()))),
        }
    }

    /// `step_next()`: every step currently `ready`, found by walking down
    /// from `$init`, descending through completed steps and
    /// short-circuiting any other status. Dedupes by name.
    pub fn step_next(&self) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<String> = self
            .step_states
            .get(INIT_STEP)
            .unwrap()
            .children
            .iter()
            .cloned()
            .collect();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let state = self.step_states.get(&name).unwrap();
            if state.status == StepStatus::READY {
                result.push(name);
            } else if state.is_completed() {
                stack.extend(state.children.iter().cloned());
            }
        }
        result
    }

    /// The activity-to-schedule descriptor for a ready step, or an error
    /// if it's a reserved `TemplatedStep` (Open Question 3).
    pub fn activity_result(
        &self,
        name: &str,
    ) -> Result<crate::result::ActivityStepResult, CoreError> {
        let state = self.step_states.get(name).unwrap();
        let step_def = self
            .plan
            .step(name)
            .expect("ready step must resolve to a plan step");

        match &step_def.kind {
            step::StepKind::Activity { activity, .. } => {
                let activity_def = self
                    .plan
                    .activities
                    .get(activity)
                    .expect("activity reference validated at load time");
                Ok(crate::result::ActivityStepResult {
                    name: name.to_string(),
                    activity_name: activity_def.name.clone(),
                    activity_version: activity_def.version.clone(),
                    task_list: activity_def.task_list.clone(),
                    heartbeat_timeout: activity_def.heartbeat_timeout.clone(),
                    schedule_to_start_timeout: activity_def.schedule_to_start_timeout.clone(),
                    schedule_to_close_timeout: activity_def.schedule_to_close_timeout.clone(),
                    start_to_close_timeout: activity_def.start_to_close_timeout.clone(),
                    input: state.input.clone(),
                })
            }
            step::StepKind::Templated { .. } => Err(CoreError::NotImplemented(format!(
                "TemplatedStep '{}' reached scheduling; not implemented",
                name
            ))),
        }
    }
}
