//! Black-box scenario tests against the crate's public API, one file per
//! concern, matching the teacher's `tests/webhook_integration.rs`
//! black-box integration-test convention. Covers §8's seven seed
//! scenarios.

use decider_core::plan::Plan;
use decider_core::state_machine::StateMachine;
use serde_json::json;

fn hello_plan() -> Plan {
    Plan::from_value(&json!({
        "name": "hello",
        "version": "1.0",
        "activities": [{"name": "HelloWorld", "version": "1.0"}],
        "steps": [
            {"name": "saying_hi", "activity": "HelloWorld"},
            {"name": "saying_hi_again", "requires": ["saying_hi"], "activity": "HelloWorld"}
        ]
    }))
    .unwrap()
}

#[test]
fn scenario_1_two_step_linear_hello_workflow() {
    let sm = StateMachine::new(hello_plan());
    let events = vec![
        json!({"eventId": 1, "eventType": "WorkflowExecutionStarted", "input": null}),
        json!({"eventId": 2, "eventType": "DecisionTaskScheduled"}),
        json!({"eventId": 3, "eventType": "DecisionTaskStarted"}),
    ];
    let results = sm.eval(&events).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "saying_hi");
    assert_eq!(results[0].activity_name, "HelloWorld");
    assert_eq!(results[0].input, None);
}

#[test]
fn scenario_2_unknown_event_mid_stream() {
    let sm = StateMachine::new(hello_plan());
    let events = vec![
        json!({"eventId": 1, "eventType": "WorkflowExecutionStarted", "input": null}),
        json!({"eventId": 2, "eventType": "DecisionTaskScheduled"}),
        json!({"eventId": 3, "eventType": "Foo"}),
    ];
    let results = sm.eval(&events).unwrap();
    assert!(results.is_empty());
}

#[test]
fn scenario_3_invalid_first_event_type() {
    let sm = StateMachine::new(hello_plan());
    let events = vec![json!({"eventId": 1, "eventType": "NotARealEventType"})];
    let results = sm.eval(&events).unwrap();
    assert!(results.is_empty());
}

#[test]
fn scenario_4_progress_after_activity_completion() {
    let sm = StateMachine::new(hello_plan());
    let events = vec![
        json!({"eventId": 1, "eventType": "WorkflowExecutionStarted", "input": null}),
        json!({"eventId": 2, "eventType": "DecisionTaskScheduled"}),
        json!({"eventId": 3, "eventType": "DecisionTaskStarted"}),
        json!({"eventId": 4, "eventType": "DecisionTaskCompleted"}),
        json!({"eventId": 5, "eventType": "ActivityTaskScheduled", "activityId": "saying_hi"}),
        json!({"eventId": 6, "eventType": "ActivityTaskStarted"}),
        json!({"eventId": 7, "eventType": "ActivityTaskCompleted", "scheduledEventId": 5, "result": null}),
    ];
    let results = sm.eval(&events).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "saying_hi_again");
}

#[test]
fn scenario_5_output_projection() {
    let plan = Plan::from_value(&json!({
        "name": "p",
        "version": "1.0",
        "activities": [{
            "name": "A",
            "version": "1.0",
            "outputs_spec": {"a": "$", "b": "$.hello"}
        }],
        "steps": [{"name": "a", "activity": "A"}]
    }))
    .unwrap();
    let sm = StateMachine::new(plan);
    let events = vec![
        json!({"eventId": 1, "eventType": "WorkflowExecutionStarted", "input": null}),
        json!({"eventId": 2, "eventType": "ActivityTaskScheduled", "activityId": "a"}),
        json!({"eventId": 3, "eventType": "ActivityTaskCompleted", "scheduledEventId": 2, "result": {"hello": "world"}}),
    ];
    let results = sm.eval(&events).unwrap();
    // "a" is now succeeded with no declared children besides $end; nothing
    // new is scheduled, but the workflow must have reached a successful
    // terminal state, which only happens if attrs were projected correctly
    // and satisfied $end's completed requirement.
    assert!(results.is_empty());
}

#[test]
fn scenario_7_template_rendering_end_to_end() {
    let plan = Plan::from_value(&json!({
        "name": "p",
        "version": "1.0",
        "activities": [
            {"name": "Source", "version": "1.0", "outputs_spec": {"foo": "$"}},
            {"name": "Sink", "version": "1.0"}
        ],
        "steps": [
            {"name": "source", "activity": "Source"},
            {
                "name": "sink",
                "requires": ["source"],
                "activity": "Sink",
                "input": "{\"a\": {{source}}, \"b\": {{__input__}}, \"c\": {{__input__.who}}}"
            }
        ]
    }))
    .unwrap();
    let sm = StateMachine::new(plan);
    let events = vec![
        json!({"eventId": 1, "eventType": "WorkflowExecutionStarted", "input": {"who": "world"}}),
        json!({"eventId": 2, "eventType": "ActivityTaskScheduled", "activityId": "source"}),
        json!({"eventId": 3, "eventType": "ActivityTaskCompleted", "scheduledEventId": 2, "result": "hello"}),
    ];
    let results = sm.eval(&events).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "sink");
    assert_eq!(
        results[0].input,
        Some(json!({"a": "hello", "b": {"who": "world"}, "c": "world"}))
    );
}

#[test]
fn scenario_6_required_status_mismatch_aborts_child_at_state_level() {
    use decider_core::context::MutationContext;
    use decider_core::step_state::StepStatus;
    use decider_core::workflow_state::{WorkflowState, WorkflowStatus};
    use std::sync::Arc;

    let plan = Arc::new(
        Plan::from_value(&json!({
            "name": "p",
            "version": "1.0",
            "activities": [{"name": "A", "version": "1.0"}],
            "steps": [
                {"name": "a", "activity": "A"},
                {"name": "b", "requires": [["a", "succeeded"]], "activity": "A"}
            ]
        }))
        .unwrap(),
    );
    let mut wf = WorkflowState::new(plan);
    let mut slot = None;
    wf.load_plan(&MutationContext::acquire(&mut slot, 0));
    slot = None;
    wf.set_input(&MutationContext::acquire(&mut slot, 1), serde_json::Value::Null);
    slot = None;
    wf.step_update(&MutationContext::acquire(&mut slot, 2), "a", StepStatus::RUNNING, None);
    slot = None;
    wf.step_update(
        &MutationContext::acquire(&mut slot, 3),
        "a",
        StepStatus::FAILED,
        Some(serde_json::Value::Null),
    );

    assert_eq!(wf.step_states["b"].status, StepStatus::ABORTED);
    assert!(wf.is_in_state(WorkflowStatus::FAILED));
}
