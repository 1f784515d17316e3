//! Plan (C5): the top-level document — input schema, ordered steps,
//! activity map. Grounded in `pydecider/plan.py`.

use crate::activity::Activity;
use crate::error::LoadError;
use crate::schema::SchemaValidator;
use crate::step::StepDef;
use serde_json::Value;
use std::collections::HashMap;

/// Immutable after load; read-only and shared across every `eval` tick.
pub struct Plan {
    pub name: String,
    pub version: String,
    input_validator: SchemaValidator,
    pub steps: Vec<StepDef>,
    pub activities: HashMap<String, Activity>,
}

impl Plan {
    pub fn from_value(data: &Value) -> Result<Self, LoadError> {
        let obj = data
            .as_object()
            .ok_or_else(|| LoadError::Malformed("plan document must be an object".into()))?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| LoadError::Malformed("plan missing 'name'".into()))?
            .to_string();
        let version = obj
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| LoadError::Malformed("plan missing 'version'".into()))?
            .to_string();

        let input_validator = SchemaValidator::new(obj.get("input_spec"))?;

        let activity_values = obj
            .get("activities")
            .and_then(Value::as_array)
            .ok_or_else(|| LoadError::Malformed("plan missing 'activities' array".into()))?;
        let mut activities = HashMap::new();
        for activity_value in activity_values {
            let activity = Activity::from_value(activity_value)?;
            activities.insert(activity.name.clone(), activity);
        }

        let step_values = obj
            .get("steps")
            .and_then(Value::as_array)
            .ok_or_else(|| LoadError::Malformed("plan missing 'steps' array".into()))?;
        let mut steps = Vec::with_capacity(step_values.len());
        for step_value in step_values {
            steps.push(StepDef::from_value(step_value, &activities)?);
        }

        Ok(Self {
            name,
            version,
            input_validator,
            steps,
            activities,
        })
    }

    pub fn check_input(&self, input: &Value) -> Result<(), String> {
        self.input_validator.check(input)
    }

    pub fn step(&self, name: &str) -> Option<&StepDef> {
        self.steps.iter().find(|s| s.name == name)
    }
}
