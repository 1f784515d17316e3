//! Activity definition (C3): name, version, timeouts, input schema, output
//! projection. Grounded in `pydecider/activity.py`.

use crate::error::LoadError;
use crate::expr::Expr;
use crate::schema::SchemaValidator;
use serde_json::Value;
use std::collections::HashMap;

/// An immutable, named, versioned unit of work executed by an external
/// worker population. Timeouts are carried as integer-seconds-as-string,
/// matching the wire format the workflow service expects.
pub struct Activity {
    pub name: String,
    pub version: String,
    pub task_list: String,
    pub heartbeat_timeout: String,
    pub schedule_to_start_timeout: String,
    pub schedule_to_close_timeout: String,
    pub start_to_close_timeout: String,
    input_validator: SchemaValidator,
    outputs_spec: HashMap<String, Expr>,
}

impl Activity {
    pub fn from_value(data: &Value) -> Result<Self, LoadError> {
        let obj = data
            .as_object()
            .ok_or_else(|| LoadError::Malformed("activity definition must be an object".into()))?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| LoadError::Malformed("activity missing 'name'".into()))?
            .to_string();
        let version = obj
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| LoadError::Malformed(format!("activity '{}' missing 'version'", name)))?
            .to_string();

        let task_list = obj
            .get("task_list")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", name, version));

        let heartbeat_timeout = timeout_or_default(obj, "heartbeat_timeout", "60");
        let schedule_to_start_timeout = timeout_or_default(obj, "schedule_to_start_timeout", "30");
        let schedule_to_close_timeout = timeout_or_default(obj, "schedule_to_close_timeout", "300");
        let start_to_close_timeout = timeout_or_default(obj, "start_to_close_timeout", "300");

        let input_validator = SchemaValidator::new(obj.get("input_spec"))?;

        let mut outputs_spec = HashMap::new();
        if let Some(Value::Object(spec)) = obj.get("outputs_spec") {
            for (key, raw_expr) in spec {
                if !key.chars().all(|c| c.is_ascii_alphanumeric()) || key.is_empty() {
                    return Err(LoadError::Malformed(format!(
                        "activity '{}' has non-alphanumeric outputs_spec key '{}'",
                        name, key
                    )));
                }
                let raw = raw_expr.as_str().ok_or_else(|| {
                    LoadError::Malformed(format!(
                        "activity '{}' outputs_spec['{}'] must be a string expression",
                        name, key
                    ))
                })?;
                let expr = Expr::parse(raw).map_err(|reason| LoadError::InvalidOutputExpression {
                    activity: name.clone(),
                    reason,
                })?;
                outputs_spec.insert(key.clone(), expr);
            }
        }

        Ok(Self {
            name,
            version,
            task_list,
            heartbeat_timeout,
            schedule_to_start_timeout,
            schedule_to_close_timeout,
            start_to_close_timeout,
            input_validator,
            outputs_spec,
        })
    }

    pub fn check_input(&self, input: &Value) -> Result<(), String> {
        self.input_validator.check(input)
    }

    /// Project raw activity output into the attribute map exposed to
    /// children, lazily evaluated only once a step reaches a terminal
    /// successful status.
    pub fn render_output(&self, output: &Value) -> HashMap<String, Value> {
        self.outputs_spec
            .iter()
            .map(|(key, expr)| (key.clone(), expr.evaluate(output)))
            .collect()
    }
}

fn timeout_or_default(
    obj: &serde_json::Map<String, Value>,
    field: &str,
    default: &str,
) -> String {
    obj.get(field)
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_task_list_and_timeouts() {
        let activity = Activity::from_value(&json!({
            "name": "HelloWorld",
            "version": "1.0"
        }))
        .unwrap();
        assert_eq!(activity.task_list, "HelloWorld-1.0");
        assert_eq!(activity.heartbeat_timeout, "60");
        assert_eq!(activity.schedule_to_start_timeout, "30");
        assert_eq!(activity.schedule_to_close_timeout, "300");
        assert_eq!(activity.start_to_close_timeout, "300");
    }

    #[test]
    fn output_projection_matches_scenario_five() {
        let activity = Activity::from_value(&json!({
            "name": "HelloWorld",
            "version": "1.0",
            "outputs_spec": {"a": "$", "b": "$.hello"}
        }))
        .unwrap();
        let output = json!({"hello": "world"});
        let attrs = activity.render_output(&output);
        assert_eq!(attrs.get("a"), Some(&output));
        assert_eq!(attrs.get("b"), Some(&json!("world")));
    }

    #[test]
    fn rejects_bad_outputs_spec_key() {
        let result = Activity::from_value(&json!({
            "name": "Bad",
            "version": "1.0",
            "outputs_spec": {"not valid!": "$"}
        }));
        assert!(result.is_err());
    }
}
