//! Step definition (C4): declared parent requirements and either an
//! Activity reference + input template, or a pure-template step. Grounded
//! in `pydecider/step.py`.

use crate::activity::Activity;
use crate::error::{LoadError, StepDefinitionError};
use crate::step_state::StepStatus;
use crate::template::{Template, SELF_INPUT_VAR};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub enum StepKind {
    /// References an Activity; carries an optional input template yielding
    /// a JSON document (`None` means the activity is scheduled with no
    /// input at all, matching scenario 1).
    Activity {
        activity: String,
        input_template: Option<Template>,
    },
    /// A pure evaluation template. Present in the data model; scheduling
    /// it is a reserved extension point (Open Question 3) that fails fast
    /// at run time rather than at load time.
    Templated { eval_block: String },
}

/// An immutable step definition as declared in the Plan document.
#[derive(Debug, Clone)]
pub struct StepDef {
    pub name: String,
    /// Parent step name -> required terminal status. Bare names in the
    /// source document default to `completed` (canonized in §9/Open
    /// Question 1).
    pub requires: HashMap<String, StepStatus>,
    pub kind: StepKind,
}

impl StepDef {
    pub fn from_value(
        data: &Value,
        activities: &HashMap<String, Activity>,
    ) -> Result<Self, LoadError> {
        let obj = data
            .as_object()
            .ok_or_else(|| LoadError::Malformed("step definition must be an object".into()))?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| LoadError::Malformed("step missing 'name'".into()))?
            .to_string();

        let requires = parse_requires(&name, obj.get("requires"))?;

        let has_activity = obj.get("activity").is_some();
        let has_eval = obj.get("eval").is_some();
        if has_activity == has_eval {
            return Err(StepDefinitionError::AmbiguousStepKind { step: name }.into());
        }

        let kind = if has_activity {
            let activity_name = obj
                .get("activity")
                .and_then(Value::as_str)
                .ok_or_else(|| LoadError::Malformed(format!("step '{}' has non-string 'activity'", name)))?
                .to_string();
            if !activities.contains_key(&activity_name) {
                return Err(LoadError::UnknownActivity {
                    step: name.clone(),
                    activity: activity_name,
                });
            }

            let input_template = match obj.get("input") {
                None | Some(Value::Null) => None,
                Some(Value::String(source)) => {
                    let mut declared_parents: std::collections::HashSet<String> =
                        requires.keys().cloned().collect();
                    declared_parents.insert(SELF_INPUT_VAR.to_string());
                    Some(Template::parse(&name, source, &declared_parents)?)
                }
                Some(_) => {
                    return Err(LoadError::Malformed(format!(
                        "step '{}' has non-string 'input' template",
                        name
                    )))
                }
            };

            StepKind::Activity {
                activity: activity_name,
                input_template,
            }
        } else {
            let eval_block = obj
                .get("eval")
                .and_then(Value::as_str)
                .ok_or_else(|| LoadError::Malformed(format!("step '{}' has non-string 'eval'", name)))?
                .to_string();
            StepKind::Templated { eval_block }
        };

        Ok(Self {
            name,
            requires,
            kind,
        })
    }
}

fn parse_requires(
    step_name: &str,
    requires: Option<&Value>,
) -> Result<HashMap<String, StepStatus>, LoadError> {
    let mut result = HashMap::new();
    let entries = match requires {
        None | Some(Value::Null) => return Ok(result),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(LoadError::Malformed(format!(
                "step '{}' has non-array 'requires'",
                step_name
            )))
        }
    };

    for entry in entries {
        match entry {
            Value::String(parent_name) => {
                result.insert(parent_name.clone(), StepStatus::COMPLETED);
            }
            Value::Array(pair) if pair.len() == 2 => {
                let parent_name = pair[0].as_str().ok_or_else(|| {
                    LoadError::Malformed(format!(
                        "step '{}' has malformed requires entry",
                        step_name
                    ))
                })?;
                let status_name = pair[1].as_str().ok_or_else(|| {
                    LoadError::Malformed(format!(
                        "step '{}' has malformed requires entry",
                        step_name
                    ))
                })?;
                let status = StepStatus::parse(status_name).ok_or_else(|| {
                    StepDefinitionError::UnknownStatusName {
                        step: step_name.to_string(),
                        status: status_name.to_string(),
                    }
                })?;
                result.insert(parent_name.to_string(), status);
            }
            _ => {
                return Err(LoadError::Malformed(format!(
                    "step '{}' has malformed requires entry",
                    step_name
                )))
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activities() -> HashMap<String, Activity> {
        let mut map = HashMap::new();
        map.insert(
            "HelloWorld".to_string(),
            Activity::from_value(&json!({"name": "HelloWorld", "version": "1.0"})).unwrap(),
        );
        map
    }

    #[test]
    fn bare_requires_name_defaults_to_completed() {
        let step = StepDef::from_value(
            &json!({"name": "b", "requires": ["a"], "activity": "HelloWorld"}),
            &activities(),
        )
        .unwrap();
        assert_eq!(step.requires.get("a"), Some(&StepStatus::COMPLETED));
    }

    #[test]
    fn explicit_status_pair_is_honored() {
        let step = StepDef::from_value(
            &json!({"name": "b", "requires": [["a", "succeeded"]], "activity": "HelloWorld"}),
            &activities(),
        )
        .unwrap();
        assert_eq!(step.requires.get("a"), Some(&StepStatus::SUCCEEDED));
    }

    #[test]
    fn rejects_unknown_activity_reference() {
        let result = StepDef::from_value(
            &json!({"name": "a", "activity": "DoesNotExist"}),
            &activities(),
        );
        assert!(matches!(result, Err(LoadError::UnknownActivity { .. })));
    }

    #[test]
    fn rejects_step_declaring_both_activity_and_eval() {
        let result = StepDef::from_value(
            &json!({"name": "a", "activity": "HelloWorld", "eval": "{{x}}"}),
            &activities(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn template_closure_check_rejects_undeclared_variable() {
        let result = StepDef::from_value(
            &json!({"name": "a", "activity": "HelloWorld", "input": "{\"x\": {{bogus}}}"}),
            &activities(),
        );
        assert!(matches!(
            result,
            Err(LoadError::StepDefinition(StepDefinitionError::UndeclaredVariable { .. }))
        ));
    }
}
