//! Output projection (C2a): a tiny JSONPath-like expression language.
//!
//! `$` denotes the whole document; `$.a.b` dereferences nested object
//! fields. Grounded in the dot-path walker the teacher crate already uses
//! for condition evaluation (`condition_evaluator::get_nested_field`).

use serde_json::Value;

/// A parsed output-projection expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    path: Vec<String>,
}

impl Expr {
    /// Parse `$` or `$.a.b.c`. Parse failures are load-time errors (the
    /// caller decides how to surface that — see `Activity::from_value`).
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw != "$" && !raw.starts_with("$.") {
            return Err(format!(
                "expression must be '$' or start with '$.': got '{}'",
                raw
            ));
        }
        let path = if raw == "$" {
            Vec::new()
        } else {
            raw[2..]
                .split('.')
                .map(|segment| {
                    if segment.is_empty() {
                        Err(format!("empty path segment in '{}'", raw))
                    } else {
                        Ok(segment.to_string())
                    }
                })
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(Self { path })
    }

    /// Evaluate against a raw document. A missing field at any segment
    /// yields `Value::Null`, matching the dot-path walker's behavior on a
    /// non-object encountered mid-path.
    pub fn evaluate(&self, document: &Value) -> Value {
        let mut current = document;
        for segment in &self.path {
            match current {
                Value::Object(map) => match map.get(segment) {
                    Some(value) => current = value,
                    None => return Value::Null,
                },
                _ => return Value::Null,
            }
        }
        current.clone()
    }
}
