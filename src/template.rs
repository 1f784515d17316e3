//! Input templating (C2b): `{{var}}` substitution plus the `{{#if}}`/
//! `{{else}}`/`{{#each}}` block constructs spec.md §4.1 requires, hand-parsed
//! into a small AST so every scalar substitution is JSON-encoded before the
//! whole rendered template is re-parsed as JSON — a guarantee handlebars'
//! own string rendering (which prints bare strings without quotes) does not
//! provide. `handlebars` is still used once, at load time, purely to
//! validate that the raw template text is syntactically well-formed before
//! this crate's own parser walks it.

use crate::error::StepDefinitionError;
use handlebars::Handlebars;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub const SELF_INPUT_VAR: &str = "__input__";

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Var(String),
    If {
        cond: String,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
    Each {
        items: String,
        body: Vec<Node>,
    },
}

/// A compiled input template: its parsed node tree plus every free variable
/// referenced anywhere in it, resolved at load time.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
    declared_vars: HashSet<String>,
}

impl Template {
    /// Parse `source`, validate Handlebars syntax, enumerate its free
    /// variables, and check every one is either `__input__`, the implicit
    /// `this` bound inside an `#each` body, or a declared parent of
    /// `step_name`. Undeclared variables are a load-time
    /// [`StepDefinitionError`] (P7).
    pub fn parse(
        step_name: &str,
        source: &str,
        declared_parents: &HashSet<String>,
    ) -> Result<Self, StepDefinitionError> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string("__plan_load_check", source)
            .map_err(|e| StepDefinitionError::UndeclaredVariable {
                step: step_name.to_string(),
                var: format!("<invalid template syntax: {}>", e),
            })?;

        let tokens = tokenize(source);
        let mut pos = 0usize;
        let (nodes, _) = parse_block(&tokens, &mut pos, &[]);

        let mut declared_vars = HashSet::new();
        collect_vars(&nodes, &mut declared_vars);

        for var in &declared_vars {
            if var != SELF_INPUT_VAR && var != "this" && !declared_parents.contains(var) {
                return Err(StepDefinitionError::UndeclaredVariable {
                    step: step_name.to_string(),
                    var: var.clone(),
                });
            }
        }

        Ok(Self {
            nodes,
            declared_vars,
        })
    }

    pub fn declared_vars(&self) -> &HashSet<String> {
        &self.declared_vars
    }

    /// Render against `context` (variable name -> value, `__input__`
    /// included). Every `{{var}}` substitution is JSON-encoded so the
    /// caller can re-parse the whole rendered text as JSON; `{{#if}}`/
    /// `{{else}}` selects exactly one branch, and `{{#each}}` iterates an
    /// array, binding `{{this}}` to the current element.
    pub fn render(&self, context: &HashMap<String, Value>) -> String {
        render_nodes(&self.nodes, context)
    }
}

enum Token {
    Text(String),
    Tag(String),
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = source;
    loop {
        match rest.find("{{") {
            Some(start) => {
                if start > 0 {
                    tokens.push(Token::Text(rest[..start].to_string()));
                }
                let after_open = &rest[start + 2..];
                match after_open.find("}}") {
                    Some(end) => {
                        tokens.push(Token::Tag(after_open[..end].trim().to_string()));
                        rest = &after_open[end + 2..];
                    }
                    None => {
                        tokens.push(Token::Text(rest[start..].to_string()));
                        rest = "";
                    }
                }
            }
            None => {
                if !rest.is_empty() {
                    tokens.push(Token::Text(rest.to_string()));
                }
                break;
            }
        }
    }
    tokens
}

/// Consume `tokens` from `*pos` until a tag in `stop` is hit (consumed) or
/// the stream runs out; returns the nodes built plus which stop tag ended
/// the block, if any. Nested `#if`/`#each` blocks fully consume their own
/// `else`/close tags via recursion, so a stop tag seen here always belongs
/// to this call's own block.
fn parse_block(tokens: &[Token], pos: &mut usize, stop: &[&str]) -> (Vec<Node>, Option<String>) {
    let mut nodes = Vec::new();
    while *pos < tokens.len() {
        match &tokens[*pos] {
            Token::Text(t) => {
                nodes.push(Node::Text(t.clone()));
                *pos += 1;
            }
            Token::Tag(raw) => {
                let tag = raw.as_str();
                if tag.starts_with('!') {
                    *pos += 1;
                    continue;
                }
                if stop.contains(&tag) {
                    *pos += 1;
                    return (nodes, Some(tag.to_string()));
                }
                if let Some(cond) = tag.strip_prefix("#if ") {
                    let cond = cond.trim().to_string();
                    *pos += 1;
                    let (then_body, hit) = parse_block(tokens, pos, &["else", "/if"]);
                    let else_body = if hit.as_deref() == Some("else") {
                        parse_block(tokens, pos, &["/if"]).0
                    } else {
                        Vec::new()
                    };
                    nodes.push(Node::If {
                        cond,
                        then_body,
                        else_body,
                    });
                } else if let Some(items) = tag.strip_prefix("#each ") {
                    let items = items.trim().to_string();
                    *pos += 1;
                    let (body, _hit) = parse_block(tokens, pos, &["/each"]);
                    nodes.push(Node::Each { items, body });
                } else {
                    let expr = tag.to_string();
                    *pos += 1;
                    nodes.push(Node::Var(expr));
                }
            }
        }
    }
    (nodes, None)
}

/// Enumerate the free variables referenced anywhere in `nodes`: the root
/// identifier of every `{{var}}`, `{{#if cond}}`, and `{{#each items}}`.
/// Close tags (`{{/if}}`, `{{/each}}`) and `{{else}}` are structural, never
/// variable references, and never reach here — `parse_block` consumes them
/// itself.
fn collect_vars(nodes: &[Node], vars: &mut HashSet<String>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Var(expr) => {
                vars.insert(root_of(expr));
            }
            Node::If {
                cond,
                then_body,
                else_body,
            } => {
                vars.insert(root_of(cond));
                collect_vars(then_body, vars);
                collect_vars(else_body, vars);
            }
            Node::Each { items, body } => {
                vars.insert(root_of(items));
                collect_vars(body, vars);
            }
        }
    }
}

fn root_of(expr: &str) -> String {
    expr.split('.').next().unwrap_or(expr).to_string()
}

fn render_nodes(nodes: &[Node], context: &HashMap<String, Value>) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Var(expr) => out.push_str(&render_expr(expr, context)),
            Node::If {
                cond,
                then_body,
                else_body,
            } => {
                if is_truthy(lookup(cond, context)) {
                    out.push_str(&render_nodes(then_body, context));
                } else {
                    out.push_str(&render_nodes(else_body, context));
                }
            }
            Node::Each { items, body } => {
                if let Some(Value::Array(array)) = lookup(items, context) {
                    let array = array.clone();
                    let mut inner = context.clone();
                    for item in array {
                        inner.insert("this".to_string(), item);
                        out.push_str(&render_nodes(body, &inner));
                    }
                }
            }
        }
    }
    out
}

fn lookup<'a>(expr: &str, context: &'a HashMap<String, Value>) -> Option<&'a Value> {
    let mut segments = expr.split('.');
    let root = segments.next()?;
    let mut current = context.get(root)?;
    for segment in segments {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

fn render_expr(expr: &str, context: &HashMap<String, Value>) -> String {
    match lookup(expr, context) {
        Some(v) => serde_json::to_string(v).unwrap_or_else(|_| "null".to_string()),
        None => "null".to_string(),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(m)) => !m.is_empty(),
    }
}
