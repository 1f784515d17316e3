//! Error types for the decider core engine

use thiserror::Error;

/// Errors raised while loading a Plan document. Load errors abort startup;
/// the process cannot proceed with a malformed plan.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("malformed plan document: {0}")]
    Malformed(String),

    #[error("step '{step}' references unknown activity '{activity}'")]
    UnknownActivity { step: String, activity: String },

    #[error("invalid output expression for activity '{activity}': {reason}")]
    InvalidOutputExpression { activity: String, reason: String },

    #[error("invalid JSON-Schema: {0}")]
    InvalidSchema(String),

    #[error(transparent)]
    StepDefinition(#[from] StepDefinitionError),
}

/// Sub-kind of [`LoadError`]: a step definition itself is inconsistent.
#[derive(Error, Debug)]
pub enum StepDefinitionError {
    #[error("step '{step}' input template references undeclared variable '{var}' (must be '__input__' or a declared parent)")]
    UndeclaredVariable { step: String, var: String },

    #[error("step '{step}' requires an unknown status name '{status}'")]
    UnknownStatusName { step: String, status: String },

    #[error("step '{step}' must declare exactly one of 'activity' or 'eval'")]
    AmbiguousStepKind { step: String },
}

/// The crate's single error currency for everything outside load time.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Per-event, recoverable: invalid workflow input, invalid template-rendered
    /// JSON, or input-schema validation failure. Callers fold this into a
    /// workflow- or step-level `aborted`/`failed` transition; `eval` keeps going.
    #[error("runtime abort: {0}")]
    RuntimeAbort(String),

    /// An event type absent from the dispatch table.
    #[error("unknown event type: {0}")]
    UnknownEvent(String),

    /// `TemplatedStep` reached scheduling; reserved extension point (Open
    /// Question 3), not yet implemented.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
