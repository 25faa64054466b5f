//! Parameter checks that run before anything is spawned

use crate::error::{BridgeError, ErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{field}' is required")]
    MissingField { field: &'static str },

    #[error("'{field}' must not start with '-': {value}")]
    FlagLike { field: &'static str, value: String },

    #[error("'{field}' is invalid: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("conflicting parameters: {0}")]
    Conflicting(String),

    #[error("{operation} needs one of: {expected}")]
    NoAction {
        operation: &'static str,
        expected: &'static str,
    },
}

impl ValidationError {
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::FlagLike { field, .. }
            | ValidationError::InvalidValue { field, .. } => Some(*field),
            _ => None,
        }
    }
}

impl From<ValidationError> for BridgeError {
    fn from(err: ValidationError) -> Self {
        let code = match &err {
            ValidationError::MissingField { .. } => ErrorCode::VALIDATION_REQUIRED_FIELD,
            ValidationError::FlagLike { .. } | ValidationError::InvalidValue { .. } => {
                ErrorCode::VALIDATION_INVALID_FORMAT
            }
            ValidationError::Conflicting(_) | ValidationError::NoAction { .. } => {
                ErrorCode::VALIDATION_CONFLICTING_PARAMETERS
            }
        };
        let field = err.field().map(str::to_string);
        BridgeError::validation_with_code(code, err.to_string(), field).with_source(err)
    }
}

/// A non-empty value
pub fn require<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField { field }),
    }
}

/// A non-empty positional value naming a resource (branch, commit,
/// container, image). It may not look like an option.
pub fn require_resource<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    let value = require(field, value)?;
    check_not_flag(field, value)?;
    Ok(value)
}

pub fn check_not_flag(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim_start().starts_with('-') {
        return Err(ValidationError::FlagLike {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Every item non-empty and not option-like; the list itself non-empty
pub fn require_resources(field: &'static str, values: &[String]) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    for value in values {
        require_resource(field, Some(value))?;
    }
    Ok(())
}

/// Optional positional resource
pub fn optional_resource(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) => check_not_flag(field, v),
        None => Ok(()),
    }
}

/// What a merge / cherry-pick / rebase invocation should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Abort,
    Continue,
    Skip,
    Start,
}

/// Resolve the control flags of a multi-step operation.
///
/// Abort wins over continue/skip. A target list cannot be combined with any
/// control flag, and supplying nothing at all is an error.
pub fn resolve_step_action(
    operation: &'static str,
    abort: bool,
    continue_: bool,
    skip: bool,
    has_targets: bool,
) -> Result<StepAction, ValidationError> {
    let control = abort || continue_ || skip;
    if control && has_targets {
        return Err(ValidationError::Conflicting(format!(
            "{operation}: abort/continue/skip cannot be combined with targets"
        )));
    }
    if continue_ && skip && !abort {
        return Err(ValidationError::Conflicting(format!(
            "{operation}: continue and skip are mutually exclusive"
        )));
    }

    if abort {
        Ok(StepAction::Abort)
    } else if continue_ {
        Ok(StepAction::Continue)
    } else if skip {
        Ok(StepAction::Skip)
    } else if has_targets {
        Ok(StepAction::Start)
    } else {
        Err(ValidationError::NoAction {
            operation,
            expected: "targets, abort, continue or skip",
        })
    }
}
