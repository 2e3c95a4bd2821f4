//! API handlers module

pub mod articles;
pub mod assistant;
pub mod health;
pub mod medical_sections;
pub mod sections;

use medarticles_common::errors::AppError;
use validator::ValidationErrors;

/// Convert validator output into a 400 naming the first offending field
pub(crate) fn validation_error(errors: ValidationErrors) -> AppError {
    let field = errors.field_errors().keys().next().map(|f| f.to_string());

    AppError::Validation {
        message: errors.to_string(),
        field,
    }
}

/// Treat blank strings as absent
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
