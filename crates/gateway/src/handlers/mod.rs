//! API handlers module

pub mod emails;
pub mod enrich;
pub mod health;
pub mod quota;
pub mod results;

use leadforge_common::errors::AppError;
use validator::Validate;

/// Validate a request DTO, mapping failures to `AppError::Validation`
pub(crate) fn validate<T: Validate>(request: &T) -> Result<(), AppError> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: e.field_errors().keys().next().map(|field| field.to_string()),
    })
}
