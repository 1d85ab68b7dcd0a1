//! Field-level validation responses
//!
//! A rejected list request answers with HTTP 400 and an itemised body:
//!
//! ```json
//! {
//!   "error": "One or more validation errors occurred.",
//!   "code": "VALIDATION_ERROR",
//!   "status": 400,
//!   "errors": {
//!     "sortOrder": [
//!       { "field": "sortOrder", "code": "INVALID_SORT_ORDER",
//!         "message": "Value must be one of the following: ASC,DESC." }
//!     ]
//!   }
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Error codes used in [`FieldError::code`]
pub mod codes {
    /// A numeric value outside its accepted range
    pub const OUT_OF_RANGE: &str = "OUT_OF_RANGE";
    /// A value that should be a number but does not parse as one
    pub const NOT_A_NUMBER: &str = "NOT_A_NUMBER";
    /// A sort column that is empty, unknown or not allow-listed
    pub const INVALID_COLUMN: &str = "INVALID_COLUMN";
    /// A sort order other than `ASC` or `DESC`
    pub const INVALID_SORT_ORDER: &str = "INVALID_SORT_ORDER";
    /// A query-string field given more than once
    pub const DUPLICATE_FIELD: &str = "DUPLICATE_FIELD";
}

/// Field-level validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears in the query string
    pub field: String,
    /// Error code (see [`codes`])
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// HTTP 400 Bad Request response carrying every field error of a request
///
/// Errors are keyed by field name so the payload is stable across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    error: String,
    code: String,
    status: u16,
    /// Field-level validation errors
    pub errors: BTreeMap<String, Vec<FieldError>>,
}

impl ValidationError {
    /// Create a new validation error response
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: "VALIDATION_ERROR".to_string(),
            status: StatusCode::BAD_REQUEST.as_u16(),
            errors: BTreeMap::new(),
        }
    }

    /// Add a field-level error
    pub fn add_field_error(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        let field = field.into();
        let error = FieldError {
            field: field.clone(),
            code: code.into(),
            message: message.into(),
        };

        self.errors.entry(field).or_default().push(error);
    }

    /// Check if there are any validation errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get the number of field errors
    pub fn error_count(&self) -> usize {
        self.errors.values().map(|v| v.len()).sum()
    }

    /// Errors recorded against one field
    pub fn field(&self, name: &str) -> &[FieldError] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

impl Default for ValidationError {
    fn default() -> Self {
        Self::new("One or more validation errors occurred.")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} field errors)", self.error, self.error_count())
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        tracing::debug!(
            fields = ?self.errors.keys().collect::<Vec<_>>(),
            count = self.error_count(),
            "Rejected list request"
        );
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_collects_per_field() {
        let mut err = ValidationError::default();
        assert!(!err.has_errors());

        err.add_field_error("pageSize", codes::OUT_OF_RANGE, "too big");
        err.add_field_error("pageSize", codes::NOT_A_NUMBER, "nope");
        err.add_field_error("sortOrder", codes::INVALID_SORT_ORDER, "bad");

        assert!(err.has_errors());
        assert_eq!(err.error_count(), 3);
        assert_eq!(err.field("pageSize").len(), 2);
        assert_eq!(err.field("sortOrder")[0].code, "INVALID_SORT_ORDER");
        assert!(err.field("pageIndex").is_empty());
    }

    #[test]
    fn test_validation_error_response_is_bad_request() {
        let mut err = ValidationError::default();
        err.add_field_error("sortColumn", codes::INVALID_COLUMN, "bad column");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validation_error_body_shape() {
        let mut err = ValidationError::default();
        err.add_field_error("pageIndex", codes::OUT_OF_RANGE, "negative");

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["errors"]["pageIndex"][0]["field"], "pageIndex");
        assert_eq!(json["errors"]["pageIndex"][0]["code"], "OUT_OF_RANGE");
    }
}
