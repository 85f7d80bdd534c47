//! # Command Result Envelope
//!
//! Every facade operation answers with a [`CommandResult`]; failures are
//! data, never panics.
//!
//! ```json
//! { "success": true,  "data": { ... }, "error": null }
//! { "success": false, "data": null,    "error": { "code": "CONFLICT", "message": "..." } }
//! ```

use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize)]
pub struct CommandResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        CommandResult {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: ApiError) -> Self {
        CommandResult {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Back to a `Result` for callers that prefer `?`.
    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err(ApiError::internal("Command returned no data")),
        }
    }
}

impl<T, E> From<Result<T, E>> for CommandResult<T>
where
    E: Into<ApiError>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => CommandResult::ok(data),
            Err(err) => CommandResult::failed(err.into()),
        }
    }
}
