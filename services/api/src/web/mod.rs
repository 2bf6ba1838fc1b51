pub mod auth;
pub mod books;
pub mod forecast;
pub mod middleware;
pub mod progress;
pub mod rest;
pub mod schedule;
pub mod state;

pub use middleware::require_auth;

use axum::http::StatusCode;
use qalamflow_core::ports::PortError;
use std::str::FromStr;
use tracing::error;

/// Maps a port failure onto the status code and message returned to the client.
///
/// Unexpected failures are logged here and reach the client as a generic message.
pub fn port_error(context: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, format!("{} not found", context)),
        PortError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(msg) => {
            error!("{} request failed: {}", context, msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

/// Parses one of the lowercase enum values accepted on the wire.
pub(crate) fn parse_field<T>(value: &str) -> Result<T, (StatusCode, String)>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}
