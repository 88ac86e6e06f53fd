//! Error and redirect responses.
//!
//! Every handler returns [`crate::errors::Result`]; this module turns the error
//! side into a status code and a JSON body of the form
//! `{"error": {"kind", "message", "retryable", "index"?}}`.

use crate::errors::Error;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

/// Location used when a permission error escapes without a configured page
const FALLBACK_REDIRECT: &str = "/";

/// Status code for each error class.
///
/// Lost database connections are 503; any other database failure is a 500.
#[must_use]
pub const fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::Validation { .. }
        | Error::InvalidJson { .. }
        | Error::ImportRejected { .. }
        | Error::Json(_) => StatusCode::BAD_REQUEST,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::PermissionDenied { .. } => StatusCode::SEE_OTHER,
        Error::Database(_) if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        Error::Database(_) | Error::Config { .. } | Error::Io(_) | Error::Toml(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

const fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::Config { .. } => "config",
        Error::Database(_) => "database",
        Error::Validation { .. } => "validation",
        Error::InvalidJson { .. } | Error::Json(_) => "invalid_json",
        Error::ImportRejected { .. } => "import_rejected",
        Error::NotFound { .. } => "not_found",
        Error::PermissionDenied { .. } => "permission_denied",
        Error::Io(_) => "io",
        Error::Toml(_) => "toml",
    }
}

/// 303 to `to` carrying the denial notice.
#[must_use]
pub fn redirect(to: &str, notice: &str) -> Response {
    let body = Json(json!({"redirect": {"to": to, "notice": notice}}));
    let mut resp = (StatusCode::SEE_OTHER, body).into_response();
    if let Ok(location) = HeaderValue::from_str(to) {
        resp.headers_mut().insert(header::LOCATION, location);
    }
    resp
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Self::PermissionDenied { permission } = &self {
            return redirect(
                FALLBACK_REDIRECT,
                &format!("You do not have permission to access the {permission} section."),
            );
        }

        let status = error_status(&self);
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        let mut body = json!({
            "kind": error_kind(&self),
            "message": self.to_string(),
            "retryable": self.is_retryable(),
        });
        if let Self::ImportRejected { index, .. } = &self {
            body["index"] = json!(index);
        }

        let mut resp = (status, Json(json!({"error": body}))).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("3"));
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbErr, RuntimeErr};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            error_status(&Error::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&Error::ImportRejected {
                index: 2,
                message: "missing name".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&Error::not_found("school", "1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&Error::Database(DbErr::Conn(RuntimeErr::Internal(
                "down".to_string()
            )))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            error_status(&Error::Database(DbErr::Custom("bad query".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_status(&Error::Config {
                message: "x".to_string()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_redirect_sets_location() {
        let resp = redirect("/admin", "nope");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/admin");
    }

    #[test]
    fn test_unavailable_is_retryable() {
        let resp =
            Error::Database(DbErr::Conn(RuntimeErr::Internal("down".to_string()))).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers()[header::RETRY_AFTER], "3");
    }

    #[test]
    fn test_query_failure_is_not_retryable() {
        let resp = Error::Database(DbErr::Custom("no such column".to_string())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers().get(header::RETRY_AFTER).is_none());
    }
}
