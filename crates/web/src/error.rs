use std::fmt;
use std::time::Duration;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use storage::error::StorageError;
use validator::ValidationErrors;

const GENERIC_ERROR: &str = "An internal error occurred";

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Storage(StorageError),
    Validation(ValidationErrors),
    RateLimited { retry_after: Duration },
    /// The request could not be extracted (body, query string or path).
    Rejected {
        status: StatusCode,
        field: &'static str,
        code: &'static str,
        message: String,
    },
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::RateLimited { retry_after } => {
                write!(f, "Rate limited, retry after {}s", retry_after.as_secs())
            }
            Self::Rejected { field, message, .. } => {
                write!(f, "Rejected {}: {}", field, message)
            }
        }
    }
}

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Storage(StorageError::NotFound) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Rejected { status, .. } => *status,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let body = match &self {
            Self::Storage(StorageError::NotFound) => {
                json!({
                    "error": "Workout not found"
                })
            }
            Self::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                json!({
                    "error": GENERIC_ERROR
                })
            }
            Self::Validation(errors) => {
                let mut details: Vec<serde_json::Value> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errors)| {
                        errors.iter().map(move |e| {
                            json!({
                                "field": field.to_string(),
                                "code": e.code.to_string(),
                                "message": e
                                    .message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| format!("{} failed {}", field, e.code)),
                            })
                        })
                    })
                    .collect();
                details.sort_by(|a, b| a["field"].as_str().cmp(&b["field"].as_str()));

                json!({
                    "error": "Validation failed",
                    "details": details
                })
            }
            Self::RateLimited { .. } => {
                json!({
                    "error": "Too many requests"
                })
            }
            Self::Rejected {
                field,
                code,
                message,
                ..
            } => {
                json!({
                    "error": "Invalid request",
                    "details": [{
                        "field": field,
                        "code": code,
                        "message": message,
                    }]
                })
            }
        };

        let mut response = (status_code, Json(body)).into_response();

        if let Self::RateLimited { retry_after } = &self {
            let seconds = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<StorageError> for WebError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<ValidationErrors> for WebError {
    fn from(error: ValidationErrors) -> Self {
        Self::Validation(error)
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            field: "body",
            code: "invalid_body",
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for WebError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            field: "query",
            code: "invalid_query",
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for WebError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            field: "path",
            code: "invalid_path",
            message: rejection.body_text(),
        }
    }
}

pub type WebResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use validator::ValidationError;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_storage_detail_never_reaches_the_caller() {
        let cases = [
            StorageError::ConstraintViolation("NOT NULL constraint failed: workouts.date".into()),
            StorageError::Unavailable("pool timed out while waiting for an open connection".into()),
        ];

        for error in cases {
            let response = WebError::from(error).into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body = body_json(response).await;
            assert_eq!(body, json!({ "error": GENERIC_ERROR }));
        }
    }

    #[tokio::test]
    async fn test_not_found_is_404() {
        let response = WebError::from(StorageError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Workout not found");
    }

    #[tokio::test]
    async fn test_validation_errors_list_each_field() {
        let mut errors = ValidationErrors::new();
        errors.add("turkish_get_ups", ValidationError::new("getup_sum_mismatch"));
        errors.add("date", ValidationError::new("date_out_of_range"));

        let response = WebError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        let details = body["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["field"], "date");
        assert_eq!(details[1]["field"], "turkish_get_ups");
        assert_eq!(details[1]["code"], "getup_sum_mismatch");
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = WebError::RateLimited {
            retry_after: Duration::from_secs(42),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
