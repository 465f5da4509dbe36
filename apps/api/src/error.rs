use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use contractdesk_core::AppError;
use serde::Serialize;
use tracing::error;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self.0 {
            AppError::Unavailable(_) | AppError::Internal(_) => {
                error!(error = %self.0, "admin request failed");
                "activity store request failed".to_owned()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use contractdesk_core::AppError;

    use super::ApiError;

    #[test]
    fn store_outages_map_to_service_unavailable() {
        let response =
            ApiError::from(AppError::Unavailable("pool timed out".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = ApiError::from(AppError::Validation("bad".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            ApiError::from(AppError::Unauthorized("missing token".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
