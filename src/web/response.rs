//! Maps [`Error`] onto HTTP responses.
//!
//! Every failure is answered with `{"success": false, "message": …}`.
//! Internal errors are logged and replaced by a generic message.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

impl Error {
    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ProductNotFound { .. }
            | Self::CategoryNotFound { .. }
            | Self::CartItemNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::UserNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. }
            | Self::InvalidPrice { .. }
            | Self::InvalidDiscount { .. }
            | Self::InvalidQuantity { .. }
            | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::SlugTaken { .. }
            | Self::EmailTaken { .. }
            | Self::OutOfStock { .. }
            | Self::InsufficientStock { .. }
            | Self::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) | Self::PasswordHash { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed.");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_of(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::OrderNotFound { id: 1 }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(Error::EmptyCart.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            Error::OutOfStock {
                product: "Lamp".to_string()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_client_error_body_carries_message() {
        let response = Error::InvalidDiscount { percent: 120 }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_of(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid discount percent: 120");
    }

    #[tokio::test]
    async fn test_server_error_hides_details() {
        let response = Error::Database(sea_orm::DbErr::Custom("disk on fire".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body["message"], "Internal server error");
    }
}
