use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::application::usercases::{
    books::CatalogError, borrowings::BorrowingError, payments::PaymentError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Internal(err) => {
                error!(error = ?err, "http: internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        json_error(status, message)
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        json_error(status, public_message(status, &self))
    }
}

impl IntoResponse for BorrowingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            BorrowingError::OutstandingPaymentExists {
                session_url: Some(session_url),
                ..
            } => format!("{self} (checkout: {session_url})"),
            _ => public_message(status, &self),
        };
        json_error(status, message)
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        json_error(status, public_message(status, &self))
    }
}

fn json_error(status: StatusCode, message: String) -> Response {
    let body = Json(ErrorResponse {
        code: status.as_u16(),
        message,
    });

    (status, body).into_response()
}

// Server-side failures never expose their cause to the client.
fn public_message(status: StatusCode, err: &dyn std::error::Error) -> String {
    if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
        error!(error = %err, "http: request failed");
        "Internal server error".to_string()
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::{TimeZone, Utc};

    #[test]
    fn validation_errors_keep_their_message() {
        let returned_at = Utc.with_ymd_and_hms(2024, 3, 18, 12, 0, 0).unwrap();
        let err = BorrowingError::AlreadyReturned { returned_at };

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            public_message(err.status_code(), &err),
            "borrowing was already returned at 2024-03-18 12:00:00 UTC"
        );
    }

    #[test]
    fn internal_errors_are_masked() {
        let err = PaymentError::Internal(anyhow!("connection refused on 10.0.0.3:5432"));

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            public_message(err.status_code(), &err),
            "Internal server error"
        );
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            CatalogError::BookNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BorrowingError::InventoryExhausted.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PaymentError::SessionNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PaymentError::GatewayUnavailable(anyhow!("timeout"))
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            BorrowingError::ChargeTooLarge {
                amount: rust_decimal_macros::dec!(100050.00),
                limit: rust_decimal_macros::dec!(99999.99),
            }
            .into_response()
            .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
