use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::{
    auth::{jwt::TokenError, payload::PayloadError, repo::StoreError},
    sms::SmsError,
};

/// Failures of the auth operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Phone number already registered")]
    DuplicatePhone,
    #[error("Invalid phone number or password")]
    InvalidCredentials,
    #[error("Phone number not found")]
    PhoneNotFound,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("Invalid admin credentials")]
    InvalidAdminCredentials,
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    InvalidBody(#[from] PayloadError),
    #[error("{0}")]
    Delivery(#[from] SmsError),
    #[error("{0}")]
    Store(StoreError),
    #[error("{0}")]
    Token(#[from] TokenError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicatePhone => AuthError::DuplicatePhone,
            other => AuthError::Store(other),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::DuplicatePhone
            | AuthError::InvalidCredentials
            | AuthError::PhoneNotFound
            | AuthError::InvalidOrExpiredToken
            | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidBody(e) => e.status(),
            AuthError::InvalidAdminCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Delivery(_) | AuthError::Store(_) | AuthError::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn during(self, op: Operation) -> ApiError {
        ApiError { op, source: self }
    }
}

/// The endpoint an error came from. Decides the 500 wording and whether the
/// body carries a `success` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Login,
    ForgotPassword,
    ResetPassword,
    AdminLogin,
    Profile,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Operation::Register => "Registration failed",
            Operation::Login => "Login failed",
            Operation::ForgotPassword => "Failed to send reset password link",
            Operation::ResetPassword => "Password reset failed",
            Operation::AdminLogin => "Admin login failed",
            Operation::Profile => "Failed to load profile",
        }
    }

    fn reports_success(self) -> bool {
        matches!(self, Operation::AdminLogin)
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub op: Operation,
    pub source: AuthError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.source.status();
        let mut body = if status.is_server_error() {
            error!(op = ?self.op, error = %self.source, "request failed");
            json!({
                "message": self.op.failure_message(),
                "error": self.source.to_string(),
            })
        } else {
            json!({ "message": self.source.to_string() })
        };
        if self.op.reports_success() {
            body["success"] = json!(false);
        }
        (status, Json(body)).into_response()
    }
}
