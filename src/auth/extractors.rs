use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use super::{
    claims::Claims,
    jwt::{TokenError, TokenService},
};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardError {
    NoToken,
    InvalidToken,
    TokenExpired,
    NotAdmin,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    User,
    Admin,
}

#[derive(Debug)]
pub struct GuardRejection {
    pub guard: Guard,
    pub error: GuardError,
}

impl GuardRejection {
    fn status(&self) -> StatusCode {
        match self.error {
            GuardError::NoToken | GuardError::InvalidToken | GuardError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            GuardError::NotAdmin => StatusCode::FORBIDDEN,
            GuardError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match (self.guard, self.error) {
            (Guard::User, GuardError::NoToken) => "Not authorized, no token",
            (Guard::Admin, GuardError::NoToken) => "No token provided, authorization denied",
            (_, GuardError::InvalidToken) => "Invalid token",
            (Guard::User, GuardError::TokenExpired) => "Token expired",
            (Guard::Admin, GuardError::TokenExpired) => "Token expired, please login again",
            (_, GuardError::NotAdmin) => "Not authorized as admin",
            (Guard::User, GuardError::Internal) => "Server authentication error",
            (Guard::Admin, GuardError::Internal) => "Server error during authentication",
        }
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        let body = match self.guard {
            Guard::User => json!({ "message": self.message() }),
            Guard::Admin => json!({ "success": false, "message": self.message() }),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Pulls `<token>` out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn verify_bearer(parts: &Parts, tokens: &TokenService) -> Result<Claims, GuardError> {
    let token = bearer_token(parts).ok_or(GuardError::NoToken)?;
    tokens.verify(token).map_err(|e| match e {
        TokenError::Expired => GuardError::TokenExpired,
        TokenError::Invalid(_) => GuardError::InvalidToken,
        TokenError::Internal(e) => {
            error!(error = %e, "token verification failed");
            GuardError::Internal
        }
    })
}

/// Any validly signed, unexpired token.
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);
        verify_bearer(parts, &tokens)
            .map(AuthUser)
            .map_err(|error| {
                warn!(?error, "user guard rejected request");
                GuardRejection {
                    guard: Guard::User,
                    error,
                }
            })
    }
}

/// A valid token whose `adminEmail` matches the configured admin.
pub struct AdminUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let tokens = TokenService::from_ref(state);
        let reject = |error| {
            warn!(?error, "admin guard rejected request");
            GuardRejection {
                guard: Guard::Admin,
                error,
            }
        };

        let claims = verify_bearer(parts, &tokens).map_err(reject)?;
        if claims.admin_email.as_deref() != Some(state.config.admin.email.as_str()) {
            return Err(reject(GuardError::NotAdmin));
        }
        Ok(AdminUser(claims))
    }
}
