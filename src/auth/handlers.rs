use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AdminLoginRequest, AdminLoginResponse, AdminSessionResponse, ForgotPasswordRequest,
            LoginRequest, LoginResponse, MessageResponse, ProfileResponse, RegisterRequest,
            RegisterResponse, ResetPasswordRequest,
        },
        extractors::{AdminUser, AuthUser, Guard, GuardError, GuardRejection},
        payload::{Payload, PayloadError},
        services,
    },
    error::{ApiError, AuthError, Operation},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/:reset_token", post(reset_password))
        .route("/auth/admin-login", post(admin_login))
        .route("/auth/me", get(get_me))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/me", get(admin_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Payload<RegisterRequest>, PayloadError>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Payload(payload) =
        payload.map_err(|e| AuthError::from(e).during(Operation::Register))?;
    let user = services::register(&state, &payload.phone, &payload.password, payload.name)
        .await
        .map_err(|e| e.during(Operation::Register))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user_id: user.id,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Payload<LoginRequest>, PayloadError>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Payload(payload) = payload.map_err(|e| AuthError::from(e).during(Operation::Login))?;
    let token = services::login(&state, &payload.phone, &payload.password)
        .await
        .map_err(|e| e.during(Operation::Login))?;

    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
    }))
}

#[instrument(skip(state, headers, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Payload<ForgotPasswordRequest>, PayloadError>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Payload(payload) =
        payload.map_err(|e| AuthError::from(e).during(Operation::ForgotPassword))?;
    let base_url = public_base_url(&state, &headers);
    services::forgot_password(&state, &payload.phone, &base_url)
        .await
        .map_err(|e| e.during(Operation::ForgotPassword))?;

    Ok(Json(MessageResponse {
        message: "Password reset link sent to your phone via SMS",
    }))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    payload: Result<Payload<ResetPasswordRequest>, PayloadError>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Payload(payload) =
        payload.map_err(|e| AuthError::from(e).during(Operation::ResetPassword))?;
    services::reset_password(&state, &reset_token, &payload.new_password)
        .await
        .map_err(|e| e.during(Operation::ResetPassword))?;

    Ok(Json(MessageResponse {
        message: "Password reset successful",
    }))
}

#[instrument(skip(state, payload))]
pub async fn admin_login(
    State(state): State<AppState>,
    payload: Result<Payload<AdminLoginRequest>, PayloadError>,
) -> Result<Json<AdminLoginResponse>, ApiError> {
    let Payload(payload) =
        payload.map_err(|e| AuthError::from(e).during(Operation::AdminLogin))?;
    let token = services::admin_login(&state, &payload.email, &payload.password)
        .await
        .map_err(|e| e.during(Operation::AdminLogin))?;

    Ok(Json(AdminLoginResponse {
        success: true,
        message: "Admin login successful",
        token,
    }))
}

#[instrument(skip_all)]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ProfileResponse>, axum::response::Response> {
    use axum::response::IntoResponse;

    // admin tokens pass the user guard but have no profile
    let user_id = claims.user_id.ok_or_else(|| {
        GuardRejection {
            guard: Guard::User,
            error: GuardError::InvalidToken,
        }
        .into_response()
    })?;

    let user = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(|e| AuthError::from(e).during(Operation::Profile).into_response())?
        .ok_or_else(|| {
            GuardRejection {
                guard: Guard::User,
                error: GuardError::InvalidToken,
            }
            .into_response()
        })?;

    Ok(Json(ProfileResponse { user: user.into() }))
}

#[instrument(skip_all)]
pub async fn admin_me(AdminUser(claims): AdminUser) -> Json<AdminSessionResponse> {
    Json(AdminSessionResponse {
        success: true,
        admin_email: claims.admin_email.unwrap_or_default(),
    })
}

/// `PUBLIC_BASE_URL` when configured, otherwise rebuilt from the Host header.
fn public_base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.config.public_base_url {
        return base.clone();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}
