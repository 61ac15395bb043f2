use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    auth::{
        claims::TokenSubject,
        jwt::TokenService,
        repo_types::{NewUser, User},
    },
    error::AuthError,
    state::AppState,
};

/// Bytes of OS randomness behind each reset token (hex encoded to 64 chars).
pub const RESET_TOKEN_BYTES: usize = 32;

/// Drops the separators people type into phone numbers, so
/// `+1 (555) 123-0000` and `+15551230000` name the same account.
pub(crate) fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !(c.is_whitespace() || matches!(c, '-' | '(' | ')' | '.')))
        .collect()
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{7,15}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn reset_url(base: &str, token: &str) -> String {
    format!("{}/api/auth/reset-password/{}", base.trim_end_matches('/'), token)
}

pub async fn register(
    state: &AppState,
    phone: &str,
    password: &str,
    name: Option<String>,
) -> Result<User, AuthError> {
    let phone = normalize_phone(phone);
    let phone = phone.as_str();
    if !is_valid_phone(phone) {
        return Err(AuthError::Validation("Invalid phone number"));
    }
    if password.is_empty() {
        return Err(AuthError::Validation("Password is required"));
    }

    if state.users.find_by_phone(phone).await?.is_some() {
        warn!(%phone, "phone already registered");
        return Err(AuthError::DuplicatePhone);
    }

    // a concurrent insert that slipped past the lookup surfaces as DuplicatePhone too
    let user = state
        .users
        .create(NewUser {
            phone: phone.to_string(),
            password: password.to_string(),
            name: name.filter(|n| !n.trim().is_empty()),
        })
        .await?;

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Unknown phone and wrong password fail with the same error.
pub async fn login(state: &AppState, phone: &str, password: &str) -> Result<String, AuthError> {
    let phone = normalize_phone(phone);
    let Some(user) = state.users.find_by_phone(&phone).await? else {
        warn!("login unknown phone");
        return Err(AuthError::InvalidCredentials);
    };

    if !state.users.verify_password(&user, password)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let tokens = TokenService::new(&state.config.jwt);
    let token = tokens.issue(&TokenSubject::User(user.id))?;
    info!(user_id = %user.id, "user logged in");
    Ok(token)
}

/// Arms a reset token and texts the link to the user.
///
/// The token is persisted before the SMS goes out and is left in place if
/// delivery fails; requesting again replaces it.
pub async fn forgot_password(state: &AppState, phone: &str, base_url: &str) -> Result<(), AuthError> {
    let phone = normalize_phone(phone);
    let Some(mut user) = state.users.find_by_phone(&phone).await? else {
        warn!("reset requested for unknown phone");
        return Err(AuthError::PhoneNotFound);
    };

    let token = generate_reset_token();
    let expires_at =
        OffsetDateTime::now_utc() + Duration::minutes(state.config.reset_token_ttl_minutes);
    user.start_reset(token.clone(), expires_at);
    state.users.save(&user, None).await?;

    let body = format!(
        "Reset your password using this link: {}",
        reset_url(base_url, &token)
    );
    state.sms.send_sms(&user.phone, &body).await?;

    info!(user_id = %user.id, "password reset link sent");
    Ok(())
}

/// Consumes a live reset token: sets the new password and clears the token.
pub async fn reset_password(
    state: &AppState,
    reset_token: &str,
    new_password: &str,
) -> Result<(), AuthError> {
    if new_password.is_empty() {
        return Err(AuthError::Validation("New password is required"));
    }

    let Some(user) = state
        .users
        .consume_reset_token(reset_token, new_password)
        .await?
    else {
        warn!("invalid or expired reset token");
        return Err(AuthError::InvalidOrExpiredToken);
    };

    info!(user_id = %user.id, "password reset");
    Ok(())
}

/// Both fields are always compared so a mismatch looks the same either way.
pub async fn admin_login(state: &AppState, email: &str, password: &str) -> Result<String, AuthError> {
    let admin = &state.config.admin;
    let email_ok = email == admin.email;
    let password_ok = password == admin.password;
    if !(email_ok & password_ok) {
        warn!("admin login rejected");
        return Err(AuthError::InvalidAdminCredentials);
    }

    let tokens = TokenService::new(&state.config.jwt);
    let token = tokens.issue(&TokenSubject::Admin(admin.email.clone()))?;
    info!("admin logged in");
    Ok(token)
}
