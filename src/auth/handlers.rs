use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
            SignupRequest, StatusMessage, UpdatePasswordRequest,
        },
        extractors::CurrentUser,
        jwt::JwtKeys,
        password,
        reset::{generate_reset_token, hash_reset_token},
    },
    email::reset_url,
    error::ApiError,
    state::AppState,
    users::{dto::PublicUser, repo::User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_password_strength(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if payload.name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    check_password_strength(&payload.password)?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::EmailTaken);
    }

    let hash = password::hash_blocking(payload.password).await?;
    let user = User::create(&state.db, &payload.name, &payload.email, &hash).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            // Burn one argon2 verification anyway so unknown emails cost the
            // same as wrong passwords.
            let _ = password::verify_blocking(payload.password, password::DUMMY_HASH.into()).await;
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let ok = password::verify_blocking(payload.password, user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login to deactivated account");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(user),
    }))
}

/// Bearer tokens are stateless; nothing is revoked server-side. The route
/// exists so clients have a uniform logout call to drop their token against.
#[instrument(skip_all)]
pub async fn logout(CurrentUser(user): CurrentUser) -> Json<StatusMessage> {
    info!(user_id = %user.id, "user logged out");
    Json(StatusMessage::success("Logged out"))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let accepted = StatusMessage::success(
        "If an account with that email exists, a password reset link has been sent",
    );

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "password reset for unknown email");
        return Ok(Json(accepted));
    };

    let (token, token_hash) = generate_reset_token()?;
    let expires_at =
        OffsetDateTime::now_utc() + Duration::minutes(state.config.reset_token_ttl_minutes);
    User::set_reset_token(&state.db, user.id, &token_hash, expires_at).await?;

    let url = reset_url(&state.config.public_base_url, &token);
    if let Err(e) = state
        .mailer
        .send_password_reset(&user.email, &user.name, &url)
        .await
    {
        // The token is already persisted and stays valid; the caller must
        // still learn that no email went out.
        error!(error = %e, user_id = %user.id, "password reset email failed");
        return Err(ApiError::MailDelivery);
    }

    info!(user_id = %user.id, "password reset email queued");
    Ok(Json(accepted))
}

#[instrument(skip(state, payload, token))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    check_password_strength(&payload.password)?;

    let token_hash = hash_reset_token(&token);
    let now = OffsetDateTime::now_utc();

    // Cheap existence check before paying for the argon2 hash.
    if User::find_by_unexpired_reset_hash(&state.db, &token_hash, now)
        .await?
        .is_none()
    {
        warn!("reset token not found or expired");
        return Err(ApiError::InvalidOrExpiredToken);
    }

    let new_hash = password::hash_blocking(payload.password).await?;

    // Conditional update; a concurrent consumer of the same secret loses here.
    let user = User::consume_reset_token(&state.db, &token_hash, &new_hash, now)
        .await?
        .ok_or(ApiError::InvalidOrExpiredToken)?;

    let keys = JwtKeys::from_ref(&state);
    let jwt = keys.sign(user.id)?;

    info!(user_id = %user.id, "password reset completed");
    Ok(Json(AuthResponse {
        token: jwt,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    check_password_strength(&payload.new_password)?;

    // A hijacked session token alone must not be enough to change the password.
    let ok =
        password::verify_blocking(payload.current_password, user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "update password with wrong current password");
        return Err(ApiError::IncorrectPassword);
    }

    let new_hash = password::hash_blocking(payload.new_password).await?;
    let user = User::update_password(&state.db, user.id, &new_hash)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    // Older tokens are now stale; hand back a fresh one.
    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, "password updated");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn password_strength() {
        assert!(check_password_strength("Secret123").is_ok());
        assert!(check_password_strength("short").is_err());
        assert!(check_password_strength("").is_err());
    }
}
