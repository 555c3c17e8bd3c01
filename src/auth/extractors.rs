use std::future::Future;
use std::pin::Pin;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{
    auth::jwt::{JwtKeys, TokenError},
    error::ApiError,
    state::AppState,
    users::repo::{Role, User},
};

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const USER_ONLY: &[Role] = &[Role::User];

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or(ApiError::Unauthenticated)
}

/// Authentication middleware. Verifies the bearer token, resolves the user it
/// names and stashes the user in request extensions for handlers downstream.
///
/// Check order: token integrity and expiry first (no store lookup), then the
/// principal lookup, then staleness against `password_changed_at`, then the
/// active flag.
pub async fn protect(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "rejected session token");
        ApiError::Unauthenticated
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "token for nonexistent user");
            ApiError::Unauthenticated
        })?;

    if user.changed_password_after(claims.iat as i64) {
        warn!(user_id = %user.id, error = %TokenError::Stale, "rejected session token");
        return Err(ApiError::Unauthenticated);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "deactivated account");
        return Err(ApiError::AccountDeactivated);
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub fn role_allowed(allowed: &[Role], role: Role) -> bool {
    allowed.contains(&role)
}

/// Role-gate middleware factory, layered inside `protect` on routes that
/// require specific roles. Requests that never passed `protect` carry no
/// resolved user and fail as unauthenticated.
pub fn restrict_to(
    allowed: &'static [Role],
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send>>
       + Clone
       + Send
       + Sync
       + 'static {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<User>()
                .ok_or(ApiError::Unauthenticated)?;
            if !role_allowed(allowed, user.role) {
                warn!(user_id = %user.id, role = ?user.role, "role not permitted");
                return Err(ApiError::Forbidden);
            }
            Ok(next.run(req).await)
        })
    }
}

/// The user resolved by `protect`, for handlers on protected routes.
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_requires_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            bearer_token(&headers),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn bearer_token_requires_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert!(matches!(
            bearer_token(&headers),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn bearer_token_extracts_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn role_sets_admit_and_reject() {
        assert!(role_allowed(ADMIN_ONLY, Role::Admin));
        assert!(!role_allowed(ADMIN_ONLY, Role::User));
        assert!(role_allowed(USER_ONLY, Role::User));
        assert!(!role_allowed(USER_ONLY, Role::Admin));
        assert!(role_allowed(&[Role::User, Role::Admin], Role::Admin));
    }
}
