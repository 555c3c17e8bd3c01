use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Domain errors surfaced to the HTTP layer.
///
/// Credential and token failures deliberately carry generic messages so that
/// responses do not reveal whether an account exists. Validation and
/// permission errors may be specific.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("You are not logged in. Please log in to get access")]
    Unauthenticated,
    #[error("Your current password is wrong")]
    IncorrectPassword,
    #[error("You do not have permission to perform this action")]
    Forbidden,
    #[error("This account has been deactivated")]
    AccountDeactivated,
    #[error("Token is invalid or has expired")]
    InvalidOrExpiredToken,
    #[error("Email already registered")]
    EmailTaken,
    #[error("{0} does not exist")]
    NotFound(&'static str),
    #[error("There was an error sending the email. Try again later")]
    MailDelivery,
    #[error(transparent)]
    Store(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::Unauthenticated
            | ApiError::IncorrectPassword => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::AccountDeactivated => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::EmailTaken => StatusCode::CONFLICT,
            ApiError::MailDelivery => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Store(e) => {
                error!(error = %e, "store error");
                "Something went wrong".to_string()
            }
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                "Something went wrong".to_string()
            }
            _ => self.to_string(),
        };
        let body = ErrorBody {
            status: if status.is_server_error() { "error" } else { "fail" },
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::AccountDeactivated.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::InvalidOrExpiredToken.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::EmailTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NotFound("User").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::MailDelivery.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn credential_errors_are_generic() {
        // Unknown email and wrong password must be indistinguishable.
        assert_eq!(
            ApiError::InvalidCredentials.to_string(),
            "Incorrect email or password"
        );
    }

    #[test]
    fn store_errors_hide_details() {
        let err = ApiError::Store(sqlx::Error::PoolClosed);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
