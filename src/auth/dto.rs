use serde::{Deserialize, Serialize};

use crate::users::dto::PublicUser;

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Response returned after signup, login, password reset and password update.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo::Role;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn auth_response_never_contains_hashes() {
        let response = AuthResponse {
            token: "jwt".into(),
            user: PublicUser {
                id: Uuid::new_v4(),
                name: "Ada".into(),
                email: "ada@example.com".into(),
                role: Role::User,
                created_at: OffsetDateTime::now_utc(),
            },
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("ada@example.com"));
        assert!(!json.contains("password"));
    }
}
