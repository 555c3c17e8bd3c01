use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::{Role, User};

/// Public part of the user returned to clients.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Profile update body. Password changes go through the dedicated
/// update-password route; sending one here is rejected outright.
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Account deactivation requires the password as confirmation.
#[derive(Debug, Deserialize)]
pub struct DeleteMeRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.limit, 20);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn public_user_drops_sensitive_fields() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            password_changed_at: OffsetDateTime::now_utc(),
            role: Role::Admin,
            is_active: true,
            reset_token_hash: Some("hash".into()),
            reset_token_expires_at: Some(OffsetDateTime::now_utc()),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("\"role\":\"admin\""));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("reset_token"));
    }
}
