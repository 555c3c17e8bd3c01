use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// User record in the database.
///
/// `password_hash` and the reset-token fields never leave the server;
/// `reset_token_hash` and `reset_token_expires_at` are either both set or
/// both null.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_changed_at: OffsetDateTime,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// True if the password changed after a token with the given issued-at
    /// timestamp was signed. Such tokens are stale and must be rejected.
    pub fn changed_password_after(&self, token_iat: i64) -> bool {
        token_iat < self.password_changed_at.unix_timestamp()
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, password_changed_at, role, is_active,
                   reset_token_hash, reset_token_expires_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, password_changed_at, role, is_active,
                   reset_token_hash, reset_token_expires_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with a hashed password. Role and active flag always
    /// take their defaults; neither is client-settable.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, password_changed_at, role, is_active,
                      reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn list(db: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, password_changed_at, role, is_active,
                   reset_token_hash, reset_token_expires_at, created_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    pub async fn update_name(db: &PgPool, id: Uuid, name: &str) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2
            WHERE id = $1
            RETURNING id, name, email, password_hash, password_changed_at, role, is_active,
                      reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Set a new password and bump `password_changed_at`, which invalidates
    /// every previously issued session token. Any outstanding reset token is
    /// cleared in the same statement.
    pub async fn update_password(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = now(),
                reset_token_hash = NULL,
                reset_token_expires_at = NULL
            WHERE id = $1
            RETURNING id, name, email, password_hash, password_changed_at, role, is_active,
                      reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Store the hash of a freshly generated reset secret. Overwrites any
    /// prior secret, so only the newest one is ever consumable.
    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_token_hash = $2, reset_token_expires_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn find_by_unexpired_reset_hash(
        db: &PgPool,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, password_changed_at, role, is_active,
                   reset_token_hash, reset_token_expires_at, created_at
            FROM users
            WHERE reset_token_hash = $1 AND reset_token_expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Consume a reset secret: one conditional update that re-checks the
    /// stored hash and expiry, swaps in the new password hash, bumps
    /// `password_changed_at` and clears both reset fields. Of two concurrent
    /// consumers with the same secret, at most one can match the WHERE clause.
    pub async fn consume_reset_token(
        db: &PgPool,
        token_hash: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = now(),
                reset_token_hash = NULL,
                reset_token_expires_at = NULL
            WHERE reset_token_hash = $1 AND reset_token_expires_at > $3
            RETURNING id, name, email, password_hash, password_changed_at, role, is_active,
                      reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(token_hash)
        .bind(new_password_hash)
        .bind(now)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Soft delete: the account stays on record but can no longer log in or
    /// pass the auth middleware.
    pub async fn deactivate(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(r#"UPDATE users SET is_active = FALSE WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Hard delete, admin only. Returns false if the user did not exist.
    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn user_with_password_changed_at(changed_at: OffsetDateTime) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            password_changed_at: changed_at,
            role: Role::User,
            is_active: true,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: changed_at,
        }
    }

    #[test]
    fn token_issued_before_password_change_is_stale() {
        let changed_at = OffsetDateTime::now_utc();
        let user = user_with_password_changed_at(changed_at);
        let iat_before = (changed_at - Duration::hours(1)).unix_timestamp();
        assert!(user.changed_password_after(iat_before));
    }

    #[test]
    fn token_issued_at_or_after_password_change_is_fresh() {
        let changed_at = OffsetDateTime::now_utc();
        let user = user_with_password_changed_at(changed_at);
        assert!(!user.changed_password_after(changed_at.unix_timestamp()));
        let iat_after = (changed_at + Duration::seconds(30)).unix_timestamp();
        assert!(!user.changed_password_after(iat_after));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = user_with_password_changed_at(OffsetDateTime::now_utc());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("reset_token_hash"));
        assert!(json.contains("ada@example.com"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }
}
