use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Task record. Every query is scoped by `user_id`; a task is only ever
/// visible to its owner.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: OffsetDateTime,
}

impl Task {
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, description, completed, created_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .fetch_one(db)
        .await?;
        Ok(task)
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, completed, created_at
            FROM tasks
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(tasks)
    }

    pub async fn find_by_id(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<Option<Task>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, completed, created_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(task)
    }

    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        completed: Option<bool>,
    ) -> Result<Option<Task>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                completed = COALESCE($5, completed)
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, completed, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(completed)
        .fetch_optional(db)
        .await?;
        Ok(task)
    }

    pub async fn mark_complete(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<Option<Task>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET completed = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, completed, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(task)
    }

    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM tasks WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_id_is_not_serialized() {
        let task = Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Buy milk".into(),
            description: None,
            completed: false,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("Buy milk"));
        assert!(!json.contains("user_id"));
    }
}
