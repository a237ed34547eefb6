use async_trait::async_trait;
use uuid::Uuid;

use super::{db::DBClient, StoreError};
use crate::models::usermodel::{normalize_email, User, UserRole};

/// Outcome of removing a user together with everything that hangs off them.
#[derive(Debug, Clone)]
pub struct UserDeletion {
    pub user: User,
    pub tickets_deleted: u64,
    pub comments_deleted: u64,
}

#[async_trait]
pub trait UserExt {
    /// Looks a user up by id, or by email when no id is given. A role, when
    /// present, is part of the email lookup key.
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
        role: Option<UserRole>,
    ) -> Result<Option<User>, StoreError>;

    async fn get_users(&self) -> Result<Vec<User>, StoreError>;

    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    async fn get_users_by_role(&self, role: UserRole) -> Result<Vec<User>, StoreError>;

    async fn save_user(
        &self,
        name: String,
        email: String,
        password: String,
        role: UserRole,
    ) -> Result<User, StoreError>;

    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, StoreError>;

    /// Removes the user, every ticket they own or are assigned to, the
    /// comments on those tickets and every comment they wrote.
    async fn delete_user_cascade(&self, user_id: Uuid) -> Result<Option<UserDeletion>, StoreError>;
}

const USER_COLUMNS: &str = r#"id, name, email, password, role, created_at, updated_at"#;

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
        role: Option<UserRole>,
    ) -> Result<Option<User>, StoreError> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {} FROM users WHERE id = $1",
                USER_COLUMNS
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            let email = normalize_email(email);
            user = match role {
                Some(role) => {
                    sqlx::query_as::<_, User>(&format!(
                        "SELECT {} FROM users WHERE LOWER(email) = $1 AND role = $2",
                        USER_COLUMNS
                    ))
                    .bind(email)
                    .bind(role)
                    .fetch_optional(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query_as::<_, User>(&format!(
                        "SELECT {} FROM users WHERE LOWER(email) = $1",
                        USER_COLUMNS
                    ))
                    .bind(email)
                    .fetch_optional(&self.pool)
                    .await?
                }
            };
        }

        Ok(user)
    }

    async fn get_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ANY($1)",
            USER_COLUMNS
        ))
        .bind(user_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn get_users_by_role(&self, role: UserRole) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE role = $1 ORDER BY name",
            USER_COLUMNS
        ))
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn save_user(
        &self,
        name: String,
        email: String,
        password: String,
        role: UserRole,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(name.trim())
        .bind(normalize_email(&email))
        .bind(password)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET role = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(role)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn delete_user_cascade(&self, user_id: Uuid) -> Result<Option<UserDeletion>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user) = user else {
            tx.rollback().await?;
            return Ok(None);
        };

        // Comments on the doomed tickets go with them via ON DELETE CASCADE,
        // but they still count towards the report.
        let ticket_comments: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM comments c
            JOIN tickets t ON t.id = c.ticket_id
            WHERE (t.owner_id = $1 OR t.assigned_to = $1) AND c.user_id <> $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let authored: Vec<Uuid> = sqlx::query_scalar(
            "DELETE FROM comments WHERE user_id = $1 RETURNING id",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE tickets
            SET comment_ids = ARRAY(
                SELECT c FROM unnest(comment_ids) AS c WHERE c <> ALL($1)
            )
            WHERE comment_ids && $1
            "#,
        )
        .bind(&authored)
        .execute(&mut *tx)
        .await?;

        let tickets = sqlx::query("DELETE FROM tickets WHERE owner_id = $1 OR assigned_to = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(UserDeletion {
            user,
            tickets_deleted: tickets.rows_affected(),
            comments_deleted: authored.len() as u64 + ticket_comments as u64,
        }))
    }
}
