// src/db/ticketdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::{complete_status_counts, db::DBClient, StoreError};
use crate::models::ticketmodel::*;

#[async_trait]
pub trait TicketExt {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError>;

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError>;

    /// Every ticket, newest first.
    async fn get_tickets(&self) -> Result<Vec<Ticket>, StoreError>;

    async fn get_tickets_by_owner(&self, owner: Uuid) -> Result<Vec<Ticket>, StoreError>;

    async fn get_tickets_by_assignee(&self, assignee: Uuid) -> Result<Vec<Ticket>, StoreError>;

    async fn update_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError>;

    /// Writes assignee and status together.
    async fn update_ticket_assignment(
        &self,
        ticket_id: Uuid,
        assigned_to: Option<Uuid>,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError>;

    async fn update_ticket_rating(
        &self,
        ticket_id: Uuid,
        rating: Rating,
    ) -> Result<Option<Ticket>, StoreError>;

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError>;

    /// Inserts the comment and appends its id to the ticket's comment list.
    /// Returns `None` when the ticket does not exist.
    async fn add_comment(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        text: String,
    ) -> Result<Option<Comment>, StoreError>;

    /// Comments of a ticket in the order they were appended.
    async fn get_ticket_comments(&self, ticket: &Ticket) -> Result<Vec<Comment>, StoreError>;

    async fn count_tickets_by_status(&self) -> Result<Vec<StatusCount>, StoreError>;
}

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    subject: String,
    description: String,
    priority: TicketPriority,
    status: TicketStatus,
    owner_id: Uuid,
    assigned_to: Option<Uuid>,
    comment_ids: Vec<Uuid>,
    attachments: Json<Vec<Attachment>>,
    rating_stars: Option<i16>,
    rating_feedback: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Ticket {
            id: row.id,
            subject: row.subject,
            description: row.description,
            priority: row.priority,
            status: row.status,
            owner: row.owner_id,
            assigned_to: row.assigned_to,
            comments: row.comment_ids,
            attachments: row.attachments.0,
            rating: row.rating_stars.map(|stars| Rating {
                stars,
                feedback: row.rating_feedback,
            }),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const TICKET_COLUMNS: &str = r#"
    id, subject, description, priority, status, owner_id, assigned_to,
    comment_ids, attachments, rating_stars, rating_feedback, created_at, updated_at
"#;

#[async_trait]
impl TicketExt for DBClient {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            INSERT INTO tickets (id, subject, description, priority, status, owner_id, attachments)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(ticket.subject.trim())
        .bind(&ticket.description)
        .bind(ticket.priority)
        .bind(TicketStatus::Open)
        .bind(ticket.owner)
        .bind(Json(&ticket.attachments))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM tickets WHERE id = $1",
            TICKET_COLUMNS
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Ticket::from))
    }

    async fn get_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM tickets ORDER BY created_at DESC",
            TICKET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn get_tickets_by_owner(&self, owner: Uuid) -> Result<Vec<Ticket>, StoreError> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM tickets WHERE owner_id = $1 ORDER BY created_at DESC",
            TICKET_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn get_tickets_by_assignee(&self, assignee: Uuid) -> Result<Vec<Ticket>, StoreError> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM tickets WHERE assigned_to = $1 ORDER BY created_at DESC",
            TICKET_COLUMNS
        ))
        .bind(assignee)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn update_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            UPDATE tickets
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(status)
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Ticket::from))
    }

    async fn update_ticket_assignment(
        &self,
        ticket_id: Uuid,
        assigned_to: Option<Uuid>,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            UPDATE tickets
            SET assigned_to = $1, status = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(assigned_to)
        .bind(status)
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Ticket::from))
    }

    async fn update_ticket_rating(
        &self,
        ticket_id: Uuid,
        rating: Rating,
    ) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r#"
            UPDATE tickets
            SET rating_stars = $1, rating_feedback = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(rating.stars)
        .bind(rating.feedback)
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Ticket::from))
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "DELETE FROM tickets WHERE id = $1 RETURNING {}",
            TICKET_COLUMNS
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Ticket::from))
    }

    async fn add_comment(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        text: String,
    ) -> Result<Option<Comment>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM tickets WHERE id = $1 FOR UPDATE")
                .bind(ticket_id)
                .fetch_optional(&mut *tx)
                .await?;

        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, ticket_id, user_id, text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ticket_id, user_id, text, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ticket_id)
        .bind(user_id)
        .bind(text)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE tickets
            SET comment_ids = array_append(comment_ids, $1), updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(comment.id)
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(comment))
    }

    async fn get_ticket_comments(&self, ticket: &Ticket) -> Result<Vec<Comment>, StoreError> {
        if ticket.comments.is_empty() {
            return Ok(Vec::new());
        }

        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.ticket_id, c.user_id, c.text, c.created_at
            FROM unnest($1::uuid[]) WITH ORDINALITY AS ids(id, position)
            JOIN comments c ON c.id = ids.id
            ORDER BY ids.position
            "#,
        )
        .bind(&ticket.comments)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn count_tickets_by_status(&self) -> Result<Vec<StatusCount>, StoreError> {
        let counts = sqlx::query_as::<_, (TicketStatus, i64)>(
            "SELECT status, COUNT(*) FROM tickets GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(complete_status_counts(counts))
    }
}
