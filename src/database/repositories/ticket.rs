//! Support ticket repository

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::database::connection::is_unique_violation;
use crate::models::ticket::{Ticket, TicketMessage, OpenTicketRequest};
use crate::utils::errors::ScholarDeskError;
use crate::workflow::TicketStatus;

const TICKET_COLUMNS: &str =
    "id, reference, user_id, subject, category, status, last_activity_at, closed_at, created_at";
const MESSAGE_COLUMNS: &str = "id, ticket_id, author_id, body, from_staff, created_at";

#[derive(Clone, Debug)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a ticket together with its first message
    pub async fn open(&self, user_id: i64, reference: &str, request: OpenTicketRequest) -> Result<(Ticket, TicketMessage), ScholarDeskError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let sql = format!(
            r#"
            INSERT INTO tickets (reference, user_id, subject, category, status, last_activity_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {TICKET_COLUMNS}
            "#
        );
        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(reference)
            .bind(user_id)
            .bind(request.subject)
            .bind(request.category)
            .bind(TicketStatus::Open)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ScholarDeskError::Duplicate(format!("ticket reference {}", reference))
                } else {
                    e.into()
                }
            })?;

        let sql = format!(
            r#"
            INSERT INTO ticket_messages (ticket_id, author_id, body, from_staff, created_at)
            VALUES ($1, $2, $3, false, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let message = sqlx::query_as::<_, TicketMessage>(&sql)
            .bind(ticket.id)
            .bind(user_id)
            .bind(request.body)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((ticket, message))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Ticket>, ScholarDeskError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    pub async fn find_by_reference(&self, reference: &str) -> Result<Option<Ticket>, ScholarDeskError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE reference = $1");
        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    /// Append a message and move the ticket to `next` in one transaction.
    /// Fails with a transition error if the ticket left `current` meanwhile.
    pub async fn add_message(
        &self,
        ticket_id: i64,
        current: TicketStatus,
        next: TicketStatus,
        author_id: i64,
        from_staff: bool,
        body: String,
    ) -> Result<(Ticket, TicketMessage), ScholarDeskError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let sql = format!(
            r#"
            UPDATE tickets SET status = $3, last_activity_at = $4
            WHERE id = $1 AND status = $2
            RETURNING {TICKET_COLUMNS}
            "#
        );
        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(ticket_id)
            .bind(current)
            .bind(next)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ScholarDeskError::transition(current, next))?;

        let sql = format!(
            r#"
            INSERT INTO ticket_messages (ticket_id, author_id, body, from_staff, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
            "#
        );
        let message = sqlx::query_as::<_, TicketMessage>(&sql)
            .bind(ticket_id)
            .bind(author_id)
            .bind(body)
            .bind(from_staff)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((ticket, message))
    }

    /// Guarded status change; `closed_at` follows the closed state
    pub async fn set_status(&self, ticket_id: i64, from: TicketStatus, to: TicketStatus) -> Result<Ticket, ScholarDeskError> {
        let sql = format!(
            r#"
            UPDATE tickets
            SET status = $3,
                last_activity_at = $4,
                closed_at = CASE WHEN $3 = 'closed' THEN $4 ELSE NULL END
            WHERE id = $1 AND status = $2
            RETURNING {TICKET_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Ticket>(&sql)
            .bind(ticket_id)
            .bind(from)
            .bind(to)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ScholarDeskError::transition(from, to))
    }

    pub async fn list_messages(&self, ticket_id: i64) -> Result<Vec<TicketMessage>, ScholarDeskError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM ticket_messages WHERE ticket_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let messages = sqlx::query_as::<_, TicketMessage>(&sql)
            .bind(ticket_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(messages)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Ticket>, ScholarDeskError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE user_id = $1 ORDER BY last_activity_at DESC"
        );
        let tickets = sqlx::query_as::<_, Ticket>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    /// Staff queue, oldest activity first
    pub async fn list_by_status(&self, status: TicketStatus, limit: i64, offset: i64) -> Result<Vec<Ticket>, ScholarDeskError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE status = $1 ORDER BY last_activity_at ASC LIMIT $2 OFFSET $3"
        );
        let tickets = sqlx::query_as::<_, Ticket>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    /// Close answered tickets with no activity since `idle_before`
    pub async fn close_idle(&self, idle_before: DateTime<Utc>) -> Result<u64, ScholarDeskError> {
        let result = sqlx::query(
            r#"
            UPDATE tickets SET status = $1, closed_at = $3
            WHERE status = $2 AND last_activity_at < $4
            "#
        )
        .bind(TicketStatus::Closed)
        .bind(TicketStatus::Answered)
        .bind(Utc::now())
        .bind(idle_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
