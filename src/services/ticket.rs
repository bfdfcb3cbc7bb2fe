//! Support tickets

use tracing::{info, warn};
use crate::database::DatabaseService;
use crate::models::ticket::{OpenTicketRequest, Ticket, TicketMessage};
use crate::models::user::User;
use crate::services::auth::{AuthService, Permission};
use crate::services::notification::{params, NotificationService};
use crate::utils::errors::{ScholarDeskError, Result};
use crate::utils::helpers::{generate_reference_code, page_bounds, require_text, truncate_text};
use crate::utils::logging::log_status_change;
use crate::workflow::TicketStatus;

const REFERENCE_ATTEMPTS: usize = 5;

pub fn new_reference() -> String {
    format!("TK-{}", generate_reference_code(8))
}

#[derive(Clone, Debug)]
pub struct TicketService {
    db: DatabaseService,
    notifications: NotificationService,
    auth: AuthService,
}

impl TicketService {
    pub fn new(db: DatabaseService, notifications: NotificationService) -> Self {
        Self {
            db,
            notifications,
            auth: AuthService::new(),
        }
    }

    /// Open a ticket with its first message
    pub async fn open(&self, user: &User, request: OpenTicketRequest) -> Result<(Ticket, TicketMessage)> {
        self.auth.require_permission(user, Permission::SelfService)?;
        let request = OpenTicketRequest {
            subject: require_text("Subject", &request.subject)?,
            body: require_text("Message", &request.body)?,
            ..request
        };

        for attempt in 1..=REFERENCE_ATTEMPTS {
            let reference = new_reference();
            match self.db.tickets.open(user.id, &reference, request.clone()).await {
                Ok((ticket, message)) => {
                    info!(ticket_id = ticket.id, reference = %ticket.reference, user_id = user.id, "Ticket opened");
                    return Ok((ticket, message));
                }
                Err(ScholarDeskError::Duplicate(_)) => {
                    warn!(attempt = attempt, reference = %reference, "Ticket reference collision");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ScholarDeskError::ServiceUnavailable(
            "Could not allocate a ticket reference".to_string(),
        ))
    }

    pub async fn get(&self, actor: &User, ticket_id: i64) -> Result<Ticket> {
        let ticket = self.db.tickets.find_by_id(ticket_id).await?
            .ok_or(ScholarDeskError::TicketNotFound { ticket_id })?;
        self.auth.require_owner_or(actor, ticket.user_id, Permission::AnswerTickets)?;
        Ok(ticket)
    }

    pub async fn find_by_reference(&self, actor: &User, reference: &str) -> Result<Ticket> {
        let reference = reference.trim().to_uppercase();
        let ticket = self.db.tickets.find_by_reference(&reference).await?
            .ok_or_else(|| ScholarDeskError::InvalidInput(format!("Unknown ticket reference {}", reference)))?;
        self.auth.require_owner_or(actor, ticket.user_id, Permission::AnswerTickets)?;
        Ok(ticket)
    }

    /// Add a message from the owner or from staff; staff replies notify the owner
    pub async fn reply(&self, actor: &User, ticket_id: i64, body: String) -> Result<(Ticket, TicketMessage)> {
        let ticket = self.get(actor, ticket_id).await?;
        let body = require_text("Message", &body)?;
        let from_staff = actor.id != ticket.user_id;

        let next = ticket.status.after_reply(from_staff).ok_or_else(|| {
            ScholarDeskError::InvalidInput(format!("Ticket {} is closed", ticket.reference))
        })?;

        let (updated, message) = self.db.tickets
            .add_message(ticket_id, ticket.status, next, actor.id, from_staff, body)
            .await?;

        if ticket.status != next {
            log_status_change("ticket", ticket_id, ticket.status.as_str(), next.as_str(), actor.id);
        }

        if from_staff {
            if let Ok(Some(owner)) = self.db.users.find_by_id(ticket.user_id).await {
                let parameters = params([
                    ("reference", updated.reference.clone()),
                    ("excerpt", truncate_text(&message.body, 120)),
                ]);
                self.notifications.notify(&owner, "ticket_reply", &parameters).await;
            }
        }

        Ok((updated, message))
    }

    pub async fn close(&self, actor: &User, ticket_id: i64) -> Result<Ticket> {
        self.set_status(actor, ticket_id, TicketStatus::Closed).await
    }

    pub async fn reopen(&self, actor: &User, ticket_id: i64) -> Result<Ticket> {
        self.set_status(actor, ticket_id, TicketStatus::Open).await
    }

    async fn set_status(&self, actor: &User, ticket_id: i64, to: TicketStatus) -> Result<Ticket> {
        let ticket = self.get(actor, ticket_id).await?;
        if !ticket.status.can_transition_to(to) {
            return Err(ScholarDeskError::transition(ticket.status, to));
        }

        let updated = self.db.tickets.set_status(ticket_id, ticket.status, to).await?;
        log_status_change("ticket", ticket_id, ticket.status.as_str(), to.as_str(), actor.id);
        Ok(updated)
    }

    pub async fn messages(&self, actor: &User, ticket_id: i64) -> Result<Vec<TicketMessage>> {
        self.get(actor, ticket_id).await?;
        self.db.tickets.list_messages(ticket_id).await
    }

    pub async fn list_mine(&self, user: &User) -> Result<Vec<Ticket>> {
        self.db.tickets.list_for_user(user.id).await
    }

    pub async fn list_by_status(&self, staff: &User, status: TicketStatus, limit: i64, offset: i64) -> Result<Vec<Ticket>> {
        self.auth.require_permission(staff, Permission::AnswerTickets)?;
        let (limit, offset) = page_bounds(limit, offset)?;
        self.db.tickets.list_by_status(status, limit, offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_format() {
        let reference = new_reference();
        assert_eq!(reference.len(), 11);
        assert!(reference.starts_with("TK-"));
        assert!(reference[3..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
