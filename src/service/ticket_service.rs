// service/ticket_service.rs
use std::{collections::HashMap, str::FromStr, sync::Arc};

use uuid::Uuid;

use crate::{
    db::Store,
    error::ErrorMessage,
    models::{
        ticketmodel::{
            Attachment, Comment, NewTicket, Rating, StatusCount, Ticket, TicketDetails,
            TicketPriority, TicketStatus, UserSummary,
        },
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError,
        lifecycle,
        notification_service::NotificationService,
        policy::{authorize, role_permits, Action, Actor, Denial},
    },
};

pub struct TicketInput {
    pub subject: String,
    pub description: String,
    pub priority: Option<String>,
    pub attachments: Vec<Attachment>,
}

fn parse_status(value: &str) -> Result<TicketStatus, ServiceError> {
    TicketStatus::from_str(value).map_err(ServiceError::Validation)
}

fn comment_text(text: &str) -> Result<String, ServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::Validation("Comment text is required".to_string()));
    }
    Ok(text.to_string())
}

/// Ticket operations for all three roles. Each operation checks the role
/// gate, loads the ticket, checks ownership, applies the lifecycle rule and
/// only then writes. Notifications go out after the write and never affect
/// the result.
#[derive(Clone)]
pub struct TicketService {
    db_client: Arc<dyn Store>,
    notifier: NotificationService,
}

impl TicketService {
    pub fn new(db_client: Arc<dyn Store>, notifier: NotificationService) -> Self {
        Self {
            db_client,
            notifier,
        }
    }

    async fn load_authorized(
        &self,
        actor: &Actor,
        action: Action,
        ticket_id: Uuid,
    ) -> Result<Ticket, ServiceError> {
        if !role_permits(actor.role, action) {
            return Err(Denial::RoleNotPermitted.into());
        }

        let ticket = self
            .db_client
            .get_ticket(ticket_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ErrorMessage::TicketNotFound.to_string()))?;

        authorize(actor, action, Some(&ticket))?;
        Ok(ticket)
    }

    /// Write paths return `None` when the ticket vanished between read and
    /// write.
    fn vanished<T>(value: Option<T>) -> Result<T, ServiceError> {
        value.ok_or_else(|| ServiceError::NotFound(ErrorMessage::TicketNotFound.to_string()))
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(self.db_client.get_user(Some(user_id), None, None).await?)
    }

    async fn populate(&self, ticket: Ticket) -> Result<TicketDetails, ServiceError> {
        let mut details = self.populate_many(vec![ticket]).await?;
        details
            .pop()
            .ok_or_else(|| ServiceError::Internal("populate returned no ticket".to_string()))
    }

    async fn populate_many(&self, tickets: Vec<Ticket>) -> Result<Vec<TicketDetails>, ServiceError> {
        let mut ids: Vec<Uuid> = tickets
            .iter()
            .flat_map(|t| std::iter::once(t.owner).chain(t.assigned_to))
            .collect();
        ids.sort();
        ids.dedup();

        let users: HashMap<Uuid, UserSummary> = self
            .db_client
            .get_users_by_ids(&ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();

        let mut details = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let comments = self.db_client.get_ticket_comments(&ticket).await?;
            details.push(TicketDetails {
                id: ticket.id,
                subject: ticket.subject,
                description: ticket.description,
                priority: ticket.priority,
                status: ticket.status,
                owner: users.get(&ticket.owner).cloned(),
                assigned_to: ticket.assigned_to.and_then(|id| users.get(&id).cloned()),
                comments,
                attachments: ticket.attachments,
                rating: ticket.rating,
                created_at: ticket.created_at,
                updated_at: ticket.updated_at,
            });
        }

        Ok(details)
    }

    fn notify_owner_of_status(&self, owner: Option<User>, ticket: &Ticket) {
        match owner {
            Some(owner) => {
                self.notifier.notify_status_updated(&owner, ticket, ticket.status);
            }
            None => tracing::warn!("Ticket {} has no owner to notify", ticket.id),
        }
    }

    // ---- user ----

    pub async fn create_ticket(&self, actor: &Actor, input: TicketInput) -> Result<Ticket, ServiceError> {
        authorize(actor, Action::CreateTicket, None)?;

        let priority = match input.priority.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => {
                TicketPriority::from_str(p).map_err(ServiceError::Validation)?
            }
            _ => TicketPriority::default(),
        };

        let ticket = self
            .db_client
            .create_ticket(NewTicket {
                subject: input.subject.trim().to_string(),
                description: input.description.trim().to_string(),
                priority,
                owner: actor.id,
                attachments: input.attachments,
            })
            .await?;

        tracing::info!("Ticket {} created by {}", ticket.id, actor.id);

        if let Some(owner) = self.find_user(actor.id).await? {
            self.notifier.notify_ticket_created(&owner, &ticket);
        }

        Ok(ticket)
    }

    pub async fn list_own_tickets(&self, actor: &Actor) -> Result<Vec<TicketDetails>, ServiceError> {
        authorize(actor, Action::ListOwnTickets, None)?;
        let tickets = self.db_client.get_tickets_by_owner(actor.id).await?;
        self.populate_many(tickets).await
    }

    pub async fn get_own_ticket(&self, actor: &Actor, ticket_id: Uuid) -> Result<TicketDetails, ServiceError> {
        let ticket = self
            .load_authorized(actor, Action::ViewOwnTicket, ticket_id)
            .await?;
        self.populate(ticket).await
    }

    pub async fn add_comment_as_owner(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        text: &str,
    ) -> Result<Comment, ServiceError> {
        let ticket = self
            .load_authorized(actor, Action::CommentAsOwner, ticket_id)
            .await?;
        self.append_comment(actor, &ticket, text).await
    }

    pub async fn rate_ticket(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        stars: i16,
        feedback: Option<String>,
    ) -> Result<Ticket, ServiceError> {
        let ticket = self
            .load_authorized(actor, Action::RateTicket, ticket_id)
            .await?;

        if !(1..=5).contains(&stars) {
            return Err(ServiceError::Validation(
                "Rating must be between 1 and 5 stars".to_string(),
            ));
        }
        lifecycle::may_rate(&ticket)?;

        let rating = Rating {
            stars,
            feedback: feedback
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty()),
        };

        let updated = Self::vanished(self.db_client.update_ticket_rating(ticket.id, rating).await?)?;
        tracing::info!("Ticket {} rated {} stars by {}", ticket.id, stars, actor.id);
        Ok(updated)
    }

    // ---- agent ----

    pub async fn list_assigned(&self, actor: &Actor) -> Result<Vec<TicketDetails>, ServiceError> {
        authorize(actor, Action::ListAssignedTickets, None)?;
        let tickets = self.db_client.get_tickets_by_assignee(actor.id).await?;
        self.populate_many(tickets).await
    }

    pub async fn agent_update_status(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        status: &str,
    ) -> Result<TicketDetails, ServiceError> {
        let ticket = self
            .load_authorized(actor, Action::UpdateAssignedStatus, ticket_id)
            .await?;

        let status = parse_status(status)?;
        let status = lifecycle::change_status(actor.role, &ticket, status)?;

        let updated = Self::vanished(self.db_client.update_ticket_status(ticket.id, status).await?)?;
        tracing::info!(
            "Ticket {} moved from {} to {} by agent {}",
            ticket.id,
            ticket.status.to_str(),
            status.to_str(),
            actor.id
        );

        let owner = self.find_user(updated.owner).await?;
        self.notify_owner_of_status(owner, &updated);

        self.populate(updated).await
    }

    pub async fn add_comment_as_assignee(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        text: &str,
    ) -> Result<Comment, ServiceError> {
        let ticket = self
            .load_authorized(actor, Action::CommentAsAssignee, ticket_id)
            .await?;
        self.append_comment(actor, &ticket, text).await
    }

    async fn append_comment(&self, actor: &Actor, ticket: &Ticket, text: &str) -> Result<Comment, ServiceError> {
        let text = comment_text(text)?;
        let comment = Self::vanished(self.db_client.add_comment(ticket.id, actor.id, text).await?)?;
        tracing::info!("Comment {} added to ticket {} by {}", comment.id, ticket.id, actor.id);
        Ok(comment)
    }

    // ---- admin ----

    pub async fn list_all(&self, actor: &Actor) -> Result<Vec<TicketDetails>, ServiceError> {
        authorize(actor, Action::ListAllTickets, None)?;
        let tickets = self.db_client.get_tickets().await?;
        self.populate_many(tickets).await
    }

    pub async fn get_any(&self, actor: &Actor, ticket_id: Uuid) -> Result<TicketDetails, ServiceError> {
        let ticket = self
            .load_authorized(actor, Action::ViewAnyTicket, ticket_id)
            .await?;
        self.populate(ticket).await
    }

    pub async fn stats(&self, actor: &Actor) -> Result<Vec<StatusCount>, ServiceError> {
        authorize(actor, Action::ViewTicketStats, None)?;
        Ok(self.db_client.count_tickets_by_status().await?)
    }

    async fn require_agent(&self, user_id: Uuid) -> Result<User, ServiceError> {
        let user = self
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ErrorMessage::UserNotFound.to_string()))?;

        if user.role != UserRole::Agent {
            return Err(ServiceError::Validation(
                "Tickets can only be assigned to agents".to_string(),
            ));
        }
        Ok(user)
    }

    /// Sets or clears the assignee. Status is left as it is.
    pub async fn assign(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        assignee: Option<Uuid>,
    ) -> Result<TicketDetails, ServiceError> {
        let ticket = self
            .load_authorized(actor, Action::AssignTicket, ticket_id)
            .await?;

        let agent = match assignee {
            Some(id) => Some(self.require_agent(id).await?),
            None => None,
        };

        let assignment = lifecycle::assign(actor.role, &ticket, assignee)?;
        let updated = Self::vanished(
            self.db_client
                .update_ticket_assignment(ticket.id, assignment.assigned_to, assignment.status)
                .await?,
        )?;

        match &agent {
            Some(agent) => {
                tracing::info!("Ticket {} assigned to agent {}", ticket.id, agent.id);
                self.notifier.notify_ticket_assigned(agent, &updated);
            }
            None => tracing::info!("Ticket {} unassigned", ticket.id),
        }

        self.populate(updated).await
    }

    /// Sets the assignee and forces the ticket back to in progress.
    pub async fn reassign(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        assignee: Uuid,
    ) -> Result<TicketDetails, ServiceError> {
        let ticket = self
            .load_authorized(actor, Action::ReassignTicket, ticket_id)
            .await?;

        let agent = self.require_agent(assignee).await?;

        let assignment = lifecycle::force_reassign(actor.role, &ticket, agent.id)?;
        let updated = Self::vanished(
            self.db_client
                .update_ticket_assignment(ticket.id, assignment.assigned_to, assignment.status)
                .await?,
        )?;

        tracing::info!(
            "Ticket {} reassigned to agent {} and set to {}",
            ticket.id,
            agent.id,
            updated.status.to_str()
        );
        self.notifier.notify_ticket_assigned(&agent, &updated);

        self.populate(updated).await
    }

    pub async fn force_status(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        status: &str,
    ) -> Result<TicketDetails, ServiceError> {
        let ticket = self
            .load_authorized(actor, Action::ForceTicketStatus, ticket_id)
            .await?;

        let status = parse_status(status)?;
        let status = lifecycle::change_status(actor.role, &ticket, status)?;

        let updated = Self::vanished(self.db_client.update_ticket_status(ticket.id, status).await?)?;
        tracing::info!(
            "Ticket {} forced from {} to {} by admin {}",
            ticket.id,
            ticket.status.to_str(),
            status.to_str(),
            actor.id
        );

        self.populate(updated).await
    }

    pub async fn delete_ticket(&self, actor: &Actor, ticket_id: Uuid) -> Result<Ticket, ServiceError> {
        let ticket = self
            .load_authorized(actor, Action::DeleteTicket, ticket_id)
            .await?;
        lifecycle::may_delete(actor.role)?;

        let deleted = Self::vanished(self.db_client.delete_ticket(ticket.id).await?)?;
        tracing::info!("Ticket {} deleted by admin {}", deleted.id, actor.id);
        Ok(deleted)
    }
}
