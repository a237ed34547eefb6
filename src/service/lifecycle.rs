//! Ticket lifecycle rules: which status changes and assignment changes a
//! role may make from a given state.

use uuid::Uuid;

use crate::{
    error::ErrorMessage,
    models::{
        ticketmodel::{Ticket, TicketStatus},
        usermodel::UserRole,
    },
    service::error::ServiceError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    NotPermitted,
    AlreadyClosed,
    NotRateable,
}

impl From<LifecycleError> for ServiceError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotPermitted => {
                ServiceError::Forbidden(ErrorMessage::PermissionDenied.to_string())
            }
            LifecycleError::AlreadyClosed => {
                ServiceError::Forbidden(ErrorMessage::TicketAlreadyClosed.to_string())
            }
            LifecycleError::NotRateable => ServiceError::Validation(
                "Ticket can only be rated once it is resolved or closed".to_string(),
            ),
        }
    }
}

/// Status transition table. Admins may move any ticket anywhere; agents may
/// move any ticket that is not closed to any status, without adjacency
/// constraints; users never change status.
pub fn may_change_status(role: UserRole, from: TicketStatus, _to: TicketStatus) -> Result<(), LifecycleError> {
    match (role, from) {
        (UserRole::Admin, _) => Ok(()),
        (UserRole::Agent, TicketStatus::Closed) => Err(LifecycleError::AlreadyClosed),
        (UserRole::Agent, TicketStatus::Open)
        | (UserRole::Agent, TicketStatus::InProgress)
        | (UserRole::Agent, TicketStatus::Resolved) => Ok(()),
        (UserRole::User, _) => Err(LifecycleError::NotPermitted),
    }
}

pub fn change_status(
    role: UserRole,
    ticket: &Ticket,
    to: TicketStatus,
) -> Result<TicketStatus, LifecycleError> {
    may_change_status(role, ticket.status, to)?;
    Ok(to)
}

/// Resulting assignee and status of an assignment change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub assigned_to: Option<Uuid>,
    pub status: TicketStatus,
}

/// Plain assignment: sets or clears the assignee and leaves status alone.
pub fn assign(
    role: UserRole,
    ticket: &Ticket,
    assignee: Option<Uuid>,
) -> Result<Assignment, LifecycleError> {
    if role != UserRole::Admin {
        return Err(LifecycleError::NotPermitted);
    }

    Ok(Assignment {
        assigned_to: assignee,
        status: ticket.status,
    })
}

/// Forced reassignment: sets the assignee and puts the ticket back in
/// progress, whatever its current status.
pub fn force_reassign(role: UserRole, _ticket: &Ticket, assignee: Uuid) -> Result<Assignment, LifecycleError> {
    if role != UserRole::Admin {
        return Err(LifecycleError::NotPermitted);
    }

    Ok(Assignment {
        assigned_to: Some(assignee),
        status: TicketStatus::InProgress,
    })
}

pub fn may_delete(role: UserRole) -> Result<(), LifecycleError> {
    match role {
        UserRole::Admin => Ok(()),
        UserRole::Agent | UserRole::User => Err(LifecycleError::NotPermitted),
    }
}

pub fn may_rate(ticket: &Ticket) -> Result<(), LifecycleError> {
    match ticket.status {
        TicketStatus::Resolved | TicketStatus::Closed => Ok(()),
        TicketStatus::Open | TicketStatus::InProgress => Err(LifecycleError::NotRateable),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::ticketmodel::TicketPriority;

    fn ticket(status: TicketStatus) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            subject: "subject".into(),
            description: "description".into(),
            priority: TicketPriority::Low,
            status,
            owner: Uuid::new_v4(),
            assigned_to: None,
            comments: Vec::new(),
            attachments: Vec::new(),
            rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn agent_may_jump_between_open_states() {
        for from in [TicketStatus::Open, TicketStatus::InProgress, TicketStatus::Resolved] {
            for to in TicketStatus::ALL {
                assert_eq!(change_status(UserRole::Agent, &ticket(from), to), Ok(to));
            }
        }
    }

    #[test]
    fn closed_is_terminal_for_agents_only() {
        let closed = ticket(TicketStatus::Closed);
        for to in TicketStatus::ALL {
            assert_eq!(
                change_status(UserRole::Agent, &closed, to),
                Err(LifecycleError::AlreadyClosed)
            );
            assert_eq!(change_status(UserRole::Admin, &closed, to), Ok(to));
        }
    }

    #[test]
    fn users_never_change_status() {
        for from in TicketStatus::ALL {
            assert_eq!(
                change_status(UserRole::User, &ticket(from), TicketStatus::Closed),
                Err(LifecycleError::NotPermitted)
            );
        }
    }

    #[test]
    fn assignment_keeps_status() {
        let t = ticket(TicketStatus::Resolved);
        let agent = Uuid::new_v4();

        let assignment = assign(UserRole::Admin, &t, Some(agent)).unwrap();
        assert_eq!(assignment.assigned_to, Some(agent));
        assert_eq!(assignment.status, TicketStatus::Resolved);

        assert_eq!(assign(UserRole::Agent, &t, Some(agent)), Err(LifecycleError::NotPermitted));
    }

    #[test]
    fn reassignment_forces_in_progress() {
        let agent = Uuid::new_v4();
        for from in TicketStatus::ALL {
            let assignment = force_reassign(UserRole::Admin, &ticket(from), agent).unwrap();
            assert_eq!(assignment.status, TicketStatus::InProgress);
            assert_eq!(assignment.assigned_to, Some(agent));
        }
        assert!(force_reassign(UserRole::User, &ticket(TicketStatus::Open), agent).is_err());
    }

    #[test]
    fn only_finished_tickets_are_rated() {
        assert!(may_rate(&ticket(TicketStatus::Resolved)).is_ok());
        assert!(may_rate(&ticket(TicketStatus::Closed)).is_ok());
        assert_eq!(may_rate(&ticket(TicketStatus::Open)), Err(LifecycleError::NotRateable));
    }

    #[test]
    fn only_admins_delete() {
        assert!(may_delete(UserRole::Admin).is_ok());
        assert!(may_delete(UserRole::Agent).is_err());
        assert!(may_delete(UserRole::User).is_err());
    }
}
