//! Authorization policy.
//!
//! One decision function for every route: the role gate comes from the
//! action's allowed-role table, then the ownership gate (owner or assignee)
//! is checked against the ticket. Admins skip ownership gates.

use uuid::Uuid;

use crate::{
    error::ErrorMessage,
    models::{
        ticketmodel::Ticket,
        usermodel::{User, UserRole},
    },
    service::error::ServiceError,
};

/// The authenticated identity performing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            id: user.id,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewProfile,
    CreateTicket,
    ListOwnTickets,
    ViewOwnTicket,
    CommentAsOwner,
    RateTicket,
    ListAssignedTickets,
    UpdateAssignedStatus,
    CommentAsAssignee,
    ListAllTickets,
    ViewAnyTicket,
    ViewTicketStats,
    AssignTicket,
    ReassignTicket,
    ForceTicketStatus,
    DeleteTicket,
    CreateUser,
    DeleteUser,
    UpdateUserRole,
    ListUsers,
    ListAgents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipGate {
    None,
    Owner,
    Assignee,
}

const EVERYONE: &[UserRole] = &[UserRole::User, UserRole::Agent, UserRole::Admin];
const USERS: &[UserRole] = &[UserRole::User];
const AGENTS: &[UserRole] = &[UserRole::Agent];
const ADMINS: &[UserRole] = &[UserRole::Admin];

impl Action {
    pub const ALL: [Action; 21] = [
        Action::ViewProfile,
        Action::CreateTicket,
        Action::ListOwnTickets,
        Action::ViewOwnTicket,
        Action::CommentAsOwner,
        Action::RateTicket,
        Action::ListAssignedTickets,
        Action::UpdateAssignedStatus,
        Action::CommentAsAssignee,
        Action::ListAllTickets,
        Action::ViewAnyTicket,
        Action::ViewTicketStats,
        Action::AssignTicket,
        Action::ReassignTicket,
        Action::ForceTicketStatus,
        Action::DeleteTicket,
        Action::CreateUser,
        Action::DeleteUser,
        Action::UpdateUserRole,
        Action::ListUsers,
        Action::ListAgents,
    ];

    pub fn allowed_roles(self) -> &'static [UserRole] {
        match self {
            Action::ViewProfile | Action::CommentAsOwner => EVERYONE,

            Action::CreateTicket
            | Action::ListOwnTickets
            | Action::ViewOwnTicket
            | Action::RateTicket => USERS,

            Action::ListAssignedTickets
            | Action::UpdateAssignedStatus
            | Action::CommentAsAssignee => AGENTS,

            Action::ListAllTickets
            | Action::ViewAnyTicket
            | Action::ViewTicketStats
            | Action::AssignTicket
            | Action::ReassignTicket
            | Action::ForceTicketStatus
            | Action::DeleteTicket
            | Action::CreateUser
            | Action::DeleteUser
            | Action::UpdateUserRole
            | Action::ListUsers
            | Action::ListAgents => ADMINS,
        }
    }

    pub fn ownership(self) -> OwnershipGate {
        match self {
            Action::ViewOwnTicket | Action::CommentAsOwner | Action::RateTicket => {
                OwnershipGate::Owner
            }
            Action::UpdateAssignedStatus | Action::CommentAsAssignee => OwnershipGate::Assignee,
            _ => OwnershipGate::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    RoleNotPermitted,
    NotYourTicket,
    NotAssignedToYou,
}

impl Denial {
    pub fn message(self) -> ErrorMessage {
        match self {
            Denial::RoleNotPermitted => ErrorMessage::PermissionDenied,
            Denial::NotYourTicket => ErrorMessage::NotYourTicket,
            Denial::NotAssignedToYou => ErrorMessage::NotAssignedToYou,
        }
    }
}

impl From<Denial> for ServiceError {
    fn from(denial: Denial) -> Self {
        ServiceError::Forbidden(denial.message().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

/// Role gate only. This is what the route middleware applies before the
/// ticket has been loaded.
pub fn role_permits(role: UserRole, action: Action) -> bool {
    action.allowed_roles().contains(&role)
}

/// Full decision. An ownership-gated action with no ticket to check against
/// is denied for everyone but admins.
pub fn decide(actor: &Actor, action: Action, ticket: Option<&Ticket>) -> Decision {
    if !role_permits(actor.role, action) {
        return Decision::Deny(Denial::RoleNotPermitted);
    }

    if actor.role == UserRole::Admin {
        return Decision::Allow;
    }

    match action.ownership() {
        OwnershipGate::None => Decision::Allow,
        OwnershipGate::Owner => match ticket {
            Some(ticket) if ticket.owner == actor.id => Decision::Allow,
            _ => Decision::Deny(Denial::NotYourTicket),
        },
        OwnershipGate::Assignee => match ticket {
            Some(ticket) if ticket.assigned_to == Some(actor.id) => Decision::Allow,
            _ => Decision::Deny(Denial::NotAssignedToYou),
        },
    }
}

pub fn authorize(actor: &Actor, action: Action, ticket: Option<&Ticket>) -> Result<(), ServiceError> {
    match decide(actor, action, ticket) {
        Decision::Allow => Ok(()),
        Decision::Deny(denial) => {
            tracing::debug!(
                actor = %actor.id,
                role = actor.role.to_str(),
                ?action,
                ?denial,
                "authorization denied"
            );
            Err(denial.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::ticketmodel::{TicketPriority, TicketStatus};

    fn actor(role: UserRole) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
        }
    }

    fn ticket(owner: Uuid, assigned_to: Option<Uuid>) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            subject: "subject".into(),
            description: "description".into(),
            priority: TicketPriority::Low,
            status: TicketStatus::Open,
            owner,
            assigned_to,
            comments: Vec::new(),
            attachments: Vec::new(),
            rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn every_pair_has_a_decision() {
        for action in Action::ALL {
            let allowed = action.allowed_roles();
            assert!(!allowed.is_empty(), "{:?} allows nobody", action);

            for role in UserRole::ALL {
                let a = actor(role);
                let owned = ticket(a.id, Some(a.id));
                let decision = decide(&a, action, Some(&owned));

                if allowed.contains(&role) {
                    assert_eq!(decision, Decision::Allow, "{:?} {:?}", role, action);
                } else {
                    assert_eq!(
                        decision,
                        Decision::Deny(Denial::RoleNotPermitted),
                        "{:?} {:?}",
                        role,
                        action
                    );
                }
            }
        }
    }

    #[test]
    fn admin_actions_are_admin_only() {
        for action in [
            Action::AssignTicket,
            Action::ReassignTicket,
            Action::ForceTicketStatus,
            Action::DeleteTicket,
            Action::DeleteUser,
            Action::ViewTicketStats,
        ] {
            assert!(role_permits(UserRole::Admin, action));
            assert!(!role_permits(UserRole::Agent, action));
            assert!(!role_permits(UserRole::User, action));
        }
    }

    #[test]
    fn user_comments_only_on_own_ticket() {
        let alice = actor(UserRole::User);
        let bob = actor(UserRole::User);
        let t = ticket(alice.id, None);

        assert_eq!(decide(&alice, Action::CommentAsOwner, Some(&t)), Decision::Allow);
        assert_eq!(
            decide(&bob, Action::CommentAsOwner, Some(&t)),
            Decision::Deny(Denial::NotYourTicket)
        );
    }

    #[test]
    fn agent_acts_only_when_assigned() {
        let owner = actor(UserRole::User);
        let assigned = actor(UserRole::Agent);
        let other = actor(UserRole::Agent);
        let t = ticket(owner.id, Some(assigned.id));

        for action in [Action::UpdateAssignedStatus, Action::CommentAsAssignee] {
            assert_eq!(decide(&assigned, action, Some(&t)), Decision::Allow);
            assert_eq!(
                decide(&other, action, Some(&t)),
                Decision::Deny(Denial::NotAssignedToYou)
            );
        }

        let unassigned = ticket(owner.id, None);
        assert_eq!(
            decide(&assigned, Action::UpdateAssignedStatus, Some(&unassigned)),
            Decision::Deny(Denial::NotAssignedToYou)
        );
    }

    #[test]
    fn agent_on_owner_route_is_ownership_checked() {
        let owner = actor(UserRole::User);
        let agent = actor(UserRole::Agent);
        let t = ticket(owner.id, Some(agent.id));

        assert_eq!(
            decide(&agent, Action::CommentAsOwner, Some(&t)),
            Decision::Deny(Denial::NotYourTicket)
        );
    }

    #[test]
    fn admin_bypasses_ownership() {
        let admin = actor(UserRole::Admin);
        let t = ticket(Uuid::new_v4(), Some(Uuid::new_v4()));

        assert_eq!(decide(&admin, Action::CommentAsOwner, Some(&t)), Decision::Allow);
        assert_eq!(decide(&admin, Action::CommentAsOwner, None), Decision::Allow);
    }

    #[test]
    fn missing_ticket_denies_gated_actions() {
        let user = actor(UserRole::User);
        assert_eq!(
            decide(&user, Action::ViewOwnTicket, None),
            Decision::Deny(Denial::NotYourTicket)
        );
    }

    #[test]
    fn denial_surfaces_as_forbidden() {
        let err = authorize(&actor(UserRole::User), Action::DeleteUser, None).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
