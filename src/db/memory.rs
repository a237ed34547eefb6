//! In-process implementation of the user and ticket stores.
//!
//! Backs the test suite and `DATABASE_URL=memory` development runs. Every
//! multi-step write happens under a single write lock, so the comment append
//! and the user cascade are atomic here just as they are inside a Postgres
//! transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    complete_status_counts,
    ticketdb::TicketExt,
    userdb::{UserDeletion, UserExt},
    StoreError,
};
use crate::models::{
    ticketmodel::*,
    usermodel::{normalize_email, User, UserRole},
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    tickets: Vec<Ticket>,
    comments: HashMap<Uuid, Comment>,
}

impl Tables {
    fn ticket_mut(&mut self, ticket_id: Uuid) -> Option<&mut Ticket> {
        self.tickets.iter_mut().find(|t| t.id == ticket_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut tickets: Vec<Ticket>) -> Vec<Ticket> {
    tickets.reverse();
    tickets
}

#[async_trait]
impl UserExt for MemoryStore {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
        role: Option<UserRole>,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;

        let user = if let Some(user_id) = user_id {
            tables.users.iter().find(|u| u.id == user_id)
        } else if let Some(email) = email {
            let email = normalize_email(email);
            tables
                .users
                .iter()
                .find(|u| u.email == email && role.map_or(true, |r| u.role == r))
        } else {
            None
        };

        Ok(user.cloned())
    }

    async fn get_users(&self) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().rev().cloned().collect())
    }

    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| user_ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn get_users_by_role(&self, role: UserRole) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .iter()
            .filter(|u| u.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn save_user(
        &self,
        name: String,
        email: String,
        password: String,
        role: UserRole,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        let email = normalize_email(&email);

        if tables.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate(format!("email {}", email)));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email,
            password,
            role,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;

        Ok(tables.users.iter_mut().find(|u| u.id == user_id).map(|user| {
            user.role = role;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn delete_user_cascade(&self, user_id: Uuid) -> Result<Option<UserDeletion>, StoreError> {
        let mut tables = self.tables.write().await;

        let Some(position) = tables.users.iter().position(|u| u.id == user_id) else {
            return Ok(None);
        };
        let user = tables.users.remove(position);

        let (doomed, kept): (Vec<Ticket>, Vec<Ticket>) = std::mem::take(&mut tables.tickets)
            .into_iter()
            .partition(|t| t.owner == user_id || t.assigned_to == Some(user_id));
        tables.tickets = kept;

        let comments_before = tables.comments.len();
        tables
            .comments
            .retain(|_, c| c.user != user_id && !doomed.iter().any(|t| t.id == c.ticket));
        let comments_deleted = (comments_before - tables.comments.len()) as u64;

        let Tables {
            tickets, comments, ..
        } = &mut *tables;
        for ticket in tickets.iter_mut() {
            ticket.comments.retain(|id| comments.contains_key(id));
        }

        Ok(Some(UserDeletion {
            user,
            tickets_deleted: doomed.len() as u64,
            comments_deleted,
        }))
    }
}

#[async_trait]
impl TicketExt for MemoryStore {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let mut tables = self.tables.write().await;

        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            subject: ticket.subject.trim().to_string(),
            description: ticket.description,
            priority: ticket.priority,
            status: TicketStatus::Open,
            owner: ticket.owner,
            assigned_to: None,
            comments: Vec::new(),
            attachments: ticket.attachments,
            rating: None,
            created_at: now,
            updated_at: now,
        };
        tables.tickets.push(ticket.clone());

        Ok(ticket)
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.tickets.iter().find(|t| t.id == ticket_id).cloned())
    }

    async fn get_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.tickets.clone()))
    }

    async fn get_tickets_by_owner(&self, owner: Uuid) -> Result<Vec<Ticket>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.tickets.iter().filter(|t| t.owner == owner).cloned().collect(),
        ))
    }

    async fn get_tickets_by_assignee(&self, assignee: Uuid) -> Result<Vec<Ticket>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .tickets
                .iter()
                .filter(|t| t.assigned_to == Some(assignee))
                .cloned()
                .collect(),
        ))
    }

    async fn update_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut tables = self.tables.write().await;

        Ok(tables.ticket_mut(ticket_id).map(|ticket| {
            ticket.status = status;
            ticket.updated_at = Utc::now();
            ticket.clone()
        }))
    }

    async fn update_ticket_assignment(
        &self,
        ticket_id: Uuid,
        assigned_to: Option<Uuid>,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut tables = self.tables.write().await;

        Ok(tables.ticket_mut(ticket_id).map(|ticket| {
            ticket.assigned_to = assigned_to;
            ticket.status = status;
            ticket.updated_at = Utc::now();
            ticket.clone()
        }))
    }

    async fn update_ticket_rating(
        &self,
        ticket_id: Uuid,
        rating: Rating,
    ) -> Result<Option<Ticket>, StoreError> {
        let mut tables = self.tables.write().await;

        Ok(tables.ticket_mut(ticket_id).map(|ticket| {
            ticket.rating = Some(rating);
            ticket.updated_at = Utc::now();
            ticket.clone()
        }))
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let mut tables = self.tables.write().await;

        let Some(position) = tables.tickets.iter().position(|t| t.id == ticket_id) else {
            return Ok(None);
        };
        let ticket = tables.tickets.remove(position);
        tables.comments.retain(|_, c| c.ticket != ticket_id);

        Ok(Some(ticket))
    }

    async fn add_comment(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        text: String,
    ) -> Result<Option<Comment>, StoreError> {
        let mut tables = self.tables.write().await;

        let comment = Comment {
            id: Uuid::new_v4(),
            ticket: ticket_id,
            user: user_id,
            text,
            created_at: Utc::now(),
        };

        let Some(ticket) = tables.ticket_mut(ticket_id) else {
            return Ok(None);
        };
        ticket.comments.push(comment.id);
        ticket.updated_at = comment.created_at;

        tables.comments.insert(comment.id, comment.clone());

        Ok(Some(comment))
    }

    async fn get_ticket_comments(&self, ticket: &Ticket) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(ticket
            .comments
            .iter()
            .filter_map(|id| tables.comments.get(id).cloned())
            .collect())
    }

    async fn count_tickets_by_status(&self) -> Result<Vec<StatusCount>, StoreError> {
        let tables = self.tables.read().await;
        Ok(complete_status_counts(
            tables.tickets.iter().map(|t| (t.status, 1)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(store: &MemoryStore, name: &str, role: UserRole) -> User {
        store
            .save_user(
                name.to_string(),
                format!("{}@example.com", name),
                "hash".to_string(),
                role,
            )
            .await
            .unwrap()
    }

    async fn ticket(store: &MemoryStore, owner: Uuid, subject: &str) -> Ticket {
        store
            .create_ticket(NewTicket {
                subject: subject.to_string(),
                description: "details".to_string(),
                priority: TicketPriority::default(),
                owner,
                attachments: Vec::new(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn email_is_unique_ignoring_case() {
        let store = MemoryStore::new();
        user(&store, "alice", UserRole::User).await;

        let err = store
            .save_user(
                "Alice Again".to_string(),
                "  ALICE@Example.com ".to_string(),
                "hash".to_string(),
                UserRole::User,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn role_is_part_of_the_email_lookup() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice", UserRole::User).await;

        let found = store
            .get_user(None, Some("Alice@example.com"), Some(UserRole::User))
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(alice.id));

        let wrong_role = store
            .get_user(None, Some("alice@example.com"), Some(UserRole::Admin))
            .await
            .unwrap();
        assert!(wrong_role.is_none());
    }

    #[tokio::test]
    async fn comments_keep_insertion_order() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice", UserRole::User).await;
        let t = ticket(&store, alice.id, "printer").await;

        for text in ["first", "second", "third"] {
            store.add_comment(t.id, alice.id, text.to_string()).await.unwrap();
        }

        let t = store.get_ticket(t.id).await.unwrap().unwrap();
        let texts: Vec<String> = store
            .get_ticket_comments(&t)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);

        let missing = store
            .add_comment(Uuid::new_v4(), alice.id, "lost".to_string())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn cascade_delete_is_isolated() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice", UserRole::User).await;
        let bob = user(&store, "bob", UserRole::User).await;
        let agent = user(&store, "agent", UserRole::Agent).await;

        let alice_ticket = ticket(&store, alice.id, "alice's").await;
        let bob_ticket = ticket(&store, bob.id, "bob's").await;
        let bob_assigned = ticket(&store, bob.id, "bob's, assigned").await;
        store
            .update_ticket_assignment(bob_assigned.id, Some(agent.id), TicketStatus::InProgress)
            .await
            .unwrap();

        store.add_comment(alice_ticket.id, agent.id, "on it".into()).await.unwrap();
        store.add_comment(bob_ticket.id, agent.id, "looking".into()).await.unwrap();
        let bob_comment = store
            .add_comment(bob_ticket.id, bob.id, "thanks".into())
            .await
            .unwrap()
            .unwrap();
        store.add_comment(bob_assigned.id, bob.id, "any news?".into()).await.unwrap();

        let deletion = store.delete_user_cascade(agent.id).await.unwrap().unwrap();
        assert_eq!(deletion.user.id, agent.id);
        assert_eq!(deletion.tickets_deleted, 1);
        // two authored comments plus bob's comment on the assigned ticket
        assert_eq!(deletion.comments_deleted, 3);

        assert!(store.get_user(Some(agent.id), None, None).await.unwrap().is_none());
        assert!(store.get_ticket(bob_assigned.id).await.unwrap().is_none());

        let alice_ticket = store.get_ticket(alice_ticket.id).await.unwrap().unwrap();
        assert!(alice_ticket.comments.is_empty());

        let bob_ticket = store.get_ticket(bob_ticket.id).await.unwrap().unwrap();
        assert_eq!(bob_ticket.comments, vec![bob_comment.id]);

        assert!(store.get_user(Some(alice.id), None, None).await.unwrap().is_some());
        assert!(store.get_user(Some(bob.id), None, None).await.unwrap().is_some());
        assert_eq!(store.get_tickets().await.unwrap().len(), 2);

        assert!(store.delete_user_cascade(agent.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_ticket_drops_its_comments() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice", UserRole::User).await;
        let t = ticket(&store, alice.id, "vpn").await;
        store.add_comment(t.id, alice.id, "help".into()).await.unwrap();

        let deleted = store.delete_ticket(t.id).await.unwrap().unwrap();
        assert_eq!(deleted.id, t.id);
        assert!(store.tables.read().await.comments.is_empty());
    }

    #[tokio::test]
    async fn counts_by_status() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice", UserRole::User).await;
        let first = ticket(&store, alice.id, "one").await;
        ticket(&store, alice.id, "two").await;
        store
            .update_ticket_status(first.id, TicketStatus::Closed)
            .await
            .unwrap();

        let counts = store.count_tickets_by_status().await.unwrap();
        assert_eq!(counts[0], StatusCount { status: TicketStatus::Open, count: 1 });
        assert_eq!(counts[3], StatusCount { status: TicketStatus::Closed, count: 1 });
    }
}
