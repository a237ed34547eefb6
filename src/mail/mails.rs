use super::sendmail::Email;
use crate::models::{
    ticketmodel::{Ticket, TicketStatus},
    usermodel::User,
};

/// Minimal escaping for values interpolated into HTML bodies.
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn ticket_created_email(owner: &User, ticket: &Ticket) -> Email {
    Email {
        to: owner.email.clone(),
        subject: format!("🎫 Ticket Created: #{}", ticket.id),
        text: format!(
            "Hi {},\n\nYour ticket has been created successfully.\nSubject: {}\nPriority: {}\nStatus: {}\n\nWe will get back to you soon.",
            owner.name,
            ticket.subject,
            ticket.priority.to_str(),
            ticket.status.to_str(),
        ),
        html: format!(
            "<h3>Hi {},</h3>\
             <p>Your ticket has been created successfully.</p>\
             <p><strong>Subject:</strong> {}</p>\
             <p><strong>Priority:</strong> {}</p>\
             <p>Status: {}</p>\
             <hr/>\
             <p>We will get back to you soon.</p>",
            escape(&owner.name),
            escape(&ticket.subject),
            ticket.priority.to_str(),
            ticket.status.to_str(),
        ),
    }
}

pub fn ticket_assigned_email(assignee: &User, ticket: &Ticket) -> Email {
    Email {
        to: assignee.email.clone(),
        subject: format!("🎫 New Ticket Assigned: {}", ticket.subject),
        text: format!(
            "You have been assigned a new ticket: \"{}\"\n\nDescription: {}\nPriority: {}",
            ticket.subject,
            ticket.description,
            ticket.priority.to_str(),
        ),
        html: format!(
            "<p>Hello <b>{}</b>,</p>\
             <p>You have been assigned a new ticket:</p>\
             <p><strong>Subject:</strong> {}</p>\
             <p><strong>Description:</strong> {}</p>\
             <p><strong>Priority:</strong> {}</p>",
            escape(&assignee.name),
            escape(&ticket.subject),
            escape(&ticket.description),
            ticket.priority.to_str(),
        ),
    }
}

pub fn status_updated_email(owner: &User, ticket: &Ticket, status: TicketStatus) -> Email {
    Email {
        to: owner.email.clone(),
        subject: format!("📢 Ticket Status Updated: {}", ticket.subject),
        text: format!(
            "Your ticket \"{}\" status has been updated to: {}.",
            ticket.subject,
            status.to_str(),
        ),
        html: format!(
            "<p>Hello <b>{}</b>,</p>\
             <p>Your ticket <strong>{}</strong> status has been updated.</p>\
             <p><strong>New Status:</strong> {}</p>",
            escape(&owner.name),
            escape(&ticket.subject),
            status.to_str(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::{ticketmodel::TicketPriority, usermodel::UserRole};

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada <admin>".to_string(),
            email: "ada@example.com".to_string(),
            password: "hash".to_string(),
            role: UserRole::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ticket() -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            subject: "VPN down".to_string(),
            description: "Cannot connect".to_string(),
            priority: TicketPriority::High,
            status: TicketStatus::Open,
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
    fn created_email_goes_to_owner() {
        let owner = user();
        let t = ticket();
        let email = ticket_created_email(&owner, &t);

        assert_eq!(email.to, "ada@example.com");
        assert!(email.subject.contains(&t.id.to_string()));
        assert!(email.html.contains("Ada &lt;admin&gt;"));
        assert!(email.text.contains("Priority: high"));
    }

    #[test]
    fn status_email_names_the_new_status() {
        let email = status_updated_email(&user(), &ticket(), TicketStatus::Resolved);
        assert!(email.subject.contains("VPN down"));
        assert!(email.text.ends_with("updated to: resolved."));
    }

    #[test]
    fn assigned_email_carries_description() {
        let email = ticket_assigned_email(&user(), &ticket());
        assert!(email.html.contains("Cannot connect"));
    }
}
