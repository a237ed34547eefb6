use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{models::ticketmodel::Attachment, service::ticket_service::TicketInput};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct AttachmentDto {
    #[validate(length(min = 1, message = "Attachment filename is required"))]
    pub filename: String,
    #[validate(url(message = "Attachment url is invalid"))]
    pub url: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateTicketDto {
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    pub priority: Option<String>,

    #[validate]
    pub attachments: Vec<AttachmentDto>,
}

impl From<CreateTicketDto> for TicketInput {
    fn from(dto: CreateTicketDto) -> Self {
        TicketInput {
            subject: dto.subject,
            description: dto.description,
            priority: dto.priority,
            attachments: dto
                .attachments
                .into_iter()
                .map(|a| Attachment {
                    filename: a.filename,
                    url: a.url,
                })
                .collect(),
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentDto {
    #[validate(length(min = 1, message = "Comment text is required"))]
    pub text: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusUpdateDto {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

/// `assignedTo: null` clears the assignee.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AssignTicketDto {
    #[serde(rename = "assignedTo", default)]
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReassignTicketDto {
    #[serde(rename = "assignedTo")]
    pub assigned_to: Uuid,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5 stars"))]
    pub stars: i16,

    #[validate(length(max = 1000, message = "Feedback must not exceed 1000 characters"))]
    pub feedback: Option<String>,
}
