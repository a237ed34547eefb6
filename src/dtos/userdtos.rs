use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    models::usermodel::User,
    service::account_service::NewAccount,
    utils::password,
};

fn validate_strong_password(value: &str) -> Result<(), ValidationError> {
    if password::is_strong(value) {
        return Ok(());
    }
    let mut error = ValidationError::new("weak_password");
    error.message = Some(
        "Password must be at least 8 characters and contain upper and lower case letters, a number and a symbol"
            .into(),
    );
    Err(error)
}

/// Used by `/register` and by admin user creation.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterUserDto {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(custom = "validate_strong_password")]
    pub password: String,

    pub role: Option<String>,
}

impl From<RegisterUserDto> for NewAccount {
    fn from(dto: RegisterUserDto) -> Self {
        NewAccount {
            name: dto.name,
            email: dto.email,
            password: dto.password,
            role: dto.role,
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleUpdateDto {
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

/// The short form returned by the agent listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct AgentDto {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl AgentDto {
    pub fn filter_agents(users: &[User]) -> Vec<AgentDto> {
        users
            .iter()
            .map(|user| AgentDto {
                id: user.id.to_string(),
                name: user.name.to_owned(),
                email: user.email.to_owned(),
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub message: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub message: String,
    pub data: UserData,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: usize,
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: &str, email: &str, password: &str) -> RegisterUserDto {
        RegisterUserDto {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: None,
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(register("Grace", "grace@example.com", "Passw0rd!").validate().is_ok());
    }

    #[test]
    fn registration_rules() {
        assert!(register("Al", "al@example.com", "Passw0rd!").validate().is_err());
        assert!(register("Grace", "not-an-email", "Passw0rd!").validate().is_err());
        assert!(register("Grace", "grace@example.com", "password").validate().is_err());
    }

    #[test]
    fn missing_fields_fail_validation_not_parsing() {
        let dto: RegisterUserDto = serde_json::from_str(r#"{"email":"a@example.com"}"#).unwrap();
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn filtered_user_hides_password() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            password: "$argon2id$secret".to_string(),
            role: crate::models::usermodel::UserRole::Agent,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(FilterUserDto::filter_user(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "agent");
    }
}
