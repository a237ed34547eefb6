use std::{str::FromStr, sync::Arc};

use uuid::Uuid;

use crate::{
    db::{userdb::UserDeletion, Store},
    error::ErrorMessage,
    models::usermodel::{normalize_email, User, UserRole},
    service::{
        error::ServiceError,
        policy::{authorize, Action, Actor},
    },
    utils::password,
};

const PASSWORD_MISMATCH: &str = "Invalid credentials, password does not match";

/// Registration, login and the admin user-management operations.
#[derive(Clone)]
pub struct AccountService {
    db_client: Arc<dyn Store>,
    allow_privileged_signup: bool,
}

pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

fn parse_role(role: Option<&str>) -> Result<Option<UserRole>, ServiceError> {
    match role.map(str::trim).filter(|r| !r.is_empty()) {
        Some(role) => UserRole::from_str(role)
            .map(Some)
            .map_err(ServiceError::Validation),
        None => Ok(None),
    }
}

fn hash_password(raw: &str) -> Result<String, ServiceError> {
    password::hash(raw).map_err(|e| match e {
        ErrorMessage::EmptyPassword | ErrorMessage::ExceededMaxPasswordLength(_) => {
            ServiceError::Validation(e.to_string())
        }
        other => ServiceError::Internal(other.to_string()),
    })
}

impl AccountService {
    pub fn new(db_client: Arc<dyn Store>, allow_privileged_signup: bool) -> Self {
        Self {
            db_client,
            allow_privileged_signup,
        }
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), ServiceError> {
        let existing = self.db_client.get_user(None, Some(email), None).await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(ErrorMessage::EmailExist.to_string()));
        }
        Ok(())
    }

    async fn insert(&self, account: NewAccount, role: UserRole) -> Result<User, ServiceError> {
        let email = normalize_email(&account.email);
        self.ensure_email_free(&email).await?;

        let hashed = hash_password(&account.password)?;
        let user = self
            .db_client
            .save_user(account.name.trim().to_string(), email, hashed, role)
            .await?;

        tracing::info!("User {} created with role {}", user.id, user.role.to_str());
        Ok(user)
    }

    /// Self-service signup. Without privileged signup enabled only the `user`
    /// role can be requested.
    pub async fn register(&self, account: NewAccount) -> Result<User, ServiceError> {
        let role = parse_role(account.role.as_deref())?.unwrap_or(UserRole::User);

        if role != UserRole::User && !self.allow_privileged_signup {
            return Err(ServiceError::Forbidden(format!(
                "Registration as {} is not allowed",
                role.to_str()
            )));
        }

        self.insert(account, role).await
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<User, ServiceError> {
        let role = parse_role(role)?;

        let user = self
            .db_client
            .get_user(None, Some(email), role)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ErrorMessage::WrongCredentials.to_string()))?;

        let matches = password::compare(password, &user.password).map_err(|e| match e {
            ErrorMessage::EmptyPassword | ErrorMessage::ExceededMaxPasswordLength(_) => {
                ServiceError::Unauthorized(PASSWORD_MISMATCH.to_string())
            }
            other => ServiceError::Internal(other.to_string()),
        })?;

        if !matches {
            return Err(ServiceError::Unauthorized(PASSWORD_MISMATCH.to_string()));
        }

        tracing::info!("User {} logged in", user.id);
        Ok(user)
    }

    pub async fn create_user(&self, actor: &Actor, account: NewAccount) -> Result<User, ServiceError> {
        authorize(actor, Action::CreateUser, None)?;

        let role = parse_role(account.role.as_deref())?.unwrap_or(UserRole::User);
        self.insert(account, role).await
    }

    pub async fn delete_user(&self, actor: &Actor, user_id: Uuid) -> Result<UserDeletion, ServiceError> {
        authorize(actor, Action::DeleteUser, None)?;

        let deletion = self
            .db_client
            .delete_user_cascade(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ErrorMessage::UserNotFound.to_string()))?;

        tracing::info!(
            "User {} deleted along with {} tickets and {} comments",
            user_id,
            deletion.tickets_deleted,
            deletion.comments_deleted
        );
        Ok(deletion)
    }

    pub async fn update_role(&self, actor: &Actor, user_id: Uuid, role: &str) -> Result<User, ServiceError> {
        authorize(actor, Action::UpdateUserRole, None)?;

        let role = UserRole::from_str(role.trim())
            .map_err(|_| ServiceError::Validation("Invalid role".to_string()))?;

        let user = self
            .db_client
            .update_user_role(user_id, role)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ErrorMessage::UserNotFound.to_string()))?;

        tracing::info!("User {} role changed to {}", user.id, role.to_str());
        Ok(user)
    }

    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<User>, ServiceError> {
        authorize(actor, Action::ListUsers, None)?;
        Ok(self.db_client.get_users().await?)
    }

    pub async fn list_agents(&self, actor: &Actor) -> Result<Vec<User>, ServiceError> {
        authorize(actor, Action::ListAgents, None)?;
        Ok(self.db_client.get_users_by_role(UserRole::Agent).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    fn account(email: &str, role: Option<&str>) -> NewAccount {
        NewAccount {
            name: "Grace Hopper".to_string(),
            email: email.to_string(),
            password: "Passw0rd!".to_string(),
            role: role.map(str::to_string),
        }
    }

    fn service(allow_privileged_signup: bool) -> AccountService {
        AccountService::new(Arc::new(MemoryStore::new()), allow_privileged_signup)
    }

    fn admin() -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
        }
    }

    #[tokio::test]
    async fn register_hashes_and_defaults_to_user() {
        let service = service(false);
        let user = service.register(account("Grace@Example.com", None)).await.unwrap();

        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.email, "grace@example.com");
        assert_ne!(user.password, "Passw0rd!");
        assert!(password::compare("Passw0rd!", &user.password).unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_regardless_of_case() {
        let service = service(false);
        service.register(account("grace@example.com", None)).await.unwrap();

        let err = service
            .register(account("GRACE@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn privileged_signup_is_gated() {
        let err = service(false)
            .register(account("a@example.com", Some("admin")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let user = service(true)
            .register(account("a@example.com", Some("agent")))
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::Agent);

        let err = service(true)
            .register(account("b@example.com", Some("superuser")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn login_checks_role_and_password() {
        let service = service(false);
        service.register(account("grace@example.com", None)).await.unwrap();

        let user = service
            .login("grace@example.com", "Passw0rd!", Some("user"))
            .await
            .unwrap();
        assert_eq!(user.email, "grace@example.com");

        assert!(service.login("grace@example.com", "Passw0rd!", None).await.is_ok());

        let err = service
            .login("grace@example.com", "Passw0rd!", Some("agent"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = service
            .login("grace@example.com", "wrong", Some("user"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn oversized_login_password_is_a_credentials_failure() {
        let service = service(false);
        service.register(account("grace@example.com", None)).await.unwrap();

        let long = "A1!".repeat(30);
        let err = service
            .login("grace@example.com", &long, None)
            .await
            .unwrap_err();
        match err {
            ServiceError::Unauthorized(message) => assert_eq!(message, PASSWORD_MISMATCH),
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn admin_manages_users() {
        let service = service(false);
        let admin = admin();

        let agent = service
            .create_user(&admin, account("agent@example.com", Some("agent")))
            .await
            .unwrap();
        assert!(password::compare("Passw0rd!", &agent.password).unwrap());
        assert_eq!(service.list_agents(&admin).await.unwrap().len(), 1);

        let promoted = service.update_role(&admin, agent.id, "admin").await.unwrap();
        assert_eq!(promoted.role, UserRole::Admin);
        assert!(service.list_agents(&admin).await.unwrap().is_empty());

        let err = service.update_role(&admin, agent.id, "root").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let deletion = service.delete_user(&admin, agent.id).await.unwrap();
        assert_eq!(deletion.user.id, agent.id);

        let err = service.delete_user(&admin, agent.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_admins_cannot_manage_users() {
        let service = service(false);
        let user = service.register(account("grace@example.com", None)).await.unwrap();
        let actor = Actor::from(&user);

        assert!(matches!(
            service.list_users(&actor).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        assert!(matches!(
            service.update_role(&actor, user.id, "admin").await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        assert!(matches!(
            service.delete_user(&actor, user.id).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        assert_eq!(service.list_users(&admin()).await.unwrap().len(), 1);
        assert_eq!(
            service.list_users(&admin()).await.unwrap()[0].role,
            UserRole::User
        );
    }
}
