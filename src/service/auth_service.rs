use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::Store,
    error::ErrorMessage,
    models::usermodel::User,
    service::error::ServiceError,
    utils::token,
};

/// Issues session tokens and resolves them back to stored users.
///
/// The signing secret is handed in once at startup and never changes.
#[derive(Clone)]
pub struct Authenticator {
    db_client: Arc<dyn Store>,
    secret: Vec<u8>,
    maxage_minutes: i64,
}

impl Authenticator {
    pub fn new(db_client: Arc<dyn Store>, secret: impl Into<Vec<u8>>, maxage_minutes: i64) -> Self {
        Self {
            db_client,
            secret: secret.into(),
            maxage_minutes,
        }
    }

    pub fn maxage_minutes(&self) -> i64 {
        self.maxage_minutes
    }

    pub fn issue_token(&self, user: &User) -> Result<String, ServiceError> {
        token::create_token(
            &user.id.to_string(),
            user.role,
            &self.secret,
            self.maxage_minutes,
        )
        .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    /// The user is always re-read from the store, so a deleted account stops
    /// resolving and a role change takes effect on the next request.
    pub async fn resolve_token(&self, token: Option<&str>) -> Result<User, ServiceError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

        let claims = token::decode_token(token, &self.secret)
            .map_err(|_| ServiceError::Unauthorized(ErrorMessage::InvalidToken.to_string()))?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized(ErrorMessage::InvalidToken.to_string()))?;

        self.db_client
            .get_user(Some(user_id), None, None)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(ErrorMessage::UserNoLongerExist.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{memory::MemoryStore, userdb::UserExt},
        models::usermodel::UserRole,
    };

    async fn setup(maxage: i64) -> (Authenticator, Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .save_user(
                "Agent Smith".into(),
                "smith@example.com".into(),
                "hash".into(),
                UserRole::Agent,
            )
            .await
            .unwrap();
        let authenticator = Authenticator::new(store.clone(), "secret", maxage);
        (authenticator, store, user)
    }

    fn unauthorized_message(err: ServiceError) -> String {
        match err {
            ServiceError::Unauthorized(message) => message,
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn issued_token_resolves_to_same_user() {
        let (auth, _, user) = setup(60).await;
        let token = auth.issue_token(&user).unwrap();

        let resolved = auth.resolve_token(Some(&token)).await.unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.role, user.role);
    }

    #[tokio::test]
    async fn missing_token() {
        let (auth, _, _) = setup(60).await;
        let err = auth.resolve_token(None).await.unwrap_err();
        assert_eq!(unauthorized_message(err), ErrorMessage::TokenNotProvided.to_string());

        let err = auth.resolve_token(Some("")).await.unwrap_err();
        assert_eq!(unauthorized_message(err), ErrorMessage::TokenNotProvided.to_string());
    }

    #[tokio::test]
    async fn foreign_or_expired_token_is_invalid() {
        let (auth, store, user) = setup(-10).await;
        let expired = auth.issue_token(&user).unwrap();
        let err = auth.resolve_token(Some(&expired)).await.unwrap_err();
        assert_eq!(unauthorized_message(err), ErrorMessage::InvalidToken.to_string());

        let other = Authenticator::new(store, "another-secret", 60);
        let foreign = other.issue_token(&user).unwrap();
        let (auth, _, _) = setup(60).await;
        let err = auth.resolve_token(Some(&foreign)).await.unwrap_err();
        assert_eq!(unauthorized_message(err), ErrorMessage::InvalidToken.to_string());
    }

    #[tokio::test]
    async fn deleted_user_no_longer_resolves() {
        let (auth, store, user) = setup(60).await;
        let token = auth.issue_token(&user).unwrap();

        store.delete_user_cascade(user.id).await.unwrap();

        let err = auth.resolve_token(Some(&token)).await.unwrap_err();
        assert_eq!(unauthorized_message(err), ErrorMessage::UserNoLongerExist.to_string());
    }
}
