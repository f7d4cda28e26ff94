use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{UserAccount, UserProfile, UserRole};
use crate::retry::{poll_until_some, RetryPolicy};
use crate::store::{RepositoryError, Store};

pub struct AuthService {
    store: Store,
    retry: RetryPolicy,
}

impl AuthService {
    pub fn new(store: Store) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    pub fn with_retry(store: Store, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Creates the account and profile documents for a freshly signed-up tourist.
    pub fn register(
        &self,
        uid: &str,
        email: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<UserAccount, AuthError> {
        let email = email.trim();
        if uid.trim().is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidRegistration);
        }

        let account = self
            .store
            .users
            .insert(UserAccount {
                uid: uid.to_string(),
                email: email.to_ascii_lowercase(),
                display_name: display_name.trim().to_string(),
                role: UserRole::Tourist,
                created_at: now,
                seed_id: None,
            })
            .map_err(|err| match err {
                RepositoryError::Conflict { .. } => AuthError::AlreadyRegistered(uid.to_string()),
                other => AuthError::Repository(other),
            })?;

        self.store.user_profiles.upsert(UserProfile {
            uid: uid.to_string(),
            phone: None,
            preferred_language: "es".to_string(),
            provider_lead_id: None,
        })?;

        info!(uid, "user registered");
        Ok(account)
    }

    /// Waits for the user document written by sign-up to become readable.
    pub async fn wait_for_user(&self, uid: &str) -> Result<UserAccount, AuthError> {
        let users = self.store.users.clone();
        let found = poll_until_some(self.retry, || {
            let result = users.fetch(uid);
            async move { result }
        })
        .await?;

        found.ok_or_else(|| {
            warn!(uid, retries = self.retry.max_retries, "user document never appeared");
            AuthError::UserNotReady(uid.to_string())
        })
    }

    pub fn get(&self, uid: &str) -> Result<Option<UserAccount>, AuthError> {
        Ok(self.store.users.fetch(uid)?)
    }

    pub fn set_role(&self, uid: &str, role: UserRole) -> Result<UserAccount, AuthError> {
        let mut account = self.store.users.require(uid)?;
        account.role = role;
        self.store.users.update(account.clone())?;
        Ok(account)
    }

    /// Registers `uid` as an administrator, or promotes the existing account.
    pub fn ensure_admin(
        &self,
        uid: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<UserAccount, AuthError> {
        if self.store.users.fetch(uid)?.is_none() {
            self.register(uid, email, "Administrador", now)?;
        }
        let account = self.set_role(uid, UserRole::Admin)?;
        info!(uid, "administrator ensured");
        Ok(account)
    }

    /// Resolves the caller and requires the admin role.
    pub fn authorize_admin(&self, uid: Option<&str>) -> Result<UserAccount, AuthError> {
        let uid = uid
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        match self.store.users.fetch(uid)? {
            Some(account) if account.role == UserRole::Admin => Ok(account),
            Some(_) => Err(AuthError::Forbidden(uid.to_string())),
            None => Err(AuthError::Unauthenticated),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("registration needs a uid and a valid email")]
    InvalidRegistration,
    #[error("user {0} is already registered")]
    AlreadyRegistered(String),
    #[error("user {0} is not available yet, try signing in again")]
    UserNotReady(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("user {0} is not an administrator")]
    Forbidden(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
