//! Identity Store contract.
//!
//! The core treats user registration, password hashing, and user persistence
//! as someone else's problem (`spec.md` §1). This trait is the seam: callers
//! inject a concrete store (a database-backed implementation lives outside
//! this crate); an in-memory double is provided here for tests.

use async_trait::async_trait;

use crate::error::AuthError;

/// A projection of a registered user, just enough for token issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub subject: String,
    pub email: String,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Looks up a user by email, for login.
    async fn lookup(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    /// Verifies a presented credential against the stored one for `email`.
    /// Returns the user record on success.
    async fn verify(&self, email: &str, credential: &str) -> Result<Option<UserRecord>, AuthError>;

    /// Looks up a user by subject, used when redeeming a handoff code.
    async fn lookup_by_subject(&self, subject: &str) -> Result<Option<UserRecord>, AuthError>;

    /// Liveness probe for `GET /healthz`.
    async fn is_reachable(&self) -> bool {
        true
    }
}

/// In-memory identity store, for tests and local development only.
#[cfg(any(test, feature = "test-support"))]
pub mod memory {
    use super::*;
    use dashmap::DashMap;

    #[derive(Default)]
    pub struct InMemoryIdentityStore {
        by_email: DashMap<String, (UserRecord, String)>,
    }

    impl InMemoryIdentityStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_user(&self, subject: &str, email: &str, credential: &str) {
            self.by_email.insert(
                email.to_string(),
                (
                    UserRecord {
                        subject: subject.to_string(),
                        email: email.to_string(),
                    },
                    credential.to_string(),
                ),
            );
        }
    }

    #[async_trait]
    impl IdentityStore for InMemoryIdentityStore {
        async fn lookup(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
            Ok(self.by_email.get(email).map(|entry| entry.0.clone()))
        }

        async fn verify(&self, email: &str, credential: &str) -> Result<Option<UserRecord>, AuthError> {
            Ok(self.by_email.get(email).and_then(|entry| {
                let (user, stored_credential) = entry.value();
                (stored_credential == credential).then(|| user.clone())
            }))
        }

        async fn lookup_by_subject(&self, subject: &str) -> Result<Option<UserRecord>, AuthError> {
            Ok(self
                .by_email
                .iter()
                .map(|entry| entry.value().0.clone())
                .find(|user| user.subject == subject))
        }
    }
}
