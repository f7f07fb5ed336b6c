//! In-memory identity adapter.
//!
//! The identity boundary is external to this core: principals and
//! credentials are owned elsewhere. This adapter holds records seeded at
//! process start (or by tests) and is the only identity implementation
//! shipped here; a directory- or database-backed adapter would implement
//! the same port.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::ports::{IdentityStore, PrincipalRecord};
use crate::domain::{DomainResult, Error};

/// Identity store over a fixed set of in-memory credential records.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    records: HashMap<String, PrincipalRecord>,
}

impl InMemoryIdentityStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prepared credential record (password already hashed).
    #[must_use]
    pub fn with_record(mut self, record: PrincipalRecord) -> Self {
        self.records.insert(record.username.clone(), record);
        self
    }

    /// Add a user, hashing the plaintext password with the default bcrypt
    /// cost.
    ///
    /// # Errors
    /// Fails with [`Error::Store`] when hashing fails.
    pub fn with_user(
        self,
        id: i64,
        username: impl Into<String>,
        password: &str,
        roles: Vec<String>,
    ) -> DomainResult<Self> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|err| Error::store(format!("password hashing failed: {err}")))?;
        Ok(self.with_record(PrincipalRecord {
            id,
            username: username.into(),
            password_hash,
            roles,
        }))
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<PrincipalRecord>> {
        Ok(self.records.get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[tokio::test]
    async fn lookup_is_by_exact_username() {
        let store = InMemoryIdentityStore::new().with_record(PrincipalRecord {
            id: 1,
            username: "admin".into(),
            password_hash: "$2b$04$notarealhash".into(),
            roles: vec!["Admin".into()],
        });

        let found = store.find_by_username("admin").await.expect("lookup");
        assert_eq!(found.map(|record| record.id), Some(1));
        let missing = store.find_by_username("Admin").await.expect("lookup");
        assert!(missing.is_none());
    }
}
