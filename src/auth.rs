//! Session-scoped identity holder.
//!
//! Credential issuance happens elsewhere; this module only carries the
//! opaque bearer token and, when a [`CredentialStore`] is attached, keeps it
//! across restarts.

use std::fmt;
use std::sync::Mutex;

use credential_store::CredentialStore;
use tracing::{info, warn};

use crate::error::SessionError;
use crate::sync::lock_unpoisoned;

#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub token: String,
}

impl Identity {
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct AuthContext {
    identity: Mutex<Option<Identity>>,
    store: Option<CredentialStore>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_identity(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            identity: Mutex::new(Some(Identity::new(email, token))),
            store: None,
        }
    }

    /// Loads the persisted identity from `store`, which stays attached for
    /// later sign-in and sign-out. An unreadable or corrupt file leaves the
    /// context anonymous.
    pub fn hydrate(store: CredentialStore) -> Self {
        let identity = match store.load() {
            Ok(Some(stored)) => {
                info!(email = %stored.email, "restored persisted identity");
                Some(Identity::new(stored.email, stored.token))
            }
            Ok(None) => None,
            Err(error) => {
                warn!(%error, path = %store.path().display(), "ignoring unreadable credentials");
                None
            }
        };

        Self {
            identity: Mutex::new(identity),
            store: Some(store),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        lock_unpoisoned(&self.identity).clone()
    }

    pub fn token(&self) -> Option<String> {
        lock_unpoisoned(&self.identity)
            .as_ref()
            .map(|identity| identity.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        lock_unpoisoned(&self.identity).is_some()
    }

    /// Adopts an externally issued token. Persisted first when a store is
    /// attached, so a write failure leaves the previous identity in place.
    pub fn sign_in(&self, email: &str, token: &str) -> Result<Identity, SessionError> {
        let email = email.trim();
        let token = token.trim();
        if email.is_empty() {
            return Err(SessionError::validation("Email cannot be empty"));
        }
        if token.is_empty() {
            return Err(SessionError::validation("Token cannot be empty"));
        }

        if let Some(store) = &self.store {
            store.save(email, token)?;
        }

        let identity = Identity::new(email, token);
        *lock_unpoisoned(&self.identity) = Some(identity.clone());
        info!(email = %identity.email, "signed in");
        Ok(identity)
    }

    /// Clears the in-memory identity, then the persisted one.
    pub fn sign_out(&self) -> Result<(), SessionError> {
        let previous = lock_unpoisoned(&self.identity).take();
        if let Some(store) = &self.store {
            store.clear()?;
        }
        if let Some(previous) = previous {
            info!(email = %previous.email, "signed out");
        }
        Ok(())
    }
}
