use std::fmt;

use serde::{Deserialize, Serialize};

pub const CREDENTIAL_VERSION: u32 = 1;

/// Persisted sign-in identity. The token is opaque and never inspected.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoredCredential {
    pub version: u32,
    pub email: String,
    pub token: String,
    pub saved_at: String,
}

impl StoredCredential {
    #[must_use]
    pub fn v1(
        email: impl Into<String>,
        token: impl Into<String>,
        saved_at: impl Into<String>,
    ) -> Self {
        Self {
            version: CREDENTIAL_VERSION,
            email: email.into(),
            token: token.into(),
            saved_at: saved_at.into(),
        }
    }
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("version", &self.version)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("saved_at", &self.saved_at)
            .finish()
    }
}
