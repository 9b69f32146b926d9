use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::CredentialStoreError;
use crate::paths::staging_path;
use crate::schema::{StoredCredential, CREDENTIAL_VERSION};

/// Single-file store for the signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Binds the store to `path`. Nothing is read or created until used.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the persisted credential, or `None` when nothing was saved.
    pub fn load(&self) -> Result<Option<StoredCredential>, CredentialStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CredentialStoreError::io(
                    "reading credential file",
                    &self.path,
                    source,
                ))
            }
        };

        let credential = serde_json::from_str::<StoredCredential>(&raw)
            .map_err(|source| CredentialStoreError::json_parse(&self.path, source))?;
        validate_credential(&self.path, &credential)?;
        Ok(Some(credential))
    }

    /// Persists the identity, replacing any previous one.
    pub fn save(
        &self,
        email: &str,
        token: &str,
    ) -> Result<StoredCredential, CredentialStoreError> {
        if email.trim().is_empty() {
            return Err(CredentialStoreError::EmptyInput { field: "email" });
        }
        if token.trim().is_empty() {
            return Err(CredentialStoreError::EmptyInput { field: "token" });
        }

        let credential = StoredCredential::v1(email.trim(), token.trim(), now_rfc3339()?);
        let encoded = serde_json::to_vec_pretty(&credential)
            .map_err(|source| CredentialStoreError::json_serialize(&self.path, source))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                CredentialStoreError::io("creating credential directory", parent, source)
            })?;
        }

        let staging = staging_path(&self.path);
        fs::write(&staging, encoded).map_err(|source| {
            CredentialStoreError::io("writing credential file", &staging, source)
        })?;
        restrict_permissions(&staging)?;
        fs::rename(&staging, &self.path).map_err(|source| {
            CredentialStoreError::io("replacing credential file", &self.path, source)
        })?;

        debug!(path = %self.path.display(), "credential saved");
        Ok(credential)
    }

    /// Removes the persisted credential. Returns whether a file existed.
    pub fn clear(&self) -> Result<bool, CredentialStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "credential cleared");
                Ok(true)
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CredentialStoreError::io(
                "removing credential file",
                &self.path,
                source,
            )),
        }
    }
}

fn validate_credential(
    path: &Path,
    credential: &StoredCredential,
) -> Result<(), CredentialStoreError> {
    if credential.version != CREDENTIAL_VERSION {
        return Err(CredentialStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: credential.version,
        });
    }

    if credential.email.trim().is_empty() {
        return Err(CredentialStoreError::EmptyField {
            path: path.to_path_buf(),
            field: "email",
        });
    }

    if credential.token.trim().is_empty() {
        return Err(CredentialStoreError::EmptyField {
            path: path.to_path_buf(),
            field: "token",
        });
    }

    if OffsetDateTime::parse(&credential.saved_at, &Rfc3339).is_err() {
        return Err(CredentialStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            value: credential.saved_at.clone(),
        });
    }

    Ok(())
}

fn now_rfc3339() -> Result<String, CredentialStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(CredentialStoreError::ClockFormat)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), CredentialStoreError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
        CredentialStoreError::io("restricting credential file permissions", path, source)
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), CredentialStoreError> {
    Ok(())
}
