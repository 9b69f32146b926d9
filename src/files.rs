//! Authenticated file workflow: listing cache, upload, rename, download.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use runner_api::{FileRecord, RunnerApiError};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::auth::AuthContext;
use crate::backend::FileBackend;
use crate::error::SessionError;
use crate::sync::lock_unpoisoned;

pub const FILENAME_EMPTY: &str = "Filename cannot be empty";
pub const INVALID_FILE_ID: &str = "Invalid file ID";
pub const FETCH_FAILED: &str = "Failed to fetch files";
pub const SAVE_FAILED: &str = "Failed to save file";
pub const RENAME_FAILED: &str = "Failed to rename file";
pub const DOWNLOAD_FAILED: &str = "Failed to download file";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FileListing {
    #[default]
    NotLoaded,
    Loaded(Vec<FileRecord>),
}

impl FileListing {
    pub fn files(&self) -> &[FileRecord] {
        match self {
            Self::NotLoaded => &[],
            Self::Loaded(files) => files,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn find(&self, file_id: &str) -> Option<&FileRecord> {
        self.files().iter().find(|record| record.id == file_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Default)]
struct ListingCache {
    files: Option<Vec<FileRecord>>,
    /// Token the listing was fetched under.
    owner: Option<String>,
    stale: bool,
}

pub struct FileSessionManager {
    backend: Arc<dyn FileBackend>,
    auth: Arc<AuthContext>,
    cache: Mutex<ListingCache>,
    renames_in_flight: Mutex<HashSet<String>>,
}

impl FileSessionManager {
    pub fn new(backend: Arc<dyn FileBackend>, auth: Arc<AuthContext>) -> Self {
        Self {
            backend,
            auth,
            cache: Mutex::new(ListingCache::default()),
            renames_in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    fn require_token(&self) -> Result<String, SessionError> {
        self.auth.token().ok_or(SessionError::AuthRequired)
    }

    /// Fetches the listing unconditionally and replaces the cache.
    pub async fn list(&self) -> Result<Vec<FileRecord>, SessionError> {
        let token = self.require_token()?;
        let files = self
            .backend
            .list_files(&token)
            .await
            .map_err(|error| map_file_error(error, FETCH_FAILED))?;

        debug!(count = files.len(), "file listing fetched");
        let mut cache = lock_unpoisoned(&self.cache);
        cache.files = Some(files.clone());
        cache.owner = Some(token);
        cache.stale = false;
        Ok(files)
    }

    /// Returns the cached listing when it is fresh and belongs to the
    /// current identity; otherwise fetches.
    pub async fn listing(&self) -> Result<Vec<FileRecord>, SessionError> {
        if !self.needs_fetch() {
            if let FileListing::Loaded(files) = self.cached() {
                return Ok(files);
            }
        }
        self.list().await
    }

    /// True when the next [`listing`](Self::listing) call would hit the network.
    pub fn needs_fetch(&self) -> bool {
        let token = self.auth.token();
        let cache = lock_unpoisoned(&self.cache);
        cache.stale || cache.files.is_none() || token.is_none() || cache.owner != token
    }

    /// The cache as seen by the current identity.
    pub fn cached(&self) -> FileListing {
        let token = self.auth.token();
        let cache = lock_unpoisoned(&self.cache);
        match (&cache.files, token) {
            (Some(files), Some(token)) if cache.owner.as_deref() == Some(token.as_str()) => {
                FileListing::Loaded(files.clone())
            }
            _ => FileListing::NotLoaded,
        }
    }

    pub fn is_stale(&self) -> bool {
        lock_unpoisoned(&self.cache).stale
    }

    pub fn invalidate(&self) {
        lock_unpoisoned(&self.cache).stale = true;
    }

    /// Drops the cached listing entirely.
    pub fn discard(&self) {
        *lock_unpoisoned(&self.cache) = ListingCache::default();
    }

    /// Stores a new file. `Ok(None)` when the store accepted the upload
    /// without echoing the created record; the listing is stale either way.
    pub async fn upload(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Option<FileRecord>, SessionError> {
        let token = self.require_token()?;
        let record = self
            .backend
            .upload_file(&token, filename, content)
            .await
            .map_err(|error| map_file_error(error, SAVE_FAILED))?;

        self.invalidate();
        match &record {
            Some(record) => info!(file_id = %record.id, filename = %record.filename, "file uploaded"),
            None => info!(filename, "file uploaded"),
        }
        Ok(record)
    }

    /// Renames a stored file. The new name is trimmed; blank names and ids
    /// are rejected before any request is made.
    pub async fn rename(&self, file_id: &str, new_name: &str) -> Result<FileRecord, SessionError> {
        let filename = new_name.trim();
        if filename.is_empty() {
            return Err(SessionError::validation(FILENAME_EMPTY));
        }
        if file_id.trim().is_empty() {
            return Err(SessionError::validation(INVALID_FILE_ID));
        }
        let token = self.require_token()?;

        let _guard = RenameGuard::acquire(&self.renames_in_flight, file_id)?;
        let record = self
            .backend
            .rename_file(&token, file_id, filename)
            .await
            .map_err(|error| map_file_error(error, RENAME_FAILED))?;

        info!(file_id, filename, "file renamed");
        self.invalidate();
        Ok(record)
    }

    pub fn is_renaming(&self, file_id: &str) -> bool {
        lock_unpoisoned(&self.renames_in_flight).contains(file_id)
    }

    pub async fn download(&self, file_id: &str, filename: &str) -> Result<DownloadedFile, SessionError> {
        if file_id.trim().is_empty() {
            return Err(SessionError::validation(INVALID_FILE_ID));
        }
        let token = self.require_token()?;
        let content = self
            .backend
            .download_file(&token, file_id)
            .await
            .map_err(|error| map_file_error(error, DOWNLOAD_FAILED))?;

        debug!(file_id, bytes = content.len(), "file downloaded");
        Ok(DownloadedFile {
            filename: filename.to_string(),
            content,
        })
    }
}

struct RenameGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    file_id: String,
}

impl<'a> RenameGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<String>>, file_id: &str) -> Result<Self, SessionError> {
        if !lock_unpoisoned(in_flight).insert(file_id.to_string()) {
            return Err(SessionError::RenameInFlight(file_id.to_string()));
        }
        Ok(Self {
            in_flight,
            file_id: file_id.to_string(),
        })
    }
}

impl Drop for RenameGuard<'_> {
    fn drop(&mut self) {
        lock_unpoisoned(self.in_flight).remove(&self.file_id);
    }
}

fn map_file_error(error: RunnerApiError, fallback: &str) -> SessionError {
    if matches!(error, RunnerApiError::MissingBearerToken) {
        return SessionError::AuthRequired;
    }
    warn!(%error, operation = fallback, "file operation failed");
    if error.is_auth_rejected() {
        SessionError::AuthRejected(fallback.to_string())
    } else if error.is_transport() {
        SessionError::Transport(fallback.to_string())
    } else {
        SessionError::Server(fallback.to_string())
    }
}

/// Renders an RFC 3339 upload timestamp as `Oct 16, 2026, 02:30 PM`, in
/// the timestamp's own offset.
pub fn format_uploaded_at(raw: &str) -> Option<String> {
    let parsed = OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()?;
    let format = format_description!(
        "[month repr:short] [day padding:none], [year], [hour repr:12]:[minute] [period]"
    );
    parsed.format(format).ok()
}
