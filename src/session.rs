//! The editor session: single writer of editor state.
//!
//! [`EditorSession`] composes the connection monitor, execution
//! orchestrator, file manager and deferred timers. Every mutation bumps the
//! revision and publishes a fresh [`SessionSnapshot`] to subscribers. The
//! state lock is never held across an await or while observers run.
//!
//! Host effects (navigation to sign-in, writing downloaded bytes) go
//! through [`HostOps`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use credential_store::CredentialStore;
use runner_api::{Endpoint, FileRecord, RunnerApiClient};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::backend::{ExecutionBackend, FileBackend};
use crate::config::SessionConfig;
use crate::connection::{ConnectionMonitor, ConnectionStatus};
use crate::error::SessionError;
use crate::execution::{ExecutionOrchestrator, ExecutionRequest, ExecutionResult, ExecutionStatus};
use crate::files::{FileListing, FileSessionManager, DOWNLOAD_FAILED, INVALID_FILE_ID};
use crate::language::{LanguageCatalog, LanguageDescriptor};
use crate::sync::lock_unpoisoned;
use crate::timers::{DeferredKind, DeferredTasks};

pub const SAVE_SIGN_IN_NOTICE: &str = "Please login to save files";
pub const SAVE_SUCCESS_NOTICE: &str = "File saved successfully!";
pub const LOGIN_REDIRECT_DELAY: Duration = Duration::from_millis(2000);
pub const SAVE_NOTICE_CLEAR_DELAY: Duration = Duration::from_millis(3000);

pub trait HostOps: Send + Sync + 'static {
    fn redirect_to_login(&self);
    fn save_download(&self, filename: &str, content: &[u8]) -> Result<(), String>;
}

pub type SessionObserver = Arc<dyn Fn(&SessionSnapshot) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameKey {
    Enter,
    Escape,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameDraft {
    pub file_id: String,
    pub draft: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub language: &'static LanguageDescriptor,
    pub source: String,
    pub output: String,
    pub error: Option<String>,
    pub connection: ConnectionStatus,
    pub execution: ExecutionStatus,
    pub listing: FileListing,
    pub files_error: Option<String>,
    pub files_panel_open: bool,
    pub files_loading: bool,
    pub rename: Option<RenameDraft>,
    pub save_notice: Option<String>,
    pub saving: bool,
    pub authenticated: bool,
    pub revision: u64,
}

struct SessionState {
    language: &'static LanguageDescriptor,
    source: String,
    output: String,
    error: Option<String>,
    files_error: Option<String>,
    files_panel_open: bool,
    files_loading: bool,
    rename: Option<RenameDraft>,
    save_notice: Option<String>,
    saving: bool,
    torn_down: bool,
    revision: u64,
    observers: Vec<SessionObserver>,
}

impl SessionState {
    fn new(language: &'static LanguageDescriptor) -> Self {
        Self {
            language,
            source: language.default_source.to_string(),
            output: String::new(),
            error: None,
            files_error: None,
            files_panel_open: false,
            files_loading: false,
            rename: None,
            save_notice: None,
            saving: false,
            torn_down: false,
            revision: 0,
            observers: Vec::new(),
        }
    }
}

struct SessionShared {
    id: Uuid,
    catalog: LanguageCatalog,
    connection: ConnectionMonitor,
    execution: ExecutionOrchestrator,
    files: FileSessionManager,
    auth: Arc<AuthContext>,
    host: Arc<dyn HostOps>,
    timers: DeferredTasks,
    state: Mutex<SessionState>,
}

impl SessionShared {
    fn is_torn_down(&self) -> bool {
        lock_unpoisoned(&self.state).torn_down
    }

    fn snapshot_of(&self, state: &SessionState) -> SessionSnapshot {
        SessionSnapshot {
            language: state.language,
            source: state.source.clone(),
            output: state.output.clone(),
            error: state.error.clone(),
            connection: self.connection.status(),
            execution: self.execution.status(),
            listing: self.files.cached(),
            files_error: state.files_error.clone(),
            files_panel_open: state.files_panel_open,
            files_loading: state.files_loading,
            rename: state.rename.clone(),
            save_notice: state.save_notice.clone(),
            saving: state.saving,
            authenticated: self.auth.is_authenticated(),
            revision: state.revision,
        }
    }

    /// Applies `apply` and publishes. `None` once torn down.
    fn update<R>(&self, apply: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        let (result, snapshot, observers) = {
            let mut state = lock_unpoisoned(&self.state);
            if state.torn_down {
                return None;
            }
            let result = apply(&mut state);
            state.revision += 1;
            (result, self.snapshot_of(&state), state.observers.clone())
        };

        for observer in &observers {
            observer(&snapshot);
        }
        Some(result)
    }

    fn publish(&self) -> Option<()> {
        self.update(|_| ())
    }

    fn read<R>(&self, inspect: impl FnOnce(&SessionState) -> R) -> R {
        inspect(&lock_unpoisoned(&self.state))
    }
}

#[derive(Clone)]
pub struct EditorSession {
    shared: Arc<SessionShared>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("id", &self.shared.id)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    pub fn new(
        execution_backend: Arc<dyn ExecutionBackend>,
        file_backend: Arc<dyn FileBackend>,
        auth: Arc<AuthContext>,
        host: Arc<dyn HostOps>,
        execution_timeout: Option<Duration>,
    ) -> Self {
        let catalog = LanguageCatalog;
        let language = catalog.default_language();
        let shared = SessionShared {
            id: Uuid::new_v4(),
            catalog,
            connection: ConnectionMonitor::new(Arc::clone(&execution_backend)),
            execution: ExecutionOrchestrator::new(execution_backend, execution_timeout),
            files: FileSessionManager::new(file_backend, Arc::clone(&auth)),
            auth,
            host,
            timers: DeferredTasks::new(),
            state: Mutex::new(SessionState::new(language)),
        };
        debug!(session = %shared.id, language = language.id, "session created");
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Builds a session talking to the configured runner service.
    pub fn from_config(config: &SessionConfig, host: Arc<dyn HostOps>) -> Result<Self, SessionError> {
        let client = RunnerApiClient::new(config.runner_api_config())
            .map_err(|error| SessionError::Connection(error.to_string()))?;
        client
            .endpoint_url(&Endpoint::Health)
            .map_err(|error| SessionError::Connection(error.to_string()))?;
        let client = Arc::new(client);
        let auth = match &config.credentials_path {
            Some(path) => AuthContext::hydrate(CredentialStore::new(path)),
            None => AuthContext::anonymous(),
        };

        Ok(Self::new(
            Arc::clone(&client) as Arc<dyn ExecutionBackend>,
            client,
            Arc::new(auth),
            host,
            config.execution_timeout,
        ))
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.shared.auth
    }

    /// Probes the service once.
    pub async fn begin(&self) -> ConnectionStatus {
        self.probe_connection().await
    }

    pub async fn probe_connection(&self) -> ConnectionStatus {
        let status = self.shared.connection.probe().await;
        info!(session = %self.shared.id, ?status, "connection status");
        self.shared.publish();
        status
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.read(|state| self.shared.snapshot_of(state))
    }

    /// Registers an observer for every subsequent snapshot. Ignored after
    /// teardown.
    pub fn subscribe(&self, observer: impl Fn(&SessionSnapshot) + Send + Sync + 'static) {
        let mut state = lock_unpoisoned(&self.shared.state);
        if !state.torn_down {
            state.observers.push(Arc::new(observer));
        }
    }

    /// Switches language and resets the buffer to its template. Edits to
    /// the previous buffer are discarded.
    pub fn select_language(&self, language_id: &str) -> Result<(), SessionError> {
        let language = self.shared.catalog.get(language_id)?;
        self.shared
            .update(|state| {
                state.language = language;
                state.source = language.default_source.to_string();
                state.output.clear();
                state.error = None;
            })
            .ok_or(SessionError::Closed)?;
        debug!(session = %self.shared.id, language = language.id, "language selected");
        Ok(())
    }

    pub fn edit_source(&self, text: impl Into<String>) {
        let text = text.into();
        self.shared.update(|state| state.source = text);
    }

    pub fn clear_output(&self) {
        self.shared.update(|state| {
            state.output.clear();
            state.error = None;
        });
    }

    /// Submits the current buffer.
    ///
    /// Returns the execution result, including application errors. A result
    /// arriving after teardown is returned but not applied.
    pub async fn run(&self) -> Result<ExecutionResult, SessionError> {
        let shared = &self.shared;
        if shared.is_torn_down() {
            return Err(SessionError::Closed);
        }

        let ticket = match shared.execution.begin(&shared.connection) {
            Ok(ticket) => ticket,
            Err(SessionError::ExecutionInFlight) => return Err(SessionError::ExecutionInFlight),
            Err(error) => {
                let message = error.to_string();
                shared.update(|state| state.error = Some(message));
                return Err(error);
            }
        };

        let Some(request) = shared.update(|state| {
            state.output.clear();
            state.error = None;
            ExecutionRequest::new(state.language.id, state.source.clone())
        }) else {
            shared.execution.abandon(ticket);
            return Err(SessionError::Closed);
        };

        let result = shared
            .execution
            .complete(ticket, &request, &shared.connection)
            .await;

        let applied = shared.update(|state| {
            state.output = result.output().to_string();
            state.error = result.error().map(str::to_string);
        });
        shared.execution.settle();
        match applied {
            Some(()) => {
                shared.publish();
            }
            None => debug!(session = %shared.id, "execution result arrived after teardown"),
        }
        Ok(result)
    }

    /// Uploads the buffer as `code<extension>`.
    ///
    /// Without an identity the sign-in notice is shown and the host is sent
    /// to sign-in after [`LOGIN_REDIRECT_DELAY`]. A save issued while one is
    /// in flight is ignored.
    pub async fn save(&self) -> Result<(), SessionError> {
        let shared = &self.shared;
        if !shared.auth.is_authenticated() {
            shared
                .update(|state| state.save_notice = Some(SAVE_SIGN_IN_NOTICE.to_string()))
                .ok_or(SessionError::Closed)?;
            self.schedule_login_redirect();
            return Err(SessionError::AuthRequired);
        }

        if shared.read(|state| state.saving) {
            debug!(session = %shared.id, "save ignored while saving");
            return Ok(());
        }
        let claimed = shared
            .update(|state| {
                if state.saving {
                    return None;
                }
                state.saving = true;
                state.save_notice = None;
                Some((
                    LanguageCatalog::save_filename(state.language),
                    state.source.clone().into_bytes(),
                ))
            })
            .ok_or(SessionError::Closed)?;
        let Some((filename, content)) = claimed else {
            return Ok(());
        };

        let outcome = shared.files.upload(&filename, content).await;
        let notice = match &outcome {
            Ok(_) => SAVE_SUCCESS_NOTICE.to_string(),
            Err(error) => error.to_string(),
        };
        let panel_open = shared
            .update(|state| {
                state.saving = false;
                state.save_notice = Some(notice);
                state.files_panel_open
            })
            .ok_or(SessionError::Closed)?;

        match outcome {
            Ok(record) => {
                let file_id = record.map(|record| record.id);
                info!(session = %shared.id, file_id = ?file_id, "buffer saved");
                self.schedule_notice_clear();
                if panel_open {
                    // Listing failures surface in files_error; the save itself succeeded.
                    let _ = self.refresh_files().await;
                }
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    fn schedule_login_redirect(&self) {
        let weak = Arc::downgrade(&self.shared);
        self.shared
            .timers
            .schedule(DeferredKind::LoginRedirect, LOGIN_REDIRECT_DELAY, move || {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                if shared.is_torn_down() {
                    return;
                }
                info!(session = %shared.id, "redirecting to sign-in");
                shared.host.redirect_to_login();
            });
    }

    fn schedule_notice_clear(&self) {
        let weak = Arc::downgrade(&self.shared);
        self.shared
            .timers
            .schedule(DeferredKind::SaveNoticeClear, SAVE_NOTICE_CLEAR_DELAY, move || {
                if let Some(shared) = weak.upgrade() {
                    shared.update(|state| {
                        if state.save_notice.as_deref() == Some(SAVE_SUCCESS_NOTICE) {
                            state.save_notice = None;
                        }
                    });
                }
            });
    }

    /// Opens the files panel, fetching when the listing is missing or stale.
    pub async fn open_files_panel(&self) -> Result<(), SessionError> {
        let shared = &self.shared;
        shared
            .update(|state| state.files_panel_open = true)
            .ok_or(SessionError::Closed)?;

        if !shared.auth.is_authenticated() {
            let error = SessionError::AuthRequired;
            let message = error.to_string();
            shared.update(|state| state.files_error = Some(message));
            return Err(error);
        }
        if shared.files.needs_fetch() {
            return self.refresh_files().await;
        }
        Ok(())
    }

    /// Closes the panel. The next opening re-fetches.
    pub fn close_files_panel(&self) {
        self.shared.files.invalidate();
        self.shared.update(|state| {
            state.files_panel_open = false;
            state.rename = None;
        });
    }

    pub async fn toggle_files_panel(&self) -> Result<(), SessionError> {
        if self.shared.read(|state| state.files_panel_open) {
            self.close_files_panel();
            Ok(())
        } else {
            self.open_files_panel().await
        }
    }

    pub async fn refresh_files(&self) -> Result<(), SessionError> {
        let shared = &self.shared;
        shared
            .update(|state| {
                state.files_loading = true;
                state.files_error = None;
            })
            .ok_or(SessionError::Closed)?;

        let outcome = shared.files.list().await;
        let files_error = outcome.as_ref().err().map(ToString::to_string);
        if shared
            .update(|state| {
                state.files_loading = false;
                state.files_error = files_error;
            })
            .is_none()
        {
            debug!(session = %shared.id, "file listing arrived after teardown");
        }
        outcome.map(|_| ())
    }

    /// Enters rename mode for a listed file, replacing any other draft.
    pub fn start_rename(&self, file_id: &str) -> Result<(), SessionError> {
        let listing = self.shared.files.cached();
        let record = listing
            .find(file_id)
            .ok_or_else(|| SessionError::validation(INVALID_FILE_ID))?;
        let draft = RenameDraft {
            file_id: record.id.clone(),
            draft: record.filename.clone(),
        };
        self.shared
            .update(|state| {
                state.rename = Some(draft);
                state.files_error = None;
            })
            .ok_or(SessionError::Closed)
    }

    pub fn edit_rename_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.shared.update(|state| {
            if let Some(rename) = state.rename.as_mut() {
                rename.draft = text;
            }
        });
    }

    /// Commits the active draft. On failure the draft stays open and the
    /// message lands in `files_error`. `Ok(None)` when nothing is being
    /// renamed.
    pub async fn commit_rename(&self) -> Result<Option<FileRecord>, SessionError> {
        let shared = &self.shared;
        let Some(RenameDraft { file_id, draft }) = shared.read(|state| state.rename.clone()) else {
            return Ok(None);
        };

        match shared.files.rename(&file_id, &draft).await {
            Ok(record) => {
                shared
                    .update(|state| {
                        if state
                            .rename
                            .as_ref()
                            .is_some_and(|rename| rename.file_id == file_id)
                        {
                            state.rename = None;
                        }
                        state.files_error = None;
                    })
                    .ok_or(SessionError::Closed)?;
                if let Err(error) = self.refresh_files().await {
                    debug!(session = %shared.id, %error, "listing refresh after rename failed");
                }
                Ok(Some(record))
            }
            Err(error) => {
                let message = error.to_string();
                shared.update(|state| state.files_error = Some(message));
                Err(error)
            }
        }
    }

    /// Leaves rename mode without any request.
    pub fn cancel_rename(&self) {
        self.shared.update(|state| state.rename = None);
    }

    pub async fn on_rename_key(&self, key: RenameKey) -> Result<(), SessionError> {
        match key {
            RenameKey::Enter => self.commit_rename().await.map(|_| ()),
            RenameKey::Escape => {
                self.cancel_rename();
                Ok(())
            }
            RenameKey::Other => Ok(()),
        }
    }

    /// Fetches a stored file and hands its bytes to the host.
    pub async fn download(&self, file_id: &str, filename: &str) -> Result<(), SessionError> {
        let shared = &self.shared;
        let outcome = match shared.files.download(file_id, filename).await {
            Ok(file) => shared
                .host
                .save_download(&file.filename, &file.content)
                .map_err(|message| {
                    warn!(session = %shared.id, file_id, %message, "host rejected download");
                    SessionError::Server(DOWNLOAD_FAILED.to_string())
                }),
            Err(error) => Err(error),
        };

        if let Err(error) = &outcome {
            let message = error.to_string();
            shared.update(|state| state.files_error = Some(message));
        }
        outcome
    }

    /// Adopts an externally issued token. With the files panel open the
    /// listing is re-fetched under the new identity.
    pub async fn sign_in(&self, email: &str, token: &str) -> Result<(), SessionError> {
        self.shared.auth.sign_in(email, token)?;
        self.shared.files.discard();
        self.shared.timers.cancel(DeferredKind::LoginRedirect);
        let panel_open = self
            .shared
            .update(|state| {
                state.rename = None;
                state.files_error = None;
                state.files_panel_open
            })
            .ok_or(SessionError::Closed)?;

        if panel_open {
            self.refresh_files().await?;
        }
        Ok(())
    }

    /// Drops the identity and everything fetched under it.
    pub fn sign_out(&self) -> Result<(), SessionError> {
        let outcome = self.shared.auth.sign_out();
        self.shared.files.discard();
        self.shared.update(|state| {
            state.rename = None;
            state.files_error = None;
            state.save_notice = None;
        });
        outcome
    }

    /// Cancels deferred work and detaches observers. Later results and
    /// timers leave the state untouched.
    pub fn teardown(&self) {
        self.shared.timers.cancel_all();
        let observers = {
            let mut state = lock_unpoisoned(&self.shared.state);
            state.torn_down = true;
            std::mem::take(&mut state.observers)
        };
        drop(observers);
        info!(session = %self.shared.id, "session torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.is_torn_down()
    }

    pub fn is_pending(&self, kind: DeferredKind) -> bool {
        self.shared.timers.is_pending(kind)
    }
}
