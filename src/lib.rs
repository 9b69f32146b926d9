//! Editor session core for a browser code runner.
//!
//! Invariant: [`EditorSession`] is the only writer of session state; hosts
//! observe it through [`SessionSnapshot`]s.
//!
//! # Public API Overview
//! - Compose a session via [`EditorSession::new`] or [`EditorSession::from_config`].
//! - Pick a language from the [`LanguageCatalog`] and edit the buffer.
//! - Run code through the [`ExecutionOrchestrator`], gated by the [`ConnectionMonitor`].
//! - Save, list, rename and download files with the [`FileSessionManager`].
//!
//! Transport lives in the `runner_api` crate; identity persistence in
//! `credential_store`.

#![allow(clippy::type_complexity)]

pub mod auth;
pub mod backend;
pub mod config;
pub mod connection;
pub mod error;
pub mod execution;
pub mod files;
pub mod language;
pub mod logging;
pub mod session;
pub mod timers;

mod sync;

pub use crate::auth::{AuthContext, Identity};
pub use crate::backend::{ExecutionBackend, FileBackend};
pub use crate::config::SessionConfig;
pub use crate::connection::{ConnectionMonitor, ConnectionStatus};
pub use crate::error::SessionError;
pub use crate::execution::{
    interpret_response, ExecutionOrchestrator, ExecutionRequest, ExecutionResult,
    ExecutionStatus, ExecutionTicket,
};
pub use crate::files::{format_uploaded_at, DownloadedFile, FileListing, FileSessionManager};
pub use crate::language::{LanguageCatalog, LanguageDescriptor, LANGUAGES};
pub use crate::session::{
    EditorSession, HostOps, RenameDraft, RenameKey, SessionObserver, SessionSnapshot,
};
pub use crate::timers::{DeferredKind, DeferredTasks};

pub use runner_api::FileRecord;
