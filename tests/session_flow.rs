mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use credential_store::{credential_path, CredentialStore};
use editor_session::{
    AuthContext, ConnectionStatus, EditorSession, ExecutionStatus, FileListing, HostOps,
    SessionConfig, SessionError,
};
use pretty_assertions::assert_eq;
use support::{build_session, sample_files, signed_in, FakeRunner, HostSpy, RunScript, EMAIL};
use tempfile::tempdir;

#[tokio::test]
async fn begin_probes_once_and_publishes_increasing_revisions() {
    let runner = FakeRunner::healthy();
    let host = HostSpy::new();
    let session = build_session(&runner, AuthContext::anonymous(), &host, None);

    let revisions = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&revisions);
    session.subscribe(move |snapshot| {
        support::lock_unpoisoned(&seen).push(snapshot.revision);
    });

    assert_eq!(session.begin().await, ConnectionStatus::Connected);
    session.edit_source("x = 1");
    session.clear_output();

    assert_eq!(runner.trace().health_calls, 1);
    let revisions = support::lock_unpoisoned(&revisions).clone();
    assert_eq!(revisions.len(), 3);
    assert!(revisions.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(session.snapshot().revision, revisions[2]);
}

#[tokio::test]
async fn initial_snapshot_uses_python_template() {
    let runner = FakeRunner::healthy();
    let host = HostSpy::new();
    let session = build_session(&runner, AuthContext::anonymous(), &host, None);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.language.id, "python");
    assert!(snapshot.source.contains("print(\"Hello, World!\")"));
    assert_eq!(snapshot.connection, ConnectionStatus::Unknown);
    assert_eq!(snapshot.execution, ExecutionStatus::Idle);
    assert_eq!(snapshot.listing, FileListing::NotLoaded);
    assert!(!snapshot.authenticated);
}

#[tokio::test(start_paused = true)]
async fn late_execution_result_is_not_applied_after_teardown() {
    let runner = FakeRunner::healthy();
    runner.trace().run_delay = Some(Duration::from_secs(2));
    runner.push_run(RunScript::stdout("late\n"));
    let host = HostSpy::new();
    let session = build_session(&runner, AuthContext::anonymous(), &host, None);
    session.begin().await;

    let notified = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&notified);
    session.subscribe(move |_| *support::lock_unpoisoned(&counter) += 1);

    let background = session.clone();
    let pending = tokio::spawn(async move { background.run().await });
    tokio::task::yield_now().await;
    let before = *support::lock_unpoisoned(&notified);
    session.teardown();

    let result = pending.await.expect("join").expect("run");
    assert_eq!(result.output(), "late\n");
    assert_eq!(session.snapshot().output, "");
    assert_eq!(*support::lock_unpoisoned(&notified), before);
    assert!(session.is_torn_down());
    assert_matches!(session.run().await, Err(SessionError::Closed));
}

#[tokio::test]
async fn sign_out_discards_listing_and_rename() {
    let runner = FakeRunner::healthy().with_files(sample_files());
    let host = HostSpy::new();
    let session = build_session(&runner, signed_in(), &host, None);
    session.open_files_panel().await.expect("open");
    session.start_rename("f1").expect("start");

    session.sign_out().expect("sign out");

    let snapshot = session.snapshot();
    assert!(!snapshot.authenticated);
    assert_eq!(snapshot.listing, FileListing::NotLoaded);
    assert_eq!(snapshot.rename, None);
}

#[tokio::test]
async fn sign_in_enables_file_workflow() {
    let runner = FakeRunner::healthy().with_files(sample_files());
    let host = HostSpy::new();
    let session = build_session(&runner, AuthContext::anonymous(), &host, None);
    assert_matches!(session.open_files_panel().await, Err(SessionError::AuthRequired));
    assert!(runner.trace().list_calls.is_empty());

    session.sign_in(EMAIL, "tok-new").await.expect("sign in");
    session.refresh_files().await.expect("refresh");

    let snapshot = session.snapshot();
    assert!(snapshot.authenticated);
    assert_eq!(snapshot.files_error, None);
    assert_eq!(snapshot.listing.files().len(), 2);
    assert_eq!(runner.trace().list_calls, vec!["tok-new".to_string()]);
}

#[tokio::test]
async fn from_config_hydrates_persisted_identity() {
    let dir = tempdir().expect("tempdir");
    let path = credential_path(dir.path());
    CredentialStore::new(&path)
        .save(EMAIL, "persisted-token")
        .expect("save credential");

    let config = SessionConfig {
        api_base_url: "http://127.0.0.1:9".to_string(),
        credentials_path: Some(path),
        ..SessionConfig::default()
    };
    let host: Arc<dyn HostOps> = HostSpy::new();
    let session = EditorSession::from_config(&config, host).expect("session");

    assert!(session.snapshot().authenticated);
    assert_eq!(session.auth().token().as_deref(), Some("persisted-token"));
}

#[tokio::test]
async fn from_config_rejects_invalid_base_url() {
    let config = SessionConfig {
        api_base_url: "ftp://example.com".to_string(),
        ..SessionConfig::default()
    };
    let host: Arc<dyn HostOps> = HostSpy::new();

    assert_matches!(
        EditorSession::from_config(&config, host),
        Err(SessionError::Connection(_))
    );
}

#[tokio::test]
async fn sign_in_with_open_panel_refetches_under_new_identity() {
    let runner = FakeRunner::healthy().with_files(sample_files());
    let host = HostSpy::new();
    let session = build_session(&runner, signed_in(), &host, None);
    session.open_files_panel().await.expect("open");

    session.sign_in("other@example.com", "tok-other").await.expect("sign in");

    let snapshot = session.snapshot();
    assert!(snapshot.files_panel_open);
    assert_eq!(snapshot.listing.files().len(), 2);
    assert_eq!(
        runner.trace().list_calls,
        vec![support::TOKEN.to_string(), "tok-other".to_string()]
    );
}

#[tokio::test]
async fn sign_in_with_closed_panel_does_not_fetch() {
    let runner = FakeRunner::healthy().with_files(sample_files());
    let host = HostSpy::new();
    let session = build_session(&runner, AuthContext::anonymous(), &host, None);

    session.sign_in(EMAIL, "tok-new").await.expect("sign in");

    assert!(runner.trace().list_calls.is_empty());
    assert_eq!(session.snapshot().listing, FileListing::NotLoaded);
}
