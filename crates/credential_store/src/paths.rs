use std::path::{Path, PathBuf};

pub const CREDENTIAL_FILE: [&str; 2] = [".editor_session", "credentials.json"];

#[must_use]
pub fn credential_path(root: &Path) -> PathBuf {
    root.join(CREDENTIAL_FILE[0]).join(CREDENTIAL_FILE[1])
}

#[must_use]
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    PathBuf::from(staging)
}
