use serde::{Deserialize, Serialize};

/// Request body for `POST /run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub language: String,
    pub code: String,
}

impl RunRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
        }
    }
}

/// Response body for `POST /run`: either an application error or run output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<RunOutput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
}

impl RunOutput {
    pub fn stdout(&self) -> &str {
        self.stdout.as_deref().unwrap_or_default()
    }

    pub fn stderr(&self) -> &str {
        self.stderr.as_deref().unwrap_or_default()
    }
}

/// A stored source file as projected by the remote store.
///
/// Also accepts the legacy listing shape (numeric `id`, `upload_date`).
/// When both `_id` and `id` are present, `_id` wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFileRecord")]
pub struct FileRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub filename: String,
    #[serde(rename = "uploadedAt", skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(rename = "storedName", default, skip_serializing_if = "Option::is_none")]
    pub stored_name: Option<String>,
}

impl FileRecord {
    pub fn new(id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            uploaded_at: None,
            stored_name: None,
        }
    }

    pub fn with_uploaded_at(mut self, uploaded_at: impl Into<String>) -> Self {
        self.uploaded_at = Some(uploaded_at.into());
        self
    }
}

/// Request body for `PUT /files/{id}/rename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameRequest<'a> {
    pub filename: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FileListResponse {
    Bare(Vec<FileRecord>),
    Envelope {
        #[serde(default)]
        files: Option<Vec<FileRecord>>,
    },
}

impl FileListResponse {
    pub(crate) fn into_files(self) -> Vec<FileRecord> {
        match self {
            Self::Bare(files) => files,
            Self::Envelope { files } => files.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FileRecordResponse {
    Record(FileRecord),
    Wrapped { file: FileRecord },
}

impl FileRecordResponse {
    pub(crate) fn into_record(self) -> FileRecord {
        match self {
            Self::Record(record) | Self::Wrapped { file: record } => record,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RawFileRecord {
    #[serde(rename = "_id", default)]
    mongo_id: Option<RawId>,
    #[serde(default)]
    id: Option<RawId>,
    filename: String,
    #[serde(rename = "uploadedAt", default)]
    uploaded_at: Option<String>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(rename = "storedName", default)]
    stored_name: Option<String>,
}

impl TryFrom<RawFileRecord> for FileRecord {
    type Error = String;

    fn try_from(raw: RawFileRecord) -> Result<Self, Self::Error> {
        let id = raw
            .mongo_id
            .or(raw.id)
            .ok_or_else(|| "file record has neither `_id` nor `id`".to_string())?;
        Ok(Self {
            id: id.into_string(),
            filename: raw.filename,
            uploaded_at: raw.uploaded_at.or(raw.upload_date),
            stored_name: raw.stored_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FileListResponse, FileRecord, FileRecordResponse};
    use pretty_assertions::assert_eq;

    #[test]
    fn envelope_listing_decodes_mongo_shape() {
        let body = r#"{"files":[{"_id":"abc","filename":"code.py","uploadedAt":"2026-10-16T14:30:00.000Z","storedName":"1729-code.py","userId":"u1"}]}"#;
        let files = serde_json::from_str::<FileListResponse>(body)
            .expect("listing")
            .into_files();

        assert_eq!(
            files,
            vec![FileRecord {
                id: "abc".to_owned(),
                filename: "code.py".to_owned(),
                uploaded_at: Some("2026-10-16T14:30:00.000Z".to_owned()),
                stored_name: Some("1729-code.py".to_owned()),
            }]
        );
    }

    #[test]
    fn bare_legacy_listing_decodes_numeric_ids() {
        let body = r#"[{"id":7,"filename":"main.c","upload_date":"2025-01-02T03:04:05Z"}]"#;
        let files = serde_json::from_str::<FileListResponse>(body)
            .expect("listing")
            .into_files();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "7");
        assert_eq!(files[0].uploaded_at.as_deref(), Some("2025-01-02T03:04:05Z"));
    }

    #[test]
    fn record_carrying_both_ids_prefers_mongo_id() {
        let body = r#"{"files":[{"_id":"abc","id":"abc-virtual","filename":"code.py","uploadedAt":"2026-10-16T14:30:00Z","upload_date":"2020-01-01T00:00:00Z"}]}"#;
        let files = serde_json::from_str::<FileListResponse>(body)
            .expect("listing")
            .into_files();

        assert_eq!(
            files,
            vec![FileRecord::new("abc", "code.py").with_uploaded_at("2026-10-16T14:30:00Z")]
        );
    }

    #[test]
    fn record_without_any_id_is_rejected() {
        assert!(serde_json::from_str::<FileRecord>(r#"{"filename":"code.py"}"#).is_err());
    }

    #[test]
    fn envelope_without_files_is_empty() {
        let files = serde_json::from_str::<FileListResponse>("{}")
            .expect("listing")
            .into_files();
        assert!(files.is_empty());
    }

    #[test]
    fn record_response_accepts_wrapped_record() {
        let body = r#"{"message":"saved","file":{"_id":"9","filename":"code.js"}}"#;
        let record = serde_json::from_str::<FileRecordResponse>(body)
            .expect("record")
            .into_record();
        assert_eq!(record, FileRecord::new("9", "code.js"));
    }
}
