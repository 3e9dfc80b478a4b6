use std::path::Path;

use reqwest::StatusCode;
use reqwest::blocking::{Client, multipart};
use serde_json::Value;
use tracing::{info, instrument};
use url::Url;

use crate::config::ArchiveConfig;
use crate::error::{Result, SyncError};

/// Which archive folder a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivePurpose {
    Elements,
    Relations,
}

/// Client for the document-storage service that keeps copies of every
/// ingested export. The service is an opaque sink: upload a file into a
/// folder, overwrite on a duplicate name, hand back a shareable link.
pub struct ArchiveClient {
    http: Client,
    base_url: Url,
    token: String,
    elements_folder: String,
    relations_folder: String,
}

impl ArchiveClient {
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            elements_folder: config.elements_folder.clone(),
            relations_folder: config.relations_folder.clone(),
        })
    }

    /// Uploads `file` into the folder for `purpose` and returns the
    /// shareable link. A duplicate-name conflict is resolved by updating
    /// the existing file's contents in place.
    #[instrument(level = "info", skip(self), fields(file = %file.display()))]
    pub fn upload(&self, purpose: ArchivePurpose, file: &Path) -> Result<String> {
        let folder = match purpose {
            ArchivePurpose::Elements => &self.elements_folder,
            ArchivePurpose::Relations => &self.relations_folder,
        };
        let url = self.endpoint(&format!("folders/{folder}/files"))?;
        let form = multipart::Form::new().file("file", file)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()?;

        let file_id = if response.status() == StatusCode::CONFLICT {
            // Duplicate name: overwrite the conflicting file instead.
            let body: Value = response.json()?;
            let existing = body
                .pointer("/conflict/id")
                .and_then(Value::as_str)
                .ok_or_else(|| self.failure(file, "conflict response without file id"))?
                .to_string();
            let url = self.endpoint(&format!("files/{existing}/content"))?;
            let form = multipart::Form::new().file("file", file)?;
            let overwrite = self
                .http
                .put(url)
                .bearer_auth(&self.token)
                .multipart(form)
                .send()?;
            if !overwrite.status().is_success() {
                return Err(self.failure(file, &format!("overwrite HTTP {}", overwrite.status())));
            }
            info!(file_id = %existing, "existing archive file overwritten");
            existing
        } else if response.status().is_success() {
            let body: Value = response.json()?;
            body.get("id")
                .map(json_id)
                .ok_or_else(|| self.failure(file, "upload response without file id"))?
        } else {
            return Err(self.failure(file, &format!("HTTP {}", response.status())));
        };

        self.shared_link(&file_id)
    }

    fn shared_link(&self, file_id: &str) -> Result<String> {
        let mut url = self.endpoint(&format!("files/{file_id}/share"))?;
        url.query_pairs_mut().append_pair("access", "company");
        let response = self.http.get(url).bearer_auth(&self.token).send()?;
        if !response.status().is_success() {
            return Err(SyncError::Archive {
                file: file_id.to_string(),
                reason: format!("share link HTTP {}", response.status()),
            });
        }
        let body: Value = response.json()?;
        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SyncError::Archive {
                file: file_id.to_string(),
                reason: "share response without url".to_string(),
            })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|error| SyncError::Config(format!("bad archive endpoint '{path}': {error}")))
    }

    fn failure(&self, file: &Path, reason: &str) -> SyncError {
        SyncError::Archive {
            file: file.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

fn json_id(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
