use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use match_sheet::{DocumentStore, RemoteError};

use crate::ops::rest::{endpoint, send_empty, send_json};

pub const DRIVE_FILES: &str = "https://www.googleapis.com/drive/v3/files";

/// Google Drive v3 over REST. Shared drives are supported on every call.
pub struct DriveApi {
    http: Client,
    token: String,
    base: String,
}

#[derive(Deserialize)]
struct FileId {
    id: String,
}

#[derive(Deserialize)]
struct FileParents {
    #[serde(default)]
    parents: Vec<String>,
}

impl DriveApi {
    pub fn new(http: Client, token: String) -> DriveApi {
        DriveApi {
            http,
            token,
            base: DRIVE_FILES.to_string(),
        }
    }
}

impl DocumentStore for DriveApi {
    fn copy_file(&self, file_id: &str) -> Result<String, RemoteError> {
        let url = endpoint(&self.base, &[file_id, "copy"])?;
        let request = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .json(&json!({}));
        let copy: FileId = send_json(request, &format!("file {}", file_id))?;
        debug!("copy_file: {} -> {}", file_id, copy.id);
        Ok(copy.id)
    }

    fn rename_file(&self, file_id: &str, name: &str) -> Result<(), RemoteError> {
        let url = endpoint(&self.base, &[file_id])?;
        let request = self
            .http
            .patch(url)
            .bearer_auth(&self.token)
            .query(&[("supportsAllDrives", "true")])
            .json(&json!({ "name": name }));
        send_empty(request, &format!("file {}", file_id))
    }

    fn move_file(&self, file_id: &str, folder_id: &str) -> Result<(), RemoteError> {
        let what = format!("file {}", file_id);
        let url = endpoint(&self.base, &[file_id])?;
        let request = self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .query(&[("supportsAllDrives", "true"), ("fields", "parents")]);
        let current: FileParents = send_json(request, &what)?;
        let previous = current.parents.join(",");
        let request = self
            .http
            .patch(url)
            .bearer_auth(&self.token)
            .query(&[
                ("supportsAllDrives", "true"),
                ("addParents", folder_id),
                ("removeParents", previous.as_str()),
            ])
            .json(&json!({}));
        send_empty(request, &what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parents_may_be_missing() {
        let p: FileParents = serde_json::from_str(r#"{"parents": ["a", "b"]}"#).unwrap();
        assert_eq!(p.parents.join(","), "a,b");
        let p: FileParents = serde_json::from_str("{}").unwrap();
        assert!(p.parents.is_empty());
    }

    #[test]
    fn copy_endpoint() {
        let url = endpoint(DRIVE_FILES, &["1xYz", "copy"]).unwrap();
        assert_eq!(url.as_str(), "https://www.googleapis.com/drive/v3/files/1xYz/copy");
    }
}
