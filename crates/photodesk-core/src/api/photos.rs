//! Project-scoped photo endpoints.
//!
//! Photos live under `/projects/{project_id}/photos`. Uploads are sent as a
//! single multipart form with one `files` part per photo.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::models::{Photo, PhotoList, UploadedPhotos};

use super::{ApiClient, ApiError, RequestOptions};

/// Fallback content type when the extension is unknown
const DEFAULT_MIME: &str = "application/octet-stream";

/// A file ready to be uploaded.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime,
            bytes,
        }
    }

    /// Read a file from disk, naming the upload after the file.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }

    fn into_part(self) -> Result<Part, ApiError> {
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)?)
    }
}

/// Content type from the file extension.
pub fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        _ => DEFAULT_MIME,
    }
}

fn photos_path(project_id: &str) -> String {
    format!("/projects/{}/photos", project_id)
}

impl ApiClient {
    /// Upload photos into a project. Returns the new photo ids in upload
    /// order.
    pub async fn upload_photos(
        &self,
        project_id: &str,
        files: Vec<PhotoUpload>,
    ) -> Result<Vec<String>, ApiError> {
        if files.is_empty() {
            return Err(ApiError::Validation("No files to upload".to_string()));
        }
        debug!(project_id, count = files.len(), "Uploading photos");

        let mut form = Form::new();
        for file in files {
            form = form.part("files", file.into_part()?);
        }

        let uploaded: UploadedPhotos = self
            .post_multipart(&photos_path(project_id), form)
            .await?;
        Ok(uploaded.items)
    }

    pub async fn list_photos(
        &self,
        project_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Photo>, ApiError> {
        let opts = RequestOptions::default()
            .query("limit", limit)
            .query("offset", offset);
        let list: PhotoList = self.get_json(&photos_path(project_id), opts).await?;
        Ok(list.items)
    }

    /// URL that serves the photo file itself.
    pub fn photo_url(&self, project_id: &str, photo_id: &str) -> String {
        self.url(&format!("{}/{}", photos_path(project_id), photo_id))
    }

    pub async fn download_photo(&self, project_id: &str, photo_id: &str) -> Result<Vec<u8>, ApiError> {
        self.get_bytes(&format!("{}/{}", photos_path(project_id), photo_id))
            .await
    }

    pub async fn delete_photo(&self, project_id: &str, photo_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", photos_path(project_id), photo_id))
            .await
    }
}
