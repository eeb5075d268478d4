//! File uploads and downloads
//!
//! Uploads go out as multipart forms. The file part is streamed in chunks so
//! a progress callback can follow how much of it the transport has taken.

use crate::error::{ClientError, ClientResult};
use crate::notify::Notice;
use crate::options::{HttpMethod, RequestOptions};
use crate::service::{ApiService, Attempt, Payload};
use bytes::Bytes;
use naturalize_core::ApiResponse;
use reqwest::multipart::{Form, Part};
use serde_json::json;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Success notice of an upload
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully.";

/// Envelope message of a completed download
pub const DOWNLOAD_COMPLETE_MESSAGE: &str = "Download complete";

/// Size of the chunks the file part is streamed in
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Receives upload progress as an integer percentage
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// A file to send as one part of a multipart form
#[derive(Clone)]
pub struct Upload {
    /// Form field the file is sent under
    pub field: String,
    /// File name announced to the server
    pub file_name: String,
    /// MIME type of the file
    pub mime_type: String,
    /// File contents
    pub contents: Bytes,
    /// Extra text fields sent with the file
    pub fields: Vec<(String, String)>,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.contents.len())
            .field("fields", &self.fields)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Upload {
    /// In-memory file; the MIME type is guessed from the file name
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        Self {
            field: field.into(),
            mime_type: mime_for(&file_name).to_string(),
            file_name,
            contents: contents.into(),
            fields: Vec::new(),
            progress: None,
        }
    }

    /// Read a file from disk
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UploadSource`] when the file cannot be read.
    pub async fn from_path(field: impl Into<String>, path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::UploadSource {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(field, file_name, contents))
    }

    /// Override the guessed MIME type
    #[must_use]
    pub fn mime(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Add a text field
    #[must_use]
    pub fn text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Report progress to `callback`
    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Size of the file part
    #[must_use]
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Whether the file part is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    fn into_part(self) -> ClientResult<(String, Part, Vec<(String, String)>)> {
        let total = self.contents.len();
        let part = match self.progress {
            Some(callback) => {
                let body = reqwest::Body::wrap_stream(progress_stream(self.contents, callback));
                Part::stream_with_length(body, u64::try_from(total).unwrap_or(u64::MAX))
            }
            None => Part::bytes(self.contents.to_vec()),
        };
        let part = part.file_name(self.file_name).mime_str(&self.mime_type)?;
        Ok((self.field, part, self.fields))
    }
}

// Chunks of `contents`, reporting the cumulative share handed out so far.
// Empty contents yield one empty chunk so that 100 is still reported on poll.
fn progress_stream(
    contents: Bytes,
    callback: ProgressCallback,
) -> impl futures::Stream<Item = Result<Bytes, io::Error>> + Send + Sync + 'static {
    let total = contents.len();
    let chunks: Vec<Bytes> = if total == 0 {
        vec![Bytes::new()]
    } else {
        (0..total)
            .step_by(UPLOAD_CHUNK_SIZE)
            .map(|start| contents.slice(start..total.min(start + UPLOAD_CHUNK_SIZE)))
            .collect()
    };

    let mut sent = 0_usize;
    futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len();
        callback(percent(sent, total));
        Ok(chunk)
    }))
}

/// Integer share of `done` in `total`, clamped to 100
#[must_use]
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let share = done.min(total).saturating_mul(100) / total;
    u8::try_from(share).unwrap_or(100)
}

/// MIME type for a file name, by extension
#[must_use]
pub fn mime_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "json" => "application/json",
        "csv" => "text/csv",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

fn build_form(fields: Vec<(String, String)>, file: Option<Upload>) -> ClientResult<Form> {
    let mut form = fields
        .into_iter()
        .fold(Form::new(), |form, (key, value)| form.text(key, value));
    if let Some(upload) = file {
        let (field, part, extra) = upload.into_part()?;
        form = extra
            .into_iter()
            .fold(form, |form, (key, value)| form.text(key, value))
            .part(field, part);
    }
    Ok(form)
}

impl ApiService {
    /// POST a file as multipart form data
    ///
    /// On success the cache is cleared (unless `clear_cache` is off) and
    /// "File uploaded successfully." is announced when `show_toast` is on.
    pub async fn upload_file(&self, path: &str, upload: Upload, options: RequestOptions) -> ApiResponse {
        let show_toast = options.show_toast;
        let response = self
            .send_form(HttpMethod::Post, path, Vec::new(), Some(upload), options.quiet())
            .await;
        if response.success && show_toast {
            self.notify(&Notice::success(UPLOAD_SUCCESS_MESSAGE));
        }
        response
    }

    /// Send text fields and an optional file as a multipart form
    pub async fn send_form(
        &self,
        method: HttpMethod,
        path: &str,
        fields: Vec<(String, String)>,
        file: Option<Upload>,
        options: RequestOptions,
    ) -> ApiResponse {
        let _release = self.release_on_finish(&options);
        let form = match build_form(fields, file) {
            Ok(form) => form,
            Err(e) => {
                warn!(path, error = %e, "cannot build multipart form");
                let message = e.to_string();
                self.notify(&Notice::error(message.clone()));
                return ApiResponse::failure(message, None);
            }
        };
        let attempt = self
            .execute(method, path, Payload::Multipart(form), &options)
            .await;
        self.settle(method, attempt, &options, None).await
    }

    /// GET `path` and write the body to `destination`
    ///
    /// Parent directories are created. The envelope data is
    /// `{ "path": .., "bytes": .. }`; a local write failure is reported as a
    /// failure envelope carrying the I/O message.
    pub async fn download_file(
        &self,
        path: &str,
        destination: impl AsRef<Path>,
        options: RequestOptions,
    ) -> ApiResponse {
        let _release = self.release_on_finish(&options);
        let destination = destination.as_ref();
        let attempt = self
            .execute(HttpMethod::Get, path, Payload::Empty, &options)
            .await;

        let (status, body) = match attempt {
            Attempt::Response { status, body } if (200..300).contains(&status) => (status, body),
            other => return self.settle(HttpMethod::Get, other, &options, None).await,
        };

        match write_download(destination, &body).await {
            Ok(written) => {
                debug!(path = %written.display(), bytes = body.len(), "download saved");
                if options.show_toast {
                    self.notify(&Notice::success(DOWNLOAD_COMPLETE_MESSAGE));
                }
                ApiResponse::ok(
                    Some(json!({ "path": written.display().to_string(), "bytes": body.len() })),
                    DOWNLOAD_COMPLETE_MESSAGE,
                )
                .with_status(status)
            }
            Err(e) => {
                warn!(path = %destination.display(), error = %e, "cannot save download");
                let message = format!("Failed to save {}: {e}", destination.display());
                self.notify(&Notice::error(message.clone()));
                ApiResponse::failure(message, None).with_status(status)
            }
        }
    }
}

async fn write_download(destination: &Path, body: &[u8]) -> io::Result<PathBuf> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(destination, body).await?;
    Ok(destination.to_path_buf())
}
