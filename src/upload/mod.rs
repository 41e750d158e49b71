use crate::{Error, Result, proxy::CredentialProxy};
use axum::{extract::Multipart, http::header};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub const FILE_FIELD: &str = "file";
pub const DEFAULT_FILE_NAME: &str = "image.jpg";
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// A browser upload spooled to a temporary file. The file is deleted when this value drops.
#[derive(Debug)]
pub struct UploadedFile {
    spool: NamedTempFile,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: u64,
}

impl UploadedFile {
    /// Spools the first `file` field of the form. Other fields are ignored.
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self> {
        while let Some(mut field) = multipart.next_field().await? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }

            let file_name = field
                .file_name()
                .map(str::to_string)
                .filter(|n| !n.is_empty());
            let content_type = field
                .content_type()
                .map(str::to_string)
                .filter(|c| !c.is_empty());

            let spool = NamedTempFile::new()?;
            let mut writer = tokio::fs::File::from_std(spool.as_file().try_clone()?);
            let mut size = 0u64;
            while let Some(chunk) = field.chunk().await? {
                size += chunk.len() as u64;
                writer.write_all(&chunk).await?;
            }
            writer.flush().await?;

            debug!("Spooled upload of {} bytes to {:?}", size, spool.path());

            return Ok(Self {
                spool,
                file_name,
                content_type,
                size,
            });
        }

        Err(Error::invalid_request("No file provided"))
    }

    pub fn from_bytes(
        bytes: &[u8],
        file_name: Option<String>,
        content_type: Option<String>,
    ) -> Result<Self> {
        use std::io::Write;

        let mut spool = NamedTempFile::new()?;
        spool.write_all(bytes)?;
        spool.flush()?;
        Ok(Self {
            spool,
            file_name,
            content_type,
            size: bytes.len() as u64,
        })
    }

    pub fn path(&self) -> &std::path::Path {
        self.spool.path()
    }

    pub fn effective_file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(DEFAULT_FILE_NAME)
    }

    pub fn effective_content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// Re-packages browser uploads and forwards them to the upstream storage endpoint.
#[derive(Debug, Clone)]
pub struct UploadRelay {
    proxy: Arc<CredentialProxy>,
    upload_url: String,
}

impl UploadRelay {
    pub fn new(proxy: Arc<CredentialProxy>, upload_url: impl Into<String>) -> Self {
        Self {
            proxy,
            upload_url: upload_url.into(),
        }
    }

    /// Returns the upstream JSON (which carries the hosted asset's `url`) unmodified.
    /// The spooled file is released when `upload` drops, on every path.
    pub async fn relay(&self, upload: UploadedFile) -> Result<Value> {
        let authorization = self.proxy.authorization()?;

        let bytes = tokio::fs::read(upload.path()).await?;
        let part = Part::bytes(bytes)
            .file_name(upload.effective_file_name().to_string())
            .mime_str(upload.effective_content_type())?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .proxy
            .http_client()
            .post(&self.upload_url)
            .header(header::AUTHORIZATION, authorization)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let result: Value = response.json().await?;
        info!(
            "Relayed upload '{}' ({} bytes)",
            upload.effective_file_name(),
            upload.size
        );
        Ok(result)
    }
}
