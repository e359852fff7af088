use anyhow::{anyhow, Result};
use std::fmt;
use std::path::Path;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// An image attached to a question, held in memory until it is sent
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl ImageAttachment {
    /// Content type is guessed from the file name's extension.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_raw()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();

        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("Not a file path: {}", path.display()))?
            .to_string();

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow!("Failed to read image {}: {}", path.display(), e))?;

        Ok(Self::new(file_name, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
