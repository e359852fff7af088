//! Renderable previews for attached images.

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::image::ImageAttachment;

/// Turns an attached image into something a front end can display
#[async_trait]
pub trait PreviewRenderer: Send + Sync {
    async fn render(&self, image: &ImageAttachment) -> Result<String>;
}

/// Renders previews as `data:` URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlPreview;

#[async_trait]
impl PreviewRenderer for DataUrlPreview {
    async fn render(&self, image: &ImageAttachment) -> Result<String> {
        Ok(data_url(image))
    }
}

pub fn data_url(image: &ImageAttachment) -> String {
    format!(
        "data:{};base64,{}",
        image.content_type(),
        STANDARD.encode(image.bytes())
    )
}
