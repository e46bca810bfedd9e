use crate::error::{Result, StoryError};
use crate::generic_types::ImageRequest;
use crate::provider::StoryProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";
pub const DEFAULT_IMAGE_QUALITY: &str = "standard";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundImage {
    pub scene_id: u64,
    pub background_url: String,
}

/// Turns a scene description into a background image URL.
pub struct BackgroundRequester {
    provider: Arc<dyn StoryProvider>,
    model: String,
    size: String,
    quality: String,
}

impl BackgroundRequester {
    pub fn new(provider: Arc<dyn StoryProvider>) -> Self {
        Self {
            provider,
            model: DEFAULT_IMAGE_MODEL.to_string(),
            size: DEFAULT_IMAGE_SIZE.to_string(),
            quality: DEFAULT_IMAGE_QUALITY.to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub async fn request(&self, scene_id: Option<u64>, description: Option<&str>) -> Result<BackgroundImage> {
        let scene_id = scene_id.ok_or(StoryError::MissingField("scene_id"))?;
        let description = description
            .filter(|d| !d.trim().is_empty())
            .ok_or(StoryError::MissingField("description"))?;

        let background_url = self.image_url(description).await?;
        tracing::info!("background generated for scene {}", scene_id);
        Ok(BackgroundImage {
            scene_id,
            background_url,
        })
    }

    /// Generates one image and returns its URL. Shared with the scene archive.
    pub(crate) async fn image_url(&self, description: &str) -> Result<String> {
        let request = ImageRequest {
            model: self.model.clone(),
            prompt: description.to_string(),
            size: self.size.clone(),
            quality: self.quality.clone(),
        };
        match self.provider.generate_image(request).await? {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(anyhow::anyhow!("image generation returned no URL").into()),
        }
    }
}
