/// Body of `POST /images/generations`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ImageGenerationRequest {
    model: String,
    prompt: String,
    size: String,
    quality: String,
    n: u8,
}

impl ImageGenerationRequest {
    pub fn new(model: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            prompt: prompt.to_string(),
            size: "1024x1024".to_string(),
            quality: "standard".to_string(),
            n: 1,
        }
    }

    pub fn with_size(mut self, size: &str) -> Self {
        self.size = size.to_string();
        self
    }

    pub fn with_quality(mut self, quality: &str) -> Self {
        self.quality = quality.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn quality(&self) -> &str {
        &self.quality
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

impl ImagesResponse {
    pub fn new(data: Vec<ImageData>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[ImageData] {
        &self.data
    }

    pub fn first_url(&self) -> Option<&str> {
        self.data.first().and_then(|image| image.url())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

impl ImageData {
    pub fn with_url(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            revised_prompt: None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn revised_prompt(&self) -> Option<&str> {
        self.revised_prompt.as_deref()
    }
}
