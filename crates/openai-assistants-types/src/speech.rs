/// Body of `POST /audio/speech`. The reply is the raw encoded audio.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SpeechRequest {
    model: String,
    input: String,
    voice: String,
}

impl SpeechRequest {
    pub fn new(model: &str, input: &str, voice: &str) -> Self {
        Self {
            model: model.to_string(),
            input: input.to_string(),
            voice: voice.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }
}
