//! Streams synthesized narration to the client in fixed-size chunks.
use crate::error::{Result, StoryError};
use crate::generic_types::SpeechRequest;
use crate::provider::{AudioStream, SpeechProvider};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

pub const CHUNK_SIZE: usize = 1024;
pub const DEFAULT_VOICE: &str = "nova";
pub const DEFAULT_SPEECH_MODEL: &str = "tts-1-hd";

/// Audio chunks of [`CHUNK_SIZE`] bytes; only the last may be shorter.
pub type SpeechStream = BoxStream<'static, Result<Bytes>>;

pub struct SpeechStreamer {
    provider: Arc<dyn SpeechProvider>,
    voice: String,
    model: String,
}

impl SpeechStreamer {
    pub fn new(provider: Arc<dyn SpeechProvider>) -> Self {
        Self {
            provider,
            voice: DEFAULT_VOICE.to_string(),
            model: DEFAULT_SPEECH_MODEL.to_string(),
        }
    }

    pub fn with_voice(mut self, voice: &str) -> Self {
        self.voice = voice.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Starts synthesis. A rejected request fails here, before any chunk.
    pub async fn stream(&self, text: &str, voice: Option<&str>, model: Option<&str>) -> Result<SpeechStream> {
        if text.trim().is_empty() {
            return Err(StoryError::MissingField("text"));
        }
        let request = SpeechRequest {
            model: model.unwrap_or(&self.model).to_string(),
            voice: voice.unwrap_or(&self.voice).to_string(),
            text: text.to_string(),
        };
        tracing::debug!(
            "synthesizing {} chars with {}/{}",
            request.text.len(),
            request.model,
            request.voice
        );
        let upstream = self.provider.synthesize(request).await?;
        Ok(rechunk(upstream, CHUNK_SIZE))
    }
}

struct Rechunker {
    upstream: AudioStream,
    buffer: BytesMut,
    size: usize,
    done: bool,
}

/// Regroups arbitrary upstream chunks into `size`-byte chunks. An upstream
/// error is yielded once and ends the stream.
fn rechunk(upstream: AudioStream, size: usize) -> SpeechStream {
    let state = Rechunker {
        upstream,
        buffer: BytesMut::with_capacity(size),
        size,
        done: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if state.buffer.len() >= state.size {
                let chunk = state.buffer.split_to(state.size).freeze();
                return Some((Ok(chunk), state));
            }
            if state.done {
                if state.buffer.is_empty() {
                    return None;
                }
                let rest = state.buffer.split().freeze();
                return Some((Ok(rest), state));
            }
            match state.upstream.next().await {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    tracing::warn!("speech stream interrupted: {:#}", e);
                    state.done = true;
                    state.buffer.clear();
                    return Some((Err(StoryError::RemoteCallFailed(e)), state));
                }
                None => state.done = true,
            }
        }
    })
    .boxed()
}
