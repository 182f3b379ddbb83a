use crate::config::{MapsConfig, TtsConfig};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::model::AudioRef;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Cloud Text-to-Speech client producing MP3 narration.
pub struct TtsClient {
    api_key: String,
    base_url: String,
    language_code: String,
    voice_name: String,
    ssml_gender: String,
    max_retries: u32,
    http: HttpClient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
    ssml_gender: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

impl TtsClient {
    pub fn new(api_key: String, config: &TtsConfig) -> Result<Self> {
        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language_code: config.language_code.clone(),
            voice_name: config.voice_name.clone(),
            ssml_gender: config.ssml_gender.clone(),
            max_retries: config.max_retries.max(1),
            http: HttpClient::new("itinerary-ai/0.1.0")?,
        })
    }

    /// `None` when TTS is disabled or no key is available.
    pub fn from_config(config: &TtsConfig, maps: &MapsConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        match config.api_key(maps) {
            Some(key) => Ok(Some(Self::new(key, config)?)),
            None => Ok(None),
        }
    }

    /// Synthesize `text` into MP3 bytes. A 503 is retried immediately.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(Error::validation("nothing to synthesize"));
        }

        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language_code,
                name: &self.voice_name,
                ssml_gender: &self.ssml_gender,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| Error::parse(format!("serialize request: {e}")))?;
        let url = format!("{}/text:synthesize", self.base_url);

        let mut attempt = 0;
        let response_text = loop {
            attempt += 1;
            match self
                .http
                .post_json_raw(&url, &body, &[], &[("x-goog-api-key", &self.api_key)])
                .await
            {
                Ok(text) => break text,
                Err(e) if e.is_unavailable() && attempt < self.max_retries => {
                    warn!(attempt, max = self.max_retries, "TTS unavailable (503), retrying");
                }
                Err(Error::Api {
                    status_code: Some(403),
                    ..
                }) => {
                    return Err(Error::api_with_status(
                        "texttospeech",
                        "the Cloud Text-to-Speech API is not enabled for this key",
                        403,
                    ));
                }
                Err(e) => return Err(e),
            }
        };

        let resp: SynthesizeResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::parse(format!("parse TTS response: {e}")))?;
        let audio = BASE64
            .decode(resp.audio_content.as_bytes())
            .map_err(|e| Error::parse(format!("decode audioContent: {e}")))?;
        if audio.is_empty() {
            return Err(Error::parse("TTS returned no audio"));
        }
        debug!(bytes = audio.len(), "speech synthesized");
        Ok(audio)
    }
}

/// Directory holding the transient per-day MP3 files.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, trip_id: &str, day: usize, audio: &[u8]) -> Result<AudioRef> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!("{trip_id}-day-{day}.mp3");
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, audio).await?;
        info!(path = %path.display(), bytes = audio.len(), "audio written");
        Ok(AudioRef {
            file_name,
            path,
            bytes: audio.len(),
        })
    }
}
