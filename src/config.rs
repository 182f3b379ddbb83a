use crate::error::{Error, Result};
use crate::llm::Provider;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub maps: MapsConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key_env: None,
            base_url: None,
        }
    }
}

impl LlmConfig {
    pub fn api_key(&self) -> Option<String> {
        let var = self
            .api_key_env
            .clone()
            .unwrap_or_else(|| self.provider.default_api_key_env().into());
        read_key(&var)
    }
}

/// Planner bounds, retry budgets and the demo fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_min_days")]
    pub min_days: u32,
    #[serde(default = "default_max_days")]
    pub max_days: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Attempts when the model answers 503.
    #[serde(default = "default_max_json_retries")]
    pub max_json_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Attempts when the model answers with JSON that fails validation.
    #[serde(default = "default_max_app_retries")]
    pub max_app_retries: u32,
    #[serde(default = "default_app_retry_delay_ms")]
    pub app_retry_delay_ms: u64,
    #[serde(default = "default_fallback_file")]
    pub fallback_file: Option<PathBuf>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_days: default_min_days(),
            max_days: default_max_days(),
            temperature: default_temperature(),
            max_json_retries: default_max_json_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_app_retries: default_max_app_retries(),
            app_retry_delay_ms: default_app_retry_delay_ms(),
            fallback_file: default_fallback_file(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MapsConfig {
    #[serde(default = "default_maps_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_maps_base_url")]
    pub base_url: String,
    /// Run place/travel-time enrichment after planning.
    #[serde(default = "default_true")]
    pub enrich: bool,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_maps_key_env(),
            base_url: default_maps_base_url(),
            enrich: true,
        }
    }
}

impl MapsConfig {
    pub fn api_key(&self) -> Option<String> {
        read_key(&self.api_key_env)
    }
}

#[derive(Debug, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tts_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default = "default_voice_name")]
    pub voice_name: String,
    #[serde(default = "default_ssml_gender")]
    pub ssml_gender: String,
    #[serde(default = "default_tts_retries")]
    pub max_retries: u32,
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: default_tts_key_env(),
            base_url: default_tts_base_url(),
            language_code: default_language_code(),
            voice_name: default_voice_name(),
            ssml_gender: default_ssml_gender(),
            max_retries: default_tts_retries(),
            audio_dir: default_audio_dir(),
        }
    }
}

impl TtsConfig {
    /// Falls back to the Maps key: both are Google Cloud API keys.
    pub fn api_key(&self, maps: &MapsConfig) -> Option<String> {
        read_key(&self.api_key_env).or_else(|| maps.api_key())
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Read an API key from the environment. Empty values and the `x` placeholder count as unset.
pub fn read_key(var: &str) -> Option<String> {
    normalize_key(std::env::var(var).ok())
}

fn normalize_key(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "x")
}

/// First variable in `vars` that is set and parses.
fn env_parse<T: std::str::FromStr>(vars: &[&str]) -> Option<T> {
    parse_first(vars.iter().map(|v| std::env::var(v).ok()))
}

fn parse_first<T: std::str::FromStr>(values: impl IntoIterator<Item = Option<String>>) -> Option<T> {
    values
        .into_iter()
        .flatten()
        .find_map(|v| v.trim().parse().ok())
}

// Defaults
fn default_model() -> String {
    std::env::var("GEMINI_MODEL")
        .ok()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "gemini-2.5-flash".into())
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_min_days() -> u32 {
    env_parse(&["MIN_DAYS", "MIN_DIAS"]).unwrap_or(1)
}
fn default_max_days() -> u32 {
    env_parse(&["MAX_DAYS", "MAX_DIAS"]).unwrap_or(7)
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_json_retries() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    env_parse(&["GEMINI_RETRY_DELAY_MS"]).unwrap_or(1000)
}
fn default_max_app_retries() -> u32 {
    env_parse(&["MAX_APP_RETRIES"]).unwrap_or(3)
}
fn default_app_retry_delay_ms() -> u64 {
    env_parse::<f64>(&["RETRY_DELAY_S"])
        .map(|s| (s * 1000.0) as u64)
        .unwrap_or(2000)
}
fn default_fallback_file() -> Option<PathBuf> {
    Some(PathBuf::from("fallback_itinerary.json"))
}
fn default_maps_key_env() -> String {
    "GOOGLE_MAPS_API_KEY".into()
}
fn default_maps_base_url() -> String {
    "https://maps.googleapis.com/maps/api".into()
}
fn default_tts_key_env() -> String {
    "GOOGLE_TTS_API_KEY".into()
}
fn default_tts_base_url() -> String {
    "https://texttospeech.googleapis.com/v1".into()
}
fn default_language_code() -> String {
    "en-US".into()
}
fn default_voice_name() -> String {
    "en-US-Wavenet-D".into()
}
fn default_ssml_gender() -> String {
    "FEMALE".into()
}
fn default_tts_retries() -> u32 {
    2
}
fn default_audio_dir() -> PathBuf {
    PathBuf::from("audio")
}
fn default_bind() -> String {
    "127.0.0.1:8501".into()
}
fn default_true() -> bool {
    true
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(Error::config("llm.model is empty"));
        }
        if self.planner.min_days == 0 || self.planner.min_days > self.planner.max_days {
            return Err(Error::config(format!(
                "planner day bounds invalid: min_days={} max_days={}",
                self.planner.min_days, self.planner.max_days
            )));
        }
        if self.planner.max_json_retries == 0 || self.planner.max_app_retries == 0 {
            return Err(Error::config("planner retry budgets must be at least 1"));
        }
        if self.llm.api_key().is_none() {
            let var = self
                .llm
                .api_key_env
                .clone()
                .unwrap_or_else(|| self.llm.provider.default_api_key_env().into());
            return Err(Error::config(format!(
                "{var} not set. Export it or point llm.api_key_env at another variable"
            )));
        }
        Ok(())
    }
}
