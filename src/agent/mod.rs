// Orchestration: plan → enrich for a trip, summarize → synthesize → store for a day.

pub mod planner;
pub mod summarizer;

pub use planner::{PlanOutcome, PlanSource};

use crate::config::{Config, PlannerConfig};
use crate::error::{Error, Result};
use crate::llm::LlmClient;
use crate::model::{AudioRef, Day, TripRequest};
use crate::tools::{self, MapsClient};
use crate::tts::{AudioStore, TtsClient};
use tracing::info;

/// Narration produced for one day.
#[derive(Debug, Clone)]
pub struct Narration {
    pub summary: String,
    pub audio: AudioRef,
}

/// Every external client a user interaction can touch.
pub struct TravelAgent {
    llm: LlmClient,
    planner: PlannerConfig,
    maps: Option<MapsClient>,
    enrich: bool,
    tts: Option<TtsClient>,
    audio: AudioStore,
}

impl TravelAgent {
    pub fn new(
        llm: LlmClient,
        planner: PlannerConfig,
        maps: Option<MapsClient>,
        tts: Option<TtsClient>,
        audio: AudioStore,
    ) -> Self {
        Self {
            llm,
            planner,
            enrich: maps.is_some(),
            maps,
            tts,
            audio,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = LlmClient::from_config(&config.llm)?;
        let maps = MapsClient::from_config(&config.maps)?;
        let tts = TtsClient::from_config(&config.tts, &config.maps)?;
        let mut agent = Self::new(
            llm,
            config.planner.clone(),
            maps,
            tts,
            AudioStore::new(&config.tts.audio_dir),
        );
        agent.enrich = agent.maps.is_some() && config.maps.enrich;
        info!(
            model = agent.model(),
            enrichment = agent.enrich,
            narration = agent.narration_available(),
            "travel agent ready"
        );
        Ok(agent)
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    pub fn planner_config(&self) -> &PlannerConfig {
        &self.planner
    }

    pub fn audio_store(&self) -> &AudioStore {
        &self.audio
    }

    pub fn narration_available(&self) -> bool {
        self.tts.is_some()
    }

    /// Plan a trip, then enrich it with place and route data when Maps is configured.
    pub async fn plan_trip(&self, request: &TripRequest) -> Result<PlanOutcome> {
        let mut outcome = planner::plan(&self.llm, &self.planner, request).await?;
        if self.enrich
            && let Some(maps) = &self.maps
        {
            tools::enrich_itinerary(maps, &mut outcome.itinerary).await;
        }
        Ok(outcome)
    }

    /// Narrate day `ordinal` (1-based) of trip `trip_id` and write the MP3.
    pub async fn narrate_day(&self, trip_id: &str, ordinal: usize, day: &Day) -> Result<Narration> {
        let tts = self
            .tts
            .as_ref()
            .ok_or_else(|| Error::config("text-to-speech is not configured"))?;

        let summary = summarizer::summarize_day(&self.llm, day).await?;
        let audio = tts.synthesize(&summary).await?;
        let audio = self.audio.save(trip_id, ordinal, &audio).await?;
        Ok(Narration { summary, audio })
    }
}
