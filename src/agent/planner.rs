use crate::config::PlannerConfig;
use crate::error::{Error, Result};
use crate::llm::{Generation, LlmClient, extract_json};
use crate::model::{Day, Itinerary, TripRequest, itinerary_schema};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Where a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanSource {
    Model,
    /// Model quota exhausted; demo data expanded from the fallback file.
    QuotaFallback,
    /// Every attempt returned invalid JSON; demo data expanded from the fallback file.
    RetryFallback,
}

impl PlanSource {
    pub fn is_demo(self) -> bool {
        !matches!(self, Self::Model)
    }

    pub fn notice(self) -> Option<&'static str> {
        match self {
            Self::Model => None,
            Self::QuotaFallback => Some("Model quota exceeded. Showing demo data."),
            Self::RetryFallback => {
                Some("The model kept returning invalid itineraries. Showing demo data.")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub itinerary: Itinerary,
    pub source: PlanSource,
}

fn system_instruction(request: &TripRequest) -> String {
    format!(
        "You are an expert travel planner. Your task is to create a detailed, daily travel \
         itinerary in English for {} over {} days, focusing on the '{}' theme. You must output \
         the FINAL, COMPLETE travel itinerary ONLY in a single JSON object that conforms \
         STRICTLY to the provided JSON Schema.",
        request.destination.trim(),
        request.days,
        request.theme
    )
}

fn user_prompt(request: &TripRequest) -> String {
    format!(
        "Plan a {}-day trip to {} with a focus on {}. Please provide the final, complete \
         itinerary JSON now.",
        request.days,
        request.destination.trim(),
        request.theme
    )
}

/// Plan an itinerary for `request`.
///
/// 503 answers are retried `max_json_retries` times; responses that fail
/// validation are retried `max_app_retries` times. When the quota is
/// exhausted or validation never succeeds, a demo plan is built from the
/// fallback file if one is available; otherwise the error is returned.
pub async fn plan(
    llm: &LlmClient,
    config: &PlannerConfig,
    request: &TripRequest,
) -> Result<PlanOutcome> {
    request.validate(config.min_days, config.max_days)?;

    let system = system_instruction(request);
    let prompt = user_prompt(request);
    let generation = Generation {
        temperature: config.temperature,
        response_schema: Some(itinerary_schema()),
    };

    info!(destination = %request.destination, days = request.days, theme = %request.theme, "planning itinerary");

    let rounds = config.max_app_retries.max(1);
    let mut last_invalid = Error::validation("no attempts made");

    for round in 1..=rounds {
        let outcome = match complete_with_retry(llm, config, &system, &prompt, &generation).await {
            Ok(raw) => parse_for_request(&raw, request),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(itinerary) => {
                info!(days = itinerary.daily_itinerary.len(), round, "itinerary validated");
                return Ok(PlanOutcome {
                    itinerary,
                    source: PlanSource::Model,
                });
            }
            Err(e) if e.is_quota_exhausted() => {
                warn!(error = %e, "model quota exhausted");
                return match demo_plan(config, request, PlanSource::QuotaFallback)? {
                    Some(itinerary) => Ok(PlanOutcome {
                        itinerary,
                        source: PlanSource::QuotaFallback,
                    }),
                    None => Err(e),
                };
            }
            Err(e) if e.is_malformed_response() => {
                warn!(round, rounds, error = %e, "model returned an invalid itinerary");
                last_invalid = e;
                if round < rounds {
                    sleep(Duration::from_millis(config.app_retry_delay_ms)).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    match demo_plan(config, request, PlanSource::RetryFallback)? {
        Some(itinerary) => {
            warn!("validation retries exhausted, using demo itinerary");
            Ok(PlanOutcome {
                itinerary,
                source: PlanSource::RetryFallback,
            })
        }
        None => Err(last_invalid),
    }
}

async fn complete_with_retry(
    llm: &LlmClient,
    config: &PlannerConfig,
    system: &str,
    prompt: &str,
    generation: &Generation,
) -> Result<String> {
    let attempts = config.max_json_retries.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match llm.complete(Some(system), prompt, generation).await {
            Err(e) if e.is_unavailable() && attempt < attempts => {
                warn!(
                    attempt,
                    attempts,
                    delay_ms = config.retry_delay_ms,
                    "model unavailable (503), retrying"
                );
                sleep(Duration::from_millis(config.retry_delay_ms)).await;
            }
            other => return other,
        }
    }
}

fn parse_for_request(raw: &str, request: &TripRequest) -> Result<Itinerary> {
    let itinerary = Itinerary::from_json(extract_json(raw))?;
    if itinerary.daily_itinerary.len() != request.days as usize {
        return Err(Error::validation(format!(
            "requested {} days but the plan has {}",
            request.days,
            itinerary.daily_itinerary.len()
        )));
    }
    Ok(itinerary)
}

fn demo_plan(
    config: &PlannerConfig,
    request: &TripRequest,
    source: PlanSource,
) -> Result<Option<Itinerary>> {
    let Some(path) = config.fallback_file.as_deref() else {
        return Ok(None);
    };
    match load_fallback(path) {
        Some(template) => expand_demo(template, request, source).map(Some),
        None => Ok(None),
    }
}

/// Load the demo itinerary. A missing or unreadable file yields `None`.
pub fn load_fallback(path: &Path) -> Option<Itinerary> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "fallback itinerary unavailable");
            return None;
        }
    };
    match serde_json::from_str::<Itinerary>(&content) {
        Ok(it) if !it.daily_itinerary.is_empty() => Some(it),
        Ok(_) => {
            warn!(path = %path.display(), "fallback itinerary has no days");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "fallback itinerary does not parse");
            None
        }
    }
}

/// Clone the first fallback day once per requested day and retarget the plan.
pub fn expand_demo(
    mut template: Itinerary,
    request: &TripRequest,
    source: PlanSource,
) -> Result<Itinerary> {
    let first = template
        .daily_itinerary
        .first()
        .cloned()
        .ok_or_else(|| Error::validation("fallback itinerary has no days"))?;

    let start = NaiveDate::from_ymd_opt(2025, 1, 1)
        .ok_or_else(|| Error::validation("invalid demo start date"))?;

    let days: Vec<Day> = (1..=request.days)
        .map(|n| {
            let date = start
                .checked_add_days(Days::new(u64::from(n - 1)))
                .ok_or_else(|| Error::validation(format!("demo day {n} is out of range")))?;
            let mut day = first.clone();
            day.day_name = match source {
                PlanSource::RetryFallback => format!("Day {n}: DEMO (JSON Error Fallback)"),
                _ => format!("Day {n}: Demo based on {}", first.day_name),
            };
            day.date = date.format("%Y-%m-%d").to_string();
            day.summary = None;
            day.audio = None;
            Ok(day)
        })
        .collect::<Result<_>>()?;

    let prefix = match source {
        PlanSource::RetryFallback => "[MOCK/RETRY FAIL]",
        _ => "[MOCK]",
    };
    template.daily_itinerary = days;
    template.total_days = request.days;
    template.destination = request.destination.trim().to_string();
    template.main_theme = format!("{prefix} {}", request.theme);
    template.validate()?;
    Ok(template)
}
