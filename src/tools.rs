//! Maps/Places tools: place details, travel time, and the enrichment pass
//! that attaches both to a planned itinerary.
//!
//! Each tool is a direct pass-through to one Google Maps web service.
//! A place that cannot be found is `Ok(None)`; transport and API failures
//! are errors.

use crate::config::MapsConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::model::{Activity, Itinerary, PlaceDetails, TravelEstimate};
use serde::Deserialize;
use tracing::{debug, info, warn};

const DETAIL_FIELDS: &str =
    "name,type,opening_hours,formatted_address,price_level,rating,user_ratings_total";

/// Directions modes in order of preference.
const MODES: [&str; 3] = ["walking", "transit", "driving"];

/// Walks longer than this are reported as a transit leg.
const MAX_WALK_SECS: u64 = 1200;

pub struct MapsClient {
    api_key: String,
    base_url: String,
    http: HttpClient,
}

#[derive(Deserialize)]
struct FindPlaceResponse {
    status: String,
    #[serde(default)]
    candidates: Vec<Candidate>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    place_id: String,
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<PlaceResult>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct PlaceResult {
    name: Option<String>,
    formatted_address: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    opening_hours: Option<OpeningHours>,
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
}

#[derive(Deserialize)]
struct OpeningHours {
    open_now: Option<bool>,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Deserialize)]
struct Leg {
    duration: TextValue,
    distance: TextValue,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Deserialize)]
struct TextValue {
    text: String,
    value: u64,
}

#[derive(Deserialize)]
struct Step {
    travel_mode: Option<String>,
}

/// Places statuses that mean "nothing matched" rather than a failed call.
fn is_no_match(status: &str) -> bool {
    matches!(status, "ZERO_RESULTS" | "NOT_FOUND")
}

impl MapsClient {
    pub fn new(api_key: String, base_url: &str) -> Result<Self> {
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: HttpClient::new("itinerary-ai/0.1.0")?,
        })
    }

    /// `None` when no Maps key is configured.
    pub fn from_config(config: &MapsConfig) -> Result<Option<Self>> {
        match config.api_key() {
            Some(key) => Ok(Some(Self::new(key, &config.base_url)?)),
            None => Ok(None),
        }
    }

    /// Look up rating, address, place types and open status for a place.
    pub async fn location_details(&self, place_name: &str) -> Result<Option<PlaceDetails>> {
        debug!(place = place_name, "find place");
        let url = format!("{}/place/findplacefromtext/json", self.base_url);
        let found: FindPlaceResponse = self
            .http
            .get_json(
                &url,
                &[
                    ("input", place_name),
                    ("inputtype", "textquery"),
                    ("fields", "place_id"),
                    ("key", &self.api_key),
                ],
            )
            .await?;

        if is_no_match(&found.status) {
            return Ok(None);
        }
        if found.status != "OK" {
            return Err(Error::api(
                "places",
                format!(
                    "{}: {}",
                    found.status,
                    found.error_message.unwrap_or_default()
                ),
            ));
        }
        let Some(candidate) = found.candidates.into_iter().next() else {
            return Ok(None);
        };

        let url = format!("{}/place/details/json", self.base_url);
        let details: DetailsResponse = self
            .http
            .get_json(
                &url,
                &[
                    ("place_id", candidate.place_id.as_str()),
                    ("fields", DETAIL_FIELDS),
                    ("key", &self.api_key),
                    ("language", "en"),
                ],
            )
            .await?;

        if is_no_match(&details.status) {
            return Ok(None);
        }
        if details.status != "OK" {
            return Err(Error::api(
                "places",
                format!(
                    "{}: {}",
                    details.status,
                    details.error_message.unwrap_or_default()
                ),
            ));
        }

        Ok(details.result.map(|r| PlaceDetails {
            name: r.name.unwrap_or_else(|| place_name.to_string()),
            address: r
                .formatted_address
                .unwrap_or_else(|| "Unknown Address".into()),
            place_types: r.types,
            rating: r.rating,
            user_ratings_total: r.user_ratings_total,
            open_now: r.opening_hours.and_then(|h| h.open_now),
        }))
    }

    /// Estimate travel time, trying walking, then transit, then driving.
    pub async fn travel_time(&self, from: &str, to: &str) -> Result<TravelEstimate> {
        let url = format!("{}/directions/json", self.base_url);

        for mode in MODES {
            let resp: DirectionsResponse = match self
                .http
                .get_json(
                    &url,
                    &[
                        ("origin", from),
                        ("destination", to),
                        ("key", &self.api_key),
                        ("mode", mode),
                        ("language", "en"),
                    ],
                )
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(mode, error = %e, "directions request failed, trying next mode");
                    continue;
                }
            };

            if resp.status != "OK" {
                debug!(mode, status = %resp.status, "no route");
                continue;
            }
            let Some(leg) = resp.routes.into_iter().next().and_then(|r| r.legs.into_iter().next())
            else {
                continue;
            };
            return Ok(estimate_from_leg(mode, leg));
        }

        Err(Error::RouteNotFound {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

fn estimate_from_leg(mode: &str, leg: Leg) -> TravelEstimate {
    let (label, note) = match mode {
        "walking" if leg.duration.value > MAX_WALK_SECS => (
            "Transit/Bus".to_string(),
            Some("Consider public transport or taxi since walking is long.".to_string()),
        ),
        "transit" => (
            leg.steps
                .first()
                .and_then(|s| s.travel_mode.clone())
                .unwrap_or_else(|| "Transit".into()),
            Some("Requires purchasing a ticket.".to_string()),
        ),
        other => (capitalize(other), None),
    };
    TravelEstimate {
        mode: label,
        duration_text: leg.duration.text,
        duration_secs: leg.duration.value,
        distance_text: leg.distance.text,
        note,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn place_query(activity: &Activity, destination: &str) -> String {
    format!("{}, {}", activity.name, destination)
}

fn address_query(activity: &Activity, destination: &str) -> String {
    format!("{}, {}", activity.location, destination)
}

/// Counts of what the enrichment pass managed to fill in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub places_found: usize,
    pub places_missing: usize,
    pub routes_measured: usize,
    pub failures: usize,
}

/// Attach place details to every activity and measured routes to every logistics leg.
///
/// Individual failures are logged and leave the field empty.
pub async fn enrich_itinerary(maps: &MapsClient, itinerary: &mut Itinerary) -> EnrichmentStats {
    let mut stats = EnrichmentStats::default();
    let destination = itinerary.destination.clone();

    for day in &mut itinerary.daily_itinerary {
        for activity in &mut day.activities {
            match maps
                .location_details(&place_query(activity, &destination))
                .await
            {
                Ok(Some(details)) => {
                    activity.enrichment = Some(details);
                    stats.places_found += 1;
                }
                Ok(None) => stats.places_missing += 1,
                Err(e) => {
                    warn!(activity = %activity.name, error = %e, "place lookup failed");
                    stats.failures += 1;
                }
            }
        }

        let pairs: Vec<(String, String)> = day
            .activities
            .windows(2)
            .map(|w| {
                (
                    address_query(&w[0], &destination),
                    address_query(&w[1], &destination),
                )
            })
            .collect();
        for (logistics, (from, to)) in day.logistics_between_activities.iter_mut().zip(pairs) {
            match maps.travel_time(&from, &to).await {
                Ok(estimate) => {
                    logistics.measured = Some(estimate);
                    stats.routes_measured += 1;
                }
                Err(e) => {
                    warn!(%from, %to, error = %e, "travel time lookup failed");
                    stats.failures += 1;
                }
            }
        }
    }

    info!(
        found = stats.places_found,
        missing = stats.places_missing,
        routes = stats.routes_measured,
        failures = stats.failures,
        "itinerary enriched"
    );
    stats
}
