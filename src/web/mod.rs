//! Web UI: trip form, itinerary pages and narration endpoints.
//!
//! Each planned trip is a transient session keyed by a random id and kept
//! in memory. Locks are released before any external call.

pub mod error;

use crate::agent::{PlanSource, TravelAgent};
use crate::model::{Itinerary, Theme, TripRequest};
use crate::output::{self, FormState, TripPage};
use axum::{
    Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use error::PageError;

/// Oldest trips are dropped beyond this many.
const MAX_TRIPS: usize = 256;

/// One planned trip held for the lifetime of the server process.
#[derive(Debug, Clone)]
pub struct Trip {
    pub id: String,
    pub request: TripRequest,
    pub itinerary: Itinerary,
    pub source: PlanSource,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

pub struct AppState {
    agent: TravelAgent,
    trips: RwLock<HashMap<String, Trip>>,
}

impl AppState {
    pub fn new(agent: TravelAgent) -> Self {
        Self {
            agent,
            trips: RwLock::new(HashMap::new()),
        }
    }

    pub async fn trip(&self, id: &str) -> Option<Trip> {
        self.trips.read().await.get(id).cloned()
    }

    /// Store a trip, evicting the oldest one (and its audio files) at capacity.
    async fn insert_trip(&self, trip: Trip) {
        let evicted = {
            let mut trips = self.trips.write().await;
            let oldest = if trips.len() >= MAX_TRIPS {
                trips
                    .values()
                    .min_by_key(|t| t.created_at)
                    .map(|t| t.id.clone())
            } else {
                None
            };
            let evicted = oldest.and_then(|id| trips.remove(&id));
            trips.insert(trip.id.clone(), trip);
            evicted
        };
        if let Some(old) = evicted {
            remove_audio(&old).await;
        }
    }

    fn default_request(&self) -> TripRequest {
        let cfg = self.agent.planner_config();
        TripRequest::new(
            "Madrid, Spain",
            (cfg.min_days + cfg.max_days) / 2,
            Theme::default(),
        )
    }

    fn render(
        &self,
        status: StatusCode,
        request: &TripRequest,
        trip: Option<&Trip>,
        error: Option<&str>,
    ) -> Response {
        let cfg = self.agent.planner_config();
        let form = FormState {
            request,
            min_days: cfg.min_days,
            max_days: cfg.max_days,
        };
        let page = trip.map(|t| TripPage {
            id: &t.id,
            itinerary: &t.itinerary,
            source: t.source,
            model: &t.model,
            narration_available: self.agent.narration_available(),
        });
        match output::render_page(&form, page.as_ref(), error) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                error!(error = %e, "page render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }

    fn error_page(&self, request: &TripRequest, trip: Option<&Trip>, err: PageError) -> Response {
        self.render(err.status, request, trip, Some(&err.message))
    }
}

async fn remove_audio(trip: &Trip) {
    let files = trip
        .itinerary
        .daily_itinerary
        .iter()
        .filter_map(|d| d.audio.as_ref());
    for audio in files {
        match tokio::fs::remove_file(&audio.path).await {
            Ok(()) => debug!(path = %audio.path.display(), "evicted audio removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %audio.path.display(), error = %e, "failed to remove evicted audio"),
        }
    }
    info!(trip = %trip.id, "trip evicted");
}

pub fn router(state: Arc<AppState>) -> Router {
    let audio_dir = state.agent.audio_store().dir().to_path_buf();
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/plan", post(plan))
        .route("/trips/{id}", get(show_trip))
        .route("/trips/{id}/days/{day}/audio", post(narrate_day))
        .nest_service("/audio", ServeDir::new(audio_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("itinerary planner running at http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn health() -> &'static str {
    "ok"
}

async fn home(State(state): State<Arc<AppState>>) -> Response {
    state.render(StatusCode::OK, &state.default_request(), None, None)
}

#[derive(Debug, Deserialize)]
pub struct PlanForm {
    pub destination: String,
    pub days: String,
    pub theme: String,
}

impl PlanForm {
    fn into_request(self, fallback_days: u32) -> Result<TripRequest, (TripRequest, PageError)> {
        let theme = Theme::from_label(&self.theme);
        let days = self.days.trim().parse::<u32>().ok();
        let request = TripRequest::new(
            self.destination.trim(),
            days.unwrap_or(fallback_days),
            theme.unwrap_or_default(),
        );
        match (days, theme) {
            (None, _) => Err((
                request,
                PageError::bad_input(format!("'{}' is not a number of days", self.days)),
            )),
            (_, None) => Err((
                request,
                PageError::bad_input(format!("unknown trip theme '{}'", self.theme)),
            )),
            _ => Ok(request),
        }
    }
}

async fn plan(State(state): State<Arc<AppState>>, Form(form): Form<PlanForm>) -> Response {
    let cfg = state.agent.planner_config();
    let request = match form.into_request(state.default_request().days) {
        Ok(r) => r,
        Err((request, err)) => return state.error_page(&request, None, err),
    };
    if let Err(e) = request.validate(cfg.min_days, cfg.max_days) {
        return state.error_page(&request, None, PageError::bad_input(e.to_string()));
    }

    let outcome = match state.agent.plan_trip(&request).await {
        Ok(o) => o,
        Err(e) => {
            warn!(error = %e, destination = %request.destination, "planning failed");
            return state.error_page(&request, None, e.into());
        }
    };

    let trip = Trip {
        id: Uuid::new_v4().simple().to_string(),
        request,
        itinerary: outcome.itinerary,
        source: outcome.source,
        model: state.agent.model().to_string(),
        created_at: Utc::now(),
    };
    let location = format!("/trips/{}", trip.id);
    info!(trip = %trip.id, source = ?trip.source, "trip planned");
    state.insert_trip(trip).await;
    Redirect::to(&location).into_response()
}

async fn show_trip(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.trip(&id).await {
        Some(trip) => state.render(StatusCode::OK, &trip.request, Some(&trip), None),
        None => state.error_page(
            &state.default_request(),
            None,
            PageError::not_found(format!("No trip with id '{id}'")),
        ),
    }
}

async fn narrate_day(
    State(state): State<Arc<AppState>>,
    Path((id, ordinal)): Path<(String, usize)>,
) -> Response {
    let Some(trip) = state.trip(&id).await else {
        return state.error_page(
            &state.default_request(),
            None,
            PageError::not_found(format!("No trip with id '{id}'")),
        );
    };
    let Some(day) = ordinal
        .checked_sub(1)
        .and_then(|i| trip.itinerary.daily_itinerary.get(i))
    else {
        return state.error_page(
            &trip.request,
            Some(&trip),
            PageError::not_found(format!("Trip has no day {ordinal}")),
        );
    };

    let narration = match state.agent.narrate_day(&trip.id, ordinal, day).await {
        Ok(n) => n,
        Err(e) => {
            warn!(trip = %id, day = ordinal, error = %e, "narration failed");
            return state.error_page(&trip.request, Some(&trip), e.into());
        }
    };

    {
        let mut trips = state.trips.write().await;
        if let Some(day) = trips
            .get_mut(&id)
            .and_then(|t| t.itinerary.day_mut(ordinal))
        {
            day.summary = Some(narration.summary);
            day.audio = Some(narration.audio);
        }
    }
    Redirect::to(&format!("/trips/{id}")).into_response()
}
