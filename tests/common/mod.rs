//! In-process stand-ins for the LLM, Maps and TTS APIs.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use itinerary_ai::agent::TravelAgent;
use itinerary_ai::config::{PlannerConfig, TtsConfig};
use itinerary_ai::llm::{LlmClient, Provider};
use itinerary_ai::tools::MapsClient;
use itinerary_ai::tts::{AudioStore, TtsClient};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const NARRATION: &str = "Good morning! An incredible day awaits you in royal Madrid.";
pub const AUDIO: &[u8] = b"ID3-mock-audio-bytes";

pub const ITINERARY: &str = r#"{
    "destination": "Madrid, Spain",
    "total_days": 2,
    "main_theme": "Historical and Cultural",
    "daily_itinerary": [
        {
            "date": "2025-05-01",
            "day_name": "Royal Madrid",
            "activities": [
                {"name": "Royal Palace", "short_description": "Official residence of the Spanish royal family.", "location": "Calle de Bailen", "start_time": "09:00", "end_time": "11:00", "estimated_cost": "14 EUR"},
                {"name": "Plaza Mayor", "short_description": "Arcaded square from the Habsburg era.", "location": "Plaza Mayor", "start_time": "11:30", "end_time": "12:30", "estimated_cost": "Free"}
            ],
            "logistics_between_activities": [
                {"transport_type": "By foot", "estimated_duration": "15 min", "additional_notes": "Walk down Calle Mayor"}
            ]
        },
        {
            "date": "2025-05-02",
            "day_name": "Museum Mile",
            "activities": [
                {"name": "Prado Museum", "short_description": "Spanish masters from Velazquez to Goya.", "location": "Paseo del Prado", "start_time": "10:00", "end_time": "13:00", "estimated_cost": "15 EUR"}
            ],
            "logistics_between_activities": []
        }
    ]
}"#;

/// A scripted LLM answer served before the defaults.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Text(String),
}

pub struct MockState {
    pub llm_script: Mutex<VecDeque<Reply>>,
    pub tts_script: Mutex<VecDeque<u16>>,
    pub itinerary_text: Mutex<String>,
    pub llm_calls: AtomicUsize,
    pub maps_calls: AtomicUsize,
    pub tts_calls: AtomicUsize,
    pub maps_fail: AtomicBool,
    pub tts_fail: AtomicBool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            llm_script: Mutex::new(VecDeque::new()),
            tts_script: Mutex::new(VecDeque::new()),
            itinerary_text: Mutex::new(ITINERARY.to_string()),
            llm_calls: AtomicUsize::new(0),
            maps_calls: AtomicUsize::new(0),
            tts_calls: AtomicUsize::new(0),
            maps_fail: AtomicBool::new(false),
            tts_fail: AtomicBool::new(false),
        }
    }
}

impl MockState {
    pub fn script(&self, replies: impl IntoIterator<Item = Reply>) {
        self.llm_script.lock().unwrap().extend(replies);
    }

    /// Error statuses the TTS endpoint answers with before succeeding.
    pub fn script_tts(&self, statuses: impl IntoIterator<Item = u16>) {
        self.tts_script.lock().unwrap().extend(statuses);
    }

    pub fn set_itinerary_text(&self, text: &str) {
        *self.itinerary_text.lock().unwrap() = text.to_string();
    }

    pub fn llm_calls(&self) -> usize {
        self.llm_calls.load(Ordering::SeqCst)
    }

    pub fn maps_calls(&self) -> usize {
        self.maps_calls.load(Ordering::SeqCst)
    }

    pub fn tts_calls(&self) -> usize {
        self.tts_calls.load(Ordering::SeqCst)
    }
}

pub struct MockApis {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockApis {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/llm/models/{call}", post(llm))
            .route("/maps/place/findplacefromtext/json", get(find_place))
            .route("/maps/place/details/json", get(place_details))
            .route("/maps/directions/json", get(directions))
            .route("/tts/{call}", post(synthesize))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn url(&self, prefix: &str) -> String {
        format!("http://{}/{prefix}", self.addr)
    }

    pub fn llm(&self) -> LlmClient {
        LlmClient::new(
            Provider::Gemini,
            "llm-key".into(),
            "gemini-test".into(),
            4096,
            Some(self.url("llm")),
        )
        .unwrap()
    }

    pub fn maps(&self) -> MapsClient {
        MapsClient::new("maps-key".into(), &self.url("maps")).unwrap()
    }

    pub fn tts(&self) -> TtsClient {
        let config = TtsConfig {
            base_url: self.url("tts"),
            ..TtsConfig::default()
        };
        TtsClient::new("tts-key".into(), &config).unwrap()
    }

    pub fn agent(&self, planner: PlannerConfig, audio_dir: &Path) -> TravelAgent {
        TravelAgent::new(
            self.llm(),
            planner,
            Some(self.maps()),
            Some(self.tts()),
            AudioStore::new(audio_dir),
        )
    }
}

/// Planner settings with no waiting between retries and no demo fallback.
pub fn fast_planner() -> PlannerConfig {
    PlannerConfig {
        min_days: 1,
        max_days: 7,
        temperature: 0.7,
        max_json_retries: 3,
        retry_delay_ms: 0,
        max_app_retries: 2,
        app_retry_delay_ms: 0,
        fallback_file: None,
    }
}

fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

async fn llm(State(s): State<Arc<MockState>>, body: String) -> Response {
    s.llm_calls.fetch_add(1, Ordering::SeqCst);
    let scripted = s.llm_script.lock().unwrap().pop_front();
    match scripted {
        Some(Reply::Status(code)) => {
            let status = StatusCode::from_u16(code).unwrap();
            (status, json!({"error": {"code": code}}).to_string()).into_response()
        }
        Some(Reply::Text(text)) => Json(gemini_reply(&text)).into_response(),
        None if body.contains("responseSchema") => {
            let text = s.itinerary_text.lock().unwrap().clone();
            Json(gemini_reply(&text)).into_response()
        }
        None => Json(gemini_reply(NARRATION)).into_response(),
    }
}

async fn find_place(
    State(s): State<Arc<MockState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    s.maps_calls.fetch_add(1, Ordering::SeqCst);
    if s.maps_fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "maps down").into_response();
    }
    let input = q.get("input").cloned().unwrap_or_default();
    if input.starts_with("Prado Museum") {
        return Json(json!({"status": "ZERO_RESULTS", "candidates": []})).into_response();
    }
    Json(json!({"status": "OK", "candidates": [{"place_id": format!("pid:{input}")}]}))
        .into_response()
}

async fn place_details(
    State(s): State<Arc<MockState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    s.maps_calls.fetch_add(1, Ordering::SeqCst);
    let id = q.get("place_id").cloned().unwrap_or_default();
    let name = id
        .trim_start_matches("pid:")
        .split(',')
        .next()
        .unwrap_or_default()
        .to_string();
    Json(json!({
        "status": "OK",
        "result": {
            "name": name,
            "formatted_address": format!("{name} Street 1, Madrid"),
            "types": ["tourist_attraction"],
            "opening_hours": {"open_now": true},
            "rating": 4.5,
            "user_ratings_total": 1200
        }
    }))
    .into_response()
}

async fn directions(
    State(s): State<Arc<MockState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    s.maps_calls.fetch_add(1, Ordering::SeqCst);
    if s.maps_fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "maps down").into_response();
    }
    if q.get("mode").map(String::as_str) != Some("walking") {
        return Json(json!({"status": "ZERO_RESULTS", "routes": []})).into_response();
    }
    Json(json!({
        "status": "OK",
        "routes": [{
            "legs": [{
                "duration": {"text": "10 mins", "value": 600},
                "distance": {"text": "0.8 km", "value": 800},
                "steps": [{"travel_mode": "WALKING"}]
            }]
        }]
    }))
    .into_response()
}

async fn synthesize(State(s): State<Arc<MockState>>, body: String) -> Response {
    s.tts_calls.fetch_add(1, Ordering::SeqCst);
    let scripted = s.tts_script.lock().unwrap().pop_front();
    if let Some(code) = scripted {
        let status = StatusCode::from_u16(code).unwrap();
        return (status, json!({"error": {"code": code}}).to_string()).into_response();
    }
    if s.tts_fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "tts down").into_response();
    }
    assert!(body.contains(NARRATION), "TTS should receive the narration");
    Json(json!({"audioContent": BASE64.encode(AUDIO)})).into_response()
}
