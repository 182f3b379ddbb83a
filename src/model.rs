//! Itinerary data model, request types and response validation.
//!
//! The model returns `Itinerary` wholesale as JSON. Serde enforces required
//! fields and types; [`Itinerary::validate`] enforces the formats the schema
//! describes but cannot guarantee (dates, times, day counts).

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub destination: String,
    pub total_days: u32,
    pub main_theme: String,
    pub daily_itinerary: Vec<Day>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub date: String,
    pub day_name: String,
    pub activities: Vec<Activity>,
    pub logistics_between_activities: Vec<Logistics>,
    /// Narration text from the summarizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub short_description: String,
    pub location: String,
    pub start_time: String,
    pub end_time: String,
    pub estimated_cost: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<PlaceDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logistics {
    pub transport_type: String,
    pub estimated_duration: String,
    #[serde(default)]
    pub additional_notes: Option<String>,
    /// Route measured by the travel-time tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<TravelEstimate>,
}

/// Structured place metadata from the Places API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub place_types: Vec<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
    pub open_now: Option<bool>,
}

impl PlaceDetails {
    pub fn open_status(&self) -> &'static str {
        match self.open_now {
            Some(true) => "Open Now",
            Some(false) => "Closed Now",
            None => "Unknown Hours",
        }
    }

    pub fn rating_label(&self) -> String {
        match self.rating {
            Some(r) => format!("{r:.1}/5"),
            None => "N/A".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelEstimate {
    pub mode: String,
    pub duration_text: String,
    pub duration_secs: u64,
    pub distance_text: String,
    pub note: Option<String>,
}

/// Location of a synthesized day narration on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRef {
    pub file_name: String,
    pub path: PathBuf,
    pub bytes: usize,
}

impl AudioRef {
    pub fn url(&self) -> String {
        format!("/audio/{}", self.file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    #[default]
    #[serde(rename = "Historical and Cultural")]
    HistoricalCultural,
    #[serde(rename = "Food and Leisure")]
    FoodLeisure,
    #[serde(rename = "Adventure and Nature")]
    AdventureNature,
}

impl Theme {
    pub const ALL: [Theme; 3] = [
        Theme::HistoricalCultural,
        Theme::FoodLeisure,
        Theme::AdventureNature,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::HistoricalCultural => "Historical and Cultural",
            Self::FoodLeisure => "Food and Leisure",
            Self::AdventureNature => "Adventure and Nature",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trip constraints collected from the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub destination: String,
    pub days: u32,
    pub theme: Theme,
}

impl TripRequest {
    pub fn new(destination: impl Into<String>, days: u32, theme: Theme) -> Self {
        Self {
            destination: destination.into(),
            days,
            theme,
        }
    }

    pub fn validate(&self, min_days: u32, max_days: u32) -> Result<()> {
        if self.destination.trim().is_empty() {
            return Err(Error::validation("destination must not be empty"));
        }
        if self.days < min_days || self.days > max_days {
            return Err(Error::validation(format!(
                "number of days must be between {min_days} and {max_days}, got {}",
                self.days
            )));
        }
        Ok(())
    }
}

impl Itinerary {
    /// Parse a raw model response and validate it.
    pub fn from_json(raw: &str) -> Result<Self> {
        let itinerary: Itinerary = serde_json::from_str(raw)
            .map_err(|e| Error::parse(format!("itinerary JSON: {e}")))?;
        itinerary.validate()?;
        Ok(itinerary)
    }

    pub fn validate(&self) -> Result<()> {
        if self.destination.trim().is_empty() {
            return Err(Error::validation("destination is empty"));
        }
        if self.daily_itinerary.is_empty() {
            return Err(Error::validation("daily_itinerary is empty"));
        }
        if self.daily_itinerary.len() != self.total_days as usize {
            return Err(Error::validation(format!(
                "total_days is {} but daily_itinerary has {} entries",
                self.total_days,
                self.daily_itinerary.len()
            )));
        }
        for (i, day) in self.daily_itinerary.iter().enumerate() {
            day.validate()
                .map_err(|e| Error::validation(format!("day {}: {e}", i + 1)))?;
        }
        Ok(())
    }

    /// Days paired with their 1-based ordinal.
    pub fn days(&self) -> impl Iterator<Item = (usize, &Day)> {
        self.daily_itinerary.iter().enumerate().map(|(i, d)| (i + 1, d))
    }

    pub fn day_mut(&mut self, ordinal: usize) -> Option<&mut Day> {
        ordinal
            .checked_sub(1)
            .and_then(|i| self.daily_itinerary.get_mut(i))
    }
}

impl Day {
    fn validate(&self) -> std::result::Result<(), String> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| format!("date '{}' is not YYYY-MM-DD", self.date))?;
        if self.day_name.trim().is_empty() {
            return Err("day_name is empty".into());
        }
        for activity in &self.activities {
            if activity.name.trim().is_empty() {
                return Err("activity name is empty".into());
            }
            for t in [&activity.start_time, &activity.end_time] {
                parse_hhmm(t).ok_or_else(|| {
                    format!("time '{t}' of '{}' is not HH:MM", activity.name)
                })?;
            }
        }
        let gaps = self.activities.len().saturating_sub(1);
        if self.logistics_between_activities.len() > gaps {
            return Err(format!(
                "{} logistics entries for {} activities",
                self.logistics_between_activities.len(),
                self.activities.len()
            ));
        }
        Ok(())
    }

    /// Logistics entries paired with the name of the activity they lead to.
    pub fn legs(&self) -> impl Iterator<Item = (&Logistics, &str)> {
        self.logistics_between_activities
            .iter()
            .zip(self.activities.iter().skip(1))
            .map(|(l, next)| (l, next.name.as_str()))
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    let (h, m) = s.split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// JSON schema the model must answer with. Only model-produced fields appear here.
pub fn itinerary_schema() -> Value {
    let logistics = json!({
        "type": "object",
        "properties": {
            "transport_type": {
                "type": "string",
                "description": "Kind of transport (e.g., 'By foot', 'Metro L1', 'Taxi', 'Bus')."
            },
            "estimated_duration": {
                "type": "string",
                "description": "Estimated time, including the waiting time (e.g., '15 min', '45 min', '1h 10min')."
            },
            "additional_notes": {
                "type": "string",
                "nullable": true,
                "description": "Short instructions, like 'Buy metro ticket' or 'Use the red metro line'."
            }
        },
        "required": ["transport_type", "estimated_duration"]
    });

    let activity = json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "description": "Name of the place to visit or activity to perform."},
            "short_description": {"type": "string", "description": "Brief description of the place (maximum 2 sentences)."},
            "location": {"type": "string", "description": "Address or well-known reference point."},
            "start_time": {"type": "string", "description": "Activity start time in HH:MM format."},
            "end_time": {"type": "string", "description": "Activity end time in HH:MM format."},
            "estimated_cost": {"type": "string", "description": "Approximate cost per person (e.g., '15€', 'Free', '40 USD')."}
        },
        "required": ["name", "short_description", "location", "start_time", "end_time", "estimated_cost"]
    });

    let day = json!({
        "type": "object",
        "properties": {
            "date": {"type": "string", "description": "Date of the day in YYYY-MM-DD format."},
            "day_name": {"type": "string", "description": "Descriptive name of the day (e.g., 'Historic Center Exploration', 'Museum Day')."},
            "activities": {
                "type": "array",
                "description": "Ordered list of activities planned for this day.",
                "items": activity
            },
            "logistics_between_activities": {
                "type": "array",
                "description": "List of logistics to move between Activity[i] and Activity[i+1].",
                "items": logistics
            }
        },
        "required": ["date", "day_name", "activities", "logistics_between_activities"]
    });

    json!({
        "type": "object",
        "properties": {
            "destination": {"type": "string", "description": "Main city or region of the trip."},
            "total_days": {"type": "integer", "description": "Total number of days the itinerary covers."},
            "main_theme": {"type": "string", "description": "Theme or main focus of the trip (e.g., 'Cultural and Historical', 'Adventure and Nature')."},
            "daily_itinerary": {
                "type": "array",
                "description": "List of the detailed planning, one 'Day' object for each day of the trip.",
                "items": day
            }
        },
        "required": ["destination", "total_days", "main_theme", "daily_itinerary"]
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"{
        "destination": "Madrid, Spain",
        "total_days": 2,
        "main_theme": "Historical and Cultural",
        "daily_itinerary": [
            {
                "date": "2025-05-01",
                "day_name": "Royal Madrid",
                "activities": [
                    {"name": "Royal Palace", "short_description": "Official residence.", "location": "Calle de Bailén", "start_time": "09:00", "end_time": "11:00", "estimated_cost": "14€"},
                    {"name": "Plaza Mayor", "short_description": "Historic square.", "location": "Plaza Mayor", "start_time": "11:30", "end_time": "12:30", "estimated_cost": "Free"}
                ],
                "logistics_between_activities": [
                    {"transport_type": "By foot", "estimated_duration": "15 min", "additional_notes": null}
                ]
            },
            {
                "date": "2025-05-02",
                "day_name": "Museum Day",
                "activities": [
                    {"name": "Prado Museum", "short_description": "Spanish masters.", "location": "Paseo del Prado", "start_time": "10:00", "end_time": "13:00", "estimated_cost": "15€"}
                ],
                "logistics_between_activities": []
            }
        ]
    }"#;

    #[test]
    fn valid_response_parses_into_itinerary() {
        let it = Itinerary::from_json(SAMPLE).unwrap();
        assert_eq!(it.destination, "Madrid, Spain");
        assert_eq!(it.daily_itinerary.len(), 2);
        let day = &it.daily_itinerary[0];
        assert_eq!(day.activities[1].name, "Plaza Mayor");
        assert_eq!(day.logistics_between_activities[0].additional_notes, None);
        assert!(day.summary.is_none());
        assert!(day.activities[0].enrichment.is_none());
        let ordinals: Vec<usize> = it.days().map(|(n, _)| n).collect();
        assert_eq!(ordinals, vec![1, 2]);
    }

    #[test]
    fn missing_field_is_rejected() {
        let raw = SAMPLE.replace(r#""main_theme": "Historical and Cultural","#, "");
        let err = Itinerary::from_json(&raw).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let raw = SAMPLE.replace(r#""total_days": 2"#, r#""total_days": "two""#);
        assert!(matches!(Itinerary::from_json(&raw), Err(Error::Parse(_))));
    }

    #[test]
    fn day_count_mismatch_is_rejected() {
        let raw = SAMPLE.replace(r#""total_days": 2"#, r#""total_days": 3"#);
        assert!(matches!(Itinerary::from_json(&raw), Err(Error::Validation(_))));
    }

    #[test]
    fn bad_time_format_is_rejected() {
        let raw = SAMPLE.replace(r#""start_time": "09:00""#, r#""start_time": "9am""#);
        let err = Itinerary::from_json(&raw).unwrap_err();
        assert!(err.to_string().contains("9am"), "{err}");
    }

    #[test]
    fn bad_date_is_rejected() {
        let raw = SAMPLE.replace("2025-05-02", "May 2nd");
        assert!(matches!(Itinerary::from_json(&raw), Err(Error::Validation(_))));
    }

    #[test]
    fn excess_logistics_are_rejected() {
        let raw = SAMPLE.replace(
            r#""logistics_between_activities": []"#,
            r#""logistics_between_activities": [{"transport_type": "Taxi", "estimated_duration": "5 min"}]"#,
        );
        assert!(matches!(Itinerary::from_json(&raw), Err(Error::Validation(_))));
    }

    #[test]
    fn legs_pair_logistics_with_next_activity() {
        let it = Itinerary::from_json(SAMPLE).unwrap();
        let legs: Vec<_> = it.daily_itinerary[0].legs().collect();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].1, "Plaza Mayor");
        assert_eq!(legs[0].0.transport_type, "By foot");
    }

    #[test]
    fn hhmm_parsing() {
        assert!(parse_hhmm("09:05").is_some());
        assert!(parse_hhmm("24:00").is_none());
        assert!(parse_hhmm("09:5").is_none());
        assert!(parse_hhmm("0905").is_none());
    }

    #[test]
    fn trip_request_bounds() {
        let ok = TripRequest::new("Lisbon", 3, Theme::FoodLeisure);
        assert!(ok.validate(1, 7).is_ok());
        assert!(TripRequest::new("  ", 3, Theme::FoodLeisure).validate(1, 7).is_err());
        assert!(TripRequest::new("Lisbon", 0, Theme::FoodLeisure).validate(1, 7).is_err());
        assert!(TripRequest::new("Lisbon", 8, Theme::FoodLeisure).validate(1, 7).is_err());
    }

    #[test]
    fn theme_labels_round_trip() {
        for theme in Theme::ALL {
            assert_eq!(Theme::from_label(theme.label()), Some(theme));
        }
        assert_eq!(Theme::from_label("food and leisure"), Some(Theme::FoodLeisure));
        assert_eq!(Theme::from_label("Nightlife"), None);
        let json = serde_json::to_string(&Theme::AdventureNature).unwrap();
        assert_eq!(json, "\"Adventure and Nature\"");
    }

    #[test]
    fn schema_requires_every_model_field() {
        let schema = itinerary_schema();
        let top: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(top, ["destination", "total_days", "main_theme", "daily_itinerary"]);

        let day = &schema["properties"]["daily_itinerary"]["items"];
        assert!(day["properties"].get("summary").is_none());
        assert!(day["properties"].get("audio").is_none());
        let activity = &day["properties"]["activities"]["items"];
        assert!(activity["properties"].get("enrichment").is_none());
        assert_eq!(activity["required"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn place_details_labels() {
        let p = PlaceDetails {
            name: "Prado".into(),
            address: "Paseo del Prado".into(),
            place_types: vec!["museum".into()],
            rating: Some(4.75),
            user_ratings_total: Some(120),
            open_now: Some(false),
        };
        assert_eq!(p.open_status(), "Closed Now");
        assert_eq!(p.rating_label(), "4.8/5");
    }
}
