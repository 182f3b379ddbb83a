use crate::agent::PlanSource;
use crate::error::{Error, Result};
use crate::model::{Activity, Day, Itinerary, Logistics, Theme, TripRequest};
use askama::Template;
use chrono::Utc;

#[derive(Template)]
#[template(path = "planner.html")]
struct PlannerPage {
    interactive: bool,
    error: Option<String>,
    form: FormView,
    trip: Option<TripView>,
}

#[allow(dead_code)] // fields used by Askama template
struct FormView {
    destination: String,
    days: u32,
    min_days: u32,
    max_days: u32,
    themes: Vec<ThemeOption>,
}

#[allow(dead_code)] // fields used by Askama template
struct ThemeOption {
    label: &'static str,
    selected: bool,
}

#[allow(dead_code)] // fields used by Askama template
struct TripView {
    id: String,
    destination: String,
    day_count: usize,
    theme: String,
    model: String,
    generated_at: String,
    notice: Option<String>,
    narration_available: bool,
    days: Vec<DayView>,
}

#[allow(dead_code)] // fields used by Askama template
struct DayView {
    ordinal: usize,
    checked: bool,
    title: String,
    date: String,
    activities: Vec<ActivityView>,
    legs: Vec<LegView>,
    summary: Option<String>,
    audio_url: Option<String>,
}

#[allow(dead_code)] // fields used by Askama template
struct ActivityView {
    time: String,
    name: String,
    description: String,
    location: String,
    cost: String,
    place: Option<PlaceView>,
}

#[allow(dead_code)] // fields used by Askama template
struct PlaceView {
    address: String,
    rating: String,
    status: String,
    kinds: String,
}

#[allow(dead_code)] // fields used by Askama template
struct LegView {
    next_activity: String,
    transport: String,
    duration: String,
    notes: String,
    measured: Option<String>,
}

/// A planned trip as shown on its page.
pub struct TripPage<'a> {
    pub id: &'a str,
    pub itinerary: &'a Itinerary,
    pub source: PlanSource,
    pub model: &'a str,
    pub narration_available: bool,
}

/// Form contents plus the allowed day range.
pub struct FormState<'a> {
    pub request: &'a TripRequest,
    pub min_days: u32,
    pub max_days: u32,
}

fn activity_to_view(a: &Activity) -> ActivityView {
    ActivityView {
        time: format!("{} - {}", a.start_time, a.end_time),
        name: a.name.clone(),
        description: a.short_description.clone(),
        location: a.location.clone(),
        cost: a.estimated_cost.clone(),
        place: a.enrichment.as_ref().map(|p| PlaceView {
            address: p.address.clone(),
            rating: p.rating_label(),
            status: p.open_status().to_string(),
            kinds: p.place_types.join(", "),
        }),
    }
}

fn leg_to_view(l: &Logistics, next_activity: &str) -> LegView {
    LegView {
        next_activity: next_activity.to_string(),
        transport: l.transport_type.clone(),
        duration: l.estimated_duration.clone(),
        notes: l
            .additional_notes
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "None".into()),
        measured: l.measured.as_ref().map(|m| {
            let mut s = format!("{}, {} ({})", m.mode, m.duration_text, m.distance_text);
            if let Some(note) = &m.note {
                s.push_str(". ");
                s.push_str(note);
            }
            s
        }),
    }
}

fn day_to_view(ordinal: usize, day: &Day) -> DayView {
    DayView {
        ordinal,
        checked: ordinal == 1,
        title: day.day_name.clone(),
        date: day.date.clone(),
        activities: day.activities.iter().map(activity_to_view).collect(),
        legs: day.legs().map(|(l, next)| leg_to_view(l, next)).collect(),
        summary: day.summary.clone(),
        audio_url: day.audio.as_ref().map(|a| a.url()),
    }
}

fn trip_to_view(trip: &TripPage<'_>) -> TripView {
    let it = trip.itinerary;
    TripView {
        id: trip.id.to_string(),
        destination: it.destination.clone(),
        day_count: it.daily_itinerary.len(),
        theme: it.main_theme.clone(),
        model: if trip.source.is_demo() {
            "demo data".into()
        } else {
            trip.model.to_string()
        },
        generated_at: Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        notice: trip.source.notice().map(String::from),
        narration_available: trip.narration_available,
        days: it.days().map(|(n, d)| day_to_view(n, d)).collect(),
    }
}

fn form_to_view(form: &FormState<'_>) -> FormView {
    FormView {
        destination: form.request.destination.clone(),
        days: form.request.days,
        min_days: form.min_days,
        max_days: form.max_days,
        themes: Theme::ALL
            .into_iter()
            .map(|t| ThemeOption {
                label: t.label(),
                selected: t == form.request.theme,
            })
            .collect(),
    }
}

/// Render the planner page: the trip form, an optional error banner and an optional trip.
pub fn render_page(
    form: &FormState<'_>,
    trip: Option<&TripPage<'_>>,
    error: Option<&str>,
) -> Result<String> {
    let page = PlannerPage {
        interactive: true,
        error: error.map(String::from),
        form: form_to_view(form),
        trip: trip.map(trip_to_view),
    };
    page.render()
        .map_err(|e| Error::Template(format!("template render: {e}")))
}

/// Render a standalone itinerary page with no form or narration controls.
pub fn render_static(trip: &TripPage<'_>) -> Result<String> {
    let request = TripRequest::new(
        trip.itinerary.destination.clone(),
        trip.itinerary.total_days,
        Theme::default(),
    );
    let form = FormState {
        request: &request,
        min_days: 1,
        max_days: trip.itinerary.total_days.max(1),
    };
    let page = PlannerPage {
        interactive: false,
        error: None,
        form: form_to_view(&form),
        trip: Some(trip_to_view(trip)),
    };
    page.render()
        .map_err(|e| Error::Template(format!("template render: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::SAMPLE;
    use crate::model::{AudioRef, PlaceDetails, TravelEstimate};
    use std::path::PathBuf;

    fn form_request() -> TripRequest {
        TripRequest::new("Madrid, Spain", 2, Theme::FoodLeisure)
    }

    #[test]
    fn home_page_preselects_theme() {
        let request = form_request();
        let form = FormState {
            request: &request,
            min_days: 1,
            max_days: 7,
        };
        let html = render_page(&form, None, None).unwrap();
        assert!(html.contains("<form"));
        assert!(html.contains(r#"<option value="Food and Leisure" selected>"#));
        assert!(!html.contains("class=\"banner error\""));
    }

    #[test]
    fn error_banner_is_escaped() {
        let request = form_request();
        let form = FormState {
            request: &request,
            min_days: 1,
            max_days: 7,
        };
        let html = render_page(&form, None, Some("upstream <503>")).unwrap();
        assert!(html.contains("class=\"banner error\""));
        assert!(html.contains("upstream &#60;503&#62;"));
        assert!(!html.contains("<503>"));
    }

    #[test]
    fn trip_page_shows_tabs_activities_and_logistics() {
        let it = Itinerary::from_json(SAMPLE).unwrap();
        let request = form_request();
        let form = FormState {
            request: &request,
            min_days: 1,
            max_days: 7,
        };
        let trip = TripPage {
            id: "abc",
            itinerary: &it,
            source: PlanSource::Model,
            model: "gemini-2.5-flash",
            narration_available: true,
        };
        let html = render_page(&form, Some(&trip), None).unwrap();
        assert!(html.contains("Plan for Madrid, Spain (2 Days)"));
        assert!(html.contains("Theme: Historical and Cultural"));
        assert!(html.contains("gemini-2.5-flash"));
        assert!(html.contains(">Day 1<"));
        assert!(html.contains(">Day 2<"));
        assert!(html.contains("Royal Palace"));
        assert!(html.contains("09:00 - 11:00"));
        assert!(html.contains("Logistics to Plaza Mayor"));
        assert!(html.contains("By foot (15 min)"));
        assert!(html.contains("/trips/abc/days/1/audio"));
    }

    #[test]
    fn enrichment_summary_and_audio_render() {
        let mut it = Itinerary::from_json(SAMPLE).unwrap();
        let day = &mut it.daily_itinerary[0];
        day.activities[0].enrichment = Some(PlaceDetails {
            name: "Palacio Real".into(),
            address: "Calle de Bailen, Madrid".into(),
            place_types: vec!["tourist_attraction".into()],
            rating: Some(4.7),
            user_ratings_total: Some(100),
            open_now: Some(true),
        });
        day.logistics_between_activities[0].measured = Some(TravelEstimate {
            mode: "Walking".into(),
            duration_text: "12 mins".into(),
            duration_secs: 720,
            distance_text: "0.9 km".into(),
            note: None,
        });
        day.summary = Some("Good morning! An incredible day awaits you...".into());
        day.audio = Some(AudioRef {
            file_name: "abc-day-1.mp3".into(),
            path: PathBuf::from("audio/abc-day-1.mp3"),
            bytes: 10,
        });
        let trip = TripPage {
            id: "abc",
            itinerary: &it,
            source: PlanSource::Model,
            model: "m",
            narration_available: true,
        };
        let html = render_static(&trip).unwrap();
        assert!(html.contains("Calle de Bailen, Madrid"));
        assert!(html.contains("4.7/5"));
        assert!(html.contains("Open Now"));
        assert!(html.contains("Walking, 12 mins (0.9 km)"));
        assert!(html.contains(r#"src="/audio/abc-day-1.mp3""#));
        assert!(!html.contains("<form"));
    }

    #[test]
    fn demo_plan_shows_notice() {
        let it = Itinerary::from_json(SAMPLE).unwrap();
        let trip = TripPage {
            id: "abc",
            itinerary: &it,
            source: PlanSource::QuotaFallback,
            model: "gemini-2.5-flash",
            narration_available: false,
        };
        let html = render_static(&trip).unwrap();
        assert!(html.contains("Model quota exceeded"));
        assert!(html.contains("demo data"));
    }
}
