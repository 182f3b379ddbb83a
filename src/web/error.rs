// User-facing error pages for the web UI

use crate::error::Error;
use axum::http::StatusCode;

/// Longest upstream error text shown in a banner.
const MAX_MESSAGE_CHARS: usize = 300;

/// An error rendered as a banner on the planner page.
#[derive(Debug)]
pub struct PageError {
    pub status: StatusCode,
    pub message: String,
}

impl PageError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<Error> for PageError {
    fn from(e: Error) -> Self {
        let (status, message) = match &e {
            Error::RateLimit {
                platform,
                retry_after_secs,
            } => {
                let mut message = format!("The {platform} quota is exhausted.");
                match retry_after_secs {
                    Some(secs) => message.push_str(&format!(" Try again in {secs} s.")),
                    None => message.push_str(" Try again later."),
                }
                (StatusCode::TOO_MANY_REQUESTS, message)
            }
            Error::Parse(_) | Error::Validation(_) => (
                StatusCode::BAD_GATEWAY,
                format!("The model returned an invalid itinerary. Please retry. ({e})"),
            ),
            Error::Api { .. } | Error::Http(_) | Error::RouteNotFound { .. } => {
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            Error::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            Error::Io(_) | Error::Template(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        Self::new(status, truncate(message))
    }
}

fn truncate(mut s: String) -> String {
    if s.chars().count() > MAX_MESSAGE_CHARS {
        s = s.chars().take(MAX_MESSAGE_CHARS).collect();
        s.push_str("...");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_map_to_bad_gateway() {
        let e: PageError = Error::api_with_status("llm", "boom", 500).into();
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);
        assert!(e.message.contains("boom"));

        let e: PageError = Error::validation("day 1: date 'x' is not YYYY-MM-DD").into();
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);
        assert!(e.message.contains("invalid itinerary"));
    }

    #[test]
    fn quota_and_config_statuses() {
        let e: PageError = Error::RateLimit {
            platform: "generativelanguage.googleapis.com".into(),
            retry_after_secs: None,
        }
        .into();
        assert_eq!(e.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(e.message.contains("generativelanguage.googleapis.com"));
        assert!(e.message.ends_with("Try again later."));

        let e: PageError = Error::config("text-to-speech is not configured").into();
        assert_eq!(e.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn rate_limit_names_the_throttling_service() {
        let e: PageError = Error::RateLimit {
            platform: "texttospeech.googleapis.com".into(),
            retry_after_secs: Some(30),
        }
        .into();
        assert_eq!(e.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            e.message,
            "The texttospeech.googleapis.com quota is exhausted. Try again in 30 s."
        );
        assert!(!e.message.contains("model"));
    }

    #[test]
    fn long_messages_are_truncated() {
        let e: PageError = Error::api("llm", "x".repeat(1000)).into();
        assert!(e.message.chars().count() <= MAX_MESSAGE_CHARS + 3);
        assert!(e.message.ends_with("..."));
    }
}
