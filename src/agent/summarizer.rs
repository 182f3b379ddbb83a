use crate::error::{Error, Result};
use crate::llm::{Generation, LlmClient};
use crate::model::Day;
use tracing::info;

const OPENING: &str = "Good morning! An incredible day awaits you...";

fn summary_prompt(day: &Day) -> String {
    let activities = day
        .activities
        .iter()
        .map(|a| {
            format!(
                "- {}-{}: {}. Description: {}. Cost: {}",
                a.start_time, a.end_time, a.name, a.short_description, a.estimated_cost
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a travel podcast host. Based on the following daily itinerary, write a concise, \
         enthusiastic, and easy-to-read summary (max 4-5 sentences, intended to be read aloud) \
         of the day. Focus on the most important activities.\n\
         The name of the day is: \"{}\".\n\
         Activities:\n{activities}\n\n\
         Write the final summary ONLY in English. Start with: '{OPENING}'",
        day.day_name
    )
}

/// Ask the model for a short spoken narration of one day.
pub async fn summarize_day(llm: &LlmClient, day: &Day) -> Result<String> {
    if day.activities.is_empty() {
        return Err(Error::validation(format!(
            "'{}' has no activities to summarize",
            day.day_name
        )));
    }

    let generation = Generation {
        temperature: 0.5,
        response_schema: None,
    };
    let narration = llm
        .complete(None, &summary_prompt(day), &generation)
        .await?
        .trim()
        .to_string();

    if narration.is_empty() {
        return Err(Error::parse("empty narration from LLM"));
    }
    info!(day = %day.day_name, chars = narration.len(), "day narration generated");
    Ok(narration)
}
