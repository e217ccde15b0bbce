use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use crate::clients::openai_client::CompletionRequest;
use crate::models::chat::ChatMessage;
use crate::models::event::{CalendarEvent, parse_timestamp};
use crate::models::intent::Intent;
use crate::service::openai_service::OpenAIClient;
use crate::service::presentation::format_events_for_display;

pub const UNPARSEABLE_REPLY: &str =
    "I'm sorry, I couldn't understand that request. Could you please rephrase it?";
pub const CHAT_FALLBACK: &str =
    "I'm having trouble generating a response right now. Please try again.";
const SUMMARY_EMPTY: &str = "You have no upcoming events. Your schedule is clear! ✨";
const SUMMARY_LIMIT: usize = 10;

const CLASSIFY_PROMPT: &str = r#"You are a smart calendar and task management assistant.
Analyze the user's message and extract:
1. Action type: create_event, list_events, update_event, delete_event, search_events, get_date_events, general_chat
2. Event details if applicable: title, start_time, end_time, description, location, date
3. Any other relevant parameters

Return ONLY a valid JSON object with the following structure:
{
    "action": "action_type",
    "parameters": {
        "title": "event title",
        "start_time": "ISO format datetime or description",
        "end_time": "ISO format datetime or description",
        "duration_minutes": number,
        "description": "description",
        "location": "location",
        "date": "YYYY-MM-DD",
        "query": "search query",
        "event_id": "id",
        "response_text": "friendly response to user"
    }
}

Current date and time: {now}

Examples:
- "Schedule a meeting tomorrow at 2pm for 1 hour" -> create_event with calculated times
- "What's on my calendar today?" -> get_date_events with today's date
- "Show my upcoming events" -> list_events
- "Cancel my dentist appointment" -> delete_event with query "dentist"
"#;

const CHAT_PROMPT: &str = "You are a helpful, friendly calendar and task management assistant. \
You help users manage their schedules, events, and tasks. Be concise but friendly.\n\
Current date and time: {now}";

const SUMMARY_PROMPT: &str =
    "You are a helpful assistant that summarizes calendar events in a friendly, concise way.";

/// Wraps the completion client with the two fallbacks callers rely on: a malformed
/// completion becomes `GeneralChat`, a failed call becomes `Error`.
pub struct IntentClassifier {
    openai: Arc<dyn OpenAIClient>,
}

impl IntentClassifier {
    pub fn new(openai: Arc<dyn OpenAIClient>) -> Self {
        Self { openai }
    }

    pub async fn analyze_user_request(
        &self,
        text: &str,
        history: &[ChatMessage],
        now: NaiveDateTime,
    ) -> Intent {
        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(text));
        let request = CompletionRequest::new(with_now(CLASSIFY_PROMPT, now), messages);

        let raw = match self.openai.complete(request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "intent classification failed");
                return Intent::Error {
                    message: format!("An error occurred: {}", err),
                };
            }
        };

        match Intent::from_json(strip_code_fences(&raw)) {
            Ok(intent) => {
                debug!(action = intent.action_name(), "classified request");
                intent
            }
            Err(err) => {
                warn!(error = %err, response = %raw, "classifier returned malformed JSON");
                Intent::GeneralChat {
                    response_text: Some(UNPARSEABLE_REPLY.to_string()),
                }
            }
        }
    }

    /// Free-form reply; never fails.
    pub async fn generate_response(
        &self,
        text: &str,
        history: &[ChatMessage],
        now: NaiveDateTime,
    ) -> String {
        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(text));
        let request = CompletionRequest::new(with_now(CHAT_PROMPT, now), messages)
            .temperature(0.8)
            .max_tokens(300);
        match self.openai.complete(request).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => CHAT_FALLBACK.to_string(),
            Err(err) => {
                warn!(error = %err, "chat completion failed");
                CHAT_FALLBACK.to_string()
            }
        }
    }

    /// Resolves a phrase like "tomorrow at 2pm" against `reference`. `None` when the
    /// model cannot produce a timestamp.
    pub async fn resolve_time(&self, phrase: &str, reference: NaiveDateTime) -> Option<NaiveDateTime> {
        let tomorrow_two = (reference + Duration::days(1))
            .with_hour(14)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .unwrap_or(reference);
        let system = format!(
            "Convert the time description to ISO format datetime.\n\
             Current datetime: {}\n\
             Return ONLY the ISO format datetime string, nothing else.\n\
             Examples:\n\
             - \"tomorrow at 2pm\" -> {}\n\
             - \"in 2 hours\" -> {}\n\
             - \"next Monday at 10am\" -> calculate the next Monday and set time to 10:00",
            iso(reference),
            iso(tomorrow_two),
            iso(reference + Duration::hours(2)),
        );
        let request = CompletionRequest::new(system, vec![ChatMessage::user(phrase)])
            .temperature(0.3)
            .max_tokens(100);
        match self.openai.complete(request).await {
            Ok(raw) => parse_timestamp(strip_code_fences(&raw)),
            Err(err) => {
                warn!(error = %err, phrase, "time resolution failed");
                None
            }
        }
    }

    /// Friendly digest of up to ten events, or the plain listing if the model fails.
    pub async fn create_smart_summary(&self, events: &[CalendarEvent]) -> String {
        if events.is_empty() {
            return SUMMARY_EMPTY.to_string();
        }
        let lines: Vec<String> = events
            .iter()
            .take(SUMMARY_LIMIT)
            .map(|event| format!("- {} at {}", event.summary, event.start))
            .collect();
        let request = CompletionRequest::new(
            SUMMARY_PROMPT,
            vec![ChatMessage::user(format!(
                "Summarize these upcoming events:\n{}",
                lines.join("\n")
            ))],
        )
        .temperature(0.7)
        .max_tokens(200);
        match self.openai.complete(request).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            _ => format_events_for_display(events),
        }
    }
}

fn with_now(template: &str, now: NaiveDateTime) -> String {
    template.replace("{now}", &now.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn iso(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Drops a surrounding ```json fence the model sometimes adds.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_json() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }
}
