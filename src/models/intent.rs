use serde::Deserialize;
use serde_json::{Map, Value};

/// A classified free-text message. Parameters the action does not use are dropped
/// when the raw completion is converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    CreateEvent(EventDraft),
    ListEvents,
    UpdateEvent {
        target: EventTarget,
        title: Option<String>,
        description: Option<String>,
        location: Option<String>,
        start_time: Option<String>,
        end_time: Option<String>,
    },
    DeleteEvent {
        target: EventTarget,
    },
    SearchEvents {
        query: Option<String>,
    },
    GetDateEvents {
        date: Option<String>,
    },
    GeneralChat {
        response_text: Option<String>,
    },
    Error {
        message: String,
    },
    Unrecognized {
        action: String,
    },
}

/// Longest booking a draft may ask for; anything above falls back to the default length.
pub const MAX_DURATION_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDraft {
    pub title: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Either an explicit backend id or a free-text query to search by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTarget {
    pub event_id: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    action: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

impl Intent {
    pub fn action_name(&self) -> &str {
        match self {
            Intent::CreateEvent(_) => "create_event",
            Intent::ListEvents => "list_events",
            Intent::UpdateEvent { .. } => "update_event",
            Intent::DeleteEvent { .. } => "delete_event",
            Intent::SearchEvents { .. } => "search_events",
            Intent::GetDateEvents { .. } => "get_date_events",
            Intent::GeneralChat { .. } => "general_chat",
            Intent::Error { .. } => "error",
            Intent::Unrecognized { action } => action,
        }
    }

    /// Parses the `{"action": ..., "parameters": {...}}` completion shape.
    pub fn from_json(payload: &str) -> Result<Intent, serde_json::Error> {
        let raw: RawIntent = serde_json::from_str(payload)?;
        Ok(Intent::from_raw(raw))
    }

    fn from_raw(raw: RawIntent) -> Intent {
        let params = &raw.parameters;
        let target = || EventTarget {
            event_id: text(params, "event_id"),
            query: text(params, "query").or_else(|| text(params, "title")),
        };
        match raw.action.trim() {
            "create_event" => Intent::CreateEvent(EventDraft {
                title: text(params, "title"),
                start_time: text(params, "start_time"),
                end_time: text(params, "end_time"),
                duration_minutes: text(params, "duration_minutes")
                    .and_then(|raw| raw.parse::<f64>().ok())
                    .filter(|minutes| *minutes > 0.0 && *minutes <= MAX_DURATION_MINUTES as f64)
                    .map(|minutes| minutes.round() as i64),
                description: text(params, "description"),
                location: text(params, "location"),
            }),
            "list_events" => Intent::ListEvents,
            "update_event" => Intent::UpdateEvent {
                target: EventTarget {
                    event_id: text(params, "event_id"),
                    query: text(params, "query"),
                },
                title: text(params, "title"),
                description: text(params, "description"),
                location: text(params, "location"),
                start_time: text(params, "start_time"),
                end_time: text(params, "end_time"),
            },
            "delete_event" => Intent::DeleteEvent { target: target() },
            "search_events" => Intent::SearchEvents {
                query: text(params, "query"),
            },
            "get_date_events" => Intent::GetDateEvents {
                date: text(params, "date"),
            },
            "general_chat" => Intent::GeneralChat {
                response_text: text(params, "response_text"),
            },
            "error" => Intent::Error {
                message: text(params, "response_text")
                    .unwrap_or_else(|| "Unknown error".to_string()),
            },
            other => Intent::Unrecognized {
                action: other.to_string(),
            },
        }
    }
}

/// Strings and numbers are both accepted; blanks count as absent.
fn text(params: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match params.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if value.is_empty() { None } else { Some(value) }
}
