use serde_json::{Value, json};
use serenity::async_trait;
use tracing::{info, warn};

use crate::models::event::{CalendarEvent, CreatedEvent, EventChanges, NewEvent};
use crate::service::calendar_service::{CalendarGateway, GatewayError, GatewayResult};

const NOT_CONNECTED: &str = "Cal.com not connected. Please set up API key in .env";
const CANCEL_REASON: &str = "Cancelled via chat assistant";
const SKIPPED_STATUSES: [&str; 3] = ["cancelled", "canceled", "rejected"];

/// Cal.com v1 bookings API, authenticated with the `apiKey` query parameter.
pub struct CalcomClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    connected: bool,
}

impl CalcomClient {
    pub fn new(http: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            connected: false,
        }
    }

    /// Probes `GET /me`; the client stays in limited mode unless it answers 200.
    pub async fn authenticate(&mut self) -> bool {
        let Some(key) = self.api_key.clone() else {
            warn!("CALCOM_API_KEY not set, calendar features disabled");
            self.connected = false;
            return false;
        };
        let result = self
            .http
            .get(self.url("/me"))
            .query(&[("apiKey", key.as_str())])
            .send()
            .await;
        self.connected = match result {
            Ok(response) if response.status().is_success() => {
                info!("calendar backend authenticated");
                true
            }
            Ok(response) => {
                warn!(status = %response.status(), "calendar authentication failed");
                false
            }
            Err(err) => {
                warn!(error = %err, "calendar authentication error");
                false
            }
        };
        self.connected
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn key(&self) -> GatewayResult<&str> {
        match (&self.api_key, self.connected) {
            (Some(key), true) => Ok(key),
            _ => Err(GatewayError::new(NOT_CONNECTED)),
        }
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> GatewayResult<(u16, Value)> {
        let key = self.key()?;
        let mut query: Vec<(&str, String)> = vec![("apiKey", key.to_string())];
        query.extend(params.iter().cloned());
        let response = self
            .http
            .get(self.url(path))
            .query(&query)
            .send()
            .await
            .map_err(|e| GatewayError::new(format!("Request failed: {}", e)))?;
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    async fn bookings(&self, params: &[(&str, String)]) -> GatewayResult<Vec<CalendarEvent>> {
        let (status, body) = self.get_json("/bookings", params).await?;
        if status != 200 {
            return Err(GatewayError::new(format!("API error: {}", status)));
        }
        Ok(normalize_bookings(&body))
    }

    async fn try_create(&self, event: &NewEvent) -> GatewayResult<CreatedEvent> {
        let (status, profile) = self.get_json("/me", &[]).await?;
        if status != 200 {
            return Err(GatewayError::new("Could not fetch user profile"));
        }
        let profile = profile.get("user").unwrap_or(&profile);
        let email = str_field(profile, "email").unwrap_or("bot@calendar.com").to_string();
        let username = str_field(profile, "username").unwrap_or("user").to_string();

        let (status, types) = self.get_json("/event-types", &[]).await?;
        if status != 200 {
            return Err(GatewayError::new(
                "Could not fetch event types. Please create an event type in Cal.com first.",
            ));
        }
        let Some(event_type_id) = types
            .get("event_types")
            .and_then(Value::as_array)
            .and_then(|list| list.first())
            .and_then(|first| first.get("id"))
            .cloned()
        else {
            return Err(GatewayError::new(
                "No event types found. Please create an event type in your Cal.com account first.",
            ));
        };

        let location = if event.location.is_empty() {
            json!({"value": "inPerson", "optionValue": ""})
        } else {
            json!({"value": event.location, "optionValue": ""})
        };
        let booking = json!({
            "eventTypeId": event_type_id,
            "start": event.start.format("%Y-%m-%dT%H:%M:%S.000Z").to_string(),
            "end": event.end.format("%Y-%m-%dT%H:%M:%S.000Z").to_string(),
            "responses": {
                "name": username,
                "email": email,
                "title": event.summary,
                "notes": event.description,
                "location": location,
            },
            "title": event.summary,
            "timeZone": event.timezone,
            "language": "en",
            "metadata": {"customTitle": event.summary},
            "organizer": {"name": username, "email": email, "timeZone": event.timezone},
        });

        let key = self.key()?;
        let response = self
            .http
            .post(self.url("/bookings"))
            .query(&[("apiKey", key)])
            .json(&booking)
            .send()
            .await
            .map_err(|e| GatewayError::new(format!("Error creating booking: {}", e)))?;
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        if status != 200 && status != 201 {
            return Err(GatewayError::new(format!(
                "Cal.com API error ({}): {}",
                status,
                error_message(&text)
            )));
        }
        let data: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let created = data.get("booking").unwrap_or(&data);
        Ok(CreatedEvent {
            id: id_field(created).or_else(|| id_field(&data)).unwrap_or_default(),
            link: str_field(created, "bookingUrl")
                .or_else(|| str_field(&data, "link"))
                .unwrap_or_default()
                .to_string(),
        })
    }
}

#[async_trait]
impl CalendarGateway for CalcomClient {
    fn is_connected(&self) -> bool {
        self.connected && self.api_key.is_some()
    }

    async fn create_event(&self, event: &NewEvent) -> GatewayResult<CreatedEvent> {
        let created = self.try_create(event).await?;
        info!(id = %created.id, "booking created");
        Ok(created)
    }

    async fn list_events(&self, max_results: usize) -> GatewayResult<Vec<CalendarEvent>> {
        self.bookings(&[
            ("take", max_results.to_string()),
            ("status", "upcoming".to_string()),
        ])
        .await
    }

    async fn fetch_events(&self, limit: usize) -> GatewayResult<Vec<CalendarEvent>> {
        self.bookings(&[("take", limit.to_string())]).await
    }

    async fn update_event(&self, id: &str, changes: &EventChanges) -> GatewayResult<String> {
        let key = self.key()?;
        let mut body = serde_json::Map::new();
        if let Some(title) = &changes.title {
            body.insert("title".into(), json!(title));
        }
        if let Some(description) = &changes.description {
            body.insert("description".into(), json!(description));
        }
        if let Some(location) = &changes.location {
            body.insert("location".into(), json!(location));
        }
        if let Some(start) = changes.start {
            body.insert("startTime".into(), json!(start.format("%Y-%m-%dT%H:%M:%S").to_string()));
        }
        if let Some(end) = changes.end {
            body.insert("endTime".into(), json!(end.format("%Y-%m-%dT%H:%M:%S").to_string()));
        }

        let response = self
            .http
            .patch(self.url(&format!("/bookings/{}", id)))
            .query(&[("apiKey", key)])
            .json(&Value::Object(body))
            .send()
            .await
            .map_err(|e| GatewayError::new(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        if status != 200 {
            return Err(GatewayError::new(format!("API error: {} - {}", status, text)));
        }
        let data: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(str_field(&data, "link").unwrap_or_default().to_string())
    }

    async fn delete_event(&self, id: &str) -> GatewayResult<()> {
        let key = self.key()?;
        let ok = |status: u16| matches!(status, 200 | 201 | 204);
        let send_err = |e: reqwest::Error| GatewayError::new(format!("Exception: {}", e));

        let cancel = self
            .http
            .post(self.url(&format!("/bookings/{}/cancel", id)))
            .query(&[("apiKey", key)])
            .json(&json!({"id": id, "reason": CANCEL_REASON}))
            .send()
            .await
            .map_err(send_err)?;
        if ok(cancel.status().as_u16()) {
            return Ok(());
        }

        let response = self
            .http
            .delete(self.url(&format!("/bookings/{}", id)))
            .query(&[("apiKey", key)])
            .send()
            .await
            .map_err(send_err)?;
        let status = response.status().as_u16();
        if ok(status) {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(GatewayError::new(format!(
            "API error ({}): {}",
            status,
            error_message(&text)
        )))
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn id_field(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `message` from a JSON error body, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Display title: metadata.customTitle, then responses.title, then the booking title.
fn booking_title(booking: &Value) -> String {
    let custom = booking
        .get("metadata")
        .and_then(|m| str_field(m, "customTitle"));
    let from_responses = || match booking.get("responses") {
        Some(Value::Object(_)) => booking.get("responses").and_then(|r| str_field(r, "title")),
        Some(Value::Array(items)) => items
            .iter()
            .find(|item| item.get("label").and_then(Value::as_str) == Some("title"))
            .and_then(|item| str_field(item, "value")),
        _ => None,
    };
    custom
        .or_else(from_responses)
        .or_else(|| str_field(booking, "title"))
        .unwrap_or("No Title")
        .to_string()
}

pub fn normalize_bookings(body: &Value) -> Vec<CalendarEvent> {
    let Some(bookings) = body.get("bookings").and_then(Value::as_array) else {
        return Vec::new();
    };
    bookings
        .iter()
        .filter_map(|booking| {
            let status = str_field(booking, "status").unwrap_or_default().to_lowercase();
            if SKIPPED_STATUSES.contains(&status.as_str()) {
                return None;
            }
            let location = match booking.get("location") {
                Some(Value::String(s)) => s.clone(),
                _ => String::new(),
            };
            Some(CalendarEvent {
                id: id_field(booking)?,
                summary: booking_title(booking),
                start: str_field(booking, "startTime").unwrap_or_default().to_string(),
                end: str_field(booking, "endTime").unwrap_or_default().to_string(),
                description: str_field(booking, "description").unwrap_or_default().to_string(),
                location,
                link: str_field(booking, "link").unwrap_or_default().to_string(),
                status,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_titles_and_skips_cancelled() {
        let body = json!({
            "bookings": [
                {"id": 1, "title": "30 min meeting", "status": "ACCEPTED",
                 "metadata": {"customTitle": "Dentist"},
                 "startTime": "2025-11-25T14:00:00.000Z", "endTime": "2025-11-25T15:00:00.000Z"},
                {"id": 2, "title": "Gym", "status": "cancelled"},
                {"id": "abc", "title": "fallback", "status": "accepted",
                 "responses": [{"label": "title", "value": "Standup"}]},
                {"id": 4, "title": "Plain", "responses": {"title": ""}, "location": "Room 1"}
            ]
        });
        let events = normalize_bookings(&body);
        let titles: Vec<_> = events.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(titles, ["Dentist", "Standup", "Plain"]);
        assert_eq!(events[0].id, "1");
        assert_eq!(events[0].status, "accepted");
        assert_eq!(events[1].id, "abc");
        assert_eq!(events[2].location, "Room 1");
    }

    #[test]
    fn missing_bookings_key_is_empty() {
        assert!(normalize_bookings(&json!({"data": []})).is_empty());
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(error_message(r#"{"message":"slot taken"}"#), "slot taken");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn disconnected_client_refuses_calls() {
        let client = CalcomClient::new(reqwest::Client::new(), "http://localhost".into(), None);
        assert!(!client.is_connected());
        let err = client.delete_event("1").await.unwrap_err();
        assert_eq!(err.0, NOT_CONNECTED);
    }
}
