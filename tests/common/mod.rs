#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};

use calendarBot::clients::openai_client::CompletionRequest;
use calendarBot::error::BotError;
use calendarBot::handlers::action::ActionExecutor;
use calendarBot::handlers::dispatcher::Dispatcher;
use calendarBot::flow::session::Language;
use calendarBot::models::event::{CalendarEvent, CreatedEvent, EventChanges, NewEvent};
use calendarBot::service::calendar_service::{CalendarGateway, GatewayError, GatewayResult};
use calendarBot::service::classifier::IntentClassifier;
use calendarBot::service::openai_service::OpenAIClient;
use calendarBot::store::TaskNoteStore;
use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

/// Hands out queued completions in order; an empty queue behaves like an outage.
#[derive(Default)]
pub struct FakeOpenAI {
    responses: StdMutex<VecDeque<Result<String, String>>>,
    pub requests: StdMutex<Vec<CompletionRequest>>,
}

impl FakeOpenAI {
    pub fn with(responses: &[Result<&str, &str>]) -> Self {
        let queue = responses
            .iter()
            .copied()
            .map(|r| r.map(str::to_string).map_err(str::to_string))
            .collect();
        Self {
            responses: StdMutex::new(queue),
            requests: StdMutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: Result<&str, &str>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(response.map(str::to_string).map_err(str::to_string));
    }
}

#[serenity::async_trait]
impl OpenAIClient for FakeOpenAI {
    async fn complete(&self, request: CompletionRequest) -> Result<String, BotError> {
        self.requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(body)) => Ok(body),
            Some(Err(err)) => Err(BotError::Llm(err)),
            None => Err(BotError::Llm("no scripted response".into())),
        }
    }
}

/// In-memory calendar that records every mutating call.
pub struct FakeCalendar {
    pub connected: bool,
    pub events: Vec<CalendarEvent>,
    pub create_error: Option<String>,
    pub created: StdMutex<Vec<NewEvent>>,
    pub deleted: StdMutex<Vec<String>>,
    pub updated: StdMutex<Vec<(String, EventChanges)>>,
}

impl FakeCalendar {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self {
            connected: true,
            events,
            create_error: None,
            created: StdMutex::new(Vec::new()),
            deleted: StdMutex::new(Vec::new()),
            updated: StdMutex::new(Vec::new()),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_create(message: &str) -> Self {
        Self {
            create_error: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }
}

#[serenity::async_trait]
impl CalendarGateway for FakeCalendar {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn create_event(&self, event: &NewEvent) -> GatewayResult<CreatedEvent> {
        if let Some(message) = &self.create_error {
            return Err(GatewayError::new(message.clone()));
        }
        self.created.lock().unwrap().push(event.clone());
        Ok(CreatedEvent {
            id: "101".into(),
            link: String::new(),
        })
    }

    async fn list_events(&self, max_results: usize) -> GatewayResult<Vec<CalendarEvent>> {
        Ok(self.events.iter().take(max_results).cloned().collect())
    }

    async fn fetch_events(&self, limit: usize) -> GatewayResult<Vec<CalendarEvent>> {
        Ok(self.events.iter().take(limit).cloned().collect())
    }

    async fn update_event(&self, id: &str, changes: &EventChanges) -> GatewayResult<String> {
        self.updated
            .lock()
            .unwrap()
            .push((id.to_string(), changes.clone()));
        Ok(String::new())
    }

    async fn delete_event(&self, id: &str) -> GatewayResult<()> {
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

pub fn event(id: &str, summary: &str, start: &str) -> CalendarEvent {
    CalendarEvent {
        id: id.into(),
        summary: summary.into(),
        start: start.into(),
        end: start.into(),
        description: String::new(),
        location: String::new(),
        link: String::new(),
        status: "accepted".into(),
    }
}

/// Monday 2025-11-24 10:00 local.
pub fn monday_morning() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 11, 24)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

pub struct Harness {
    pub dispatcher: Dispatcher,
    pub executor: Arc<ActionExecutor>,
    pub openai: Arc<FakeOpenAI>,
    pub calendar: Arc<FakeCalendar>,
    _dir: TempDir,
}

pub fn harness(openai: FakeOpenAI, calendar: FakeCalendar, admin: Option<&str>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let openai = Arc::new(openai);
    let calendar = Arc::new(calendar);
    let store = Arc::new(TaskNoteStore::open(dir.path()).unwrap());
    let classifier = Arc::new(IntentClassifier::new(openai.clone()));
    let executor = Arc::new(ActionExecutor::new(classifier, calendar.clone(), store));
    let dispatcher = Dispatcher::new(
        executor.clone(),
        admin.map(str::to_string),
        chrono_tz::Tz::UTC,
        Language::En,
    );
    Harness {
        dispatcher,
        executor,
        openai,
        calendar,
        _dir: dir,
    }
}
