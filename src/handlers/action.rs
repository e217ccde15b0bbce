use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::error::BotResult;
use crate::flow::callback::{Callback, MenuAction};
use crate::flow::machine::{Commit, FlowKind};
use crate::flow::session::{CollectedFields, EventChoice, Field, FieldValue, Language};
use crate::models::chat::ChatMessage;
use crate::models::event::{CalendarEvent, EventChanges, NewEvent, parse_timestamp};
use crate::models::intent::{EventDraft, EventTarget, Intent};
use crate::models::task::Priority;
use crate::service::calendar_service::{
    CalendarGateway, DEFAULT_SEARCH_RESULTS, GatewayResult, events_for_date, search_events,
};
use crate::service::classifier::IntentClassifier;
use crate::service::i18n::{Msg, tr, trf};
use crate::service::presentation::{
    Reply, confirm_delete, event_listing, format_events_for_display, language_picker, main_menu,
    note_detail, note_line, note_list, task_line, task_list, with_menu,
};
use crate::store::{StoreError, TaskNoteStore};

pub const BOT_NAME: &str = "Calendar Assistant";
pub const LIST_LIMIT: usize = 10;
pub const DEFAULT_DURATION_MINUTES: i64 = 60;
/// Zone sent with every booking; local "today"/"tomorrow" only affect date math.
pub const BOOKING_TIMEZONE: &str = "UTC";

/// What the dispatcher should do next: show a reply, or enter a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Reply(Reply),
    StartFlow { kind: FlowKind, seed: CollectedFields },
}

impl From<Reply> for ActionOutcome {
    fn from(reply: Reply) -> Self {
        ActionOutcome::Reply(reply)
    }
}

/// One free-text message being handled.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    pub user_id: &'a str,
    pub text: &'a str,
    pub lang: Language,
    pub history: &'a [ChatMessage],
    pub now: NaiveDateTime,
}

/// Maps intents, menu entries, flow commits and buttons onto the calendar and
/// the task/note store. Holds no per-user state.
pub struct ActionExecutor {
    classifier: Arc<IntentClassifier>,
    calendar: Arc<dyn CalendarGateway>,
    store: Arc<TaskNoteStore>,
}

impl ActionExecutor {
    pub fn new(
        classifier: Arc<IntentClassifier>,
        calendar: Arc<dyn CalendarGateway>,
        store: Arc<TaskNoteStore>,
    ) -> Self {
        Self {
            classifier,
            calendar,
            store,
        }
    }

    pub fn calendar_enabled(&self) -> bool {
        self.calendar.is_connected()
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn store(&self) -> &TaskNoteStore {
        &self.store
    }

    pub async fn execute(&self, intent: Intent, turn: Turn<'_>) -> BotResult<ActionOutcome> {
        let lang = turn.lang;
        if needs_calendar(&intent) && !self.calendar_enabled() {
            return Ok(Reply::text(tr(lang, Msg::CalendarDisabled)).into());
        }
        info!(action = intent.action_name(), user_id = turn.user_id, "executing intent");

        let outcome = match intent {
            Intent::CreateEvent(draft) => return Ok(self.create_from_draft(draft, turn).await),
            Intent::ListEvents => self.upcoming(lang).await,
            Intent::GetDateEvents { date } => self.date_events(date.as_deref(), turn).await,
            Intent::SearchEvents { query } => match query {
                Some(query) => self.search_reply(&query, lang).await,
                None => Reply::text(tr(lang, Msg::NeedQuery)),
            },
            Intent::DeleteEvent { target } => self.delete_target(&target, lang).await,
            Intent::UpdateEvent {
                target,
                title,
                description,
                location,
                start_time,
                end_time,
            } => {
                let changes = EventChanges {
                    title,
                    description,
                    location,
                    start: self.resolve(start_time.as_deref(), turn.now).await,
                    end: self.resolve(end_time.as_deref(), turn.now).await,
                };
                self.update_target(&target, changes, lang).await
            }
            Intent::GeneralChat {
                response_text: Some(text),
            } => Reply::text(text),
            Intent::GeneralChat { response_text: None }
            | Intent::Error { .. }
            | Intent::Unrecognized { .. } => Reply::text(
                self.classifier
                    .generate_response(turn.text, turn.history, turn.now)
                    .await,
            ),
        };
        Ok(outcome.into())
    }

    /// Direct handler for a main-menu entry. Access and calendar checks are the
    /// dispatcher's job.
    pub async fn menu(
        &self,
        action: MenuAction,
        user_id: &str,
        lang: Language,
        today: NaiveDate,
    ) -> BotResult<ActionOutcome> {
        let outcome = match action {
            MenuAction::Main => Reply::with_keyboard(tr(lang, Msg::MainMenu), main_menu(lang)).into(),
            MenuAction::Help => with_menu(lang, tr(lang, Msg::Help)).into(),
            MenuAction::Language => language_picker().into(),
            MenuAction::CreateEvent => start(FlowKind::CreateEvent, CollectedFields::new()),
            MenuAction::Search => start(FlowKind::Search, CollectedFields::new()),
            MenuAction::AddTask => start(FlowKind::AddTask, CollectedFields::new()),
            MenuAction::AddNote => start(FlowKind::AddNote, CollectedFields::new()),
            MenuAction::Upcoming => self.upcoming(lang).await.into(),
            MenuAction::Today => self.today(lang, today).await.into(),
            MenuAction::Delete => self.pick_event(FlowKind::Delete, Msg::NoDelete, lang).await,
            MenuAction::Edit => self.pick_event(FlowKind::EditTitle, Msg::NoEdit, lang).await,
            MenuAction::Tasks => task_list(lang, &self.store.get_tasks(user_id, false).await).into(),
            MenuAction::Notes => note_list(lang, &self.store.get_notes(user_id).await).into(),
        };
        Ok(outcome)
    }

    /// Executes the result of a finished flow.
    pub async fn commit(&self, commit: Commit, user_id: &str, lang: Language) -> BotResult<Reply> {
        match commit {
            Commit::CreateEvent { title, start } => {
                let Some(end) = start.checked_add_signed(Duration::hours(1)) else {
                    return Ok(with_menu(lang, tr(lang, Msg::UnclearTime)));
                };
                let event = NewEvent {
                    summary: title,
                    start,
                    end,
                    description: String::new(),
                    location: String::new(),
                    timezone: BOOKING_TIMEZONE.to_string(),
                };
                Ok(with_menu(lang, self.create(&event, lang).await))
            }
            Commit::Search { query } => Ok(self.search_everything(&query, user_id, lang).await),
            Commit::DeleteEvent { event } => Ok(with_menu(lang, self.delete_by_id(&event.id, lang).await)),
            Commit::RenameEvent { event, title } => {
                let text = match self.calendar.update_event(&event.id, &EventChanges::title(&title)).await {
                    Ok(_) => trf(lang, Msg::TitleUpdated, &[("title", title.as_str())]),
                    Err(err) => trf(lang, Msg::UpdateFailed, &[("error", err.0.as_str())]),
                };
                Ok(with_menu(lang, text))
            }
            Commit::AddTask { title } => {
                match self.store.add_task(user_id, &title, "", Priority::Medium).await {
                    Ok(task) => Ok(with_menu(
                        lang,
                        trf(
                            lang,
                            Msg::TaskAdded,
                            &[("id", task.id.to_string().as_str()), ("title", task.title.as_str())],
                        ),
                    )),
                    Err(err) => store_failure(lang, err),
                }
            }
            Commit::AddNote { title, content } => {
                match self.store.add_note(user_id, &title, &content, BTreeSet::new()).await {
                    Ok(note) => Ok(with_menu(
                        lang,
                        trf(
                            lang,
                            Msg::NoteSaved,
                            &[("id", note.id.to_string().as_str()), ("title", note.title.as_str())],
                        ),
                    )),
                    Err(err) => store_failure(lang, err),
                }
            }
        }
    }

    /// Buttons with a direct effect. `None` for callbacks that belong to a flow.
    pub async fn button(
        &self,
        callback: &Callback,
        user_id: &str,
        lang: Language,
    ) -> BotResult<Option<Reply>> {
        let reply = match callback {
            Callback::DeleteEvent { id } => confirm_delete(lang, id),
            Callback::ConfirmDelete { id } => with_menu(lang, self.delete_by_id(id, lang).await),
            Callback::CompleteTask { id } => match self.store.complete_task(user_id, *id).await {
                Ok(task) => {
                    let done = trf(lang, Msg::TaskCompleted, &[("title", task.title.as_str())]);
                    prefixed(done, task_list(lang, &self.store.get_tasks(user_id, false).await))
                }
                Err(err) => store_failure(lang, err)?,
            },
            Callback::DeleteTask { id } => match self.store.delete_task(user_id, *id).await {
                Ok(task) => {
                    let done = trf(lang, Msg::TaskDeleted, &[("title", task.title.as_str())]);
                    prefixed(done, task_list(lang, &self.store.get_tasks(user_id, false).await))
                }
                Err(err) => store_failure(lang, err)?,
            },
            Callback::ViewNote { id } => match self.store.get_note(user_id, *id).await {
                Some(note) => note_detail(lang, &note),
                None => store_failure(lang, StoreError::NoteNotFound(*id))?,
            },
            Callback::DeleteNote { id } => match self.store.delete_note(user_id, *id).await {
                Ok(note) => {
                    let done = trf(lang, Msg::NoteDeleted, &[("title", note.title.as_str())]);
                    prefixed(done, note_list(lang, &self.store.get_notes(user_id).await))
                }
                Err(err) => store_failure(lang, err)?,
            },
            _ => return Ok(None),
        };
        Ok(Some(reply))
    }

    pub async fn upcoming(&self, lang: Language) -> Reply {
        match self.calendar.list_events(LIST_LIMIT).await {
            Ok(events) => event_listing(
                tr(lang, Msg::UpcomingEvents).to_string(),
                tr(lang, Msg::NoUpcoming).to_string(),
                &events,
                lang,
            ),
            Err(err) => failure(lang, &err.0),
        }
    }

    pub async fn today(&self, lang: Language, today: NaiveDate) -> Reply {
        let label = today.format("%B %d, %Y").to_string();
        match events_for_date(self.calendar.as_ref(), today).await {
            Ok(events) => event_listing(
                trf(lang, Msg::TodaySchedule, &[("date", label.as_str())]),
                trf(lang, Msg::NoToday, &[("date", label.as_str())]),
                &events,
                lang,
            ),
            Err(err) => failure(lang, &err.0),
        }
    }

    /// Events starting on `date`, for the daily digest.
    pub async fn events_on(&self, date: NaiveDate) -> GatewayResult<Vec<CalendarEvent>> {
        events_for_date(self.calendar.as_ref(), date).await
    }

    async fn create_from_draft(&self, draft: EventDraft, turn: Turn<'_>) -> ActionOutcome {
        let lang = turn.lang;
        let Some(raw_start) = draft.start_time.as_deref() else {
            let mut seed = CollectedFields::new();
            if let Some(title) = draft.title {
                seed.insert(Field::Title, FieldValue::Text(title));
            }
            return start(FlowKind::CreateEvent, seed);
        };
        let Some(start_at) = self.resolve(Some(raw_start), turn.now).await else {
            return Reply::text(tr(lang, Msg::UnclearTime)).into();
        };
        let minutes = draft.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        let explicit_end = self
            .resolve(draft.end_time.as_deref(), turn.now)
            .await
            .filter(|end| *end > start_at);
        let Some(end_at) = explicit_end.or_else(|| {
            Duration::try_minutes(minutes).and_then(|length| start_at.checked_add_signed(length))
        }) else {
            return Reply::text(tr(lang, Msg::UnclearTime)).into();
        };

        let event = NewEvent {
            summary: draft.title.unwrap_or_else(|| "Untitled Event".to_string()),
            start: start_at,
            end: end_at,
            description: draft.description.unwrap_or_default(),
            location: draft.location.unwrap_or_default(),
            timezone: BOOKING_TIMEZONE.to_string(),
        };
        Reply::text(self.create(&event, lang).await).into()
    }

    async fn create(&self, event: &NewEvent, lang: Language) -> String {
        match self.calendar.create_event(event).await {
            Ok(created) => {
                let mut text = format!(
                    "{}\n\n📌 {}\n📅 {}\n⏰ {} - {}",
                    tr(lang, Msg::EventCreated),
                    event.summary,
                    event.start.format("%B %d, %Y"),
                    event.start.format("%I:%M %p"),
                    event.end.format("%I:%M %p"),
                );
                if !created.link.is_empty() {
                    text.push_str(&format!("\n🔗 {}", created.link));
                }
                text
            }
            Err(err) => {
                warn!(error = %err, "event creation failed");
                trf(lang, Msg::EventFailed, &[("error", err.0.as_str())])
            }
        }
    }

    /// ISO timestamps are taken as-is; anything else goes through the model.
    async fn resolve(&self, raw: Option<&str>, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let raw = raw?;
        match parse_timestamp(raw) {
            Some(at) => Some(at),
            None => self.classifier.resolve_time(raw, now).await,
        }
    }

    async fn date_events(&self, raw: Option<&str>, turn: Turn<'_>) -> Reply {
        let lang = turn.lang;
        let today = turn.now.date();
        let date = match raw.map(|r| r.trim().to_lowercase()) {
            None => Some(today),
            Some(token) if token == "today" => Some(today),
            Some(token) if token == "tomorrow" => today.succ_opt(),
            Some(token) => token
                .parse::<NaiveDate>()
                .ok()
                .or_else(|| parse_timestamp(&token).map(|at| at.date())),
        };
        let Some(date) = date else {
            return Reply::text(tr(lang, Msg::InvalidDate));
        };
        let label = date.format("%B %d, %Y").to_string();
        match events_for_date(self.calendar.as_ref(), date).await {
            Ok(events) if events.is_empty() => {
                Reply::text(trf(lang, Msg::NoDate, &[("date", label.as_str())]))
            }
            Ok(events) => Reply::text(format!(
                "{}\n\n{}",
                trf(lang, Msg::DateSchedule, &[("date", label.as_str())]),
                format_events_for_display(&events)
            )),
            Err(err) => failure(lang, &err.0),
        }
    }

    async fn search_reply(&self, query: &str, lang: Language) -> Reply {
        match search_events(self.calendar.as_ref(), query, DEFAULT_SEARCH_RESULTS).await {
            Ok(events) if events.is_empty() => {
                Reply::text(trf(lang, Msg::NoFound, &[("query", query)]))
            }
            Ok(events) => Reply::text(format!(
                "{}\n\n{}",
                trf(lang, Msg::FoundEvents, &[("query", query)]),
                format_events_for_display(&events)
            )),
            Err(err) => failure(lang, &err.0),
        }
    }

    /// Events (when the calendar is up), tasks and notes matching `query`.
    async fn search_everything(&self, query: &str, user_id: &str, lang: Language) -> Reply {
        let mut sections = Vec::new();
        if self.calendar_enabled() {
            match search_events(self.calendar.as_ref(), query, DEFAULT_SEARCH_RESULTS).await {
                Ok(events) if !events.is_empty() => sections.push(format!(
                    "{}\n\n{}",
                    trf(lang, Msg::FoundEvents, &[("query", query)]),
                    format_events_for_display(&events)
                )),
                Ok(_) => {}
                Err(err) => sections.push(trf(lang, Msg::Failed, &[("error", err.0.as_str())])),
            }
        }
        let tasks = self.store.search_tasks(user_id, query).await;
        if !tasks.is_empty() {
            let lines: Vec<String> = tasks.iter().map(task_line).collect();
            sections.push(format!("{}\n{}", tr(lang, Msg::MatchingTasks), lines.join("\n")));
        }
        let notes = self.store.search_notes(user_id, query).await;
        if !notes.is_empty() {
            let lines: Vec<String> = notes.iter().map(note_line).collect();
            sections.push(format!("{}\n{}", tr(lang, Msg::MatchingNotes), lines.join("\n")));
        }
        if sections.is_empty() {
            return with_menu(lang, trf(lang, Msg::NoFound, &[("query", query)]));
        }
        with_menu(lang, sections.join("\n\n"))
    }

    async fn pick_event(&self, kind: FlowKind, empty: Msg, lang: Language) -> ActionOutcome {
        let events = match self.calendar.list_events(LIST_LIMIT).await {
            Ok(events) => events,
            Err(err) => return failure(lang, &err.0).into(),
        };
        if events.is_empty() {
            return with_menu(lang, tr(lang, empty)).into();
        }
        let choices = events
            .into_iter()
            .map(|event| EventChoice {
                id: event.id,
                summary: event.summary,
            })
            .collect();
        start(kind, CollectedFields::new().with(Field::Choices, FieldValue::Choices(choices)))
    }

    async fn delete_by_id(&self, id: &str, lang: Language) -> String {
        match self.calendar.delete_event(id).await {
            Ok(()) => {
                info!(event_id = id, "event deleted");
                tr(lang, Msg::EventDeleted).to_string()
            }
            Err(err) => trf(lang, Msg::DeleteFailed, &[("error", err.0.as_str())]),
        }
    }

    /// Free-text delete: an explicit id or a single search hit is deleted without
    /// confirmation; several hits are listed and nothing is deleted.
    async fn delete_target(&self, target: &EventTarget, lang: Language) -> Reply {
        if let Some(id) = &target.event_id {
            return Reply::text(self.delete_by_id(id, lang).await);
        }
        let Some(query) = &target.query else {
            return Reply::text(tr(lang, Msg::NeedDeleteTarget));
        };
        match self.find_single(query, lang).await {
            Ok(event) => Reply::text(match self.calendar.delete_event(&event.id).await {
                Ok(()) => trf(lang, Msg::DeletedTitle, &[("title", event.summary.as_str())]),
                Err(err) => trf(lang, Msg::DeleteFailed, &[("error", err.0.as_str())]),
            }),
            Err(reply) => reply,
        }
    }

    async fn update_target(&self, target: &EventTarget, changes: EventChanges, lang: Language) -> Reply {
        let id = match (&target.event_id, &target.query) {
            (Some(id), _) => id.clone(),
            (None, Some(query)) => match self.find_single(query, lang).await {
                Ok(event) => event.id,
                Err(reply) => return reply,
            },
            (None, None) => return Reply::text(tr(lang, Msg::NeedUpdateTarget)),
        };
        if changes.is_empty() {
            return Reply::text(tr(lang, Msg::NothingToUpdate));
        }
        match self.calendar.update_event(&id, &changes).await {
            Ok(link) if link.is_empty() => Reply::text(tr(lang, Msg::EventUpdated)),
            Ok(link) => Reply::text(format!("{}\n🔗 {}", tr(lang, Msg::EventUpdated), link)),
            Err(err) => Reply::text(trf(lang, Msg::UpdateFailed, &[("error", err.0.as_str())])),
        }
    }

    /// The only event matching `query`, or the reply explaining why there isn't one.
    async fn find_single(&self, query: &str, lang: Language) -> Result<CalendarEvent, Reply> {
        let mut events = search_events(self.calendar.as_ref(), query, DEFAULT_SEARCH_RESULTS)
            .await
            .map_err(|err| failure(lang, &err.0))?;
        match events.len() {
            0 => Err(Reply::text(trf(lang, Msg::NoFound, &[("query", query)]))),
            1 => Ok(events.remove(0)),
            count => Err(Reply::text(format!(
                "{}\n\n{}",
                trf(
                    lang,
                    Msg::AmbiguousMatches,
                    &[("count", count.to_string().as_str()), ("query", query)],
                ),
                format_events_for_display(&events)
            ))),
        }
    }
}

fn needs_calendar(intent: &Intent) -> bool {
    matches!(
        intent,
        Intent::CreateEvent(_)
            | Intent::ListEvents
            | Intent::UpdateEvent { .. }
            | Intent::DeleteEvent { .. }
            | Intent::SearchEvents { .. }
            | Intent::GetDateEvents { .. }
    )
}

fn start(kind: FlowKind, seed: CollectedFields) -> ActionOutcome {
    ActionOutcome::StartFlow { kind, seed }
}

fn failure(lang: Language, error: &str) -> Reply {
    with_menu(lang, trf(lang, Msg::Failed, &[("error", error)]))
}

fn prefixed(line: String, mut reply: Reply) -> Reply {
    reply.text = format!("{}\n\n{}", line, reply.text);
    reply
}

/// Missing records are reported to the user; I/O and corruption escalate.
fn store_failure(lang: Language, err: StoreError) -> BotResult<Reply> {
    match err {
        StoreError::TaskNotFound(_) | StoreError::NoteNotFound(_) => {
            Ok(failure(lang, &err.to_string()))
        }
        other => Err(other.into()),
    }
}
