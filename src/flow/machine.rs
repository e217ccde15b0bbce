//! Generic "collect fields, then commit" runner shared by every multi-step flow.
//!
//! A flow is a [`FlowKind`] plus the ordered list of fields it needs. Each turn
//! fills the first missing field; once nothing is missing the session is cleared
//! and a [`Commit`] is handed back to the caller to execute.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::flow::parse::{parse_date_token, parse_time_token};
use crate::flow::session::{ActiveFlow, CollectedFields, EventChoice, Field, FieldValue, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    CreateEvent,
    Search,
    Delete,
    EditTitle,
    AddTask,
    AddNote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowInput {
    Text(String),
    PickDate(NaiveDate),
    PickHour(u32),
    PickMinute(u32),
    BackToHours,
    PickEvent(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowPrompt {
    Date,
    Hour { date: NaiveDate },
    Minute { date: NaiveDate, hour: u32 },
    EventTitle,
    Query,
    EventChoice { kind: FlowKind, choices: Vec<EventChoice> },
    NewTitle { event: EventChoice },
    TaskTitle,
    NoteTitle,
    NoteContent { title: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    InvalidDate,
    InvalidTime,
    InvalidNumber,
    EmptyText,
    UnexpectedInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    NotActive,
    MissingDate,
    MissingHour,
    MissingChoices,
    InvalidEventNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    CreateEvent { title: String, start: NaiveDateTime },
    Search { query: String },
    DeleteEvent { event: EventChoice },
    RenameEvent { event: EventChoice, title: String },
    AddTask { title: String },
    AddNote { title: String, content: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Prompt(FlowPrompt),
    Retry { reason: RetryReason, prompt: FlowPrompt },
    Commit(Commit),
    Aborted(AbortReason),
}

enum Accept {
    Value(FieldValue),
    Partial(Field, FieldValue),
    Unset(Field),
    Retry(RetryReason),
    Abort(AbortReason),
}

impl FlowKind {
    fn steps(self) -> &'static [Field] {
        match self {
            FlowKind::CreateEvent => &[Field::Date, Field::StartTime, Field::Title],
            FlowKind::Search => &[Field::Query],
            FlowKind::Delete => &[Field::Event],
            FlowKind::EditTitle => &[Field::Event, Field::Title],
            FlowKind::AddTask => &[Field::Title],
            FlowKind::AddNote => &[Field::Title, Field::Content],
        }
    }

    pub fn pending_field(self, fields: &CollectedFields) -> Option<Field> {
        self.steps().iter().copied().find(|f| !fields.contains(*f))
    }

    pub fn active_flow(self, fields: &CollectedFields) -> ActiveFlow {
        let pending = self.pending_field(fields);
        match self {
            FlowKind::CreateEvent if pending == Some(Field::Title) => ActiveFlow::CreatingEventTitle,
            FlowKind::CreateEvent => ActiveFlow::CreatingEvent,
            FlowKind::Search => ActiveFlow::Searching,
            FlowKind::Delete => ActiveFlow::Deleting,
            FlowKind::EditTitle => ActiveFlow::Editing,
            FlowKind::AddTask => ActiveFlow::AddingTask,
            FlowKind::AddNote if pending == Some(Field::Title) => ActiveFlow::AddingNoteTitle,
            FlowKind::AddNote => ActiveFlow::AddingNoteContent,
        }
    }

    fn commit(self, fields: &CollectedFields) -> Option<Commit> {
        let text = |field: Field| fields.text(field).map(str::to_string);
        let commit = match self {
            FlowKind::CreateEvent => Commit::CreateEvent {
                title: text(Field::Title)?,
                start: fields.start_time()?,
            },
            FlowKind::Search => Commit::Search {
                query: text(Field::Query)?,
            },
            FlowKind::Delete => Commit::DeleteEvent {
                event: fields.event()?.clone(),
            },
            FlowKind::EditTitle => Commit::RenameEvent {
                event: fields.event()?.clone(),
                title: text(Field::Title)?,
            },
            FlowKind::AddTask => Commit::AddTask {
                title: text(Field::Title)?,
            },
            FlowKind::AddNote => Commit::AddNote {
                title: text(Field::Title)?,
                content: text(Field::Content)?,
            },
        };
        Some(commit)
    }

    fn prompt(self, field: Field, fields: &CollectedFields) -> Result<FlowPrompt, AbortReason> {
        let prompt = match (self, field) {
            (_, Field::Date) => FlowPrompt::Date,
            (_, Field::StartTime) => {
                let date = fields.date().ok_or(AbortReason::MissingDate)?;
                match fields.hour() {
                    Some(hour) => FlowPrompt::Minute { date, hour },
                    None => FlowPrompt::Hour { date },
                }
            }
            (FlowKind::EditTitle, Field::Title) => FlowPrompt::NewTitle {
                event: fields.event().cloned().ok_or(AbortReason::MissingChoices)?,
            },
            (FlowKind::AddTask, Field::Title) => FlowPrompt::TaskTitle,
            (FlowKind::AddNote, Field::Title) => FlowPrompt::NoteTitle,
            (_, Field::Title) => FlowPrompt::EventTitle,
            (_, Field::Query) => FlowPrompt::Query,
            (_, Field::Event) => FlowPrompt::EventChoice {
                kind: self,
                choices: fields
                    .choices()
                    .map(<[EventChoice]>::to_vec)
                    .ok_or(AbortReason::MissingChoices)?,
            },
            (_, Field::Content) => FlowPrompt::NoteContent {
                title: fields.text(Field::Title).unwrap_or_default().to_string(),
            },
            (_, Field::Hour) | (_, Field::Choices) => return Err(AbortReason::NotActive),
        };
        Ok(prompt)
    }
}

/// Starts `kind`, discarding any flow already in progress.
pub fn begin(session: &mut Session, kind: FlowKind, seed: CollectedFields) -> StepOutcome {
    if let Some(previous) = session.flow_kind() {
        debug!(?previous, next = ?kind, "replacing active flow");
    }
    session.start(kind, seed);
    advance(session)
}

/// Returns `true` when a flow was actually running.
pub fn cancel(session: &mut Session) -> bool {
    let was_active = !session.is_idle();
    session.clear();
    was_active
}

/// Feeds one user input into the active flow.
pub fn step(session: &mut Session, input: FlowInput, today: NaiveDate) -> StepOutcome {
    let Some(kind) = session.flow_kind() else {
        return StepOutcome::Aborted(AbortReason::NotActive);
    };
    let Some(field) = kind.pending_field(session.fields()) else {
        return advance(session);
    };

    match accept(field, input, session.fields(), today) {
        Accept::Value(value) => {
            if let Some(fields) = session.fields_mut() {
                fields.insert(field, value);
                if field == Field::StartTime {
                    fields.remove(Field::Hour);
                }
            }
            advance(session)
        }
        Accept::Partial(aux, value) => {
            if let Some(fields) = session.fields_mut() {
                if aux == Field::Date {
                    fields.remove(Field::Hour);
                }
                fields.insert(aux, value);
            }
            advance(session)
        }
        Accept::Unset(aux) => {
            if let Some(fields) = session.fields_mut() {
                fields.remove(aux);
            }
            advance(session)
        }
        Accept::Retry(reason) => match kind.prompt(field, session.fields()) {
            Ok(prompt) => StepOutcome::Retry { reason, prompt },
            Err(abort) => fail(session, abort),
        },
        Accept::Abort(reason) => fail(session, reason),
    }
}

fn advance(session: &mut Session) -> StepOutcome {
    let Some(kind) = session.flow_kind() else {
        return StepOutcome::Aborted(AbortReason::NotActive);
    };
    match kind.pending_field(session.fields()) {
        Some(field) => match kind.prompt(field, session.fields()) {
            Ok(prompt) => StepOutcome::Prompt(prompt),
            Err(reason) => fail(session, reason),
        },
        None => {
            let commit = kind.commit(session.fields());
            session.clear();
            match commit {
                Some(commit) => StepOutcome::Commit(commit),
                None => StepOutcome::Aborted(AbortReason::NotActive),
            }
        }
    }
}

fn fail(session: &mut Session, reason: AbortReason) -> StepOutcome {
    debug!(?reason, "flow aborted");
    session.clear();
    StepOutcome::Aborted(reason)
}

fn accept(field: Field, input: FlowInput, fields: &CollectedFields, today: NaiveDate) -> Accept {
    match field {
        Field::Date => accept_date(input, today),
        Field::StartTime => accept_time(input, fields),
        Field::Event => accept_event(input, fields),
        Field::Title | Field::Query | Field::Content => match input {
            FlowInput::Text(text) if !text.trim().is_empty() => {
                Accept::Value(FieldValue::Text(text.trim().to_string()))
            }
            FlowInput::Text(_) => Accept::Retry(RetryReason::EmptyText),
            _ => Accept::Retry(RetryReason::UnexpectedInput),
        },
        Field::Hour | Field::Choices => Accept::Abort(AbortReason::NotActive),
    }
}

fn accept_date(input: FlowInput, today: NaiveDate) -> Accept {
    match input {
        FlowInput::PickDate(date) => Accept::Value(FieldValue::Date(date)),
        FlowInput::Text(text) => match parse_date_token(&text, today) {
            Some(date) => Accept::Value(FieldValue::Date(date)),
            None => Accept::Retry(RetryReason::InvalidDate),
        },
        FlowInput::PickHour(_) | FlowInput::PickMinute(_) | FlowInput::BackToHours => {
            Accept::Abort(AbortReason::MissingDate)
        }
        FlowInput::PickEvent(_) => Accept::Retry(RetryReason::UnexpectedInput),
    }
}

fn accept_time(input: FlowInput, fields: &CollectedFields) -> Accept {
    let Some(date) = fields.date() else {
        return Accept::Abort(AbortReason::MissingDate);
    };
    match input {
        FlowInput::Text(text) => match parse_time_token(&text) {
            Some(time) => Accept::Value(FieldValue::StartTime(date.and_time(time))),
            None => Accept::Retry(RetryReason::InvalidTime),
        },
        FlowInput::PickHour(hour) if hour < 24 => Accept::Partial(Field::Hour, FieldValue::Hour(hour)),
        FlowInput::PickMinute(minute) => {
            let Some(hour) = fields.hour() else {
                return Accept::Abort(AbortReason::MissingHour);
            };
            match date.and_hms_opt(hour, minute, 0) {
                Some(start) => Accept::Value(FieldValue::StartTime(start)),
                None => Accept::Retry(RetryReason::InvalidTime),
            }
        }
        FlowInput::PickHour(_) => Accept::Retry(RetryReason::InvalidTime),
        FlowInput::BackToHours => Accept::Unset(Field::Hour),
        FlowInput::PickDate(date) => Accept::Partial(Field::Date, FieldValue::Date(date)),
        FlowInput::PickEvent(_) => Accept::Retry(RetryReason::UnexpectedInput),
    }
}

fn accept_event(input: FlowInput, fields: &CollectedFields) -> Accept {
    let Some(choices) = fields.choices() else {
        return Accept::Abort(AbortReason::MissingChoices);
    };
    match input {
        FlowInput::Text(text) => match text.trim().parse::<usize>() {
            Ok(n) if (1..=choices.len()).contains(&n) => {
                Accept::Value(FieldValue::Event(choices[n - 1].clone()))
            }
            Ok(_) => Accept::Abort(AbortReason::InvalidEventNumber),
            Err(_) => Accept::Retry(RetryReason::InvalidNumber),
        },
        FlowInput::PickEvent(id) => match choices.iter().find(|c| c.id == id) {
            Some(choice) => Accept::Value(FieldValue::Event(choice.clone())),
            None => Accept::Abort(AbortReason::InvalidEventNumber),
        },
        _ => Accept::Retry(RetryReason::UnexpectedInput),
    }
}
