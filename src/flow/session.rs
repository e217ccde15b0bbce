use std::collections::{BTreeMap, VecDeque};

use chrono::{NaiveDate, NaiveDateTime};

use crate::flow::machine::FlowKind;
use crate::models::chat::ChatMessage;

/// Chat turns kept for free-form completions.
pub const HISTORY_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    En,
    Fa,
}

impl Language {
    pub fn from_code(code: &str) -> Option<Language> {
        match code.to_lowercase().as_str() {
            "en" => Some(Language::En),
            "fa" => Some(Language::Fa),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fa => "fa",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveFlow {
    Idle,
    CreatingEvent,
    CreatingEventTitle,
    Searching,
    Deleting,
    Editing,
    AddingTask,
    AddingNoteTitle,
    AddingNoteContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Date,
    Hour,
    StartTime,
    Query,
    Choices,
    Event,
    Content,
}

/// Event reference offered to the user by number or button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventChoice {
    pub id: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Hour(u32),
    StartTime(NaiveDateTime),
    Choices(Vec<EventChoice>),
    Event(EventChoice),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedFields {
    values: BTreeMap<Field, FieldValue>,
}

static NO_FIELDS: CollectedFields = CollectedFields {
    values: BTreeMap::new(),
};

impl CollectedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: FieldValue) -> Self {
        self.values.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn remove(&mut self, field: Field) {
        self.values.remove(&field);
    }

    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match self.values.get(&field) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self.values.get(&Field::Date) {
            Some(FieldValue::Date(date)) => Some(*date),
            _ => None,
        }
    }

    pub fn hour(&self) -> Option<u32> {
        match self.values.get(&Field::Hour) {
            Some(FieldValue::Hour(hour)) => Some(*hour),
            _ => None,
        }
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        match self.values.get(&Field::StartTime) {
            Some(FieldValue::StartTime(start)) => Some(*start),
            _ => None,
        }
    }

    pub fn choices(&self) -> Option<&[EventChoice]> {
        match self.values.get(&Field::Choices) {
            Some(FieldValue::Choices(choices)) => Some(choices),
            _ => None,
        }
    }

    pub fn event(&self) -> Option<&EventChoice> {
        match self.values.get(&Field::Event) {
            Some(FieldValue::Event(choice)) => Some(choice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct FlowState {
    kind: FlowKind,
    fields: CollectedFields,
}

/// Per-user conversational state.
///
/// Collected fields only exist inside an active flow, so an idle session can
/// never carry leftovers from an earlier attempt.
#[derive(Debug, Clone, Default)]
pub struct Session {
    flow: Option<FlowState>,
    language: Language,
    history: VecDeque<ChatMessage>,
}

impl Session {
    pub fn new(language: Language) -> Self {
        Self {
            flow: None,
            language,
            history: VecDeque::new(),
        }
    }

    pub fn active_flow(&self) -> ActiveFlow {
        match &self.flow {
            None => ActiveFlow::Idle,
            Some(state) => state.kind.active_flow(&state.fields),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.flow.is_none()
    }

    pub fn flow_kind(&self) -> Option<FlowKind> {
        self.flow.as_ref().map(|state| state.kind)
    }

    pub fn fields(&self) -> &CollectedFields {
        self.flow
            .as_ref()
            .map(|state| &state.fields)
            .unwrap_or(&NO_FIELDS)
    }

    /// Replaces whatever flow was running.
    pub(crate) fn start(&mut self, kind: FlowKind, seed: CollectedFields) {
        self.flow = Some(FlowState { kind, fields: seed });
    }

    pub(crate) fn fields_mut(&mut self) -> Option<&mut CollectedFields> {
        self.flow.as_mut().map(|state| &mut state.fields)
    }

    pub fn clear(&mut self) {
        self.flow = None;
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn remember(&mut self, message: ChatMessage) {
        self.history.push_back(message);
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_latest_turns() {
        let mut session = Session::new(Language::En);
        for i in 0..10 {
            session.remember(ChatMessage::user(format!("m{i}")));
        }
        let history = session.history();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].content, "m4");
    }

    #[test]
    fn idle_session_has_no_fields() {
        let mut session = Session::new(Language::Fa);
        session.start(
            FlowKind::AddTask,
            CollectedFields::new().with(Field::Query, FieldValue::Text("x".into())),
        );
        assert!(!session.fields().is_empty());
        session.clear();
        assert_eq!(session.active_flow(), ActiveFlow::Idle);
        assert!(session.fields().is_empty());
        assert_eq!(session.language(), Language::Fa);
    }
}
