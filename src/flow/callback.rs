use serde::{Deserialize, Serialize};

/// Discord rejects component ids longer than this.
pub const MAX_CALLBACK_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuAction {
    #[serde(rename = "main")]
    Main,
    #[serde(rename = "new")]
    CreateEvent,
    #[serde(rename = "up")]
    Upcoming,
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "find")]
    Search,
    #[serde(rename = "del")]
    Delete,
    #[serde(rename = "edit")]
    Edit,
    #[serde(rename = "task+")]
    AddTask,
    #[serde(rename = "tasks")]
    Tasks,
    #[serde(rename = "note+")]
    AddNote,
    #[serde(rename = "notes")]
    Notes,
    #[serde(rename = "lang")]
    Language,
    #[serde(rename = "help")]
    Help,
}

impl MenuAction {
    pub const ALL: [MenuAction; 13] = [
        MenuAction::Main,
        MenuAction::CreateEvent,
        MenuAction::Upcoming,
        MenuAction::Today,
        MenuAction::Search,
        MenuAction::Delete,
        MenuAction::Edit,
        MenuAction::AddTask,
        MenuAction::Tasks,
        MenuAction::AddNote,
        MenuAction::Notes,
        MenuAction::Language,
        MenuAction::Help,
    ];

    /// Everything except chat and help touches calendar, tasks or notes.
    pub fn requires_admin(self) -> bool {
        !matches!(self, MenuAction::Main | MenuAction::Help | MenuAction::Language)
    }

    pub fn requires_calendar(self) -> bool {
        matches!(
            self,
            MenuAction::CreateEvent
                | MenuAction::Upcoming
                | MenuAction::Today
                | MenuAction::Delete
                | MenuAction::Edit
        )
    }
}

/// Payload carried by an interactive button and echoed back on press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "k")]
pub enum Callback {
    #[serde(rename = "-")]
    Ignore,
    #[serde(rename = "x")]
    Cancel,
    #[serde(rename = "m")]
    Menu {
        #[serde(rename = "a")]
        action: MenuAction,
    },
    #[serde(rename = "nav")]
    MonthNav {
        #[serde(rename = "y")]
        year: i32,
        #[serde(rename = "m")]
        month: u32,
    },
    #[serde(rename = "d")]
    SelectDate {
        #[serde(rename = "y")]
        year: i32,
        #[serde(rename = "m")]
        month: u32,
        #[serde(rename = "d")]
        day: u32,
    },
    #[serde(rename = "h")]
    SelectHour {
        #[serde(rename = "h")]
        hour: u32,
    },
    #[serde(rename = "mi")]
    SelectMinute {
        #[serde(rename = "m")]
        minute: u32,
    },
    #[serde(rename = "bh")]
    BackToHours,
    #[serde(rename = "ed")]
    DeleteEvent {
        #[serde(rename = "i")]
        id: String,
    },
    #[serde(rename = "ec")]
    ConfirmDelete {
        #[serde(rename = "i")]
        id: String,
    },
    #[serde(rename = "ee")]
    EditEvent {
        #[serde(rename = "i")]
        id: String,
    },
    #[serde(rename = "tc")]
    CompleteTask {
        #[serde(rename = "i")]
        id: u32,
    },
    #[serde(rename = "td")]
    DeleteTask {
        #[serde(rename = "i")]
        id: u32,
    },
    #[serde(rename = "nv")]
    ViewNote {
        #[serde(rename = "i")]
        id: u32,
    },
    #[serde(rename = "nd")]
    DeleteNote {
        #[serde(rename = "i")]
        id: u32,
    },
    #[serde(rename = "l")]
    SetLanguage {
        #[serde(rename = "c")]
        code: String,
    },
}

impl Callback {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Unknown or malformed payloads yield `None` and are ignored by callers.
    pub fn decode(raw: &str) -> Option<Callback> {
        serde_json::from_str(raw).ok()
    }

    pub fn is_inert(&self) -> bool {
        matches!(self, Callback::Ignore)
    }
}
