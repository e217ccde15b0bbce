use chrono::{Datelike, NaiveDate};

use crate::flow::callback::{Callback, MenuAction};
use crate::flow::machine::{AbortReason, FlowKind, FlowPrompt, RetryReason};
use crate::flow::session::{EventChoice, Language};
use crate::models::event::CalendarEvent;
use crate::models::note::Note;
use crate::models::task::Task;
use crate::service::i18n::{Msg, menu_label, tr, trf};

pub const PICKER_HOURS: std::ops::RangeInclusive<u32> = 6..=23;
pub const PICKER_MINUTES: [u32; 4] = [0, 15, 30, 45];
const HOURS_PER_ROW: usize = 6;
const WEEKDAY_HEADER: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];
const BUTTON_LABEL_LIMIT: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub callback: Callback,
}

impl Button {
    pub fn new(label: impl Into<String>, callback: Callback) -> Self {
        Self {
            label: label.into(),
            callback,
        }
    }

    fn inert(label: impl Into<String>) -> Self {
        Self::new(label, Callback::Ignore)
    }

    fn menu(lang: Language, action: MenuAction) -> Self {
        Self::new(menu_label(lang, action), Callback::Menu { action })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    pub fn find(&self, callback: &Callback) -> Option<&Button> {
        self.buttons().find(|b| &b.callback == callback)
    }
}

/// What the transport should show: text plus optional buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

pub fn main_menu(lang: Language) -> Keyboard {
    let rows = [
        [MenuAction::CreateEvent, MenuAction::Upcoming],
        [MenuAction::Today, MenuAction::Search],
        [MenuAction::Edit, MenuAction::Delete],
        [MenuAction::AddTask, MenuAction::Tasks],
        [MenuAction::AddNote, MenuAction::Notes],
        [MenuAction::Language, MenuAction::Help],
    ];
    Keyboard::new(
        rows.iter()
            .map(|row| row.iter().map(|a| Button::menu(lang, *a)).collect())
            .collect(),
    )
}

fn back_to_menu(lang: Language) -> Vec<Button> {
    vec![Button::menu(lang, MenuAction::Main)]
}

fn cancel_row(lang: Language) -> Vec<Button> {
    vec![Button::new(tr(lang, Msg::BtnCancel), Callback::Cancel)]
}

fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Month grid with navigation; blank and header cells carry [`Callback::Ignore`].
pub fn date_grid(lang: Language, year: i32, month: u32) -> Keyboard {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Keyboard::new(vec![cancel_row(lang)]);
    };
    let (prev_year, prev_month) = shift_month(year, month, -1);
    let (next_year, next_month) = shift_month(year, month, 1);
    let days_in_month = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|next| (next - first).num_days() as u32)
        .unwrap_or(28);

    let mut rows = vec![
        vec![
            Button::new(
                "◀️",
                Callback::MonthNav {
                    year: prev_year,
                    month: prev_month,
                },
            ),
            Button::inert(first.format("%B %Y").to_string()),
            Button::new(
                "▶️",
                Callback::MonthNav {
                    year: next_year,
                    month: next_month,
                },
            ),
        ],
        WEEKDAY_HEADER.iter().map(|d| Button::inert(*d)).collect(),
    ];

    let offset = first.weekday().num_days_from_monday() as usize;
    let mut week: Vec<Button> = (0..offset).map(|_| Button::inert(" ")).collect();
    for day in 1..=days_in_month {
        week.push(Button::new(
            day.to_string(),
            Callback::SelectDate { year, month, day },
        ));
        if week.len() == 7 {
            rows.push(std::mem::take(&mut week));
        }
    }
    if !week.is_empty() {
        while week.len() < 7 {
            week.push(Button::inert(" "));
        }
        rows.push(week);
    }
    rows.push(cancel_row(lang));
    Keyboard::new(rows)
}

pub fn hour_grid(lang: Language) -> Keyboard {
    let hours: Vec<u32> = PICKER_HOURS.collect();
    let mut rows: Vec<Vec<Button>> = hours
        .chunks(HOURS_PER_ROW)
        .map(|chunk| {
            chunk
                .iter()
                .map(|h| Button::new(format!("{}:00", h), Callback::SelectHour { hour: *h }))
                .collect()
        })
        .collect();
    rows.push(cancel_row(lang));
    Keyboard::new(rows)
}

pub fn minute_grid(lang: Language, hour: u32) -> Keyboard {
    Keyboard::new(vec![
        PICKER_MINUTES
            .iter()
            .map(|m| {
                Button::new(
                    format!("{}:{:02}", hour, m),
                    Callback::SelectMinute { minute: *m },
                )
            })
            .collect(),
        vec![Button::new(tr(lang, Msg::BtnBackToHours), Callback::BackToHours)],
        cancel_row(lang),
    ])
}

pub fn confirm_delete(lang: Language, id: &str) -> Reply {
    Reply::with_keyboard(
        tr(lang, Msg::ConfirmDelete),
        Keyboard::new(vec![vec![
            Button::new(
                tr(lang, Msg::BtnConfirmDelete),
                Callback::ConfirmDelete { id: id.to_string() },
            ),
            Button::new(
                tr(lang, Msg::BtnBack),
                Callback::Menu {
                    action: MenuAction::Delete,
                },
            ),
        ]]),
    )
}

pub fn language_picker() -> Reply {
    Reply::with_keyboard(
        tr(Language::En, Msg::SelectLanguage),
        Keyboard::new(vec![vec![
            Button::new(
                "🇬🇧 English",
                Callback::SetLanguage {
                    code: Language::En.code().to_string(),
                },
            ),
            Button::new(
                "🇮🇷 فارسی",
                Callback::SetLanguage {
                    code: Language::Fa.code().to_string(),
                },
            ),
        ]]),
    )
}

fn truncate(label: &str) -> String {
    if label.chars().count() <= BUTTON_LABEL_LIMIT {
        return label.to_string();
    }
    let cut: String = label.chars().take(BUTTON_LABEL_LIMIT - 1).collect();
    format!("{}…", cut)
}

pub fn format_event_start(event: &CalendarEvent) -> String {
    event
        .starts_at()
        .map(|start| start.format("%B %d, %Y at %I:%M %p").to_string())
        .unwrap_or_else(|| event.start.clone())
}

pub fn format_events_for_display(events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return "No events found.".to_string();
    }
    let mut out = format!("📅 Found {} event(s):\n\n", events.len());
    for (idx, event) in events.iter().enumerate() {
        out.push_str(&format!("{}. 📌 {}\n", idx + 1, event.summary));
        out.push_str(&format!("   ⏰ {}\n", format_event_start(event)));
        if !event.description.is_empty() {
            out.push_str(&format!("   📝 {}\n", event.description));
        }
        if !event.location.is_empty() {
            out.push_str(&format!("   📍 {}\n", event.location));
        }
        if !event.link.is_empty() {
            out.push_str(&format!("   🔗 {}\n", event.link));
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// Heading followed by the listing, or the empty-state message.
pub fn event_listing(heading: String, empty: String, events: &[CalendarEvent], lang: Language) -> Reply {
    let text = if events.is_empty() {
        empty
    } else {
        format!("{}\n\n{}", heading, format_events_for_display(events))
    };
    let mut rows = vec![vec![
        Button::menu(lang, MenuAction::CreateEvent),
        Button::menu(lang, MenuAction::Upcoming),
    ]];
    if !events.is_empty() {
        rows.push(vec![
            Button::menu(lang, MenuAction::Edit),
            Button::menu(lang, MenuAction::Delete),
        ]);
    }
    rows.push(back_to_menu(lang));
    Reply::with_keyboard(text, Keyboard::new(rows))
}

pub fn event_choices(lang: Language, kind: FlowKind, choices: &[EventChoice]) -> Reply {
    let heading = match kind {
        FlowKind::EditTitle => tr(lang, Msg::SelectEdit),
        _ => tr(lang, Msg::SelectDelete),
    };
    let mut text = format!("{}\n\n", heading);
    let mut rows = Vec::new();
    for (idx, choice) in choices.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", idx + 1, choice.summary));
        let callback = match kind {
            FlowKind::EditTitle => Callback::EditEvent {
                id: choice.id.clone(),
            },
            _ => Callback::DeleteEvent {
                id: choice.id.clone(),
            },
        };
        rows.push(vec![Button::new(
            truncate(&format!("{}. {}", idx + 1, choice.summary)),
            callback,
        )]);
    }
    text.push('\n');
    text.push_str(tr(lang, Msg::PickByNumber));
    rows.push(cancel_row(lang));
    Reply::with_keyboard(text, Keyboard::new(rows))
}

pub fn task_line(task: &Task) -> String {
    let mark = if task.completed { "☑️" } else { task.priority.emoji() };
    let mut line = format!("#{} {} {}", task.id, mark, task.title);
    if !task.description.is_empty() {
        line.push_str(&format!("\n   {}", task.description));
    }
    line
}

pub fn note_line(note: &Note) -> String {
    let mut line = format!("#{} {}", note.id, note.title);
    if !note.tags.is_empty() {
        let tags: Vec<String> = note.tags.iter().map(|t| format!("#{}", t)).collect();
        line.push_str(&format!(" ({})", tags.join(" ")));
    }
    line
}

pub fn task_list(lang: Language, tasks: &[Task]) -> Reply {
    if tasks.is_empty() {
        return Reply::with_keyboard(
            tr(lang, Msg::NoTasks),
            Keyboard::new(vec![
                vec![Button::menu(lang, MenuAction::AddTask)],
                back_to_menu(lang),
            ]),
        );
    }
    let lines: Vec<String> = tasks.iter().map(task_line).collect();
    let mut rows: Vec<Vec<Button>> = tasks
        .iter()
        .map(|task| {
            vec![
                Button::new(
                    format!("{} #{}", tr(lang, Msg::BtnComplete), task.id),
                    Callback::CompleteTask { id: task.id },
                ),
                Button::new(
                    format!("{} #{}", tr(lang, Msg::BtnDelete), task.id),
                    Callback::DeleteTask { id: task.id },
                ),
            ]
        })
        .collect();
    rows.push(vec![Button::menu(lang, MenuAction::AddTask)]);
    rows.push(back_to_menu(lang));
    Reply::with_keyboard(
        format!("{}\n\n{}", tr(lang, Msg::TasksHeader), lines.join("\n")),
        Keyboard::new(rows),
    )
}

pub fn note_list(lang: Language, notes: &[Note]) -> Reply {
    if notes.is_empty() {
        return Reply::with_keyboard(
            tr(lang, Msg::NoNotes),
            Keyboard::new(vec![
                vec![Button::menu(lang, MenuAction::AddNote)],
                back_to_menu(lang),
            ]),
        );
    }
    let lines: Vec<String> = notes.iter().map(note_line).collect();
    let mut rows: Vec<Vec<Button>> = notes
        .iter()
        .map(|note| {
            vec![
                Button::new(
                    format!("{} #{}", tr(lang, Msg::BtnView), note.id),
                    Callback::ViewNote { id: note.id },
                ),
                Button::new(
                    format!("{} #{}", tr(lang, Msg::BtnDelete), note.id),
                    Callback::DeleteNote { id: note.id },
                ),
            ]
        })
        .collect();
    rows.push(vec![Button::menu(lang, MenuAction::AddNote)]);
    rows.push(back_to_menu(lang));
    Reply::with_keyboard(
        format!("{}\n\n{}", tr(lang, Msg::NotesHeader), lines.join("\n")),
        Keyboard::new(rows),
    )
}

pub fn note_detail(lang: Language, note: &Note) -> Reply {
    let mut text = format!("🗒️ {}\n\n{}", note_line(note), note.content);
    text.push_str(&format!(
        "\n\n🕒 {}",
        note.updated_at.format("%B %d, %Y at %I:%M %p")
    ));
    Reply::with_keyboard(
        text,
        Keyboard::new(vec![
            vec![
                Button::new(
                    format!("{} #{}", tr(lang, Msg::BtnDelete), note.id),
                    Callback::DeleteNote { id: note.id },
                ),
                Button::menu(lang, MenuAction::Notes),
            ],
            back_to_menu(lang),
        ]),
    )
}

/// Plain message with the main menu underneath.
pub fn with_menu(lang: Language, text: impl Into<String>) -> Reply {
    Reply::with_keyboard(text, main_menu(lang))
}

pub fn render_prompt(lang: Language, prompt: &FlowPrompt, today: NaiveDate) -> Reply {
    match prompt {
        FlowPrompt::Date => Reply::with_keyboard(
            tr(lang, Msg::SelectDate),
            date_grid(lang, today.year(), today.month()),
        ),
        FlowPrompt::Hour { date } => Reply::with_keyboard(
            trf(lang, Msg::SelectTime, &[("date", date.format("%B %d, %Y").to_string().as_str())]),
            hour_grid(lang),
        ),
        FlowPrompt::Minute { hour, .. } => Reply::with_keyboard(
            trf(lang, Msg::SelectMinutes, &[("hour", hour.to_string().as_str())]),
            minute_grid(lang, *hour),
        ),
        FlowPrompt::EventTitle => {
            Reply::with_keyboard(tr(lang, Msg::EnterTitle), Keyboard::new(vec![cancel_row(lang)]))
        }
        FlowPrompt::Query => {
            Reply::with_keyboard(tr(lang, Msg::SearchQuery), Keyboard::new(vec![cancel_row(lang)]))
        }
        FlowPrompt::EventChoice { kind, choices } => event_choices(lang, *kind, choices),
        FlowPrompt::NewTitle { event } => Reply::with_keyboard(
            trf(lang, Msg::EnterNewTitle, &[("title", event.summary.as_str())]),
            Keyboard::new(vec![cancel_row(lang)]),
        ),
        FlowPrompt::TaskTitle => Reply::with_keyboard(
            tr(lang, Msg::EnterTaskTitle),
            Keyboard::new(vec![cancel_row(lang)]),
        ),
        FlowPrompt::NoteTitle => Reply::with_keyboard(
            tr(lang, Msg::EnterNoteTitle),
            Keyboard::new(vec![cancel_row(lang)]),
        ),
        FlowPrompt::NoteContent { title } => Reply::with_keyboard(
            trf(lang, Msg::EnterNoteContent, &[("title", title.as_str())]),
            Keyboard::new(vec![cancel_row(lang)]),
        ),
    }
}

/// Correction message, then the same prompt again.
pub fn render_retry(
    lang: Language,
    reason: RetryReason,
    prompt: &FlowPrompt,
    today: NaiveDate,
) -> Reply {
    let correction = match reason {
        RetryReason::InvalidDate => Msg::InvalidDate,
        RetryReason::InvalidTime => Msg::InvalidTime,
        RetryReason::InvalidNumber => Msg::InvalidNumber,
        RetryReason::EmptyText => Msg::EmptyText,
        RetryReason::UnexpectedInput => Msg::UnexpectedInput,
    };
    let mut reply = render_prompt(lang, prompt, today);
    reply.text = format!("{}\n\n{}", tr(lang, correction), reply.text);
    reply
}

pub fn render_abort(lang: Language, reason: AbortReason) -> Reply {
    let msg = match reason {
        AbortReason::MissingDate | AbortReason::MissingHour => Msg::ErrorNoDatetime,
        AbortReason::InvalidEventNumber => Msg::InvalidEventNumber,
        AbortReason::NotActive | AbortReason::MissingChoices => Msg::FlowExpired,
    };
    with_menu(lang, tr(lang, msg))
}
