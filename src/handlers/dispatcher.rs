use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::error::BotResult;
use crate::flow::callback::{Callback, MenuAction};
use crate::flow::machine::{self, FlowInput, FlowKind, StepOutcome};
use crate::flow::session::{Language, Session};
use crate::handlers::action::{ActionExecutor, ActionOutcome, BOT_NAME, Turn};
use crate::models::chat::ChatMessage;
use crate::models::intent::Intent;
use crate::service::i18n::{Msg, is_cancel_token, menu_action_for_label, tr, trf};
use crate::service::presentation::{
    Reply, date_grid, render_abort, render_prompt, render_retry, with_menu,
};

pub type SessionMap = Arc<Mutex<HashMap<String, SessionSlot>>>;

/// Sessions untouched for this long are dropped, language preference included.
pub const SESSION_IDLE_DAYS: i64 = 7;

#[derive(Clone)]
pub struct SessionSlot {
    session: Arc<Mutex<Session>>,
    last_seen: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    Start,
    Menu,
    Help,
    Today,
    Upcoming,
    Create,
}

impl SlashCommand {
    pub const ALL: [SlashCommand; 6] = [
        SlashCommand::Start,
        SlashCommand::Menu,
        SlashCommand::Help,
        SlashCommand::Today,
        SlashCommand::Upcoming,
        SlashCommand::Create,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SlashCommand::Start => "start",
            SlashCommand::Menu => "menu",
            SlashCommand::Help => "help",
            SlashCommand::Today => "today",
            SlashCommand::Upcoming => "upcoming",
            SlashCommand::Create => "create",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Start => "Start the assistant",
            SlashCommand::Menu => "Show the main menu",
            SlashCommand::Help => "Show help",
            SlashCommand::Today => "View today's events",
            SlashCommand::Upcoming => "View upcoming events",
            SlashCommand::Create => "Create an event with the date picker",
        }
    }

    /// Accepts the bare name or a leading slash.
    pub fn from_name(name: &str) -> Option<SlashCommand> {
        let name = name.trim().trim_start_matches('/');
        Self::ALL.into_iter().find(|cmd| cmd.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Text(String),
    Callback(Callback),
    Command(SlashCommand),
}

/// Routes each update to a menu shortcut, the active flow, or the classifier.
///
/// Each user's session sits behind its own mutex which is held for the whole
/// update, so two messages from one user never interleave.
pub struct Dispatcher {
    executor: Arc<ActionExecutor>,
    sessions: SessionMap,
    admin_user_id: Option<String>,
    timezone: Tz,
    default_language: Language,
}

impl Dispatcher {
    pub fn new(
        executor: Arc<ActionExecutor>,
        admin_user_id: Option<String>,
        timezone: Tz,
        default_language: Language,
    ) -> Self {
        Self {
            executor,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            admin_user_id,
            timezone,
            default_language,
        }
    }

    /// Without a configured admin every caller is trusted.
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_user_id
            .as_deref()
            .map_or(true, |admin| admin == user_id)
    }

    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }

    pub async fn handle(&self, user_id: &str, input: UserInput) -> Option<Reply> {
        self.handle_at(user_id, input, self.now()).await
    }

    /// Handles one update as if the local wall clock read `now`.
    pub async fn handle_at(
        &self,
        user_id: &str,
        input: UserInput,
        now: NaiveDateTime,
    ) -> Option<Reply> {
        let request_id = Uuid::new_v4();
        let span = info_span!("update", %request_id, user_id);
        async move {
            let session = self.session_for(user_id, now).await;
            let mut session = session.lock().await;
            match self.route(user_id, input, &mut session, now).await {
                Ok(reply) => reply,
                Err(err) => {
                    error!(error = %err, "failed to handle update");
                    session.clear();
                    let lang = session.language();
                    Some(with_menu(lang, tr(lang, Msg::ErrorOccurred)))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Copy of the user's current session, if one was ever created.
    pub async fn session_snapshot(&self, user_id: &str) -> Option<Session> {
        let slot = self.sessions.lock().await.get(user_id).cloned()?;
        let snapshot = slot.session.lock().await.clone();
        Some(snapshot)
    }

    async fn session_for(&self, user_id: &str, now: NaiveDateTime) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        if let Some(cutoff) = now.checked_sub_signed(Duration::days(SESSION_IDLE_DAYS)) {
            let before = sessions.len();
            sessions.retain(|_, slot| slot.last_seen > cutoff || Arc::strong_count(&slot.session) > 1);
            if sessions.len() < before {
                debug!(evicted = before - sessions.len(), "dropped idle sessions");
            }
        }
        let slot = sessions.entry(user_id.to_string()).or_insert_with(|| SessionSlot {
            session: Arc::new(Mutex::new(Session::new(self.default_language))),
            last_seen: now,
        });
        slot.last_seen = slot.last_seen.max(now);
        slot.session.clone()
    }

    async fn route(
        &self,
        user_id: &str,
        input: UserInput,
        session: &mut Session,
        now: NaiveDateTime,
    ) -> BotResult<Option<Reply>> {
        match input {
            UserInput::Text(text) => self.on_text(user_id, &text, session, now).await.map(Some),
            UserInput::Callback(callback) => self.on_callback(user_id, callback, session, now).await,
            UserInput::Command(command) => self.on_command(user_id, command, session, now).await.map(Some),
        }
    }

    async fn on_text(
        &self,
        user_id: &str,
        text: &str,
        session: &mut Session,
        now: NaiveDateTime,
    ) -> BotResult<Reply> {
        let lang = session.language();
        if is_cancel_token(text) {
            machine::cancel(session);
            return Ok(with_menu(lang, tr(lang, Msg::Cancelled)));
        }
        if let Some(action) = menu_action_for_label(text) {
            return self.on_menu(user_id, action, session, now.date()).await;
        }
        if !session.is_idle() {
            debug!(flow = ?session.active_flow(), "continuing flow");
            let outcome = machine::step(session, FlowInput::Text(text.to_string()), now.date());
            return self.render_step(outcome, user_id, lang, now.date()).await;
        }

        let history = session.history();
        let intent = self
            .executor
            .classifier()
            .analyze_user_request(text, &history, now)
            .await;
        let reply = if !self.is_admin(user_id) && !is_conversational(&intent) {
            warn!(action = intent.action_name(), "non-admin requested a restricted action");
            Reply::text(tr(lang, Msg::AccessDenied))
        } else {
            let turn = Turn {
                user_id,
                text,
                lang,
                history: &history,
                now,
            };
            let outcome = self.executor.execute(intent, turn).await?;
            self.apply(outcome, user_id, session, now.date()).await?
        };
        session.remember(ChatMessage::user(text));
        session.remember(ChatMessage::assistant(reply.text.clone()));
        Ok(reply)
    }

    async fn on_menu(
        &self,
        user_id: &str,
        action: MenuAction,
        session: &mut Session,
        today: NaiveDate,
    ) -> BotResult<Reply> {
        let lang = session.language();
        if action.requires_admin() && !self.is_admin(user_id) {
            return Ok(Reply::text(tr(lang, Msg::AccessDenied)));
        }
        if action.requires_calendar() && !self.executor.calendar_enabled() {
            return Ok(with_menu(lang, tr(lang, Msg::CalendarDisabled)));
        }
        session.clear();
        let outcome = self.executor.menu(action, user_id, lang, today).await?;
        self.apply(outcome, user_id, session, today).await
    }

    async fn on_callback(
        &self,
        user_id: &str,
        callback: Callback,
        session: &mut Session,
        now: NaiveDateTime,
    ) -> BotResult<Option<Reply>> {
        let lang = session.language();
        let today = now.date();
        let restricted = !matches!(
            callback,
            Callback::Ignore | Callback::Cancel | Callback::Menu { .. } | Callback::SetLanguage { .. }
        );
        if restricted && !self.is_admin(user_id) {
            return Ok(Some(Reply::text(tr(lang, Msg::AccessDenied))));
        }

        let input = match callback {
            Callback::Ignore => return Ok(None),
            Callback::Cancel => {
                machine::cancel(session);
                return Ok(Some(with_menu(lang, tr(lang, Msg::Cancelled))));
            }
            Callback::Menu { action } => {
                return self.on_menu(user_id, action, session, today).await.map(Some);
            }
            Callback::SetLanguage { code } => {
                let Some(language) = Language::from_code(&code) else {
                    return Ok(None);
                };
                session.set_language(language);
                return Ok(Some(with_menu(language, tr(language, Msg::LanguageChanged))));
            }
            Callback::MonthNav { year, month } => {
                if session.flow_kind() != Some(FlowKind::CreateEvent) {
                    return Ok(Some(render_abort(lang, machine::AbortReason::NotActive)));
                }
                return Ok(Some(Reply::with_keyboard(
                    tr(lang, Msg::SelectDate),
                    date_grid(lang, year, month),
                )));
            }
            Callback::SelectDate { year, month, day } => {
                match NaiveDate::from_ymd_opt(year, month, day) {
                    Some(date) => FlowInput::PickDate(date),
                    None => return Ok(None),
                }
            }
            Callback::SelectHour { hour } => FlowInput::PickHour(hour),
            Callback::SelectMinute { minute } => FlowInput::PickMinute(minute),
            Callback::BackToHours => FlowInput::BackToHours,
            Callback::EditEvent { id } => {
                if session.flow_kind() != Some(FlowKind::EditTitle) {
                    return Ok(Some(render_abort(lang, machine::AbortReason::NotActive)));
                }
                FlowInput::PickEvent(id)
            }
            other => {
                if matches!(other, Callback::DeleteEvent { .. }) {
                    session.clear();
                }
                return self.executor.button(&other, user_id, lang).await;
            }
        };

        let outcome = machine::step(session, input, today);
        self.render_step(outcome, user_id, lang, today).await.map(Some)
    }

    async fn on_command(
        &self,
        user_id: &str,
        command: SlashCommand,
        session: &mut Session,
        now: NaiveDateTime,
    ) -> BotResult<Reply> {
        let lang = session.language();
        let today = now.date();
        match command {
            SlashCommand::Start | SlashCommand::Menu => {
                session.clear();
                let status = if self.executor.calendar_enabled() {
                    ""
                } else {
                    tr(lang, Msg::WelcomeLimited)
                };
                Ok(with_menu(
                    lang,
                    trf(lang, Msg::Welcome, &[("bot_name", BOT_NAME), ("calendar_status", status)]),
                ))
            }
            SlashCommand::Help => self.on_menu(user_id, MenuAction::Help, session, today).await,
            SlashCommand::Today => self.on_menu(user_id, MenuAction::Today, session, today).await,
            SlashCommand::Upcoming => {
                self.on_menu(user_id, MenuAction::Upcoming, session, today).await
            }
            SlashCommand::Create => {
                self.on_menu(user_id, MenuAction::CreateEvent, session, today).await
            }
        }
    }

    async fn apply(
        &self,
        outcome: ActionOutcome,
        user_id: &str,
        session: &mut Session,
        today: NaiveDate,
    ) -> BotResult<Reply> {
        match outcome {
            ActionOutcome::Reply(reply) => Ok(reply),
            ActionOutcome::StartFlow { kind, seed } => {
                let step = machine::begin(session, kind, seed);
                self.render_step(step, user_id, session.language(), today).await
            }
        }
    }

    async fn render_step(
        &self,
        outcome: StepOutcome,
        user_id: &str,
        lang: Language,
        today: NaiveDate,
    ) -> BotResult<Reply> {
        match outcome {
            StepOutcome::Prompt(prompt) => Ok(render_prompt(lang, &prompt, today)),
            StepOutcome::Retry { reason, prompt } => Ok(render_retry(lang, reason, &prompt, today)),
            StepOutcome::Commit(commit) => self.executor.commit(commit, user_id, lang).await,
            StepOutcome::Aborted(reason) => Ok(render_abort(lang, reason)),
        }
    }
}

/// Intents a non-admin caller may still trigger.
fn is_conversational(intent: &Intent) -> bool {
    matches!(
        intent,
        Intent::GeneralChat { .. } | Intent::Error { .. } | Intent::Unrecognized { .. }
    )
}
