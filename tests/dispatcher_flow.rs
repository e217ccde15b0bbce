mod common;

use calendarBot::flow::callback::{Callback, MenuAction};
use calendarBot::handlers::dispatcher::{SESSION_IDLE_DAYS, SlashCommand, UserInput};
use calendarBot::service::classifier::{CHAT_FALLBACK, UNPARSEABLE_REPLY};
use calendarBot::service::i18n::menu_label;
use calendarBot::service::presentation::{PICKER_HOURS, PICKER_MINUTES};
use calendarBot::flow::session::Language;
use chrono::NaiveDate;

use common::{FakeCalendar, FakeOpenAI, event, harness, monday_morning};

fn text(raw: &str) -> UserInput {
    UserInput::Text(raw.to_string())
}

fn menu(action: MenuAction) -> UserInput {
    text(menu_label(Language::En, action))
}

#[tokio::test]
async fn menu_create_flow_books_a_one_hour_event() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::new(Vec::new()), None);
    let now = monday_morning();

    let reply = h
        .dispatcher
        .handle_at("u1", menu(MenuAction::CreateEvent), now)
        .await
        .unwrap();
    assert!(reply.text.starts_with("📅 Select a date"));
    assert!(reply.keyboard.is_some());

    let reply = h.dispatcher.handle_at("u1", text("tomorrow"), now).await.unwrap();
    assert!(reply.text.contains("November 25, 2025"));
    h.dispatcher.handle_at("u1", text("14:30"), now).await.unwrap();
    let reply = h.dispatcher.handle_at("u1", text("Dentist"), now).await.unwrap();

    assert!(reply.text.starts_with("✅ Event created successfully!"));
    assert!(reply.text.contains("📌 Dentist"));
    assert!(reply.text.contains("02:30 PM - 03:30 PM"));

    let created = h.calendar.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    let day = NaiveDate::from_ymd_opt(2025, 11, 25).unwrap();
    assert_eq!(created[0].start, day.and_hms_opt(14, 30, 0).unwrap());
    assert_eq!(created[0].end, day.and_hms_opt(15, 30, 0).unwrap());
    assert_eq!(created[0].timezone, "UTC");
    assert!(h.dispatcher.session_snapshot("u1").await.unwrap().is_idle());
}

#[tokio::test]
async fn picker_callbacks_drive_the_same_flow() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::new(Vec::new()), None);
    let now = monday_morning();

    h.dispatcher
        .handle_at("u1", UserInput::Command(SlashCommand::Create), now)
        .await
        .unwrap();
    let pick = |cb: Callback| UserInput::Callback(cb);
    h.dispatcher
        .handle_at(
            "u1",
            pick(Callback::SelectDate {
                year: 2025,
                month: 11,
                day: 26,
            }),
            now,
        )
        .await
        .unwrap();
    h.dispatcher
        .handle_at("u1", pick(Callback::SelectHour { hour: 9 }), now)
        .await
        .unwrap();
    let reply = h
        .dispatcher
        .handle_at("u1", pick(Callback::SelectMinute { minute: 15 }), now)
        .await
        .unwrap();
    assert!(reply.text.starts_with("📝 Please type the event title"));
    h.dispatcher.handle_at("u1", text("Standup"), now).await.unwrap();

    let created = h.calendar.created.lock().unwrap().clone();
    let start = NaiveDate::from_ymd_opt(2025, 11, 26)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    assert_eq!(created[0].start, start);
    assert_eq!(created[0].end - created[0].start, chrono::Duration::hours(1));
}

#[tokio::test]
async fn picker_bookings_last_one_hour_across_month_and_year_ends() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::new(Vec::new()), None);
    let now = monday_morning();
    let dates = [(2025, 11, 24), (2025, 11, 30), (2025, 12, 31), (2026, 2, 28)];

    let mut expected = Vec::new();
    for (year, month, day) in dates {
        let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        for hour in PICKER_HOURS {
            for minute in PICKER_MINUTES {
                let steps = [
                    UserInput::Command(SlashCommand::Create),
                    UserInput::Callback(Callback::SelectDate { year, month, day }),
                    UserInput::Callback(Callback::SelectHour { hour }),
                    UserInput::Callback(Callback::SelectMinute { minute }),
                    text("Slot"),
                ];
                for step in steps {
                    h.dispatcher.handle_at("u1", step, now).await.unwrap();
                }
                expected.push(date.and_hms_opt(hour, minute, 0).unwrap());
            }
        }
    }

    let created = h.calendar.created.lock().unwrap().clone();
    assert_eq!(created.len(), expected.len());
    for (event, start) in created.iter().zip(expected) {
        assert_eq!(event.start, start);
        assert_eq!(event.end - event.start, chrono::Duration::hours(1));
    }
}

#[tokio::test]
async fn gateway_failure_is_reported_and_flow_ends() {
    let h = harness(
        FakeOpenAI::default(),
        FakeCalendar::failing_create("Could not fetch user profile"),
        None,
    );
    let now = monday_morning();

    h.dispatcher.handle_at("u1", menu(MenuAction::CreateEvent), now).await.unwrap();
    h.dispatcher.handle_at("u1", text("tomorrow"), now).await.unwrap();
    h.dispatcher.handle_at("u1", text("14:30"), now).await.unwrap();
    let reply = h.dispatcher.handle_at("u1", text("Dentist"), now).await.unwrap();

    assert_eq!(
        reply.text,
        "❌ Failed to create event: Could not fetch user profile"
    );
    assert!(reply.keyboard.is_some());
    assert!(h.dispatcher.session_snapshot("u1").await.unwrap().is_idle());
}

#[tokio::test]
async fn cancel_mid_flow_resets_the_session() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::new(Vec::new()), None);
    let now = monday_morning();

    h.dispatcher.handle_at("u1", menu(MenuAction::CreateEvent), now).await.unwrap();
    h.dispatcher.handle_at("u1", text("tomorrow"), now).await.unwrap();
    let reply = h.dispatcher.handle_at("u1", text("cancel"), now).await.unwrap();
    assert_eq!(reply.text, "❌ Cancelled.");

    let session = h.dispatcher.session_snapshot("u1").await.unwrap();
    assert!(session.is_idle());
    assert!(session.fields().is_empty());

    let again = h.dispatcher.handle_at("u1", text("cancel"), now).await.unwrap();
    assert_eq!(again.text, "❌ Cancelled.");
    assert!(h.openai.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn ambiguous_delete_lists_matches_and_deletes_nothing() {
    let openai = FakeOpenAI::with(&[Ok(
        r#"{"action":"delete_event","parameters":{"query":"meeting"}}"#,
    )]);
    let calendar = FakeCalendar::new(vec![
        event("1", "Team meeting", "2025-11-25T14:00:00.000Z"),
        event("2", "Client meeting", "2025-11-26T10:00:00.000Z"),
        event("3", "Dentist", "2025-11-27T09:00:00.000Z"),
    ]);
    let h = harness(openai, calendar, None);

    let reply = h
        .dispatcher
        .handle_at("u1", text("delete my meeting"), monday_morning())
        .await
        .unwrap();

    assert!(reply.text.starts_with("Found 2 events matching 'meeting'. Please be more specific:"));
    assert!(reply.text.contains("Team meeting"));
    assert!(reply.text.contains("Client meeting"));
    assert!(h.calendar.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn single_match_delete_goes_through_without_confirmation() {
    let openai = FakeOpenAI::with(&[Ok(
        r#"```json
{"action":"delete_event","parameters":{"query":"dentist"}}
```"#,
    )]);
    let calendar = FakeCalendar::new(vec![
        event("1", "Team meeting", "2025-11-25T14:00:00.000Z"),
        event("3", "Dentist", "2025-11-27T09:00:00.000Z"),
    ]);
    let h = harness(openai, calendar, None);

    let reply = h
        .dispatcher
        .handle_at("u1", text("cancel the dentist"), monday_morning())
        .await
        .unwrap();
    assert_eq!(reply.text, "✅ Deleted: Dentist");
    assert_eq!(*h.calendar.deleted.lock().unwrap(), vec!["3".to_string()]);
}

#[tokio::test]
async fn delete_button_asks_before_deleting() {
    let h = harness(
        FakeOpenAI::default(),
        FakeCalendar::new(vec![event("7", "Dentist", "2025-11-25T14:00:00.000Z")]),
        None,
    );
    let now = monday_morning();

    let reply = h
        .dispatcher
        .handle_at("u1", UserInput::Callback(Callback::DeleteEvent { id: "7".into() }), now)
        .await
        .unwrap();
    assert!(reply.text.starts_with("⚠️ Are you sure"));
    assert!(h.calendar.deleted.lock().unwrap().is_empty());

    let reply = h
        .dispatcher
        .handle_at("u1", UserInput::Callback(Callback::ConfirmDelete { id: "7".into() }), now)
        .await
        .unwrap();
    assert_eq!(reply.text, "✅ Event deleted successfully!");
    assert_eq!(*h.calendar.deleted.lock().unwrap(), vec!["7".to_string()]);
}

#[tokio::test]
async fn leftover_edit_button_cannot_pick_for_delete() {
    let h = harness(
        FakeOpenAI::default(),
        FakeCalendar::new(vec![event("7", "Dentist", "2025-11-25T14:00:00.000Z")]),
        None,
    );
    let now = monday_morning();

    h.dispatcher.handle_at("u1", menu(MenuAction::Edit), now).await.unwrap();
    h.dispatcher.handle_at("u1", menu(MenuAction::Delete), now).await.unwrap();
    let reply = h
        .dispatcher
        .handle_at("u1", UserInput::Callback(Callback::EditEvent { id: "7".into() }), now)
        .await
        .unwrap();

    assert_eq!(
        reply.text,
        "❌ This step is no longer active. Please start again from the menu."
    );
    assert!(h.calendar.deleted.lock().unwrap().is_empty());
    assert!(h.calendar.updated.lock().unwrap().is_empty());
}

#[tokio::test]
async fn edit_button_renames_within_the_edit_flow() {
    let h = harness(
        FakeOpenAI::default(),
        FakeCalendar::new(vec![event("7", "Dentist", "2025-11-25T14:00:00.000Z")]),
        None,
    );
    let now = monday_morning();

    h.dispatcher.handle_at("u1", menu(MenuAction::Edit), now).await.unwrap();
    h.dispatcher
        .handle_at("u1", UserInput::Callback(Callback::EditEvent { id: "7".into() }), now)
        .await
        .unwrap();
    h.dispatcher.handle_at("u1", text("Orthodontist"), now).await.unwrap();

    let updated = h.calendar.updated.lock().unwrap().clone();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].0, "7");
    assert_eq!(updated[0].1.title.as_deref(), Some("Orthodontist"));
    assert!(h.calendar.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_admin_can_chat_but_not_act() {
    let openai = FakeOpenAI::with(&[
        Ok(r#"{"action":"list_events","parameters":{}}"#),
        Ok(r#"{"action":"general_chat","parameters":{"response_text":"Hello there!"}}"#),
    ]);
    let h = harness(openai, FakeCalendar::new(Vec::new()), Some("owner"));
    let now = monday_morning();

    let reply = h.dispatcher.handle_at("guest", text("show my events"), now).await.unwrap();
    assert!(reply.text.starts_with("⛔"));

    let reply = h.dispatcher.handle_at("guest", text("hi"), now).await.unwrap();
    assert_eq!(reply.text, "Hello there!");

    let reply = h
        .dispatcher
        .handle_at("guest", menu(MenuAction::Tasks), now)
        .await
        .unwrap();
    assert!(reply.text.starts_with("⛔"));

    let reply = h
        .dispatcher
        .handle_at("guest", UserInput::Callback(Callback::ConfirmDelete { id: "1".into() }), now)
        .await
        .unwrap();
    assert!(reply.text.starts_with("⛔"));
    assert!(h.calendar.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_classification_becomes_an_apology() {
    let openai = FakeOpenAI::with(&[Ok("sure, I'll get right on it")]);
    let h = harness(openai, FakeCalendar::new(Vec::new()), None);

    let reply = h
        .dispatcher
        .handle_at("u1", text("book something"), monday_morning())
        .await
        .unwrap();
    assert_eq!(reply.text, UNPARSEABLE_REPLY);

    let history = h.dispatcher.session_snapshot("u1").await.unwrap().history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "book something");
}

#[tokio::test]
async fn llm_outage_falls_back_to_canned_reply() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::new(Vec::new()), None);
    let reply = h
        .dispatcher
        .handle_at("u1", text("what's up"), monday_morning())
        .await
        .unwrap();
    assert_eq!(reply.text, CHAT_FALLBACK);
}

#[tokio::test]
async fn calendar_menu_entries_are_blocked_when_disconnected() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::disconnected(), None);
    let now = monday_morning();

    let reply = h
        .dispatcher
        .handle_at("u1", menu(MenuAction::CreateEvent), now)
        .await
        .unwrap();
    assert_eq!(reply.text, "❌ Calendar features are disabled.");
    assert!(h.dispatcher.session_snapshot("u1").await.unwrap().is_idle());

    let reply = h
        .dispatcher
        .handle_at("u1", UserInput::Command(SlashCommand::Start), now)
        .await
        .unwrap();
    assert!(reply.text.contains("Calendar features currently disabled"));
}

#[tokio::test]
async fn task_flow_adds_and_completes_a_task() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::disconnected(), None);
    let now = monday_morning();

    let reply = h
        .dispatcher
        .handle_at("u1", menu(MenuAction::AddTask), now)
        .await
        .unwrap();
    assert_eq!(reply.text, "✅ What's the task?");
    let reply = h.dispatcher.handle_at("u1", text("Buy milk"), now).await.unwrap();
    assert_eq!(reply.text, "✅ Task #1 added: Buy milk");

    let reply = h
        .dispatcher
        .handle_at("u1", UserInput::Callback(Callback::CompleteTask { id: 1 }), now)
        .await
        .unwrap();
    assert!(reply.text.starts_with("✅ Completed: Buy milk"));
    assert!(h.executor.store().get_tasks("u1", false).await.is_empty());

    let reply = h
        .dispatcher
        .handle_at("u1", UserInput::Callback(Callback::CompleteTask { id: 9 }), now)
        .await
        .unwrap();
    assert_eq!(reply.text, "❌ Task 9 not found");
}

#[tokio::test]
async fn note_flow_then_search_finds_it() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::disconnected(), None);
    let now = monday_morning();

    h.dispatcher.handle_at("u1", menu(MenuAction::AddNote), now).await.unwrap();
    let reply = h.dispatcher.handle_at("u1", text("Groceries"), now).await.unwrap();
    assert!(reply.text.starts_with("🗒️ Groceries"));
    let reply = h
        .dispatcher
        .handle_at("u1", text("eggs, flour, oat milk"), now)
        .await
        .unwrap();
    assert_eq!(reply.text, "✅ Note #1 saved: Groceries");

    h.dispatcher.handle_at("u1", menu(MenuAction::Search), now).await.unwrap();
    let reply = h.dispatcher.handle_at("u1", text("flour"), now).await.unwrap();
    assert!(reply.text.starts_with("📒 Matching notes:"));
    assert!(reply.text.contains("Groceries"));
}

#[tokio::test]
async fn menu_label_abandons_the_active_flow() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::new(Vec::new()), None);
    let now = monday_morning();

    h.dispatcher.handle_at("u1", menu(MenuAction::CreateEvent), now).await.unwrap();
    h.dispatcher.handle_at("u1", text("tomorrow"), now).await.unwrap();
    let reply = h
        .dispatcher
        .handle_at("u1", menu(MenuAction::Upcoming), now)
        .await
        .unwrap();
    assert!(reply.text.starts_with("You have no upcoming events"));
    assert!(h.dispatcher.session_snapshot("u1").await.unwrap().is_idle());
}

#[tokio::test]
async fn stale_picker_button_reports_expired_step() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::new(Vec::new()), None);
    let reply = h
        .dispatcher
        .handle_at(
            "u1",
            UserInput::Callback(Callback::SelectHour { hour: 10 }),
            monday_morning(),
        )
        .await
        .unwrap();
    assert_eq!(
        reply.text,
        "❌ This step is no longer active. Please start again from the menu."
    );
}

#[tokio::test]
async fn users_keep_separate_sessions() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::new(Vec::new()), None);
    let now = monday_morning();

    h.dispatcher.handle_at("alice", menu(MenuAction::AddTask), now).await.unwrap();
    assert!(!h.dispatcher.session_snapshot("alice").await.unwrap().is_idle());
    h.dispatcher.handle_at("bob", UserInput::Command(SlashCommand::Menu), now).await.unwrap();
    assert!(h.dispatcher.session_snapshot("bob").await.unwrap().is_idle());
    assert!(!h.dispatcher.session_snapshot("alice").await.unwrap().is_idle());
}

#[tokio::test]
async fn idle_sessions_are_dropped_after_a_week() {
    let h = harness(FakeOpenAI::default(), FakeCalendar::new(Vec::new()), None);
    let start = monday_morning();

    h.dispatcher
        .handle_at(
            "alice",
            UserInput::Callback(Callback::SetLanguage { code: "fa".into() }),
            start,
        )
        .await
        .unwrap();
    h.dispatcher.handle_at("bob", UserInput::Command(SlashCommand::Menu), start).await.unwrap();

    let later = start + chrono::Duration::days(3);
    h.dispatcher.handle_at("bob", UserInput::Command(SlashCommand::Menu), later).await.unwrap();
    let alice = h.dispatcher.session_snapshot("alice").await.unwrap();
    assert_eq!(alice.language(), Language::Fa);

    let much_later = start + chrono::Duration::days(SESSION_IDLE_DAYS + 1);
    h.dispatcher
        .handle_at("bob", UserInput::Command(SlashCommand::Menu), much_later)
        .await
        .unwrap();
    assert!(h.dispatcher.session_snapshot("alice").await.is_none());
    assert!(h.dispatcher.session_snapshot("bob").await.is_some());
}
