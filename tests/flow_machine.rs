use calendarBot::flow::machine::{
    self, AbortReason, Commit, FlowInput, FlowKind, FlowPrompt, RetryReason, StepOutcome,
};
use calendarBot::flow::session::{
    ActiveFlow, CollectedFields, EventChoice, Field, FieldValue, Language, Session,
};
use calendarBot::service::presentation::{PICKER_HOURS, PICKER_MINUTES};
use chrono::NaiveDate;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 24).unwrap()
}

fn text(raw: &str) -> FlowInput {
    FlowInput::Text(raw.to_string())
}

fn choices() -> CollectedFields {
    CollectedFields::new().with(
        Field::Choices,
        FieldValue::Choices(vec![
            EventChoice {
                id: "a1".into(),
                summary: "Team meeting".into(),
            },
            EventChoice {
                id: "b2".into(),
                summary: "Dentist".into(),
            },
        ]),
    )
}

#[test]
fn typed_date_time_and_title_commit_an_event() {
    let mut session = Session::new(Language::En);
    assert_eq!(
        machine::begin(&mut session, FlowKind::CreateEvent, CollectedFields::new()),
        StepOutcome::Prompt(FlowPrompt::Date)
    );
    assert_eq!(session.active_flow(), ActiveFlow::CreatingEvent);

    let tomorrow = NaiveDate::from_ymd_opt(2025, 11, 25).unwrap();
    assert_eq!(
        machine::step(&mut session, text("tomorrow"), today()),
        StepOutcome::Prompt(FlowPrompt::Hour { date: tomorrow })
    );
    assert_eq!(
        machine::step(&mut session, text("14:30"), today()),
        StepOutcome::Prompt(FlowPrompt::EventTitle)
    );
    assert_eq!(session.active_flow(), ActiveFlow::CreatingEventTitle);

    assert_eq!(
        machine::step(&mut session, text("Dentist"), today()),
        StepOutcome::Commit(Commit::CreateEvent {
            title: "Dentist".into(),
            start: tomorrow.and_hms_opt(14, 30, 0).unwrap(),
        })
    );
    assert!(session.is_idle());
    assert!(session.fields().is_empty());
}

#[test]
fn picker_buttons_walk_through_hour_and_minute() {
    let mut session = Session::new(Language::En);
    machine::begin(&mut session, FlowKind::CreateEvent, CollectedFields::new());
    let date = NaiveDate::from_ymd_opt(2025, 12, 3).unwrap();

    assert_eq!(
        machine::step(&mut session, FlowInput::PickDate(date), today()),
        StepOutcome::Prompt(FlowPrompt::Hour { date })
    );
    assert_eq!(
        machine::step(&mut session, FlowInput::PickHour(14), today()),
        StepOutcome::Prompt(FlowPrompt::Minute { date, hour: 14 })
    );
    assert_eq!(
        machine::step(&mut session, FlowInput::BackToHours, today()),
        StepOutcome::Prompt(FlowPrompt::Hour { date })
    );
    machine::step(&mut session, FlowInput::PickHour(9), today());
    assert_eq!(
        machine::step(&mut session, FlowInput::PickMinute(45), today()),
        StepOutcome::Prompt(FlowPrompt::EventTitle)
    );
    assert_eq!(session.fields().start_time(), date.and_hms_opt(9, 45, 0));
    assert_eq!(session.fields().hour(), None);
}

#[test]
fn every_time_spelling_lands_on_the_same_start() {
    for raw in ["14:30", "2:30 PM", "2:30pm", "1430"] {
        let mut session = Session::new(Language::En);
        machine::begin(&mut session, FlowKind::CreateEvent, CollectedFields::new());
        machine::step(&mut session, text("2025-11-25"), today());
        machine::step(&mut session, text(raw), today());
        assert_eq!(
            session.fields().start_time(),
            NaiveDate::from_ymd_opt(2025, 11, 25)
                .unwrap()
                .and_hms_opt(14, 30, 0),
            "{raw}"
        );
    }
}

#[test]
fn bad_date_and_time_ask_again_without_losing_progress() {
    let mut session = Session::new(Language::En);
    machine::begin(&mut session, FlowKind::CreateEvent, CollectedFields::new());
    assert_eq!(
        machine::step(&mut session, text("next week"), today()),
        StepOutcome::Retry {
            reason: RetryReason::InvalidDate,
            prompt: FlowPrompt::Date
        }
    );
    machine::step(&mut session, text("today"), today());
    assert_eq!(
        machine::step(&mut session, text("noonish"), today()),
        StepOutcome::Retry {
            reason: RetryReason::InvalidTime,
            prompt: FlowPrompt::Hour { date: today() }
        }
    );
    assert_eq!(session.fields().date(), Some(today()));
}

#[test]
fn seeded_title_skips_the_title_prompt() {
    let mut session = Session::new(Language::En);
    let seed = CollectedFields::new().with(Field::Title, FieldValue::Text("Standup".into()));
    machine::begin(&mut session, FlowKind::CreateEvent, seed);
    machine::step(&mut session, text("today"), today());
    assert_eq!(
        machine::step(&mut session, text("9:00 AM"), today()),
        StepOutcome::Commit(Commit::CreateEvent {
            title: "Standup".into(),
            start: today().and_hms_opt(9, 0, 0).unwrap(),
        })
    );
}

#[test]
fn cancel_is_idempotent() {
    let mut session = Session::new(Language::En);
    machine::begin(&mut session, FlowKind::AddNote, CollectedFields::new());
    machine::step(&mut session, text("Groceries"), today());

    assert!(machine::cancel(&mut session));
    assert!(session.is_idle());
    assert!(session.fields().is_empty());
    assert!(!machine::cancel(&mut session));
    assert!(session.is_idle());
}

#[test]
fn minute_without_hour_aborts_and_clears() {
    let mut session = Session::new(Language::En);
    machine::begin(&mut session, FlowKind::CreateEvent, CollectedFields::new());
    machine::step(&mut session, text("today"), today());
    assert_eq!(
        machine::step(&mut session, FlowInput::PickMinute(15), today()),
        StepOutcome::Aborted(AbortReason::MissingHour)
    );
    assert!(session.is_idle());
}

#[test]
fn idle_session_rejects_flow_input() {
    let mut session = Session::new(Language::En);
    assert_eq!(
        machine::step(&mut session, FlowInput::PickHour(10), today()),
        StepOutcome::Aborted(AbortReason::NotActive)
    );
}

#[test]
fn delete_flow_picks_by_number() {
    let mut session = Session::new(Language::En);
    let outcome = machine::begin(&mut session, FlowKind::Delete, choices());
    assert!(matches!(
        outcome,
        StepOutcome::Prompt(FlowPrompt::EventChoice { kind: FlowKind::Delete, ref choices }) if choices.len() == 2
    ));
    assert_eq!(
        machine::step(&mut session, text("abc"), today()),
        StepOutcome::Retry {
            reason: RetryReason::InvalidNumber,
            prompt: FlowPrompt::EventChoice {
                kind: FlowKind::Delete,
                choices: choices().choices().unwrap().to_vec(),
            }
        }
    );
    assert_eq!(
        machine::step(&mut session, text("2"), today()),
        StepOutcome::Commit(Commit::DeleteEvent {
            event: EventChoice {
                id: "b2".into(),
                summary: "Dentist".into(),
            }
        })
    );
}

#[test]
fn out_of_range_event_number_aborts() {
    let mut session = Session::new(Language::En);
    machine::begin(&mut session, FlowKind::Delete, choices());
    assert_eq!(
        machine::step(&mut session, text("5"), today()),
        StepOutcome::Aborted(AbortReason::InvalidEventNumber)
    );
    assert!(session.is_idle());
}

#[test]
fn edit_flow_takes_button_then_new_title() {
    let mut session = Session::new(Language::En);
    machine::begin(&mut session, FlowKind::EditTitle, choices());
    let picked = EventChoice {
        id: "a1".into(),
        summary: "Team meeting".into(),
    };
    assert_eq!(
        machine::step(&mut session, FlowInput::PickEvent("a1".into()), today()),
        StepOutcome::Prompt(FlowPrompt::NewTitle {
            event: picked.clone()
        })
    );
    assert_eq!(
        machine::step(&mut session, text("   "), today()),
        StepOutcome::Retry {
            reason: RetryReason::EmptyText,
            prompt: FlowPrompt::NewTitle {
                event: picked.clone()
            }
        }
    );
    assert_eq!(
        machine::step(&mut session, text("Weekly sync"), today()),
        StepOutcome::Commit(Commit::RenameEvent {
            event: picked,
            title: "Weekly sync".into(),
        })
    );
}

#[test]
fn beginning_a_flow_replaces_the_previous_one() {
    let mut session = Session::new(Language::En);
    machine::begin(&mut session, FlowKind::AddNote, CollectedFields::new());
    machine::step(&mut session, text("Half-written"), today());
    assert_eq!(
        machine::begin(&mut session, FlowKind::Search, CollectedFields::new()),
        StepOutcome::Prompt(FlowPrompt::Query)
    );
    assert_eq!(session.active_flow(), ActiveFlow::Searching);
    assert!(session.fields().text(Field::Title).is_none());
}

#[test]
fn every_picker_slot_commits_exactly_that_start() {
    let dates = [
        NaiveDate::from_ymd_opt(2025, 11, 24).unwrap(),
        NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        NaiveDate::from_ymd_opt(2028, 2, 29).unwrap(),
    ];
    for date in dates {
        for hour in PICKER_HOURS {
            for minute in PICKER_MINUTES {
                let mut session = Session::new(Language::En);
                let seed = CollectedFields::new().with(Field::Title, FieldValue::Text("Slot".into()));
                machine::begin(&mut session, FlowKind::CreateEvent, seed);
                machine::step(&mut session, FlowInput::PickDate(date), today());
                machine::step(&mut session, FlowInput::PickHour(hour), today());
                assert_eq!(
                    machine::step(&mut session, FlowInput::PickMinute(minute), today()),
                    StepOutcome::Commit(Commit::CreateEvent {
                        title: "Slot".into(),
                        start: date.and_hms_opt(hour, minute, 0).unwrap(),
                    }),
                    "{date} {hour}:{minute}"
                );
                assert!(session.is_idle());
            }
        }
    }
}
