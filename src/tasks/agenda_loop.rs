use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::id::UserId;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{BotError, BotResult};
use crate::handlers::action::ActionExecutor;
use crate::service::presentation::task_line;

#[async_trait]
pub trait DmSender: Send + Sync {
    async fn send_dm(&self, user_id: &str, content: &str) -> BotResult<()>;
}

pub struct DiscordDmSender {
    http: Arc<Http>,
}

impl DiscordDmSender {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
        }
    }
}

#[async_trait]
impl DmSender for DiscordDmSender {
    async fn send_dm(&self, user_id: &str, content: &str) -> BotResult<()> {
        let id = user_id
            .parse::<u64>()
            .map(UserId::new)
            .map_err(|_| BotError::Transport(format!("Invalid user id {}", user_id)))?;
        let channel = id.create_dm_channel(&self.http).await?;
        channel.say(&self.http, content).await?;
        Ok(())
    }
}

/// Sends the admin a daily agenda at `hour` local time.
pub async fn run_agenda_loop(
    executor: Arc<ActionExecutor>,
    sender: Arc<dyn DmSender>,
    user_id: String,
    timezone: Tz,
    hour: u32,
) {
    loop {
        let next_run = next_daily_run(Utc::now(), timezone, hour);
        info!(%next_run, "next agenda digest scheduled");
        let sleep_for = (next_run - Utc::now())
            .to_std()
            .unwrap_or_else(|_| std::time::Duration::from_secs(60));
        sleep(sleep_for).await;

        let today = Utc::now().with_timezone(&timezone).date_naive();
        if let Err(err) = agenda_tick(&executor, sender.as_ref(), &user_id, today).await {
            warn!(error = %err, "agenda digest failed");
        }
    }
}

pub fn next_daily_run(now: DateTime<Utc>, timezone: Tz, hour: u32) -> DateTime<Utc> {
    let at = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let target_on = |date: NaiveDate| {
        let local = date.and_time(at);
        timezone
            .from_local_datetime(&local)
            .earliest()
            .unwrap_or_else(|| timezone.from_utc_datetime(&local))
            .with_timezone(&Utc)
    };

    let today = now.with_timezone(&timezone).date_naive();
    let target = target_on(today);
    if now < target {
        target
    } else {
        target_on(today + Duration::days(1))
    }
}

pub async fn agenda_tick<S: DmSender + ?Sized>(
    executor: &ActionExecutor,
    sender: &S,
    user_id: &str,
    today: NaiveDate,
) -> BotResult<()> {
    let mut body = format!(
        "☀️ Good morning! Here is your agenda for {}:\n",
        today.format("%B %d, %Y")
    );

    if executor.calendar_enabled() {
        match executor.events_on(today).await {
            Ok(events) if events.is_empty() => body.push_str("\n📅 No events today.\n"),
            Ok(events) => {
                let summary = executor.classifier().create_smart_summary(&events).await;
                body.push_str(&format!("\n📅 {}\n", summary));
            }
            Err(err) => body.push_str(&format!("\n❌ {}\n", err)),
        }
    }

    let tasks = executor.store().get_tasks(user_id, false).await;
    if tasks.is_empty() {
        body.push_str("\n📝 No open tasks.");
    } else {
        let lines: Vec<String> = tasks.iter().map(task_line).collect();
        body.push_str(&format!("\n📝 Open tasks:\n{}", lines.join("\n")));
    }

    sender.send_dm(user_id, body.trim_end()).await
}
