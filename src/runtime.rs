use std::sync::Arc;

use serenity::model::gateway::GatewayIntents;
use tracing::{error, info};

use crate::config::Settings;
use crate::error::{BotError, BotResult};
use crate::handlers::action::ActionExecutor;
use crate::handlers::discord::BotHandler;
use crate::handlers::dispatcher::Dispatcher;
use crate::tasks::agenda_loop::{self, DiscordDmSender};
use crate::tasks::task_runner::TaskRunner;

pub async fn run_api(
    settings: &Settings,
    dispatcher: Arc<Dispatcher>,
    executor: Arc<ActionExecutor>,
) -> BotResult<()> {
    let token = settings
        .discord_token
        .clone()
        .ok_or_else(|| BotError::Config("DISCORD_CLIENT_SECRET must be set for api mode".into()))?;

    let mut task_runner = TaskRunner::new();
    match (settings.digest_hour, settings.admin_user_id.clone()) {
        (Some(hour), Some(admin)) => {
            let sender = Arc::new(DiscordDmSender::new(&token));
            task_runner.add_task(
                "agenda_digest",
                agenda_loop::run_agenda_loop(executor, sender, admin, settings.timezone, hour),
            );
        }
        (Some(_), None) => info!("DIGEST_HOUR set without ADMIN_USER_ID, digest disabled"),
        _ => {}
    }
    task_runner.start_all();

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::Client::builder(&token, intents)
        .event_handler(BotHandler::new(dispatcher))
        .await?;

    if let Err(why) = client.start().await {
        error!(error = ?why, "client error");
        return Err(why.into());
    }
    Ok(())
}
