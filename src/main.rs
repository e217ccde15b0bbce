#![allow(non_snake_case)]

use std::env;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use calendarBot::cli::{self, CLI_USER_ID};
use calendarBot::clients::calcom_client::CalcomClient;
use calendarBot::config::{AppConfig, RunMode, Settings};
use calendarBot::error::BotResult;
use calendarBot::handlers::action::ActionExecutor;
use calendarBot::handlers::dispatcher::Dispatcher;
use calendarBot::runtime;
use calendarBot::service::classifier::IntentClassifier;
use calendarBot::service::openai_service::OpenAIService;
use calendarBot::store::TaskNoteStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        error!(error = %err, "fatal error");
        std::process::exit(1);
    }
}

async fn run() -> BotResult<()> {
    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path)?,
        Err(_) => AppConfig::default(),
    };
    let settings = Settings::from_lookup(|key| config.lookup(key))?;

    let http = reqwest::Client::builder()
        .timeout(settings.http_timeout)
        .build()?;

    let openai = Arc::new(OpenAIService::new(
        http.clone(),
        settings.llm_api_url.clone(),
        settings.openai_api_key.clone(),
        settings.llm_model.clone(),
    ));
    let classifier = Arc::new(IntentClassifier::new(openai));

    let mut calendar = CalcomClient::new(
        http,
        settings.calcom_api_url.clone(),
        settings.calcom_api_key.clone(),
    );
    if !calendar.authenticate().await {
        warn!("running in limited mode without calendar features");
    }

    let store = Arc::new(TaskNoteStore::open(&settings.db_location)?);
    let executor = Arc::new(ActionExecutor::new(classifier, Arc::new(calendar), store));
    let dispatcher = Arc::new(Dispatcher::new(
        executor.clone(),
        settings.admin_user_id.clone(),
        settings.timezone,
        settings.default_language,
    ));

    match settings.run_mode {
        RunMode::Api => {
            info!("starting in api mode");
            runtime::run_api(&settings, dispatcher, executor).await
        }
        RunMode::Cli => {
            let user_id = settings.admin_user_id.as_deref().unwrap_or(CLI_USER_ID);
            cli::cli(&dispatcher, user_id).await;
            Ok(())
        }
    }
}
