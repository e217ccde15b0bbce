use std::sync::Arc;

use serenity::all::{Command, Interaction as DiscordInteraction, Message};
use serenity::async_trait;
use serenity::builder::CreateCommand;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{debug, info, warn};

use crate::flow::callback::Callback;
use crate::handlers::discord_responder::{ChatResponder, SerenityResponder, pack_reply};
use crate::handlers::dispatcher::{Dispatcher, SlashCommand, UserInput};

pub struct BotHandler {
    dispatcher: Arc<Dispatcher>,
}

impl BotHandler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        BotHandler { dispatcher }
    }

    pub async fn handle_message_with<R: ChatResponder + ?Sized>(
        &self,
        responder: &R,
        user_id: &str,
        text: &str,
    ) {
        if text.trim().is_empty() {
            return;
        }
        let input = match text.trim().strip_prefix('/').and_then(SlashCommand::from_name) {
            Some(command) => UserInput::Command(command),
            None => UserInput::Text(text.to_string()),
        };
        self.dispatch(responder, user_id, input).await;
    }

    pub async fn handle_component_with<R: ChatResponder + ?Sized>(
        &self,
        responder: &R,
        user_id: &str,
        custom_id: &str,
    ) {
        let Some(callback) = Callback::decode(custom_id) else {
            debug!(custom_id, "ignoring unknown button payload");
            if let Err(err) = responder.acknowledge().await {
                warn!(error = %err, "failed to acknowledge button");
            }
            return;
        };
        self.dispatch(responder, user_id, UserInput::Callback(callback)).await;
    }

    pub async fn handle_command_with<R: ChatResponder + ?Sized>(
        &self,
        responder: &R,
        user_id: &str,
        name: &str,
    ) {
        let Some(command) = SlashCommand::from_name(name) else {
            debug!(name, "ignoring unknown command");
            return;
        };
        self.dispatch(responder, user_id, UserInput::Command(command)).await;
    }

    async fn dispatch<R: ChatResponder + ?Sized>(&self, responder: &R, user_id: &str, input: UserInput) {
        let result = match self.dispatcher.handle(user_id, input).await {
            Some(reply) => responder.send_pages(&pack_reply(&reply)).await,
            None => responder.acknowledge().await,
        };
        if let Err(err) = result {
            warn!(error = %err, user_id, "failed to deliver reply");
        }
    }
}

#[async_trait]
impl EventHandler for BotHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "connected to Discord");
        for command in SlashCommand::ALL {
            let builder = CreateCommand::new(command.name()).description(command.description());
            if let Err(err) = Command::create_global_command(&ctx.http, builder).await {
                warn!(error = %err, command = command.name(), "failed to register command");
            }
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let responder = SerenityResponder::for_message(&ctx, &msg);
        let user_id = msg.author.id.to_string();
        self.handle_message_with(&responder, &user_id, &msg.content).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: DiscordInteraction) {
        match interaction {
            DiscordInteraction::Command(command) => {
                let responder = SerenityResponder::for_command(&ctx, &command);
                let user_id = command.user.id.to_string();
                self.handle_command_with(&responder, &user_id, &command.data.name)
                    .await;
            }
            DiscordInteraction::Component(component) => {
                let responder = SerenityResponder::for_component(&ctx, &component);
                let user_id = component.user.id.to_string();
                self.handle_component_with(&responder, &user_id, &component.data.custom_id)
                    .await;
            }
            _ => {}
        }
    }
}
