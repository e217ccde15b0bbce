use serenity::all::{ButtonStyle, CommandInteraction, ComponentInteraction, Message};
use serenity::async_trait;
use serenity::builder::{
    CreateActionRow, CreateButton, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage,
};
use serenity::prelude::Context;
use tracing::warn;

use crate::error::BotResult;
use crate::flow::callback::MAX_CALLBACK_LEN;
use crate::service::presentation::Reply;

pub const MAX_BUTTONS_PER_ROW: usize = 5;
pub const MAX_ROWS_PER_MESSAGE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedButton {
    pub label: String,
    pub custom_id: String,
}

/// One outgoing chat message: text plus at most five rows of five buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub text: String,
    pub rows: Vec<Vec<PackedButton>>,
}

/// Splits a reply into pages that fit the component limits. Inert cells are
/// dropped; overflow rows go to follow-up pages with no text.
pub fn pack_reply(reply: &Reply) -> Vec<MessagePage> {
    let mut rows: Vec<Vec<PackedButton>> = Vec::new();
    for row in reply.keyboard.iter().flat_map(|k| k.rows.iter()) {
        let buttons: Vec<PackedButton> = row
            .iter()
            .filter(|button| !button.callback.is_inert())
            .filter_map(|button| match button.callback.encode() {
                Ok(custom_id) if custom_id.len() <= MAX_CALLBACK_LEN => Some(PackedButton {
                    label: button.label.clone(),
                    custom_id,
                }),
                Ok(custom_id) => {
                    warn!(len = custom_id.len(), label = %button.label, "callback too long, button dropped");
                    None
                }
                Err(err) => {
                    warn!(error = %err, "failed to encode callback");
                    None
                }
            })
            .collect();
        rows.extend(buttons.chunks(MAX_BUTTONS_PER_ROW).map(<[PackedButton]>::to_vec));
    }

    let mut pages: Vec<MessagePage> = rows
        .chunks(MAX_ROWS_PER_MESSAGE)
        .map(|chunk| MessagePage {
            text: String::new(),
            rows: chunk.to_vec(),
        })
        .collect();
    match pages.first_mut() {
        Some(first) => first.text = reply.text.clone(),
        None => pages.push(MessagePage {
            text: reply.text.clone(),
            rows: Vec::new(),
        }),
    }
    pages
}

fn action_rows(page: &MessagePage) -> Vec<CreateActionRow> {
    page.rows
        .iter()
        .map(|row| {
            CreateActionRow::Buttons(
                row.iter()
                    .map(|b| {
                        CreateButton::new(&b.custom_id)
                            .label(&b.label)
                            .style(ButtonStyle::Secondary)
                    })
                    .collect(),
            )
        })
        .collect()
}

#[async_trait]
pub trait ChatResponder: Send + Sync {
    /// Answers the update with the given pages, in order.
    async fn send_pages(&self, pages: &[MessagePage]) -> BotResult<()>;

    /// Confirms a button press that produced no visible reply.
    async fn acknowledge(&self) -> BotResult<()>;
}

pub struct SerenityResponder<'a> {
    ctx: &'a Context,
    message: Option<&'a Message>,
    command: Option<&'a CommandInteraction>,
    component: Option<&'a ComponentInteraction>,
}

impl<'a> SerenityResponder<'a> {
    pub fn for_message(ctx: &'a Context, message: &'a Message) -> Self {
        Self {
            ctx,
            message: Some(message),
            command: None,
            component: None,
        }
    }

    pub fn for_command(ctx: &'a Context, command: &'a CommandInteraction) -> Self {
        Self {
            ctx,
            message: None,
            command: Some(command),
            component: None,
        }
    }

    pub fn for_component(ctx: &'a Context, component: &'a ComponentInteraction) -> Self {
        Self {
            ctx,
            message: None,
            command: None,
            component: Some(component),
        }
    }

    fn response_message(page: &MessagePage) -> CreateInteractionResponseMessage {
        let builder = CreateInteractionResponseMessage::new().components(action_rows(page));
        if page.text.is_empty() {
            builder
        } else {
            builder.content(&page.text)
        }
    }

    fn followup(page: &MessagePage) -> CreateInteractionResponseFollowup {
        let builder = CreateInteractionResponseFollowup::new().components(action_rows(page));
        if page.text.is_empty() {
            builder
        } else {
            builder.content(&page.text)
        }
    }
}

#[async_trait]
impl ChatResponder for SerenityResponder<'_> {
    async fn send_pages(&self, pages: &[MessagePage]) -> BotResult<()> {
        let Some((first, rest)) = pages.split_first() else {
            return self.acknowledge().await;
        };

        if let Some(message) = self.message {
            for page in pages {
                let mut builder = CreateMessage::new().components(action_rows(page));
                if !page.text.is_empty() {
                    builder = builder.content(&page.text);
                }
                message.channel_id.send_message(&self.ctx.http, builder).await?;
            }
            return Ok(());
        }

        if let Some(command) = self.command {
            command
                .create_response(
                    &self.ctx.http,
                    CreateInteractionResponse::Message(Self::response_message(first)),
                )
                .await?;
            for page in rest {
                command.create_followup(&self.ctx.http, Self::followup(page)).await?;
            }
            return Ok(());
        }

        if let Some(component) = self.component {
            component
                .create_response(
                    &self.ctx.http,
                    CreateInteractionResponse::UpdateMessage(Self::response_message(first)),
                )
                .await?;
            for page in rest {
                component.create_followup(&self.ctx.http, Self::followup(page)).await?;
            }
        }
        Ok(())
    }

    async fn acknowledge(&self) -> BotResult<()> {
        if let Some(component) = self.component {
            component
                .create_response(&self.ctx.http, CreateInteractionResponse::Acknowledge)
                .await?;
        }
        Ok(())
    }
}
