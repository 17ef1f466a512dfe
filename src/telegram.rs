use async_trait::async_trait;
use teloxide::payloads::setters::*;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId as TgChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageEntityKind, MessageId,
    ParseMode, User,
};
use teloxide::{ApiError, RequestError};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::service::GameService;
use crate::transport::ChatTransport;
use crate::types::{
    Button, ChatId, InboundEvent, InboundKind, Profile, TapRef, UserId as PlayerId,
};

type HandlerResult = anyhow::Result<()>;

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn keyboard(buttons: &[Button]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(buttons.iter().map(|button| {
        vec![InlineKeyboardButton::callback(
            button.label.clone(),
            button.payload.clone(),
        )]
    }))
}

fn delivery_error(err: RequestError) -> TransportError {
    TransportError::Delivery(err.to_string())
}

fn private_delivery_error(err: RequestError) -> TransportError {
    match err {
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::CantInitiateConversation
            | ApiError::CantTalkWithBots
            | ApiError::UserDeactivated
            | ApiError::ChatNotFound,
        ) => TransportError::PrivateChatUnavailable(err.to_string()),
        other => delivery_error(other),
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat: ChatId, html: &str) -> Result<(), TransportError> {
        self.bot
            .send_message(TgChatId(chat.0), html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(delivery_error)?;
        Ok(())
    }

    async fn send_buttons(
        &self,
        chat: ChatId,
        html: &str,
        buttons: &[Button],
    ) -> Result<(), TransportError> {
        self.bot
            .send_message(TgChatId(chat.0), html)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard(buttons))
            .await
            .map_err(delivery_error)?;
        Ok(())
    }

    async fn send_private(&self, user: PlayerId, html: &str) -> Result<(), TransportError> {
        self.bot
            .send_message(TgChatId(user.0), html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(private_delivery_error)?;
        Ok(())
    }

    async fn answer_tap(
        &self,
        tap: &TapRef,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError> {
        let mut request = self.bot.answer_callback_query(tap.callback_id.clone());
        if let Some(text) = text {
            request = request.text(text).show_alert(alert);
        }
        request.await.map_err(delivery_error)?;
        Ok(())
    }

    async fn edit_tapped(&self, tap: &TapRef, html: &str) -> Result<(), TransportError> {
        let Some(message_id) = tap.message_id else {
            return self.send_text(tap.chat, html).await;
        };
        self.bot
            .edit_message_text(TgChatId(tap.chat.0), MessageId(message_id), html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(delivery_error)?;
        Ok(())
    }

    async fn is_admin(&self, chat: ChatId, user: PlayerId) -> Result<bool, TransportError> {
        let admins = self
            .bot
            .get_chat_administrators(TgChatId(chat.0))
            .await
            .map_err(delivery_error)?;
        Ok(admins.iter().any(|member| player_id(&member.user) == user))
    }
}

fn player_id(user: &User) -> PlayerId {
    PlayerId(user.id.0 as i64)
}

fn profile(user: &User) -> Profile {
    Profile {
        id: player_id(user),
        first_name: user.first_name.clone(),
        username: user.username.clone(),
    }
}

/// Text messages with a known sender. Text-mention entities carry users without a
/// public username, so they are lifted out for `/remove`.
pub fn inbound_from_message(msg: &Message) -> Option<InboundEvent> {
    let sender = msg.from()?;
    let text = msg.text()?;
    let mentions = msg
        .entities()
        .unwrap_or(&[])
        .iter()
        .filter_map(|entity| match &entity.kind {
            MessageEntityKind::TextMention { user } => Some(profile(user)),
            _ => None,
        })
        .collect();
    Some(InboundEvent {
        chat: ChatId(msg.chat.id.0),
        sender: profile(sender),
        kind: InboundKind::Text {
            text: text.to_string(),
            mentions,
        },
    })
}

/// Taps on buttons the bot posted. Inline-mode callbacks have no message and are skipped.
pub fn inbound_from_callback(query: &CallbackQuery) -> Option<InboundEvent> {
    let message = query.message.as_ref()?;
    let data = query.data.clone()?;
    let chat = ChatId(message.chat.id.0);
    Some(InboundEvent {
        chat,
        sender: profile(&query.from),
        kind: InboundKind::Tap {
            tap: TapRef {
                chat,
                callback_id: query.id.clone(),
                message_id: Some(message.id.0),
            },
            data,
        },
    })
}

async fn on_message(msg: Message, service: GameService) -> HandlerResult {
    if let Some(event) = inbound_from_message(&msg) {
        service.handle(event).await;
    }
    Ok(())
}

async fn on_callback(bot: Bot, query: CallbackQuery, service: GameService) -> HandlerResult {
    match inbound_from_callback(&query) {
        Some(event) => service.handle(event).await,
        None => {
            debug!(callback_id = %query.id, "callback without message ignored");
            bot.answer_callback_query(query.id).await?;
        }
    }
    Ok(())
}

/// Runs the long-polling dispatcher until Ctrl-C. Updates from one chat are handled
/// in arrival order.
pub async fn run_dispatcher(bot: Bot, service: GameService) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    info!("dispatcher starting");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![service])
        .default_handler(|update| async move {
            debug!(update_id = update.id, "unhandled update");
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
