use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::{Button, ChatId, TapRef, UserId};

/// Outbound side of the messaging platform. Every text argument is HTML.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat: ChatId, html: &str) -> Result<(), TransportError>;

    /// One button per row.
    async fn send_buttons(
        &self,
        chat: ChatId,
        html: &str,
        buttons: &[Button],
    ) -> Result<(), TransportError>;

    /// Fails with [`TransportError::PrivateChatUnavailable`] when the user cannot be
    /// reached one-to-one.
    async fn send_private(&self, user: UserId, html: &str) -> Result<(), TransportError>;

    /// `text` is plain text, shown as a toast or, with `alert`, a modal.
    async fn answer_tap(
        &self,
        tap: &TapRef,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError>;

    async fn edit_tapped(&self, tap: &TapRef, html: &str) -> Result<(), TransportError>;

    /// Creator and administrators both count.
    async fn is_admin(&self, chat: ChatId, user: UserId) -> Result<bool, TransportError>;
}
