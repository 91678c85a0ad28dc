//! # UI Module
//!
//! Discord-facing presentation for playback sessions: embeds, the control
//! button row and the [`ControlSurface`] seam the player uses to publish
//! "now playing" messages, disable stale controls and post announcements.

use anyhow::Result;
use async_trait::async_trait;
use serenity::{
    builder::{CreateMessage, EditMessage},
    http::Http,
    model::id::{ChannelId, MessageId},
};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::audio::{session::Announcement, track::Track};

pub mod buttons;
pub mod embeds;

/// Mensajes públicos que produce una sesión en su canal de texto.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// Publica el mensaje "now playing" con controles activos.
    async fn send_now_playing(&self, channel_id: ChannelId, track: &Track) -> Result<MessageId>;

    /// Deja el mensaje visible pero con todos los botones deshabilitados.
    async fn disable_controls(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()>;

    async fn announce(&self, channel_id: ChannelId, announcement: &Announcement) -> Result<()>;
}

/// Implementación sobre la API HTTP de Discord.
///
/// Se crea antes que el cliente y recibe su `Http` con [`DiscordControls::bind`],
/// así comparte los buckets de rate limit del gateway.
#[derive(Default)]
pub struct DiscordControls {
    http: OnceLock<Arc<Http>>,
}

impl DiscordControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, http: Arc<Http>) {
        if self.http.set(http).is_err() {
            debug!("Cliente HTTP de controles ya asignado");
        }
    }

    fn http(&self) -> Result<&Http> {
        self.http
            .get()
            .map(|http| http.as_ref())
            .ok_or_else(|| anyhow::anyhow!("Cliente HTTP de Discord no inicializado"))
    }
}

#[async_trait]
impl ControlSurface for DiscordControls {
    async fn send_now_playing(&self, channel_id: ChannelId, track: &Track) -> Result<MessageId> {
        let message = channel_id
            .send_message(
                self.http()?,
                CreateMessage::new()
                    .embed(embeds::create_now_playing_embed(track))
                    .components(buttons::create_player_buttons(false)),
            )
            .await?;

        debug!("📨 Mensaje de controles {} enviado a {}", message.id, channel_id);
        Ok(message.id)
    }

    async fn disable_controls(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        channel_id
            .edit_message(
                self.http()?,
                message_id,
                EditMessage::new().components(buttons::create_player_buttons(true)),
            )
            .await?;

        debug!("🔒 Controles deshabilitados en mensaje {}", message_id);
        Ok(())
    }

    async fn announce(&self, channel_id: ChannelId, announcement: &Announcement) -> Result<()> {
        channel_id
            .send_message(
                self.http()?,
                CreateMessage::new().embed(embeds::create_announcement_embed(announcement)),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::model::id::UserId;

    #[tokio::test]
    async fn unbound_controls_fail_without_sending() {
        let controls = DiscordControls::new();
        let track = Track::new("a", "https://example.com/a", UserId::new(1));

        let err = controls
            .send_now_playing(ChannelId::new(1), &track)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no inicializado"));
    }

    #[test]
    fn binding_twice_keeps_the_first_client() {
        let controls = DiscordControls::new();
        let first = Arc::new(Http::new("first"));
        controls.bind(first.clone());
        controls.bind(Arc::new(Http::new("second")));

        let bound = controls.http().unwrap();
        assert!(std::ptr::eq(bound, first.as_ref()));
    }
}
