use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::mpsc;

use crate::audio::{
    session::{PlaybackId, SessionEvent},
    track::Track,
};

/// Evento de un guild emitido por el backend de audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    pub guild_id: GuildId,
    pub event: SessionEvent,
}

pub type NodeEventSender = mpsc::UnboundedSender<NodeEvent>;
pub type NodeEventReceiver = mpsc::UnboundedReceiver<NodeEvent>;

pub fn event_channel() -> (NodeEventSender, NodeEventReceiver) {
    mpsc::unbounded_channel()
}

/// Backend que ejecuta el audio de cada guild.
///
/// Las llamadas solo mandan comandos; el progreso real (inicio, fin o error de
/// un track) vuelve como [`NodeEvent`] etiquetado con el [`PlaybackId`] que se
/// pasó a [`AudioNode::play`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioNode: Send + Sync {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()>;

    async fn play(
        &self,
        guild_id: GuildId,
        track: &Track,
        playback: PlaybackId,
        volume: u8,
    ) -> Result<()>;

    async fn pause(&self, guild_id: GuildId, paused: bool) -> Result<()>;

    async fn stop(&self, guild_id: GuildId) -> Result<()>;

    async fn destroy(&self, guild_id: GuildId) -> Result<()>;

    async fn set_volume(&self, guild_id: GuildId, volume: u8) -> Result<()>;
}
