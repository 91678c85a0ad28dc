use serenity::{async_trait, model::id::GuildId};
use songbird::{
    tracks::PlayMode, Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler,
};
use tracing::{debug, info, warn};

use crate::audio::{
    node::{NodeEvent, NodeEventSender},
    session::{PlaybackId, SessionEvent},
};

fn forward(events: &NodeEventSender, guild_id: GuildId, event: SessionEvent) {
    if events.send(NodeEvent { guild_id, event }).is_err() {
        warn!("⚠️ Despachador de eventos cerrado, evento descartado en guild {}", guild_id);
    }
}

/// Handler para cuando un track comienza
pub struct TrackStartHandler {
    pub guild_id: GuildId,
    pub playback: PlaybackId,
    pub events: NodeEventSender,
}

#[async_trait]
impl VoiceEventHandler for TrackStartHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        debug!("▶️ Track iniciado en guild {} ({:?})", self.guild_id, self.playback);
        forward(
            &self.events,
            self.guild_id,
            SessionEvent::TrackStarted {
                playback: self.playback,
            },
        );

        // Una sola notificación por reproducción.
        Some(VoiceEvent::Cancel)
    }
}

/// Handler para eventos de fin de track (natural o por stop)
pub struct TrackEndHandler {
    pub guild_id: GuildId,
    pub playback: PlaybackId,
    pub events: NodeEventSender,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        info!("🎵 Track terminó en guild {}", self.guild_id);
        forward(
            &self.events,
            self.guild_id,
            SessionEvent::TrackEnded {
                playback: self.playback,
            },
        );
        None
    }
}

/// Handler para errores de tracks
pub struct TrackErrorHandler {
    pub guild_id: GuildId,
    pub playback: PlaybackId,
    pub events: NodeEventSender,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks
                .iter()
                .find_map(|(state, _)| match &state.playing {
                    PlayMode::Errored(e) => Some(format!("{:?}", e)),
                    _ => None,
                })
                .unwrap_or_else(|| "unknown playback error".to_string()),
            _ => "unknown playback error".to_string(),
        };

        warn!("❌ Error en track para guild {}: {}", self.guild_id, error);
        forward(
            &self.events,
            self.guild_id,
            SessionEvent::TrackErrored {
                playback: self.playback,
                error,
            },
        );
        None
    }
}

/// Registro de estado del driver de voz
pub struct DriverStatusHandler {
    pub guild_id: GuildId,
}

#[async_trait]
impl VoiceEventHandler for DriverStatusHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        match ctx {
            EventContext::DriverConnect(_) => {
                info!("🔗 Driver de voz conectado en guild {}", self.guild_id)
            }
            EventContext::DriverReconnect(_) => {
                info!("🔄 Reconectando al canal de voz en guild {}", self.guild_id)
            }
            EventContext::DriverDisconnect(data) => {
                warn!(
                    "🔌 Driver de voz desconectado en guild {}: {:?}",
                    self.guild_id, data.reason
                )
            }
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::node::event_channel;

    #[tokio::test]
    async fn track_end_is_forwarded_with_its_playback() {
        let (tx, mut rx) = event_channel();
        let handler = TrackEndHandler {
            guild_id: GuildId::new(3),
            playback: PlaybackId(7),
            events: tx,
        };

        assert!(handler.act(&EventContext::Track(&[])).await.is_none());
        assert_eq!(
            rx.recv().await,
            Some(NodeEvent {
                guild_id: GuildId::new(3),
                event: SessionEvent::TrackEnded {
                    playback: PlaybackId(7)
                },
            })
        );
    }

    #[tokio::test]
    async fn track_start_fires_once() {
        let (tx, mut rx) = event_channel();
        let handler = TrackStartHandler {
            guild_id: GuildId::new(3),
            playback: PlaybackId(2),
            events: tx,
        };

        assert!(matches!(
            handler.act(&EventContext::Track(&[])).await,
            Some(VoiceEvent::Cancel)
        ));
        assert!(matches!(
            rx.recv().await,
            Some(NodeEvent {
                event: SessionEvent::TrackStarted { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn closed_dispatcher_is_not_fatal() {
        let (tx, rx) = event_channel();
        drop(rx);
        let handler = TrackErrorHandler {
            guild_id: GuildId::new(3),
            playback: PlaybackId(1),
            events: tx,
        };

        assert!(handler.act(&EventContext::Track(&[])).await.is_none());
    }
}
