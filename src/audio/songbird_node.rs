use anyhow::{Context as _, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    events::CoreEvent, input::YoutubeDl, tracks::TrackHandle, Event, Songbird, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    audio::{
        node::{AudioNode, NodeEventSender},
        session::PlaybackId,
        track::Track,
    },
    bot::events::{DriverStatusHandler, TrackEndHandler, TrackErrorHandler, TrackStartHandler},
};

/// Evento de songbird que dispara el "now playing" de cada track.
///
/// `Play` solo se emite al salir de una pausa; `Playable` llega una vez
/// cuando el input quedó listo para sonar.
pub fn start_event() -> Event {
    Event::Track(TrackEvent::Playable)
}

/// Nodo de audio local: songbird para la voz y yt-dlp como input.
pub struct SongbirdNode {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    ytdlp: &'static str,
    tracks: DashMap<GuildId, TrackHandle>,
    events: NodeEventSender,
}

impl SongbirdNode {
    /// `ytdlp` es el ejecutable usado para extraer el audio de cada track.
    pub fn new(manager: Arc<Songbird>, events: NodeEventSender, ytdlp: String) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            // Songbird exige un programa `'static`; se crea un único nodo por proceso.
            ytdlp: Box::leak(ytdlp.into_boxed_str()),
            tracks: DashMap::new(),
            events,
        }
    }

    fn handle(&self, guild_id: GuildId) -> Option<TrackHandle> {
        self.tracks.get(&guild_id).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl AudioNode for SongbirdNode {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| anyhow::anyhow!("Error al unirse al canal: {:?}", e))?;

        let mut call = call.lock().await;
        if let Err(e) = call.deafen(true).await {
            warn!("⚠️ No se pudo ensordecer al bot en guild {}: {:?}", guild_id, e);
        }

        call.remove_all_global_events();
        for event in [CoreEvent::DriverConnect, CoreEvent::DriverReconnect, CoreEvent::DriverDisconnect] {
            call.add_global_event(Event::Core(event), DriverStatusHandler { guild_id });
        }

        info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
        Ok(())
    }

    async fn play(
        &self,
        guild_id: GuildId,
        track: &Track,
        playback: PlaybackId,
        volume: u8,
    ) -> Result<()> {
        let call = self
            .manager
            .get(guild_id)
            .ok_or_else(|| anyhow::anyhow!("No hay conexión de voz para guild {}", guild_id))?;

        // El fin del handle anterior llega con un PlaybackId viejo y se ignora.
        if let Some((_, previous)) = self.tracks.remove(&guild_id) {
            let _ = previous.stop();
        }

        let input = YoutubeDl::new_ytdl_like(self.ytdlp, self.http.clone(), track.uri.clone());
        let handle = call.lock().await.play_input(input.into());

        handle
            .set_volume(f32::from(volume) / 100.0)
            .context("Error al ajustar volumen inicial")?;

        handle
            .add_event(
                start_event(),
                TrackStartHandler {
                    guild_id,
                    playback,
                    events: self.events.clone(),
                },
            )
            .context("Error al agregar handler de inicio")?;
        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndHandler {
                    guild_id,
                    playback,
                    events: self.events.clone(),
                },
            )
            .context("Error al agregar handler de fin")?;
        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                TrackErrorHandler {
                    guild_id,
                    playback,
                    events: self.events.clone(),
                },
            )
            .context("Error al agregar handler de error")?;

        self.tracks.insert(guild_id, handle);
        debug!("🎵 Track {} enviado al driver ({:?})", track.title, playback);
        Ok(())
    }

    async fn pause(&self, guild_id: GuildId, paused: bool) -> Result<()> {
        let Some(handle) = self.handle(guild_id) else {
            debug!("Sin track activo en guild {}", guild_id);
            return Ok(());
        };

        if paused {
            handle.pause()?;
        } else {
            handle.play()?;
        }
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> Result<()> {
        if let Some(handle) = self.handle(guild_id) {
            handle.stop()?;
        }
        Ok(())
    }

    async fn destroy(&self, guild_id: GuildId) -> Result<()> {
        if let Some((_, handle)) = self.tracks.remove(&guild_id) {
            let _ = handle.stop();
        }

        if self.manager.get(guild_id).is_some() {
            self.manager
                .remove(guild_id)
                .await
                .map_err(|e| anyhow::anyhow!("Error al salir del canal: {:?}", e))?;
        }

        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok(())
    }

    async fn set_volume(&self, guild_id: GuildId, volume: u8) -> Result<()> {
        if let Some(handle) = self.handle(guild_id) {
            handle.set_volume(f32::from(volume) / 100.0)?;
        }
        Ok(())
    }
}
