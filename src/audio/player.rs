use anyhow::Result;
use serenity::model::id::{GuildId, UserId};
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        node::{AudioNode, NodeEvent, NodeEventReceiver},
        queue::QueueInfo,
        registry::SessionRegistry,
        session::{
            Effect, Enqueued, LoopMode, SessionChannels, SessionEvent, SharedSession,
        },
        track::Track,
    },
    error::MusicError,
    ui::ControlSurface,
};

/// Punto de entrada de todas las operaciones de reproducción.
///
/// Cada operación bloquea la sesión solo para la transición de estado y
/// ejecuta los efectos resultantes después de soltar el lock.
pub struct AudioPlayer {
    registry: Arc<SessionRegistry>,
    node: Arc<dyn AudioNode>,
    controls: Arc<dyn ControlSurface>,
}

impl AudioPlayer {
    pub fn new(
        registry: Arc<SessionRegistry>,
        node: Arc<dyn AudioNode>,
        controls: Arc<dyn ControlSurface>,
    ) -> Self {
        Self {
            registry,
            node,
            controls,
        }
    }

    /// Encola un track, conectando la sesión al canal de voz si hace falta.
    pub async fn play(
        &self,
        guild_id: GuildId,
        channels: SessionChannels,
        track: Track,
    ) -> Result<Enqueued> {
        let (session, created) = self.registry.get_or_create(guild_id, channels);

        let outcome = session.lock().enqueue_and_maybe_start(track);
        let (mut enqueued, effects) = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                if created {
                    self.registry.remove(guild_id, &session);
                }
                return Err(e.into());
            }
        };
        self.apply(&session, effects).await;

        let connect_to = session.lock().begin_connect();
        if let Some(voice) = connect_to {
            info!("🔗 Conectando a canal de voz {} en guild {}", voice, guild_id);

            if let Err(e) = self.node.connect(guild_id, voice).await {
                error!("❌ Error al conectar en guild {}: {:?}", guild_id, e);
                let effects = session.lock().connection_failed();
                self.apply(&session, effects).await;
                return Err(MusicError::ConnectionFailed(e.to_string()).into());
            }

            let effects = session.lock().mark_connected();
            if effects.iter().any(|effect| matches!(effect, Effect::Play { .. })) {
                if let Enqueued::Queued { position } = enqueued {
                    enqueued = match position {
                        0 => Enqueued::Started,
                        n => Enqueued::Queued { position: n - 1 },
                    };
                }
            }
            self.apply(&session, effects).await;
        }

        Ok(enqueued)
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<()> {
        let session = self.session(guild_id)?;
        let effects = session.lock().pause()?;
        self.apply(&session, effects).await;
        Ok(())
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<()> {
        let session = self.session(guild_id)?;
        let effects = session.lock().resume()?;
        self.apply(&session, effects).await;
        Ok(())
    }

    /// Devuelve `true` si quedó pausado.
    pub async fn toggle_pause(&self, guild_id: GuildId) -> Result<bool> {
        let session = self.session(guild_id)?;
        let (paused, effects) = session.lock().toggle_pause()?;
        self.apply(&session, effects).await;
        Ok(paused)
    }

    pub async fn skip(&self, guild_id: GuildId) -> Result<Track> {
        let session = self.session(guild_id)?;
        let (skipped, effects) = session.lock().skip()?;
        self.apply(&session, effects).await;
        Ok(skipped)
    }

    pub async fn stop(&self, guild_id: GuildId) -> Result<()> {
        let session = self.session(guild_id)?;
        let effects = session.lock().stop();
        self.apply(&session, effects).await;
        Ok(())
    }

    pub fn set_loop_mode(&self, guild_id: GuildId, mode: LoopMode) -> Result<()> {
        self.session(guild_id)?.lock().set_loop_mode(mode);
        Ok(())
    }

    pub fn toggle_loop(&self, guild_id: GuildId) -> Result<LoopMode> {
        Ok(self.session(guild_id)?.lock().toggle_loop())
    }

    pub async fn set_volume(&self, guild_id: GuildId, level: i64) -> Result<()> {
        let session = self.session(guild_id)?;
        let effects = session.lock().set_volume(level)?;
        self.apply(&session, effects).await;
        Ok(())
    }

    pub fn toggle_twenty_four_seven(&self, guild_id: GuildId) -> Result<bool> {
        Ok(self.session(guild_id)?.lock().toggle_twenty_four_seven())
    }

    pub fn remove(&self, guild_id: GuildId, position: usize) -> Result<Track> {
        let session = self.session(guild_id)?;
        let removed = session.lock().queue_mut().remove(position)?;
        Ok(removed)
    }

    pub fn move_track(&self, guild_id: GuildId, from: usize, to: usize) -> Result<Track> {
        let session = self.session(guild_id)?;
        let mut guard = session.lock();
        let moved = guard.queue_mut().move_track(from, to)?.clone();
        Ok(moved)
    }

    pub fn shuffle(&self, guild_id: GuildId) -> Result<()> {
        self.session(guild_id)?.lock().queue_mut().shuffle();
        Ok(())
    }

    pub fn clear_queue(&self, guild_id: GuildId) -> Result<usize> {
        Ok(self.session(guild_id)?.lock().queue_mut().clear())
    }

    pub fn queue_info(&self, guild_id: GuildId) -> Result<(QueueInfo, LoopMode)> {
        let session = self.session(guild_id)?;
        let guard = session.lock();
        Ok((guard.queue().snapshot(), guard.loop_mode()))
    }

    pub fn now_playing(&self, guild_id: GuildId) -> Result<Track> {
        let session = self.session(guild_id)?;
        let current = session.lock().current_track().cloned();
        current.ok_or_else(|| MusicError::NothingPlaying.into())
    }

    /// Verifica que `user` pueda usar los botones del track actual.
    pub fn authorize(&self, guild_id: GuildId, user: UserId) -> Result<()> {
        let session = self.session(guild_id)?;
        let verdict = session.lock().authorize(user);
        verdict.map_err(Into::into)
    }

    pub fn active_sessions(&self) -> usize {
        self.registry.session_count()
    }

    /// Reparte los eventos del nodo en un carril por guild: cada guild los
    /// procesa en orden de llegada sin esperar la I/O de los demás.
    pub async fn run_events(self: Arc<Self>, mut events: NodeEventReceiver) {
        info!("📡 Despachador de eventos de audio iniciado");
        let mut lanes: HashMap<GuildId, mpsc::UnboundedSender<SessionEvent>> = HashMap::new();

        while let Some(NodeEvent { guild_id, event }) = events.recv().await {
            let lane = lanes
                .entry(guild_id)
                .or_insert_with(|| self.clone().spawn_lane(guild_id));

            if let Err(mpsc::error::SendError(event)) = lane.send(event) {
                warn!("⚠️ Carril de eventos de guild {} cerrado, recreando", guild_id);
                let lane = self.clone().spawn_lane(guild_id);
                if lane.send(event).is_ok() {
                    lanes.insert(guild_id, lane);
                }
            }
        }
        info!("📡 Canal de eventos de audio cerrado");
    }

    fn spawn_lane(self: Arc<Self>, guild_id: GuildId) -> mpsc::UnboundedSender<SessionEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        debug!("Carril de eventos creado para guild {}", guild_id);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.handle_event(NodeEvent { guild_id, event }).await;
            }
        });
        tx
    }

    pub async fn handle_event(&self, NodeEvent { guild_id, event }: NodeEvent) {
        let Some(session) = self.registry.get(guild_id) else {
            debug!("Evento {:?} sin sesión en guild {}", event, guild_id);
            return;
        };

        let effects = session.lock().handle(event);
        self.apply(&session, effects).await;
    }

    fn session(&self, guild_id: GuildId) -> Result<SharedSession, MusicError> {
        self.registry
            .get(guild_id)
            .filter(|session| !session.lock().is_destroyed())
            .ok_or(MusicError::NothingPlaying)
    }

    /// Ejecuta los efectos en orden. Los fallos de I/O se registran y nunca
    /// revierten la transición ya aplicada.
    async fn apply(&self, session: &SharedSession, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }

        let (guild_id, channels) = {
            let guard = session.lock();
            (guard.guild_id(), guard.channels())
        };
        let mut pending = VecDeque::from(effects);

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::Play {
                    track,
                    playback,
                    volume,
                } => {
                    if let Err(e) = self.node.play(guild_id, &track, playback, volume).await {
                        error!("❌ Error al reproducir {}: {:?}", track.title, e);
                        let follow_up = session.lock().handle(SessionEvent::TrackErrored {
                            playback,
                            error: e.to_string(),
                        });
                        pending.extend(follow_up);
                    }
                }
                Effect::Pause(paused) => {
                    if let Err(e) = self.node.pause(guild_id, paused).await {
                        warn!("⚠️ Error al pausar/reanudar en guild {}: {:?}", guild_id, e);
                    }
                }
                Effect::StopTrack => {
                    if let Err(e) = self.node.stop(guild_id).await {
                        warn!("⚠️ Error al detener track en guild {}: {:?}", guild_id, e);
                    }
                }
                Effect::Destroy => {
                    if let Err(e) = self.node.destroy(guild_id).await {
                        warn!("⚠️ Error al desconectar en guild {}: {:?}", guild_id, e);
                    }
                }
                Effect::SetVolume(volume) => {
                    if let Err(e) = self.node.set_volume(guild_id, volume).await {
                        warn!("⚠️ Error al ajustar volumen en guild {}: {:?}", guild_id, e);
                    }
                }
                Effect::SendNowPlaying { track, playback } => {
                    match self.controls.send_now_playing(channels.text, &track).await {
                        Ok(message) => {
                            let stale = session.lock().attach_control_message(playback, message);
                            pending.extend(stale.map(Effect::DisableControls));
                        }
                        Err(e) => warn!("⚠️ No se pudo enviar now playing: {:?}", e),
                    }
                }
                Effect::DisableControls(message) => {
                    if let Err(e) = self.controls.disable_controls(channels.text, message).await {
                        warn!("⚠️ No se pudieron deshabilitar controles {}: {:?}", message, e);
                    }
                }
                Effect::Announce(announcement) => {
                    if let Err(e) = self.controls.announce(channels.text, &announcement).await {
                        warn!("⚠️ No se pudo publicar {:?}: {:?}", announcement, e);
                    }
                }
                Effect::Unregister => {
                    self.registry.remove(guild_id, session);
                }
            }
        }
    }
}
