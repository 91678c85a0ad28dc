//! Per-guild playback session.
//!
//! [`PlaybackSession`] is a pure state machine: every operation mutates the
//! in-memory state and returns the list of [`Effect`]s the caller has to carry
//! out afterwards (node commands, UI messages, registry removal). Keeping the
//! I/O out of the session means a concurrent event for the same guild always
//! observes the post-transition state, never a half-applied one.
//!
//! Events coming back from the audio node carry the [`PlaybackId`] of the
//! playback they refer to. Anything addressed to an older playback is ignored,
//! which is what makes a skip racing a natural track end advance only once.

use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::{debug, info, warn};

use crate::{
    audio::{queue::MusicQueue, track::Track},
    error::MusicError,
};

pub type SharedSession = Arc<Mutex<PlaybackSession>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Connecting,
    Playing,
    Paused,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    Track,
    Queue,
}

impl LoopMode {
    /// Alterna como el botón de loop: off ↔ queue.
    pub fn toggled(self) -> Self {
        match self {
            LoopMode::Off => LoopMode::Queue,
            _ => LoopMode::Off,
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopMode::Off => "off",
            LoopMode::Track => "track",
            LoopMode::Queue => "queue",
        };
        f.write_str(name)
    }
}

impl FromStr for LoopMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(LoopMode::Off),
            "track" => Ok(LoopMode::Track),
            "queue" => Ok(LoopMode::Queue),
            other => anyhow::bail!("unknown loop mode: {}", other),
        }
    }
}

/// Identifica una reproducción concreta dentro de la sesión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlaybackId(pub u64);

impl PlaybackId {
    fn next(self) -> Self {
        PlaybackId(self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChannels {
    pub voice: ChannelId,
    pub text: ChannelId,
}

/// Eventos que recibe la sesión desde el nodo de audio o el gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TrackStarted { playback: PlaybackId },
    TrackEnded { playback: PlaybackId },
    TrackErrored { playback: PlaybackId, error: String },
    QueueEnded,
    Disconnected,
}

/// Mensajes públicos que la sesión publica en su canal de texto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    QueueEnded,
    Stopped,
    TrackFailed { title: String, error: String },
    Disconnected,
}

/// I/O pendiente tras una transición, en orden de ejecución.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Play {
        track: Track,
        playback: PlaybackId,
        volume: u8,
    },
    Pause(bool),
    StopTrack,
    Destroy,
    SetVolume(u8),
    SendNowPlaying { track: Track, playback: PlaybackId },
    DisableControls(MessageId),
    Announce(Announcement),
    Unregister,
}

/// Resultado de encolar un track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Started,
    Queued { position: usize },
}

#[derive(Debug)]
pub struct PlaybackSession {
    guild_id: GuildId,
    channels: SessionChannels,
    queue: MusicQueue,
    status: PlaybackStatus,
    connected: bool,
    loop_mode: LoopMode,
    volume: u8,
    twenty_four_seven: bool,
    manual_stop: bool,
    control_message: Option<MessageId>,
    playback: PlaybackId,
    skip_requested: bool,
    queue_end_handled: bool,
}

impl PlaybackSession {
    pub fn new(guild_id: GuildId, channels: SessionChannels, volume: u8, max_queue: usize) -> Self {
        Self {
            guild_id,
            channels,
            queue: MusicQueue::new(max_queue),
            status: PlaybackStatus::Idle,
            connected: false,
            loop_mode: LoopMode::Off,
            volume: volume.min(100),
            twenty_four_seven: false,
            manual_stop: false,
            control_message: None,
            playback: PlaybackId::default(),
            skip_requested: false,
            queue_end_handled: false,
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    // Getters

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn channels(&self) -> SessionChannels {
        self.channels
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn is_destroyed(&self) -> bool {
        self.status == PlaybackStatus::Destroyed
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current()
    }

    pub fn queue(&self) -> &MusicQueue {
        &self.queue
    }

    /// Acceso mutable para remove/move/shuffle/clear; ninguna de esas
    /// operaciones toca `current` ni requiere I/O.
    pub fn queue_mut(&mut self) -> &mut MusicQueue {
        &mut self.queue
    }

    // Conexión de voz

    /// Devuelve el canal a unir si la sesión todavía no está conectada.
    pub fn begin_connect(&mut self) -> Option<ChannelId> {
        if self.connected || self.status != PlaybackStatus::Idle {
            return None;
        }
        self.status = PlaybackStatus::Connecting;
        Some(self.channels.voice)
    }

    pub fn mark_connected(&mut self) -> Vec<Effect> {
        if self.is_destroyed() {
            // Detenida mientras se conectaba.
            return vec![Effect::Destroy];
        }
        if self.status != PlaybackStatus::Connecting {
            return Vec::new();
        }
        self.connected = true;
        self.status = PlaybackStatus::Idle;
        info!("🔊 Sesión conectada en guild {}", self.guild_id);

        if self.queue.current().is_none() && !self.queue.is_empty() {
            self.start_next()
        } else {
            Vec::new()
        }
    }

    pub fn connection_failed(&mut self) -> Vec<Effect> {
        warn!("❌ No se pudo conectar la sesión en guild {}", self.guild_id);
        self.status = PlaybackStatus::Destroyed;
        self.queue.clear();
        // Un join que expiró puede dejar un Call en el manager.
        vec![Effect::Destroy, Effect::Unregister]
    }

    // Operaciones de control

    pub fn enqueue_and_maybe_start(
        &mut self,
        track: Track,
    ) -> Result<(Enqueued, Vec<Effect>), MusicError> {
        if self.is_destroyed() {
            return Err(MusicError::NothingPlaying);
        }

        let position = self.queue.add(track, None)?;
        if self.status == PlaybackStatus::Idle && self.connected && self.queue.current().is_none() {
            return Ok((Enqueued::Started, self.start_next()));
        }

        Ok((Enqueued::Queued { position }, Vec::new()))
    }

    pub fn pause(&mut self) -> Result<Vec<Effect>, MusicError> {
        self.require_current()?;
        if self.status != PlaybackStatus::Playing {
            return Ok(Vec::new());
        }
        self.status = PlaybackStatus::Paused;
        info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
        Ok(vec![Effect::Pause(true)])
    }

    pub fn resume(&mut self) -> Result<Vec<Effect>, MusicError> {
        self.require_current()?;
        if self.status != PlaybackStatus::Paused {
            return Ok(Vec::new());
        }
        self.status = PlaybackStatus::Playing;
        info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
        Ok(vec![Effect::Pause(false)])
    }

    /// Devuelve `true` si la sesión quedó pausada.
    pub fn toggle_pause(&mut self) -> Result<(bool, Vec<Effect>), MusicError> {
        if self.status == PlaybackStatus::Paused {
            self.resume().map(|effects| (false, effects))
        } else {
            self.pause().map(|effects| (true, effects))
        }
    }

    /// Solo pide al nodo que corte el track actual; el avance llega con el
    /// evento de fin de track. Saltar nunca reinserta por loop.
    pub fn skip(&mut self) -> Result<(Track, Vec<Effect>), MusicError> {
        if self.is_destroyed() {
            return Err(MusicError::NothingPlaying);
        }
        let current = self
            .queue
            .current()
            .cloned()
            .ok_or(MusicError::NothingPlaying)?;

        self.skip_requested = true;
        info!("⏭️ Saltando {} en guild {}", current.title, self.guild_id);
        Ok((current, vec![Effect::StopTrack]))
    }

    /// Detención manual. Idempotente.
    pub fn stop(&mut self) -> Vec<Effect> {
        if self.is_destroyed() {
            debug!("Stop ignorado, la sesión de {} ya fue destruida", self.guild_id);
            return Vec::new();
        }

        self.manual_stop = true;
        self.status = PlaybackStatus::Destroyed;
        self.queue.clear();
        self.queue.advance();
        info!("⏹️ Sesión detenida manualmente en guild {}", self.guild_id);

        let mut effects = Vec::new();
        if let Some(message) = self.control_message.take() {
            effects.push(Effect::DisableControls(message));
        }
        effects.push(Effect::Announce(Announcement::Stopped));
        effects.push(Effect::Destroy);
        effects.push(Effect::Unregister);
        effects
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
        match mode {
            LoopMode::Off => info!("➡️ Repetición desactivada"),
            LoopMode::Track => info!("🔂 Repetir canción activado"),
            LoopMode::Queue => info!("🔁 Repetir cola activado"),
        }
    }

    pub fn toggle_loop(&mut self) -> LoopMode {
        self.set_loop_mode(self.loop_mode.toggled());
        self.loop_mode
    }

    pub fn set_volume(&mut self, level: i64) -> Result<Vec<Effect>, MusicError> {
        let level = u8::try_from(level)
            .ok()
            .filter(|level| *level <= 100)
            .ok_or(MusicError::OutOfRange)?;

        self.volume = level;
        info!("🔊 Volumen ajustado a {}% en guild {}", level, self.guild_id);
        Ok(vec![Effect::SetVolume(level)])
    }

    pub fn set_twenty_four_seven(&mut self, enabled: bool) {
        self.twenty_four_seven = enabled;
        info!("🌙 Modo 24/7 {} en guild {}", if enabled { "activado" } else { "desactivado" }, self.guild_id);
    }

    pub fn toggle_twenty_four_seven(&mut self) -> bool {
        self.set_twenty_four_seven(!self.twenty_four_seven);
        self.twenty_four_seven
    }

    /// Solo quien pidió el track actual puede usar los botones.
    pub fn authorize(&self, user: UserId) -> Result<(), MusicError> {
        if self.is_destroyed() {
            return Err(MusicError::NothingPlaying);
        }
        match self.queue.current() {
            None => Err(MusicError::NothingPlaying),
            Some(track) if track.is_requested_by(user) => Ok(()),
            Some(_) => Err(MusicError::NotAuthorized),
        }
    }

    // Eventos

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::TrackStarted { playback } => self.on_track_started(playback),
            SessionEvent::TrackEnded { playback } => self.on_track_ended(playback, None),
            SessionEvent::TrackErrored { playback, error } => {
                self.on_track_ended(playback, Some(error))
            }
            SessionEvent::QueueEnded => self.on_queue_end(),
            SessionEvent::Disconnected => self.on_disconnected(),
        }
    }

    /// Guarda el mensaje de controles recién enviado. Devuelve el mensaje que
    /// hay que deshabilitar: el anterior, o el nuevo si ya quedó obsoleto.
    pub fn attach_control_message(
        &mut self,
        playback: PlaybackId,
        message: MessageId,
    ) -> Option<MessageId> {
        if self.is_destroyed() || playback != self.playback || self.queue.current().is_none() {
            debug!("Mensaje de controles obsoleto en guild {}", self.guild_id);
            return Some(message);
        }
        self.control_message.replace(message)
    }

    fn on_track_started(&mut self, playback: PlaybackId) -> Vec<Effect> {
        if self.is_stale(playback) {
            debug!("TrackStarted obsoleto ({:?}) en guild {}", playback, self.guild_id);
            return Vec::new();
        }
        let Some(track) = self.queue.current().cloned() else {
            return Vec::new();
        };

        info!("▶️ Reproduciendo: {} en guild {}", track.title, self.guild_id);
        let mut effects = Vec::new();
        if let Some(previous) = self.control_message.take() {
            effects.push(Effect::DisableControls(previous));
        }
        effects.push(Effect::SendNowPlaying { track, playback });
        effects
    }

    fn on_track_ended(&mut self, playback: PlaybackId, error: Option<String>) -> Vec<Effect> {
        if self.is_stale(playback) || self.queue.current().is_none() {
            debug!("Fin de track obsoleto ({:?}) en guild {}", playback, self.guild_id);
            return Vec::new();
        }

        let skipped = std::mem::take(&mut self.skip_requested);
        let mut effects = Vec::new();

        if let Some(finished) = self.queue.current().cloned() {
            match &error {
                Some(error) => {
                    warn!("❌ Error en track {}: {}", finished.title, error);
                    effects.push(Effect::Announce(Announcement::TrackFailed {
                        title: finished.title.clone(),
                        error: error.clone(),
                    }));
                }
                None if !skipped => match self.loop_mode {
                    LoopMode::Track => self.queue.requeue(finished, true),
                    LoopMode::Queue => self.queue.requeue(finished, false),
                    LoopMode::Off => {}
                },
                None => {}
            }
        }

        self.queue.advance();
        if self.queue.current().is_some() {
            effects.extend(self.begin_playback());
        } else {
            self.status = PlaybackStatus::Idle;
            effects.extend(self.on_queue_end());
        }
        effects
    }

    fn on_queue_end(&mut self) -> Vec<Effect> {
        if self.manual_stop {
            self.manual_stop = false;
            debug!("Fin de cola tras stop manual en guild {}, sin anuncio", self.guild_id);
            return Vec::new();
        }
        if self.is_destroyed() || self.queue_end_handled || self.queue.current().is_some() {
            return Vec::new();
        }

        self.queue_end_handled = true;
        self.status = PlaybackStatus::Idle;
        info!("📭 Cola terminada en guild {}", self.guild_id);

        let mut effects = vec![Effect::Announce(Announcement::QueueEnded)];
        if let Some(message) = self.control_message.take() {
            effects.push(Effect::DisableControls(message));
        }

        if self.twenty_four_seven {
            info!("🌙 Modo 24/7: la sesión sigue conectada en guild {}", self.guild_id);
        } else {
            self.status = PlaybackStatus::Destroyed;
            effects.push(Effect::Destroy);
            effects.push(Effect::Unregister);
        }
        effects
    }

    fn on_disconnected(&mut self) -> Vec<Effect> {
        // Un Connecting recibe la salida de una sesión anterior del guild.
        if self.is_destroyed() || self.status == PlaybackStatus::Connecting {
            return Vec::new();
        }

        warn!("🔌 Sesión desconectada externamente en guild {}", self.guild_id);
        self.status = PlaybackStatus::Destroyed;
        self.queue.clear();
        self.queue.advance();

        let mut effects = Vec::new();
        if let Some(message) = self.control_message.take() {
            effects.push(Effect::DisableControls(message));
        }
        effects.push(Effect::Announce(Announcement::Disconnected));
        effects.push(Effect::Destroy);
        effects.push(Effect::Unregister);
        effects
    }

    /// Avanza desde un estado sin track actual.
    fn start_next(&mut self) -> Vec<Effect> {
        self.queue.advance();
        self.begin_playback()
    }

    /// Emite la reproducción del `current` ya colocado en la cola.
    fn begin_playback(&mut self) -> Vec<Effect> {
        let Some(track) = self.queue.current().cloned() else {
            self.status = PlaybackStatus::Idle;
            return Vec::new();
        };

        self.playback = self.playback.next();
        self.status = PlaybackStatus::Playing;
        self.skip_requested = false;
        self.queue_end_handled = false;

        vec![Effect::Play {
            track,
            playback: self.playback,
            volume: self.volume,
        }]
    }

    fn require_current(&self) -> Result<(), MusicError> {
        if self.is_destroyed() {
            return Err(MusicError::NothingPlaying);
        }
        match self.queue.current() {
            Some(_) => Ok(()),
            None => Err(MusicError::NotPlaying),
        }
    }

    fn is_stale(&self, playback: PlaybackId) -> bool {
        self.is_destroyed() || playback != self.playback
    }
}

#[cfg(test)]
impl PlaybackSession {
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn control_message(&self) -> Option<MessageId> {
        self.control_message
    }

    pub fn current_playback(&self) -> PlaybackId {
        self.playback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REQUESTER: u64 = 10;

    fn track(title: &str) -> Track {
        Track::new(title, format!("https://example.com/{title}"), UserId::new(REQUESTER))
    }

    fn session() -> PlaybackSession {
        let channels = SessionChannels {
            voice: ChannelId::new(100),
            text: ChannelId::new(200),
        };
        let mut session = PlaybackSession::new(GuildId::new(1), channels, 50, 100);
        session.begin_connect();
        session.mark_connected();
        session
    }

    /// Sesión reproduciendo el primer título con el resto pendiente.
    fn playing(titles: &[&str]) -> PlaybackSession {
        let mut session = session();
        for title in titles {
            session.enqueue_and_maybe_start(track(title)).unwrap();
        }
        session
    }

    fn current_title(session: &PlaybackSession) -> Option<String> {
        session.current_track().map(|t| t.title.clone())
    }

    fn pending_titles(session: &PlaybackSession) -> Vec<String> {
        session.queue().pending().map(|t| t.title.clone()).collect()
    }

    fn end_current(session: &mut PlaybackSession) -> Vec<Effect> {
        let playback = session.current_playback();
        session.handle(SessionEvent::TrackEnded { playback })
    }

    fn announcements(effects: &[Effect]) -> Vec<&Announcement> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Announce(announcement) => Some(announcement),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_enqueue_starts_playback() {
        let mut session = session();
        let (enqueued, effects) = session.enqueue_and_maybe_start(track("a")).unwrap();

        assert_eq!(enqueued, Enqueued::Started);
        assert_eq!(session.status(), PlaybackStatus::Playing);
        assert_eq!(
            effects,
            vec![Effect::Play {
                track: track("a"),
                playback: PlaybackId(1),
                volume: 50,
            }]
        );

        let (enqueued, effects) = session.enqueue_and_maybe_start(track("b")).unwrap();
        assert_eq!(enqueued, Enqueued::Queued { position: 0 });
        assert!(effects.is_empty());
    }

    #[test]
    fn enqueue_while_connecting_waits_for_connection() {
        let channels = SessionChannels {
            voice: ChannelId::new(100),
            text: ChannelId::new(200),
        };
        let mut session = PlaybackSession::new(GuildId::new(1), channels, 50, 100);

        assert_eq!(session.begin_connect(), Some(ChannelId::new(100)));
        assert_eq!(session.status(), PlaybackStatus::Connecting);
        assert_eq!(session.begin_connect(), None);

        let (enqueued, effects) = session.enqueue_and_maybe_start(track("a")).unwrap();
        assert_eq!(enqueued, Enqueued::Queued { position: 0 });
        assert!(effects.is_empty());

        let effects = session.mark_connected();
        assert!(matches!(effects.as_slice(), [Effect::Play { .. }]));
        assert_eq!(current_title(&session), Some("a".into()));
    }

    #[test]
    fn stop_during_connect_releases_voice() {
        let channels = SessionChannels {
            voice: ChannelId::new(100),
            text: ChannelId::new(200),
        };
        let mut session = PlaybackSession::new(GuildId::new(1), channels, 50, 100);
        session.enqueue_and_maybe_start(track("a")).unwrap();
        session.begin_connect();
        session.stop();

        assert_eq!(session.mark_connected(), vec![Effect::Destroy]);
        assert!(session.is_destroyed());
    }

    #[test]
    fn connection_failure_destroys_session() {
        let channels = SessionChannels {
            voice: ChannelId::new(100),
            text: ChannelId::new(200),
        };
        let mut session = PlaybackSession::new(GuildId::new(1), channels, 50, 100);
        session.begin_connect();
        session.enqueue_and_maybe_start(track("a")).unwrap();

        assert_eq!(
            session.connection_failed(),
            vec![Effect::Destroy, Effect::Unregister]
        );
        assert!(session.is_destroyed());
    }

    #[test]
    fn pause_and_resume_toggle_status() {
        let mut session = playing(&["a"]);

        assert_eq!(session.pause(), Ok(vec![Effect::Pause(true)]));
        assert_eq!(session.status(), PlaybackStatus::Paused);
        assert_eq!(session.pause(), Ok(vec![]));

        assert_eq!(session.resume(), Ok(vec![Effect::Pause(false)]));
        assert_eq!(session.status(), PlaybackStatus::Playing);

        let (paused, _) = session.toggle_pause().unwrap();
        assert!(paused);
    }

    #[test]
    fn pause_without_current_is_not_playing() {
        let mut session = session();
        assert_eq!(session.pause(), Err(MusicError::NotPlaying));
        assert_eq!(session.resume(), Err(MusicError::NotPlaying));
    }

    #[test]
    fn skip_does_not_touch_queue() {
        let mut session = playing(&["a", "b"]);
        let (skipped, effects) = session.skip().unwrap();

        assert_eq!(skipped.title, "a");
        assert_eq!(effects, vec![Effect::StopTrack]);
        assert_eq!(current_title(&session), Some("a".into()));
        assert_eq!(pending_titles(&session), vec!["b"]);
    }

    #[test]
    fn skip_and_track_end_race_advances_once() {
        let mut session = playing(&["a", "b", "c"]);
        let playback = session.current_playback();

        session.skip().unwrap();
        let effects = session.handle(SessionEvent::TrackEnded { playback });
        assert!(matches!(effects.as_slice(), [Effect::Play { .. }]));

        // El nodo repite el fin de la misma reproducción.
        let effects = session.handle(SessionEvent::TrackEnded { playback });
        assert!(effects.is_empty());
        let effects = session.handle(SessionEvent::TrackErrored {
            playback,
            error: "late".into(),
        });
        assert!(effects.is_empty());

        assert_eq!(current_title(&session), Some("b".into()));
        assert_eq!(pending_titles(&session), vec!["c"]);
    }

    #[test]
    fn loop_track_repeats_same_track() {
        let mut session = playing(&["a", "b"]);
        session.set_loop_mode(LoopMode::Track);

        for _ in 0..5 {
            let effects = end_current(&mut session);
            assert!(matches!(effects.as_slice(), [Effect::Play { track, .. }] if track.title == "a"));
            assert_eq!(current_title(&session), Some("a".into()));
            assert_eq!(session.queue().len(), 1);
        }
    }

    #[test]
    fn loop_queue_rotates_tracks() {
        let mut session = playing(&["a", "b"]);
        session.set_loop_mode(LoopMode::Queue);

        end_current(&mut session);
        assert_eq!(current_title(&session), Some("b".into()));
        assert_eq!(pending_titles(&session), vec!["a"]);

        end_current(&mut session);
        assert_eq!(current_title(&session), Some("a".into()));
        assert_eq!(pending_titles(&session), vec!["b"]);
    }

    #[test]
    fn skip_bypasses_track_loop() {
        let mut session = playing(&["a", "b"]);
        session.set_loop_mode(LoopMode::Track);

        session.skip().unwrap();
        end_current(&mut session);
        assert_eq!(current_title(&session), Some("b".into()));
        assert!(session.queue().is_empty());

        // El loop sigue activo para la pista siguiente.
        end_current(&mut session);
        assert_eq!(current_title(&session), Some("b".into()));
    }

    #[test]
    fn track_error_advances_without_retry() {
        let mut session = playing(&["a", "b"]);
        session.set_loop_mode(LoopMode::Track);
        let playback = session.current_playback();

        let effects = session.handle(SessionEvent::TrackErrored {
            playback,
            error: "403".into(),
        });

        assert_eq!(
            announcements(&effects),
            vec![&Announcement::TrackFailed {
                title: "a".into(),
                error: "403".into(),
            }]
        );
        assert_eq!(current_title(&session), Some("b".into()));
        assert!(session.queue().is_empty());
    }

    #[test]
    fn track_start_replaces_control_message() {
        let mut session = playing(&["a", "b"]);
        let first = session.current_playback();

        let effects = session.handle(SessionEvent::TrackStarted { playback: first });
        assert!(matches!(effects.as_slice(), [Effect::SendNowPlaying { .. }]));
        assert_eq!(session.attach_control_message(first, MessageId::new(1)), None);

        end_current(&mut session);
        let second = session.current_playback();
        let effects = session.handle(SessionEvent::TrackStarted { playback: second });
        assert_eq!(
            effects,
            vec![
                Effect::DisableControls(MessageId::new(1)),
                Effect::SendNowPlaying {
                    track: track("b"),
                    playback: second,
                },
            ]
        );
        assert_eq!(session.attach_control_message(second, MessageId::new(2)), None);
        assert_eq!(session.control_message(), Some(MessageId::new(2)));
    }

    #[test]
    fn stale_control_message_is_disabled_on_arrival() {
        let mut session = playing(&["a"]);
        let playback = session.current_playback();
        session.handle(SessionEvent::TrackStarted { playback });

        // La cola termina mientras el mensaje se estaba enviando.
        session.set_twenty_four_seven(true);
        end_current(&mut session);

        assert_eq!(
            session.attach_control_message(playback, MessageId::new(9)),
            Some(MessageId::new(9))
        );
        assert_eq!(session.control_message(), None);
    }

    #[test]
    fn exhaustion_without_247_tears_down() {
        let mut session = playing(&["a"]);
        let playback = session.current_playback();
        session.handle(SessionEvent::TrackStarted { playback });
        session.attach_control_message(playback, MessageId::new(5));

        let effects = end_current(&mut session);

        assert_eq!(
            effects,
            vec![
                Effect::Announce(Announcement::QueueEnded),
                Effect::DisableControls(MessageId::new(5)),
                Effect::Destroy,
                Effect::Unregister,
            ]
        );
        assert!(session.is_destroyed());
    }

    #[test]
    fn exhaustion_with_247_stays_idle() {
        let mut session = playing(&["a"]);
        session.toggle_twenty_four_seven();

        let effects = end_current(&mut session);

        assert!(!effects.contains(&Effect::Unregister));
        assert!(!effects.contains(&Effect::Destroy));
        assert_eq!(session.status(), PlaybackStatus::Idle);

        // Un aviso de fin de cola del nodo no vuelve a anunciar.
        assert!(session.handle(SessionEvent::QueueEnded).is_empty());

        // Y la sesión puede volver a reproducir.
        let (enqueued, effects) = session.enqueue_and_maybe_start(track("b")).unwrap();
        assert_eq!(enqueued, Enqueued::Started);
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn stop_then_queue_end_announces_once() {
        let mut session = playing(&["a", "b"]);
        let playback = session.current_playback();

        let mut effects = session.stop();
        effects.extend(session.handle(SessionEvent::QueueEnded));
        effects.extend(session.handle(SessionEvent::TrackEnded { playback }));
        effects.extend(session.stop());

        assert_eq!(announcements(&effects), vec![&Announcement::Stopped]);
        assert_eq!(effects.iter().filter(|e| **e == Effect::Unregister).count(), 1);
        assert!(session.is_destroyed());
        assert!(session.current_track().is_none());
    }

    #[test]
    fn stop_disables_live_controls() {
        let mut session = playing(&["a"]);
        let playback = session.current_playback();
        session.handle(SessionEvent::TrackStarted { playback });
        session.attach_control_message(playback, MessageId::new(3));

        let effects = session.stop();
        assert_eq!(effects[0], Effect::DisableControls(MessageId::new(3)));
        assert_eq!(session.control_message(), None);
    }

    #[test]
    fn volume_is_validated() {
        let mut session = playing(&["a"]);

        assert_eq!(session.set_volume(150), Err(MusicError::OutOfRange));
        assert_eq!(session.set_volume(-1), Err(MusicError::OutOfRange));
        assert_eq!(session.volume(), 50);

        assert_eq!(session.set_volume(50), Ok(vec![Effect::SetVolume(50)]));
        assert_eq!(session.volume(), 50);
        assert_eq!(session.set_volume(100), Ok(vec![Effect::SetVolume(100)]));
        assert_eq!(session.volume(), 100);
    }

    #[test]
    fn only_requester_is_authorized() {
        let mut session = session();
        assert_eq!(session.authorize(UserId::new(REQUESTER)), Err(MusicError::NothingPlaying));

        session.enqueue_and_maybe_start(track("a")).unwrap();
        assert_eq!(session.authorize(UserId::new(REQUESTER)), Ok(()));
        assert_eq!(session.authorize(UserId::new(99)), Err(MusicError::NotAuthorized));
    }

    #[test]
    fn authorization_follows_current_track() {
        let mut session = session();
        session.enqueue_and_maybe_start(track("a")).unwrap();
        session
            .enqueue_and_maybe_start(Track::new("b", "https://example.com/b", UserId::new(77)))
            .unwrap();

        end_current(&mut session);
        assert_eq!(session.authorize(UserId::new(REQUESTER)), Err(MusicError::NotAuthorized));
        assert_eq!(session.authorize(UserId::new(77)), Ok(()));
    }

    #[test]
    fn disconnect_tears_down_once() {
        let mut session = playing(&["a"]);
        let effects = session.handle(SessionEvent::Disconnected);

        assert_eq!(announcements(&effects), vec![&Announcement::Disconnected]);
        assert!(effects.contains(&Effect::Unregister));
        assert!(session.handle(SessionEvent::Disconnected).is_empty());
    }

    #[test]
    fn loop_mode_parses_and_toggles() {
        assert_eq!("Track".parse::<LoopMode>().unwrap(), LoopMode::Track);
        assert!("forever".parse::<LoopMode>().is_err());
        assert_eq!(LoopMode::Off.toggled(), LoopMode::Queue);
        assert_eq!(LoopMode::Track.toggled(), LoopMode::Off);
    }
}
