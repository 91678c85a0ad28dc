use dashmap::{mapref::entry::Entry, DashMap};
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info};

use crate::audio::session::{PlaybackSession, SessionChannels, SharedSession};

/// Sesiones activas, a lo sumo una por guild.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, SharedSession>,
    default_volume: u8,
    max_queue_size: usize,
}

impl SessionRegistry {
    pub fn new(default_volume: u8, max_queue_size: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            default_volume,
            max_queue_size,
        }
    }

    /// Devuelve la sesión del guild, creándola si no existe. El `bool` indica
    /// si fue creada en esta llamada. Una sesión destruida que todavía no se
    /// desregistró se reemplaza.
    pub fn get_or_create(
        &self,
        guild_id: GuildId,
        channels: SessionChannels,
    ) -> (SharedSession, bool) {
        match self.sessions.entry(guild_id) {
            Entry::Occupied(mut entry) => {
                if !entry.get().lock().is_destroyed() {
                    return (entry.get().clone(), false);
                }
                let session = self.new_session(guild_id, channels);
                entry.insert(session.clone());
                debug!("♻️ Sesión destruida reemplazada en guild {}", guild_id);
                (session, true)
            }
            Entry::Vacant(entry) => {
                let session = self.new_session(guild_id, channels);
                entry.insert(session.clone());
                (session, true)
            }
        }
    }

    fn new_session(&self, guild_id: GuildId, channels: SessionChannels) -> SharedSession {
        info!("🎵 Nueva sesión creada para guild {}", guild_id);
        PlaybackSession::new(guild_id, channels, self.default_volume, self.max_queue_size).shared()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<SharedSession> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// Quita la sesión solo si sigue siendo la misma instancia registrada;
    /// una sesión nueva del mismo guild no se ve afectada.
    pub fn remove(&self, guild_id: GuildId, session: &SharedSession) -> bool {
        let removed = self
            .sessions
            .remove_if(&guild_id, |_, current| Arc::ptr_eq(current, session))
            .is_some();

        if removed {
            info!("🗑️ Sesión eliminada para guild {}", guild_id);
        } else {
            debug!("Sesión de guild {} ya no estaba registrada", guild_id);
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::model::id::ChannelId;

    fn channels() -> SessionChannels {
        SessionChannels {
            voice: ChannelId::new(1),
            text: ChannelId::new(2),
        }
    }

    #[test]
    fn one_session_per_guild() {
        let registry = SessionRegistry::new(50, 10);
        let (first, created) = registry.get_or_create(GuildId::new(7), channels());
        assert!(created);

        let (second, created) = registry.get_or_create(GuildId::new(7), channels());
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.session_count(), 1);

        registry.get_or_create(GuildId::new(8), channels());
        assert_eq!(registry.session_count(), 2);
    }

    #[test]
    fn new_sessions_use_configured_volume() {
        let registry = SessionRegistry::new(35, 10);
        let (session, _) = registry.get_or_create(GuildId::new(7), channels());
        assert_eq!(session.lock().volume(), 35);
    }

    #[test]
    fn destroyed_session_is_replaced() {
        let registry = SessionRegistry::new(50, 10);
        let guild = GuildId::new(7);
        let (old, _) = registry.get_or_create(guild, channels());
        old.lock().stop();

        let (fresh, created) = registry.get_or_create(guild, channels());
        assert!(created);
        assert!(!Arc::ptr_eq(&old, &fresh));

        // El Unregister pendiente de la sesión vieja no afecta a la nueva.
        assert!(!registry.remove(guild, &old));
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn remove_ignores_replaced_session() {
        let registry = SessionRegistry::new(50, 10);
        let guild = GuildId::new(7);
        let (old, _) = registry.get_or_create(guild, channels());

        assert!(registry.remove(guild, &old));
        assert!(registry.get(guild).is_none());

        let (fresh, created) = registry.get_or_create(guild, channels());
        assert!(created);

        // Un teardown tardío de la sesión anterior no borra la nueva.
        assert!(!registry.remove(guild, &old));
        assert!(registry
            .get(guild)
            .is_some_and(|current| Arc::ptr_eq(&current, &fresh)));
    }
}
