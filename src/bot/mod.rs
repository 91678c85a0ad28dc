//! # Bot Module
//!
//! Discord gateway integration for the jukebox.
//!
//! This module contains:
//! - Slash command registration ([`commands`])
//! - Command and button routing ([`handlers`])
//! - Songbird event handlers that feed the session dispatcher ([`events`])
//!
//! ## Architecture
//!
//! [`MusicBot`] implements Serenity's [`EventHandler`]. Interactions are routed
//! to the shared [`AudioPlayer`]; voice-state changes for the bot itself are
//! turned into session events so an external disconnect tears the session
//! down through the same path as node events.

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::{sync::Arc, time::Instant};
use tracing::{error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;

use crate::{
    audio::{
        node::{NodeEvent, NodeEventSender},
        player::AudioPlayer,
        session::SessionEvent,
    },
    config::Config,
    sources::TrackSearch,
};

/// Main Discord bot handler.
///
/// ## Fields
///
/// - `config`: Bot configuration
/// - `player`: Session registry plus playback operations
/// - `search`: Query resolution for `/play`
/// - `events`: Sender into the sequential session event dispatcher
pub struct MusicBot {
    pub config: Arc<Config>,
    pub player: Arc<AudioPlayer>,
    pub search: Arc<dyn TrackSearch>,
    events: NodeEventSender,
    pub started: Instant,
}

impl MusicBot {
    pub fn new(
        config: Arc<Config>,
        player: Arc<AudioPlayer>,
        search: Arc<dyn TrackSearch>,
        events: NodeEventSender,
    ) -> Self {
        Self {
            config,
            player,
            search,
            events,
            started: Instant::now(),
        }
    }

    /// Registers slash commands with Discord.
    ///
    /// Guild commands (`GUILD_ID`) propagate in about a second; global
    /// commands can take up to an hour.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                commands::register_guild_commands(ctx, guild_id).await.map_err(|e| {
                    error!("❌ Error registrando comandos de guild: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for MusicBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await
                {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }

    /// Detecta cuando el bot es sacado del canal de voz.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || new.channel_id.is_some() || old.is_none() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            let event = NodeEvent {
                guild_id,
                event: SessionEvent::Disconnected,
            };
            if self.events.send(event).is_err() {
                warn!("⚠️ Despachador de eventos cerrado");
            }
        }
    }
}
