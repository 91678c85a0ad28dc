use anyhow::Result;
use serenity::{
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseFollowup,
        CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::{CommandInteraction, ComponentInteraction},
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::time::Instant;
use tracing::{error, info};

use crate::{
    audio::session::{Enqueued, LoopMode, SessionChannels},
    bot::MusicBot,
    error::{user_message, MusicError},
    ui::{
        buttons::ControlButton,
        embeds::{self, colors},
    },
};

/// Respuesta única de una interacción.
pub struct Reply {
    content: Option<String>,
    embed: Option<CreateEmbed>,
    ephemeral: bool,
}

impl Reply {
    fn embed(embed: CreateEmbed) -> Self {
        Self {
            content: None,
            embed: Some(embed),
            ephemeral: false,
        }
    }

    fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embed: None,
            ephemeral: false,
        }
    }

    fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            ephemeral: true,
            ..Self::text(content)
        }
    }

    fn ephemeral_embed(embed: CreateEmbed) -> Self {
        Self {
            ephemeral: true,
            ..Self::embed(embed)
        }
    }

    fn status(description: impl Into<String>) -> Self {
        Self::embed(
            CreateEmbed::default()
                .description(description)
                .color(colors::MUSIC_PURPLE),
        )
    }

    /// Errores de usuario se muestran tal cual; el resto se registra y se
    /// oculta detrás del mensaje genérico.
    fn failure(error: &anyhow::Error, source: &str) -> Self {
        if error.downcast_ref::<MusicError>().is_none() {
            error!("❌ Error en {}: {:?}", source, error);
        }
        Self::ephemeral(user_message(error))
    }

    fn into_message(self) -> CreateInteractionResponseMessage {
        let mut message = CreateInteractionResponseMessage::new().ephemeral(self.ephemeral);
        if let Some(content) = self.content {
            message = message.content(content);
        }
        if let Some(embed) = self.embed {
            message = message.embed(embed);
        }
        message
    }

    fn into_followup(self) -> CreateInteractionResponseFollowup {
        let mut followup = CreateInteractionResponseFollowup::new().ephemeral(self.ephemeral);
        if let Some(content) = self.content {
            followup = followup.content(content);
        }
        if let Some(embed) = self.embed {
            followup = followup.embed(embed);
        }
        followup
    }

    fn into_edit(self) -> EditInteractionResponse {
        let mut edit = EditInteractionResponse::new();
        if let Some(content) = self.content {
            edit = edit.content(content);
        }
        if let Some(embed) = self.embed {
            edit = edit.embed(embed);
        }
        edit
    }
}

/// Convierte una posición 1-based del usuario al índice interno.
pub fn to_index(position: i64) -> Result<usize, MusicError> {
    usize::try_from(position)
        .ok()
        .and_then(|position| position.checked_sub(1))
        .ok_or(MusicError::InvalidPosition)
}

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn int_option(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_i64())
}

fn required_int(command: &CommandInteraction, name: &str) -> Result<i64> {
    int_option(command, name).ok_or_else(|| anyhow::anyhow!("Opción {} no proporcionada", name))
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Result<ChannelId, MusicError> {
    guild_id
        .to_guild_cached(&ctx.cache)
        .and_then(|guild| guild.voice_states.get(&user_id).and_then(|state| state.channel_id))
        .ok_or(MusicError::NotInVoice)
}

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &MusicBot) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        return send_reply(ctx, &command, Reply::ephemeral("❌ Commands only work in a server."), false)
            .await;
    };

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let mut deferred = false;
    let outcome = match command.data.name.as_str() {
        "play" => handle_play(ctx, &command, bot, guild_id, &mut deferred).await,
        _ => run_command(ctx, &command, bot, guild_id).await,
    };

    let reply = outcome.unwrap_or_else(|e| Reply::failure(&e, &format!("/{}", command.data.name)));
    send_reply(ctx, &command, reply, deferred).await
}

/// Cómo entregar una respuesta según el estado de la interacción.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Respond,
    EditDeferred,
    /// El defer es público: se borra y la respuesta va como followup efímero.
    ReplaceDeferred,
}

impl Delivery {
    fn for_reply(reply: &Reply, deferred: bool) -> Self {
        match (deferred, reply.ephemeral) {
            (false, _) => Delivery::Respond,
            (true, false) => Delivery::EditDeferred,
            (true, true) => Delivery::ReplaceDeferred,
        }
    }
}

async fn send_reply(ctx: &Context, command: &CommandInteraction, reply: Reply, deferred: bool) -> Result<()> {
    match Delivery::for_reply(&reply, deferred) {
        Delivery::Respond => {
            command
                .create_response(&ctx.http, CreateInteractionResponse::Message(reply.into_message()))
                .await?;
        }
        Delivery::EditDeferred => {
            command.edit_response(&ctx.http, reply.into_edit()).await?;
        }
        Delivery::ReplaceDeferred => {
            command.delete_response(&ctx.http).await?;
            command.create_followup(&ctx.http, reply.into_followup()).await?;
        }
    }
    Ok(())
}

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MusicBot,
    guild_id: GuildId,
    deferred: &mut bool,
) -> Result<Reply> {
    let voice = user_voice_channel(ctx, guild_id, command.user.id)?;
    let query = string_option(command, "query")
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?;

    // La búsqueda puede tardar más que el límite de respuesta
    command.defer(&ctx.http).await?;
    *deferred = true;

    let track = bot.search.resolve(query, command.user.id).await?;
    let channels = SessionChannels {
        voice,
        text: command.channel_id,
    };

    let reply = match bot.player.play(guild_id, channels, track.clone()).await? {
        Enqueued::Started => Reply::status(format!("🎵 Starting **[{}]({})**", track.title, track.uri)),
        Enqueued::Queued { position } => Reply::embed(embeds::create_track_added_embed(&track, position)),
    };
    Ok(reply)
}

async fn run_command(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MusicBot,
    guild_id: GuildId,
) -> Result<Reply> {
    let player = &bot.player;

    let reply = match command.data.name.as_str() {
        "pause" => {
            player.pause(guild_id).await?;
            Reply::status("⏸️ Paused")
        }
        "resume" => {
            player.resume(guild_id).await?;
            Reply::status("▶️ Resumed")
        }
        "skip" => {
            let skipped = player.skip(guild_id).await?;
            Reply::status(format!("⏭️ Skipped **{}**", skipped.title))
        }
        "stop" => {
            player.stop(guild_id).await?;
            Reply::ephemeral("⏹️ Stopped the music and left")
        }
        "queue" => {
            let page = int_option(command, "page").unwrap_or(1).max(1) as usize;
            let (info, loop_mode) = player.queue_info(guild_id)?;
            Reply::embed(embeds::create_queue_embed(&info, loop_mode, page))
        }
        "nowplaying" => {
            let track = player.now_playing(guild_id)?;
            Reply::embed(embeds::create_now_playing_embed(&track))
        }
        "shuffle" => {
            player.shuffle(guild_id)?;
            Reply::status("🔀 Shuffled the queue")
        }
        "loop" => {
            let mode: LoopMode = string_option(command, "mode").unwrap_or("off").parse()?;
            player.set_loop_mode(guild_id, mode)?;
            Reply::status(format!("🔄 Loop mode set to: {}", mode))
        }
        "remove" => {
            let position = to_index(required_int(command, "position")?)?;
            let removed = player.remove(guild_id, position)?;
            Reply::status(format!("❌ Removed [{}]({})", removed.title, removed.uri))
        }
        "move" => {
            let from = to_index(required_int(command, "from")?)?;
            let to = to_index(required_int(command, "to")?)?;
            let moved = player.move_track(guild_id, from, to)?;
            Reply::status(format!(
                "📦 Moved [{}]({}) to position {}",
                moved.title,
                moved.uri,
                to + 1
            ))
        }
        "clearqueue" => {
            let removed = player.clear_queue(guild_id)?;
            Reply::status(format!("🗑️ Cleared the queue ({} songs)", removed))
        }
        "volume" => {
            let level = required_int(command, "level")?;
            player.set_volume(guild_id, level).await?;
            Reply::text(format!("🔊 Volume set to {}%", level))
        }
        "247" => {
            let enabled = player.toggle_twenty_four_seven(guild_id)?;
            Reply::status(format!(
                "🎵 24/7 mode is now {}",
                if enabled { "enabled" } else { "disabled" }
            ))
        }
        "help" => Reply::embed(embeds::create_help_embed()),
        "invite" => {
            let bot_id = ctx.cache.current_user().id;
            Reply::embed(embeds::create_info_embed(
                "📨 Invite Me",
                &format!(
                    "[Click here to invite me to your server](https://discord.com/api/oauth2/authorize?client_id={}&permissions=3164160&scope=bot%20applications.commands)",
                    bot_id
                ),
            ))
        }
        "ping" => {
            let start = Instant::now();
            ctx.http.get_current_user().await?;
            Reply::embed(embeds::create_info_embed(
                "🏓 Pong!",
                &format!("REST latency: {}ms", start.elapsed().as_millis()),
            ))
        }
        "stats" => Reply::embed(embeds::create_stats_embed(
            bot.started.elapsed(),
            player.active_sessions(),
            ctx.cache.guild_count(),
        )),
        "support" => match &bot.config.support_url {
            Some(url) => Reply::embed(embeds::create_info_embed(
                "💬 Support Server",
                &format!("[Click here to join our support server]({})", url),
            )),
            None => Reply::ephemeral("💬 No support server is configured."),
        },
        _ => Reply::ephemeral("❌ Unknown command"),
    };

    Ok(reply)
}

/// Maneja interacciones con componentes (botones)
pub async fn handle_component(ctx: &Context, component: ComponentInteraction, bot: &MusicBot) -> Result<()> {
    info!(
        "🔘 Botón {} presionado por {}",
        component.data.custom_id, component.user.name
    );

    let reply = match run_button(ctx, &component, bot).await {
        Ok(reply) => reply,
        Err(e) => Reply::failure(&e, &format!("botón {}", component.data.custom_id)),
    };

    component
        .create_response(&ctx.http, CreateInteractionResponse::Message(reply.into_message()))
        .await?;
    Ok(())
}

async fn run_button(ctx: &Context, component: &ComponentInteraction, bot: &MusicBot) -> Result<Reply> {
    let Some(button) = ControlButton::from_custom_id(&component.data.custom_id) else {
        return Ok(Reply::ephemeral("❌ Unknown action"));
    };
    let guild_id = component.guild_id.ok_or(MusicError::NothingPlaying)?;

    user_voice_channel(ctx, guild_id, component.user.id)?;
    // Se verifica en cada click contra el track actual.
    bot.player.authorize(guild_id, component.user.id)?;

    let reply = match button {
        ControlButton::Pause => {
            let paused = bot.player.toggle_pause(guild_id).await?;
            Reply::ephemeral(if paused { "⏸️ Paused" } else { "▶️ Resumed" })
        }
        ControlButton::Skip => {
            bot.player.skip(guild_id).await?;
            Reply::ephemeral("⏭️ Skipped")
        }
        ControlButton::Stop => {
            bot.player.stop(guild_id).await?;
            Reply::ephemeral("⏹️ Stopped")
        }
        ControlButton::Loop => {
            let mode = bot.player.toggle_loop(guild_id)?;
            Reply::ephemeral(format!(
                "🔁 Loop: {}",
                if mode == LoopMode::Off { "Disabled" } else { "Enabled" }
            ))
        }
        ControlButton::Queue => {
            let (info, loop_mode) = bot.player.queue_info(guild_id)?;
            Reply::ephemeral_embed(embeds::create_queue_embed(&info, loop_mode, 1))
        }
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        assert_eq!(to_index(1), Ok(0));
        assert_eq!(to_index(12), Ok(11));
        assert_eq!(to_index(0), Err(MusicError::InvalidPosition));
        assert_eq!(to_index(-3), Err(MusicError::InvalidPosition));
    }

    #[test]
    fn user_errors_become_ephemeral_text() {
        let reply = Reply::failure(&MusicError::NotAuthorized.into(), "test");
        assert!(reply.ephemeral);
        assert_eq!(
            reply.content.as_deref(),
            Some("🚫 Only the person who requested this song can use these buttons!")
        );

        let reply = Reply::failure(&anyhow::anyhow!("boom"), "test");
        assert_eq!(reply.content.as_deref(), Some(crate::error::GENERIC_FAILURE));
    }

    #[test]
    fn failures_after_defer_stay_ephemeral() {
        let failure = Reply::failure(&MusicError::TrackLoadFailed("no matches".into()).into(), "/play");
        assert_eq!(Delivery::for_reply(&failure, true), Delivery::ReplaceDeferred);
        assert_eq!(Delivery::for_reply(&failure, false), Delivery::Respond);

        let queued = Reply::status("🎵 Starting");
        assert_eq!(Delivery::for_reply(&queued, true), Delivery::EditDeferred);
        assert_eq!(Delivery::for_reply(&queued, false), Delivery::Respond);
    }

    #[test]
    fn unknown_loop_mode_is_generic_failure() {
        let err = "sometimes".parse::<LoopMode>().unwrap_err();
        let reply = Reply::failure(&err, "/loop");
        assert_eq!(reply.content.as_deref(), Some(crate::error::GENERIC_FAILURE));
    }
}
