use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    serenity::model::application::Command::set_global_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

pub fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        simple("pause", "Pause the current song"),
        simple("resume", "Resume the current song"),
        simple("skip", "Skip the current song"),
        simple("stop", "Stop playback, clear the queue and leave"),
        queue_command(),
        simple("nowplaying", "Show the current song"),
        simple("shuffle", "Shuffle the upcoming songs"),
        loop_command(),
        position_command("remove", "Remove a song from the queue", "position"),
        move_command(),
        simple("clearqueue", "Clear the upcoming songs"),
        volume_command(),
        simple("247", "Toggle 24/7 mode"),
        simple("help", "Show all commands"),
        simple("invite", "Get the invite link"),
        simple("ping", "Check the bot latency"),
        simple("stats", "Show bot statistics"),
        simple("support", "Get the support server link"),
    ]
}

fn simple(name: &str, description: &str) -> CreateCommand {
    CreateCommand::new(name).description(description)
}

// Comandos con opciones

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play a song or add it to the queue")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "Song name or URL")
                .required(true),
        )
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue")
        .description("Show the queue")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "page", "Page number")
                .min_int_value(1),
        )
}

fn loop_command() -> CreateCommand {
    CreateCommand::new("loop")
        .description("Set the repeat mode")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "mode", "Repeat mode")
                .required(true)
                .add_string_choice("Off", "off")
                .add_string_choice("Track", "track")
                .add_string_choice("Queue", "queue"),
        )
}

fn position_command(name: &str, description: &str, option: &str) -> CreateCommand {
    CreateCommand::new(name).description(description).add_option(
        CreateCommandOption::new(CommandOptionType::Integer, option, "Position in the queue")
            .required(true),
    )
}

fn move_command() -> CreateCommand {
    CreateCommand::new("move")
        .description("Move a song to another position")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "from", "Current position")
                .required(true),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "to", "New position")
                .required(true),
        )
}

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Set the volume")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "level", "Volume level (0-100)")
                .required(true),
        )
}
