use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::audio::{
    queue::QueueInfo,
    session::{Announcement, LoopMode},
    track::{format_duration, Track},
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

const STANDARD_FOOTER: &str = "🎵 Guild Jukebox";

pub const QUEUE_PAGE_SIZE: usize = 10;

fn duration_label(track: &Track) -> String {
    if track.is_stream() {
        "🔴 Live".to_string()
    } else {
        format_duration(track.duration)
    }
}

/// Embed del mensaje de controles
pub fn create_now_playing_embed(track: &Track) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Now Playing")
        .description(format!("**[{}]({})**", track.title, track.uri))
        .color(colors::MUSIC_PURPLE)
        .field("🎤 Author", &track.author, true)
        .field("⏱️ Duration", duration_label(track), true)
        .field("👤 Requested by", format!("<@{}>", track.requester), true);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_track_added_embed(track: &Track, position: usize) -> CreateEmbed {
    CreateEmbed::default()
        .title("✅ Added to Queue")
        .description(format!("**[{}]({})**", track.title, track.uri))
        .color(colors::SUCCESS_GREEN)
        .field("⏱️ Duration", duration_label(track), true)
        .field("📍 Position", format!("#{}", position + 1), true)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_queue_embed(queue_info: &QueueInfo, loop_mode: LoopMode, page: usize) -> CreateEmbed {
    let queue_page = queue_info.page(page, QUEUE_PAGE_SIZE);

    let mut embed = CreateEmbed::default()
        .title("📋 Queue")
        .color(colors::INFO_BLUE);

    if queue_info.current.is_none() && queue_info.items.is_empty() {
        return embed
            .description("😴 **The queue is empty**\n\n💡 Use `/play <song>` to add music")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER));
    }

    if let Some(current) = &queue_info.current {
        let status = match loop_mode {
            LoopMode::Track => "🔂",
            LoopMode::Queue => "🔁",
            LoopMode::Off => "▶️",
        };
        embed = embed.field(
            format!("{} Now Playing", status),
            format!("**{}** `[{}]`", current.title, duration_label(current)),
            false,
        );
    }

    if !queue_page.items.is_empty() {
        let description = queue_page
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                format!(
                    "**{}**. {} `[{}]`",
                    queue_page.offset + i + 1,
                    item.title,
                    duration_label(item)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        embed = embed.field("Up Next", description, false);
    }

    let mut info = format!("**Total:** {} tracks", queue_info.items.len());
    if queue_info.total_duration > Duration::ZERO {
        info.push_str(&format!(
            " • **Duration:** {}",
            format_duration(queue_info.total_duration)
        ));
    }
    embed = embed.field("Info", info, false);

    embed.footer(CreateEmbedFooter::new(format!(
        "Page {} of {} • Guild Jukebox",
        queue_page.current_page, queue_page.total_pages
    )))
}

/// Texto público de cada anuncio de sesión.
pub fn create_announcement_embed(announcement: &Announcement) -> CreateEmbed {
    let (title, description, color) = match announcement {
        Announcement::QueueEnded => (
            "📭 Queue has ended!",
            "Add more songs with `/play`.".to_string(),
            colors::NEUTRAL_GRAY,
        ),
        Announcement::Stopped => (
            "⏹️ Stopped",
            "Playback stopped and the queue was cleared.".to_string(),
            colors::WARNING_ORANGE,
        ),
        Announcement::TrackFailed { title, error } => (
            "⚠️ Track failed",
            format!("Could not play **{}**: {}", title, error),
            colors::ERROR_RED,
        ),
        Announcement::Disconnected => (
            "🔌 Disconnected",
            "I was removed from the voice channel, so the session was closed.".to_string(),
            colors::WARNING_ORANGE,
        ),
    };

    CreateEmbed::default()
        .title(title)
        .description(description)
        .color(color)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_help_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("🎵 Guild Jukebox - Commands")
        .color(colors::INFO_BLUE)
        .field(
            "🎵 Playback",
            "• `/play <query>` - Play a song or add it to the queue\n\
            • `/pause` - Pause playback\n\
            • `/resume` - Resume playback\n\
            • `/skip` - Skip the current song\n\
            • `/stop` - Stop and clear the queue\n\
            • `/nowplaying` - Show the current song",
            false,
        )
        .field(
            "📜 Queue",
            "• `/queue [page]` - Show the queue\n\
            • `/shuffle` - Shuffle upcoming songs\n\
            • `/loop <off|track|queue>` - Set repeat mode\n\
            • `/remove <position>` - Remove a song\n\
            • `/move <from> <to>` - Move a song\n\
            • `/clearqueue` - Clear upcoming songs",
            false,
        )
        .field(
            "⚙️ Settings",
            "• `/volume <0-100>` - Set the volume\n\
            • `/247` - Toggle 24/7 mode",
            false,
        )
        .field(
            "ℹ️ Info",
            "• `/ping` • `/stats` • `/invite` • `/support`",
            false,
        )
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_stats_embed(uptime: Duration, sessions: usize, guilds: usize) -> CreateEmbed {
    let uptime = humantime::format_duration(Duration::from_secs(uptime.as_secs()));

    CreateEmbed::default()
        .title("📊 Stats")
        .color(colors::INFO_BLUE)
        .field("⏱️ Uptime", uptime.to_string(), true)
        .field("🎧 Active sessions", sessions.to_string(), true)
        .field("🏠 Servers", guilds.to_string(), true)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_info_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(title)
        .description(description)
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}
