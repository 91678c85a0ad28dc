use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;

use crate::{
    audio::{
        node::event_channel, player::AudioPlayer, registry::SessionRegistry,
        songbird_node::SongbirdNode,
    },
    bot::MusicBot,
    config::Config,
    sources::YtDlpSearch,
    ui::DiscordControls,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_jukebox=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Guild Jukebox v{}", env!("CARGO_PKG_VERSION"));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    // Audio: songbird como nodo, eventos repartidos por guild
    let songbird = Songbird::serenity();
    let (events_tx, events_rx) = event_channel();
    let node = Arc::new(SongbirdNode::new(
        songbird.clone(),
        events_tx.clone(),
        config.ytdlp_path.clone(),
    ));
    let controls = Arc::new(DiscordControls::new());
    let registry = Arc::new(SessionRegistry::new(config.default_volume, config.max_queue_size));
    let player = Arc::new(AudioPlayer::new(registry, node, controls.clone()));

    tokio::spawn(player.clone().run_events(events_rx));

    let search = Arc::new(YtDlpSearch::new(config.ytdlp_path.clone(), config.search_timeout()));
    let handler = MusicBot::new(config.clone(), player, search, events_tx);

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Los controles usan el mismo Http (y rate limiter) que el cliente
    controls.bind(client.http.clone());

    // Manejar shutdown graceful
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        std::process::exit(0);
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check() -> Result<()> {
    // Verificar dependencias críticas
    let ytdlp_path = std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string());
    let yt_dlp = async_process::Command::new(&ytdlp_path)
        .arg("--version")
        .output()
        .await?;

    let ffmpeg = async_process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await?;

    if yt_dlp.status.success() && ffmpeg.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes");
    }
}
