use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serenity::model::id::UserId;
use std::time::Duration;
use tracing::{info, warn};

use super::TrackSearch;
use crate::{audio::track::Track, error::MusicError};

/// Campos de `yt-dlp --dump-json` que interesan.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    title: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    #[serde(default)]
    is_live: Option<bool>,
}

/// Búsqueda de tracks con el binario de yt-dlp.
pub struct YtDlpSearch {
    program: String,
    timeout: Duration,
}

impl YtDlpSearch {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// URLs se pasan tal cual; el resto se busca en YouTube.
    pub fn search_target(query: &str) -> String {
        let query = query.trim();
        match url::Url::parse(query) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => query.to_string(),
            _ => format!("ytsearch1:{}", query),
        }
    }

    async fn run(&self, target: &str) -> Result<String> {
        let mut cmd = async_process::Command::new(&self.program);
        cmd.args([
            "--dump-json",
            "--no-playlist",
            "--skip-download",
            "--quiet",
            "--no-warnings",
        ])
        .arg(target)
        .kill_on_drop(true);
        let output = cmd.output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| anyhow::anyhow!("yt-dlp timeout después de {:?}", self.timeout))??;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp falló: {}", error.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TrackSearch for YtDlpSearch {
    async fn resolve(&self, query: &str, requester: UserId) -> Result<Track> {
        let target = Self::search_target(query);
        info!("🔍 Buscando con yt-dlp: {}", target);

        let stdout = match self.run(&target).await {
            Ok(stdout) => stdout,
            Err(e) => {
                warn!("❌ Búsqueda fallida para '{}': {:?}", query, e);
                return Err(MusicError::TrackLoadFailed(format!("no results for `{}`", query)).into());
            }
        };

        stdout
            .lines()
            .find_map(|line| parse_track(line, requester))
            .ok_or_else(|| MusicError::TrackLoadFailed(format!("no results for `{}`", query)).into())
    }
}

/// Convierte una línea JSON de yt-dlp en un [`Track`].
pub fn parse_track(line: &str, requester: UserId) -> Option<Track> {
    let entry: YtDlpEntry = serde_json::from_str(line.trim()).ok()?;
    let uri = entry.webpage_url.or(entry.url)?;
    let title = entry.title.unwrap_or_else(|| uri.clone());

    let mut track = Track::new(title, uri, requester);
    if let Some(author) = entry.uploader.or(entry.channel) {
        track = track.with_author(author);
    }
    if let Some(seconds) = entry.duration.filter(|_| entry.is_live != Some(true)) {
        track = track.with_duration_ms((seconds * 1000.0).round() as u64);
    }
    if let Some(thumbnail) = entry.thumbnail {
        track = track.with_thumbnail(thumbnail);
    }
    Some(track)
}
