//! # Sources Module
//!
//! Resolution of user queries into playable [`Track`]s. The player never
//! searches on its own: handlers resolve a query through a [`TrackSearch`]
//! and hand the resulting track to the session.

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::UserId;

use crate::audio::track::Track;

pub mod ytdlp;

pub use ytdlp::YtDlpSearch;

#[async_trait]
pub trait TrackSearch: Send + Sync {
    /// Resuelve una URL o texto libre al primer resultado.
    async fn resolve(&self, query: &str, requester: UserId) -> Result<Track>;
}
