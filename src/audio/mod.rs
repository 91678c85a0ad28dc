//! # Audio Module
//!
//! Per-guild playback sessions for Guild Jukebox.
//!
//! This module provides:
//! - An ordered, bounded queue with loop modes ([`queue`])
//! - The playback session state machine ([`session`])
//! - One session per guild ([`registry`])
//! - The bridge between sessions, the voice node and the Discord UI ([`player`])
//!
//! ## Architecture
//!
//! ### [`session`] - Playback Session
//! - Pure state: every operation returns the [`session::Effect`]s to perform
//! - Node events carry a [`session::PlaybackId`]; stale ones are ignored
//!
//! ### [`player`] - Audio Player
//! - Looks up sessions, performs effects outside the session lock
//! - Consumes node events sequentially from a single channel
//!
//! ### [`node`] - Voice Node
//! - [`node::AudioNode`] abstracts the voice backend
//! - [`songbird_node::SongbirdNode`] implements it on top of songbird + yt-dlp
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let registry = Arc::new(SessionRegistry::new(50, 100));
//! let player = AudioPlayer::new(registry, node, controls);
//!
//! player.play(guild_id, channels, track).await?;
//! player.skip(guild_id).await?;
//! ```

pub mod node;
pub mod player;
pub mod queue;
pub mod registry;
pub mod session;
pub mod songbird_node;
pub mod track;
