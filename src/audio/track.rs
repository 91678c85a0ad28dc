use serenity::model::id::UserId;
use std::time::Duration;

/// Pista reproducible, inmutable una vez creada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub uri: String,
    pub author: String,
    pub duration: Duration,
    pub thumbnail: Option<String>,
    pub requester: UserId,
}

impl Track {
    pub fn new(title: impl Into<String>, uri: impl Into<String>, requester: UserId) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
            author: String::from("Unknown"),
            duration: Duration::ZERO,
            thumbnail: None,
            requester,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_duration_ms(mut self, millis: u64) -> Self {
        self.duration = Duration::from_millis(millis);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    /// Streams en vivo llegan sin duración.
    pub fn is_stream(&self) -> bool {
        self.duration.is_zero()
    }

    pub fn is_requested_by(&self, user: UserId) -> bool {
        self.requester == user
    }
}

#[cfg(test)]
impl Track {
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Formatea una duración como `m:ss` (o `h:mm:ss` si pasa de una hora).
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_short_and_long_durations() {
        assert_eq!(format_duration(Duration::from_millis(61_000)), "1:01");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "1:02:05");
        assert_eq!(format_duration(Duration::ZERO), "0:00");
    }

    #[test]
    fn builder_keeps_requester() {
        let track = Track::new("Song", "https://example.com/a", UserId::new(42))
            .with_author("Band")
            .with_duration_ms(215_000);

        assert!(track.is_requested_by(UserId::new(42)));
        assert!(!track.is_requested_by(UserId::new(7)));
        assert_eq!(track.duration, Duration::from_secs(215));
        assert!(!track.is_stream());
    }
}
