use thiserror::Error;

/// Errores corregibles por el usuario.
///
/// Cada variante se muestra tal cual (mensaje efímero) en el límite de la
/// interacción; nunca se propagan más allá del handler del comando o botón.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MusicError {
    #[error("❌ Invalid position!")]
    InvalidPosition,

    #[error("❌ Volume must be between 0 and 100!")]
    OutOfRange,

    #[error("🚫 Only the person who requested this song can use these buttons!")]
    NotAuthorized,

    #[error("❌ Not playing anything!")]
    NothingPlaying,

    #[error("❌ There is no track to pause or resume!")]
    NotPlaying,

    #[error("🔇 You need to join a voice channel first!")]
    NotInVoice,

    #[error("📭 The queue is full (max {0} tracks)")]
    QueueFull(usize),

    #[error("❌ Could not join the voice channel: {0}")]
    ConnectionFailed(String),

    #[error("❌ Failed to load track: {0}")]
    TrackLoadFailed(String),
}

/// Respuesta genérica para fallos no clasificados.
pub const GENERIC_FAILURE: &str = "⚠️ Something went wrong while running that command.";

/// Traduce cualquier error de un handler al texto que verá el usuario.
pub fn user_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<MusicError>() {
        Some(music) => music.to_string(),
        None => GENERIC_FAILURE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn music_errors_surface_their_own_text() {
        let err = anyhow::Error::from(MusicError::OutOfRange);
        assert_eq!(user_message(&err), "❌ Volume must be between 0 and 100!");

        let err = anyhow::Error::from(MusicError::QueueFull(3));
        assert_eq!(user_message(&err), "📭 The queue is full (max 3 tracks)");
    }

    #[test]
    fn unknown_errors_become_generic_failure() {
        let err = anyhow::anyhow!("discord http 500");
        assert_eq!(user_message(&err), GENERIC_FAILURE);
    }

    #[test]
    fn context_does_not_hide_music_errors() {
        let err = anyhow::Error::from(MusicError::NothingPlaying).context("handling /skip");
        assert_eq!(user_message(&err), "❌ Not playing anything!");
    }
}
