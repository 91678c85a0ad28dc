use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

/// IDs personalizados para los botones
pub mod button_ids {
    pub const PAUSE: &str = "pause";
    pub const SKIP: &str = "skip";
    pub const STOP: &str = "stop";
    pub const LOOP: &str = "loop";
    pub const QUEUE: &str = "queue";
}

/// Acción asociada a un botón de los controles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlButton {
    Pause,
    Skip,
    Stop,
    Loop,
    Queue,
}

impl ControlButton {
    pub fn from_custom_id(id: &str) -> Option<Self> {
        match id {
            button_ids::PAUSE => Some(Self::Pause),
            button_ids::SKIP => Some(Self::Skip),
            button_ids::STOP => Some(Self::Stop),
            button_ids::LOOP => Some(Self::Loop),
            button_ids::QUEUE => Some(Self::Queue),
            _ => None,
        }
    }

    pub fn custom_id(self) -> &'static str {
        match self {
            Self::Pause => button_ids::PAUSE,
            Self::Skip => button_ids::SKIP,
            Self::Stop => button_ids::STOP,
            Self::Loop => button_ids::LOOP,
            Self::Queue => button_ids::QUEUE,
        }
    }
}

/// Fila de controles del mensaje "now playing". Con `disabled` se usa para
/// apagar un mensaje que ya no representa la reproducción actual.
pub fn create_player_buttons(disabled: bool) -> Vec<CreateActionRow> {
    let row = CreateActionRow::Buttons(vec![
        CreateButton::new(ControlButton::Pause.custom_id())
            .emoji('⏯')
            .style(ButtonStyle::Primary)
            .disabled(disabled),
        CreateButton::new(ControlButton::Skip.custom_id())
            .emoji('⏭')
            .style(ButtonStyle::Secondary)
            .disabled(disabled),
        CreateButton::new(ControlButton::Stop.custom_id())
            .emoji('⏹')
            .style(ButtonStyle::Danger)
            .disabled(disabled),
        CreateButton::new(ControlButton::Loop.custom_id())
            .emoji('🔁')
            .style(ButtonStyle::Secondary)
            .disabled(disabled),
        CreateButton::new(ControlButton::Queue.custom_id())
            .label("Queue")
            .emoji('📋')
            .style(ButtonStyle::Secondary)
            .disabled(disabled),
    ]);

    vec![row]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_ids_round_trip() {
        for button in [
            ControlButton::Pause,
            ControlButton::Skip,
            ControlButton::Stop,
            ControlButton::Loop,
            ControlButton::Queue,
        ] {
            assert_eq!(ControlButton::from_custom_id(button.custom_id()), Some(button));
        }
        assert_eq!(ControlButton::from_custom_id("filter"), None);
    }

    #[test]
    fn player_row_has_every_control() {
        let rows = create_player_buttons(true);
        assert_eq!(rows.len(), 1);
        let CreateActionRow::Buttons(buttons) = &rows[0] else {
            panic!("expected a button row");
        };
        assert_eq!(buttons.len(), 5);
    }
}
