use std::fmt;
use std::time::Duration;

/// Host signals that can leave message headers out of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    MessageReceived,
    MessageUpdated,
    MessageSwiped,
    ChatChanged,
    GenerationEnded,
    GenerationStopped,
    ModelChanged,
    CharacterMessageRendered,
}

impl HostEvent {
    pub const ALL: [HostEvent; 8] = [
        HostEvent::MessageReceived,
        HostEvent::MessageUpdated,
        HostEvent::MessageSwiped,
        HostEvent::ChatChanged,
        HostEvent::GenerationEnded,
        HostEvent::GenerationStopped,
        HostEvent::ModelChanged,
        HostEvent::CharacterMessageRendered,
    ];

    /// Host-side event name.
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::MessageReceived => "message_received",
            HostEvent::MessageUpdated => "message_updated",
            HostEvent::MessageSwiped => "message_swiped",
            HostEvent::ChatChanged => "chat_id_changed",
            HostEvent::GenerationEnded => "generation_ended",
            HostEvent::GenerationStopped => "generation_stopped",
            HostEvent::ModelChanged => "chatcompletion_model_changed",
            HostEvent::CharacterMessageRendered => "character_message_rendered",
        }
    }
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How long to let the host finish rendering before a refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTiming {
    /// Single-message events.
    pub message: Duration,
    /// Whole chat swapped out; the host renders every message first.
    pub chat_changed: Duration,
    /// Generation finished or the model selection moved.
    pub settle: Duration,
    /// Follow-up after the transcript observer saw a relevant change.
    pub observer: Duration,
}

impl Default for RefreshTiming {
    fn default() -> Self {
        Self {
            message: Duration::from_millis(100),
            chat_changed: Duration::from_millis(300),
            settle: Duration::from_millis(200),
            observer: Duration::from_millis(50),
        }
    }
}

impl RefreshTiming {
    /// No delays at all.
    pub const fn immediate() -> Self {
        Self {
            message: Duration::ZERO,
            chat_changed: Duration::ZERO,
            settle: Duration::ZERO,
            observer: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, event: HostEvent) -> Duration {
        match event {
            HostEvent::MessageReceived
            | HostEvent::MessageUpdated
            | HostEvent::MessageSwiped
            | HostEvent::CharacterMessageRendered => self.message,
            HostEvent::ChatChanged => self.chat_changed,
            HostEvent::GenerationEnded | HostEvent::GenerationStopped | HostEvent::ModelChanged => {
                self.settle
            }
        }
    }
}
