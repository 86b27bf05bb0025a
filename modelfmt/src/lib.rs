pub mod annotate;
pub mod dom;
pub mod events;
pub mod extension;
pub mod host;
pub mod normalize;
pub mod observer;
pub mod settings;
pub mod transcript;
pub mod types;

// Re-exports for convenience
pub use annotate::{ANNOTATION_CLASS, Outcome, PassReport, annotate_all, annotate_message};
pub use dom::{Document, Element};
pub use events::{HostEvent, RefreshTiming};
pub use extension::{Extension, ExtensionState, apply_visual_state};
pub use normalize::{format_model_name, normalize};
pub use settings::{EXTENSION_ID, Settings, SettingsStore};
pub use transcript::{MessageExtra, MessageRecord, TranscriptError};
pub use types::*;
