//! Wires host events to delayed annotation passes.
//!
//! All state sits behind one lock and each pass holds it for the whole chat,
//! so passes never interleave. Nothing is ever cancelled: a refresh that
//! turns out to be superseded just finds the labels already correct.

use crate::annotate::{PassReport, annotate_all};
use crate::dom::{Document, Element};
use crate::events::{HostEvent, RefreshTiming};
use crate::observer::{MutationRecord, triggers_refresh};
use crate::settings::Settings;
use crate::transcript::MessageRecord;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Body class present while model labels are shown.
pub const MODEL_NAME_BODY_CLASS: &str = "mnf-enabled";
/// Body class present while character names are shown.
pub const CH_NAME_BODY_CLASS: &str = "mnf-ch-enabled";

/// Cap on observer-driven passes chained after one scheduled refresh.
const MAX_FOLLOW_UPS: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct ExtensionState {
    pub settings: Settings,
    pub transcript: Vec<MessageRecord>,
    pub document: Document,
}

/// Make the body classes match the settings. Returns true if any changed.
pub fn apply_visual_state(document: &mut Document, settings: &Settings) -> bool {
    let model = document.toggle_body_class(MODEL_NAME_BODY_CLASS, settings.show_model_name);
    let ch = document.toggle_body_class(CH_NAME_BODY_CLASS, settings.show_ch_name);
    model || ch
}

#[derive(Clone)]
pub struct Extension {
    state: Arc<RwLock<ExtensionState>>,
    timing: RefreshTiming,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Extension {
    pub fn new(
        settings: Settings,
        transcript: Vec<MessageRecord>,
        mut document: Document,
        timing: RefreshTiming,
    ) -> Self {
        apply_visual_state(&mut document, &settings);
        Self {
            state: Arc::new(RwLock::new(ExtensionState {
                settings,
                transcript,
                document,
            })),
            timing,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn timing(&self) -> RefreshTiming {
        self.timing
    }

    /// Run one annotation pass right now.
    pub async fn refresh(&self) -> PassReport {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        annotate_all(
            &mut state.document.chat,
            &state.transcript,
            state.settings.split_level,
        )
    }

    /// Switch settings, update the body classes and relabel immediately.
    pub async fn apply_settings(&self, settings: Settings) -> PassReport {
        {
            let mut state = self.state.write().await;
            state.settings = settings;
            apply_visual_state(&mut state.document, &settings);
        }
        self.refresh().await
    }

    /// The host loaded another chat.
    pub async fn replace_chat(&self, transcript: Vec<MessageRecord>, chat: Element) {
        let mut state = self.state.write().await;
        state.transcript = transcript;
        state.document.chat = chat;
    }

    /// Read access to the current state.
    pub async fn read<T>(&self, f: impl FnOnce(&ExtensionState) -> T) -> T {
        let state = self.state.read().await;
        f(&state)
    }

    /// Host-side edits (new messages, swipes, re-renders).
    pub async fn with_state<T>(&self, f: impl FnOnce(&mut ExtensionState) -> T) -> T {
        let mut state = self.state.write().await;
        f(&mut state)
    }

    /// Schedule a refresh for a host event.
    pub fn dispatch(&self, event: HostEvent) {
        let delay = self.timing.delay_for(event);
        tracing::debug!("{} received, refreshing in {:?}", event, delay);
        self.schedule(delay);
    }

    /// Feed a mutation seen on the chat container. Returns true if it
    /// scheduled a refresh.
    pub fn observe(&self, record: &MutationRecord) -> bool {
        if !triggers_refresh(record) {
            return false;
        }
        self.schedule(self.timing.observer);
        true
    }

    /// Refresh tasks scheduled and not yet drained by [`Extension::flush`].
    pub fn pending(&self) -> usize {
        self.pending_handles().len()
    }

    /// Wait until every scheduled refresh, including ones scheduled while
    /// waiting, has run.
    pub async fn flush(&self) {
        loop {
            let handles = std::mem::take(&mut *self.pending_handles());
            if handles.is_empty() {
                break;
            }
            for result in futures::future::join_all(handles).await {
                if let Err(e) = result {
                    tracing::warn!("Refresh task failed: {}", e);
                }
            }
        }
    }

    fn schedule(&self, delay: Duration) {
        let this = self.clone();
        let handle = tokio::spawn(async move { this.run_scheduled(delay).await });
        let mut handles = self.pending_handles();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    async fn run_scheduled(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
        let mut report = self.refresh().await;

        // Our own writes reach the transcript observer like any other change.
        for _ in 0..MAX_FOLLOW_UPS {
            if !report.mutations.iter().any(triggers_refresh) {
                break;
            }
            tokio::time::sleep(self.timing.observer).await;
            report = self.refresh().await;
        }
    }

    fn pending_handles(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::ANNOTATION_CLASS;
    use crate::host::{TIMESTAMP_CLASS, TITLE_ATTR, render_chat, render_message, rendered_messages};
    use crate::types::SplitLevel;

    fn records() -> Vec<MessageRecord> {
        vec![
            MessageRecord::user("Me", "hi"),
            MessageRecord::ai("Bot", "hello", Some("openrouter"), Some("qwen/qwen3-32b")),
            MessageRecord::ai("Bot", "more", None, Some("llama-3-70b-instruct")),
        ]
    }

    fn extension(settings: Settings) -> Extension {
        let records = records();
        let document = Document::new(render_chat(&records));
        Extension::new(settings, records, document, RefreshTiming::immediate())
    }

    async fn labels(ext: &Extension) -> Vec<Option<String>> {
        ext.read(|s| {
            rendered_messages(&s.document.chat, ANNOTATION_CLASS)
                .into_iter()
                .map(|m| m.label)
                .collect()
        })
        .await
    }

    #[tokio::test]
    async fn chat_changed_labels_every_ai_message() {
        let ext = extension(Settings::default());
        ext.dispatch(HostEvent::ChatChanged);
        ext.flush().await;

        assert_eq!(
            labels(&ext).await,
            vec![None, Some("qwen3".to_string()), Some("llama-3".to_string())]
        );
        assert_eq!(ext.pending(), 0);
    }

    #[tokio::test]
    async fn overlapping_events_never_duplicate_labels() {
        let ext = extension(Settings::default());
        for event in HostEvent::ALL {
            ext.dispatch(event);
            ext.dispatch(event);
        }
        ext.flush().await;
        let first = labels(&ext).await;

        ext.dispatch(HostEvent::MessageUpdated);
        ext.flush().await;
        assert_eq!(labels(&ext).await, first);

        let counts = ext
            .read(|s| {
                s.document
                    .chat
                    .children()
                    .iter()
                    .map(|m| m.count(&|e| e.has_class(ANNOTATION_CLASS)))
                    .collect::<Vec<_>>()
            })
            .await;
        assert_eq!(counts, vec![0, 1, 1]);
    }

    #[tokio::test]
    async fn swipe_relabels_and_resyncs_tooltip() {
        let ext = extension(Settings::default());
        ext.dispatch(HostEvent::ChatChanged);
        ext.flush().await;

        ext.with_state(|s| {
            s.transcript[2] = MessageRecord::ai("Bot", "swiped", Some("openai"), Some("gpt-4-turbo-128k"));
        })
        .await;
        ext.dispatch(HostEvent::MessageSwiped);
        ext.flush().await;

        assert_eq!(labels(&ext).await[2].as_deref(), Some("gpt-4-turbo"));
        let title = ext
            .read(|s| {
                s.document.chat.children()[2]
                    .find_by_class(TIMESTAMP_CLASS)
                    .and_then(|t| t.attr(TITLE_ATTR))
                    .map(String::from)
            })
            .await;
        assert_eq!(title.as_deref(), Some("openai - gpt-4-turbo-128k"));
    }

    #[tokio::test]
    async fn new_message_rendered_later_gets_a_label() {
        let ext = extension(Settings::default());
        ext.dispatch(HostEvent::ChatChanged);
        ext.flush().await;

        ext.with_state(|s| {
            let record = MessageRecord::ai("Bot", "fresh", Some("api"), Some("claude-3-5-sonnet-20241022"));
            let index = s.transcript.len();
            s.document.chat.append(render_message(index, &record));
            s.transcript.push(record);
        })
        .await;
        ext.dispatch(HostEvent::CharacterMessageRendered);
        ext.flush().await;

        assert_eq!(labels(&ext).await[3].as_deref(), Some("claude-3-5-sonnet"));
    }

    #[tokio::test]
    async fn apply_settings_toggles_body_classes_and_relabels() {
        let ext = extension(Settings::default());
        let on = ext
            .read(|s| {
                (
                    s.document.has_body_class(MODEL_NAME_BODY_CLASS),
                    s.document.has_body_class(CH_NAME_BODY_CLASS),
                )
            })
            .await;
        assert_eq!(on, (true, true));
        ext.refresh().await;

        let report = ext
            .apply_settings(Settings {
                show_model_name: false,
                show_ch_name: true,
                split_level: SplitLevel::Vendor,
            })
            .await;
        assert_eq!(report.updated, 2);
        assert!(!ext.read(|s| s.document.has_body_class(MODEL_NAME_BODY_CLASS)).await);
        assert_eq!(labels(&ext).await[1].as_deref(), Some("qwen3-32b"));
    }

    #[tokio::test]
    async fn observer_ignores_label_writes() {
        let ext = extension(Settings::default());
        let leaf = vec![ANNOTATION_CLASS.to_string()];
        assert!(!ext.observe(&MutationRecord::character_data(&leaf)));
        assert_eq!(ext.pending(), 0);

        let timestamp = vec![TIMESTAMP_CLASS.to_string()];
        assert!(ext.observe(&MutationRecord::attribute(&timestamp, TITLE_ATTR)));
        assert_eq!(ext.pending(), 1);
        ext.flush().await;
        assert_eq!(ext.pending(), 0);
    }

    #[tokio::test]
    async fn finished_refreshes_are_not_retained() {
        let ext = extension(Settings::default());
        for _ in 0..200 {
            ext.dispatch(HostEvent::MessageReceived);
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        ext.dispatch(HostEvent::MessageReceived);

        assert!(ext.pending() <= 2, "pending = {}", ext.pending());
        ext.flush().await;
        assert_eq!(ext.pending(), 0);
        assert_eq!(labels(&ext).await[1].as_deref(), Some("qwen3"));
    }

    #[tokio::test]
    async fn replace_chat_swaps_transcript_and_document() {
        let ext = extension(Settings::default());
        let other = vec![MessageRecord::ai("Other", "yo", None, Some("gpt-4o-2024-08-06"))];
        ext.replace_chat(other.clone(), render_chat(&other)).await;
        ext.dispatch(HostEvent::ChatChanged);
        ext.flush().await;

        assert_eq!(labels(&ext).await, vec![Some("gpt-4o".to_string())]);
    }
}
