use modelfmt::host::{RenderedMessage, render_chat, rendered_messages};
use modelfmt::transcript::load_jsonl;
use modelfmt::{
    ANNOTATION_CLASS, Document, Extension, HostEvent, RefreshTiming, Settings, SettingsStore,
    SplitLevel,
};
use std::path::Path;

/// Load a chat, let the extension label it as the host would, print the result.
pub async fn run_annotate(
    store: &SettingsStore,
    path: &Path,
    level: Option<SplitLevel>,
) -> anyhow::Result<()> {
    let mut settings = store.load()?;
    if let Some(level) = level {
        settings.split_level = level;
    }

    let records = load_jsonl(path)?;
    if records.is_empty() {
        println!("No messages in {}", path.display());
        return Ok(());
    }

    let chat = render_chat(&records);
    let ext = Extension::new(settings, records, Document::new(chat), RefreshTiming::default());
    ext.dispatch(HostEvent::ChatChanged);
    ext.flush().await;

    let messages = ext
        .read(|s| rendered_messages(&s.document.chat, ANNOTATION_CLASS))
        .await;
    tracing::debug!("Annotated {} messages from {}", messages.len(), path.display());

    for message in &messages {
        println!("{}", render_line(message, &settings));
    }
    Ok(())
}

fn render_line(message: &RenderedMessage, settings: &Settings) -> String {
    let text = message.text.lines().next().unwrap_or_default();
    match (&message.label, settings.show_model_name) {
        (Some(label), true) if !message.is_user && !settings.show_ch_name => {
            format!("[{}]: {}", label, text)
        }
        (Some(label), true) => format!("[{}] {}: {}", label, message.name, text),
        _ => format!("{}: {}", message.name, text),
    }
}
