//! The host's chat markup contract, and a renderer that produces it.

use crate::dom::Element;
use crate::transcript::MessageRecord;

pub const CHAT_ID: &str = "chat";
pub const MESSAGE_CLASS: &str = "mes";
pub const MESSAGE_ID_ATTR: &str = "mesid";
pub const IS_USER_ATTR: &str = "is_user";
pub const TIMESTAMP_CLASS: &str = "timestamp";
pub const TITLE_ATTR: &str = "title";
pub const NAME_CONTAINER_CLASS: &str = "alignItemsBaseline";
pub const NAME_TEXT_CLASS: &str = "name_text";
pub const MESSAGE_TEXT_CLASS: &str = "mes_text";

/// True for messages the user wrote.
pub fn is_user_message(message: &Element) -> bool {
    message.attr(IS_USER_ATTR) == Some("true")
}

/// Render the whole transcript into a chat container.
pub fn render_chat(records: &[MessageRecord]) -> Element {
    records
        .iter()
        .enumerate()
        .fold(
            Element::new("div").with_attr("id", CHAT_ID),
            |chat, (i, record)| chat.with_child(render_message(i, record)),
        )
}

/// Render one message the way the host does. AI messages carry their raw
/// model identifier as the timestamp tooltip.
pub fn render_message(index: usize, record: &MessageRecord) -> Element {
    let mut timestamp = Element::new("small").with_class(TIMESTAMP_CLASS);
    if !record.is_user {
        if let Some(raw) = record.raw_identifier() {
            timestamp.set_attr(TITLE_ATTR, raw);
        }
    }

    let names = Element::new("span")
        .with_class("flex-container")
        .with_class(NAME_CONTAINER_CLASS)
        .with_child(
            Element::new("span")
                .with_class(NAME_TEXT_CLASS)
                .with_text(record.name.clone()),
        )
        .with_child(timestamp);

    Element::new("div")
        .with_class(MESSAGE_CLASS)
        .with_attr(MESSAGE_ID_ATTR, index.to_string())
        .with_attr(IS_USER_ATTR, record.is_user.to_string())
        .with_child(
            Element::new("div")
                .with_class("mes_block")
                .with_child(Element::new("div").with_class("ch_name").with_child(names))
                .with_child(
                    Element::new("div")
                        .with_class(MESSAGE_TEXT_CLASS)
                        .with_text(record.mes.clone()),
                ),
        )
}

/// What a reader sees for one rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub is_user: bool,
    pub name: String,
    pub label: Option<String>,
    pub text: String,
}

/// Read back every message in the chat container, in order.
pub fn rendered_messages(chat: &Element, label_class: &str) -> Vec<RenderedMessage> {
    chat.children()
        .iter()
        .filter(|m| m.has_class(MESSAGE_CLASS))
        .map(|m| RenderedMessage {
            is_user: is_user_message(m),
            name: text_of(m, NAME_TEXT_CLASS).unwrap_or_default(),
            label: text_of(m, label_class),
            text: text_of(m, MESSAGE_TEXT_CLASS).unwrap_or_default(),
        })
        .collect()
}

fn text_of(message: &Element, class: &str) -> Option<String> {
    message.find_by_class(class).map(|e| e.text().to_string())
}
