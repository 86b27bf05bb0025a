//! Reconcile each AI message header with a normalized model label.
//!
//! Every write is an upsert diffed against what is already there, so a pass
//! over an up-to-date chat changes nothing and can run any number of times.

use crate::dom::Element;
use crate::host::{
    MESSAGE_CLASS, MESSAGE_ID_ATTR, NAME_CONTAINER_CLASS, NAME_TEXT_CLASS, TIMESTAMP_CLASS,
    TITLE_ATTR, is_user_message,
};
use crate::normalize::normalize;
use crate::observer::MutationRecord;
use crate::transcript::MessageRecord;
use crate::types::SplitLevel;

/// Marker class of the label leaf this crate owns.
pub const ANNOTATION_CLASS: &str = "clean_model_name";
const ANNOTATION_TAG: &str = "span";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UserMessage,
    NoIdentifier,
    /// No name container to put the label in.
    NoAnchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Updated,
    Unchanged,
    Skipped(SkipReason),
}

/// Tally of one batch pass, plus the mutations it made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub tooltips_synced: usize,
    pub mutations: Vec<MutationRecord>,
}

impl PassReport {
    pub fn changed(&self) -> bool {
        !self.mutations.is_empty()
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Inserted => self.inserted += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Raw identifier for a rendered message.
///
/// The transcript entry at the message's `mesid` wins; the cached timestamp
/// tooltip is the fallback. Blank values count as absent.
pub fn resolve_raw_identifier(message: &Element, transcript: &[MessageRecord]) -> Option<String> {
    let structured = message
        .attr(MESSAGE_ID_ATTR)
        .and_then(|id| id.trim().parse::<usize>().ok())
        .and_then(|i| transcript.get(i))
        .and_then(MessageRecord::raw_identifier);

    structured.or_else(|| {
        message
            .find_by_class(TIMESTAMP_CLASS)
            .and_then(|t| t.attr(TITLE_ATTR))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    })
}

/// Bring one message's label in line with its data.
pub fn annotate_message(
    message: &mut Element,
    transcript: &[MessageRecord],
    level: SplitLevel,
    report: &mut PassReport,
) -> Outcome {
    let outcome = upsert_label(message, transcript, level, report);
    report.record(outcome);
    outcome
}

fn upsert_label(
    message: &mut Element,
    transcript: &[MessageRecord],
    level: SplitLevel,
    report: &mut PassReport,
) -> Outcome {
    if is_user_message(message) {
        return Outcome::Skipped(SkipReason::UserMessage);
    }
    let Some(raw) = resolve_raw_identifier(message, transcript) else {
        return Outcome::Skipped(SkipReason::NoIdentifier);
    };

    // Keep the tooltip current so the fallback stays right if the
    // transcript entry goes away on a partial re-render.
    if let Some(timestamp) = message.find_by_class_mut(TIMESTAMP_CLASS) {
        if timestamp.attr(TITLE_ATTR) != Some(raw.as_str()) {
            timestamp.set_attr(TITLE_ATTR, raw.as_str());
            report.tooltips_synced += 1;
            report
                .mutations
                .push(MutationRecord::attribute(timestamp.classes(), TITLE_ATTR));
        }
    }

    let label = normalize(Some(&raw), level);

    if let Some(leaf) = message.find_by_class_mut(ANNOTATION_CLASS) {
        if leaf.text() == label {
            return Outcome::Unchanged;
        }
        leaf.set_text(label);
        report
            .mutations
            .push(MutationRecord::character_data(leaf.classes()));
        return Outcome::Updated;
    }

    let Some(container) = message.find_by_class_mut(NAME_CONTAINER_CLASS) else {
        return Outcome::Skipped(SkipReason::NoAnchor);
    };
    let leaf = Element::new(ANNOTATION_TAG)
        .with_class(ANNOTATION_CLASS)
        .with_text(label);
    let anchor = container
        .children()
        .iter()
        .position(|c| c.has_class(NAME_TEXT_CLASS));
    match anchor {
        Some(index) => container.insert_child(index, leaf),
        None => container.prepend(leaf),
    }
    report.mutations.push(MutationRecord::child_list(
        container.classes(),
        vec![vec![ANNOTATION_CLASS.to_string()]],
    ));
    Outcome::Inserted
}

/// One pass over every AI message in the chat container.
pub fn annotate_all(chat: &mut Element, transcript: &[MessageRecord], level: SplitLevel) -> PassReport {
    let mut report = PassReport::default();
    for message in chat
        .children_mut()
        .iter_mut()
        .filter(|m| m.has_class(MESSAGE_CLASS) && !is_user_message(m))
    {
        annotate_message(message, transcript, level, &mut report);
    }
    tracing::debug!(
        "Annotation pass (level {}): {} inserted, {} updated, {} unchanged, {} skipped, {} tooltips synced",
        level,
        report.inserted,
        report.updated,
        report.unchanged,
        report.skipped,
        report.tooltips_synced
    );
    report
}
