//! Which structural changes to the chat container warrant another pass.

use crate::annotate::ANNOTATION_CLASS;
use crate::host::{IS_USER_ATTR, MESSAGE_ID_ATTR, TITLE_ATTR};

/// Attribute changes worth a refresh. Nothing the annotation leaf carries is
/// listed here, so label writes can never trigger themselves.
pub const OBSERVED_ATTRIBUTES: &[&str] = &[MESSAGE_ID_ATTR, IS_USER_ATTR, TITLE_ATTR];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// Nodes added or removed; one class list per node.
    ChildList { nodes: Vec<Vec<String>> },
    Attributes { name: String },
    CharacterData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Classes of the node the mutation happened on.
    pub target_classes: Vec<String>,
}

impl MutationRecord {
    pub fn child_list(target_classes: &[String], nodes: Vec<Vec<String>>) -> Self {
        Self {
            kind: MutationKind::ChildList { nodes },
            target_classes: target_classes.to_vec(),
        }
    }

    pub fn attribute(target_classes: &[String], name: &str) -> Self {
        Self {
            kind: MutationKind::Attributes {
                name: name.to_string(),
            },
            target_classes: target_classes.to_vec(),
        }
    }

    pub fn character_data(target_classes: &[String]) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target_classes: target_classes.to_vec(),
        }
    }
}

fn is_annotation(classes: &[String]) -> bool {
    classes.iter().any(|c| c == ANNOTATION_CLASS)
}

/// Should this mutation schedule a refresh?
pub fn triggers_refresh(record: &MutationRecord) -> bool {
    if is_annotation(&record.target_classes) {
        return false;
    }
    match &record.kind {
        MutationKind::ChildList { nodes } => !nodes.iter().all(|n| is_annotation(n)),
        MutationKind::Attributes { name } => OBSERVED_ATTRIBUTES.contains(&name.as_str()),
        MutationKind::CharacterData => false,
    }
}
