//! Minimal element tree standing in for the host's rendered chat.
//!
//! Only what the annotator needs: classes, attributes, own text, ordered
//! children and descendant lookup in document order.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Element] {
        &mut self.children
    }

    /// Insert at `index`, clamped to the end.
    pub fn insert_child(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, child);
    }

    pub fn prepend(&mut self, child: Element) {
        self.children.insert(0, child);
    }

    pub fn append(&mut self, child: Element) {
        self.children.push(child);
    }

    /// First descendant matching `pred`, depth-first in document order.
    /// The element itself is not considered.
    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in &self.children {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_mut(&mut self, pred: &dyn Fn(&Element) -> bool) -> Option<&mut Element> {
        for child in self.children.iter_mut() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_mut(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        self.find(&|e| e.has_class(class))
    }

    pub fn find_by_class_mut(&mut self, class: &str) -> Option<&mut Element> {
        self.find_mut(&|e| e.has_class(class))
    }

    /// Number of descendants matching `pred`.
    pub fn count(&self, pred: &dyn Fn(&Element) -> bool) -> usize {
        self.children
            .iter()
            .map(|c| usize::from(pred(c)) + c.count(pred))
            .sum()
    }
}

/// The page: body-level toggle classes plus the chat container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    body_classes: BTreeSet<String>,
    pub chat: Element,
}

impl Document {
    pub fn new(chat: Element) -> Self {
        Self {
            body_classes: BTreeSet::new(),
            chat,
        }
    }

    pub fn has_body_class(&self, class: &str) -> bool {
        self.body_classes.contains(class)
    }

    /// Add or remove a body class. Returns true when the set changed.
    pub fn toggle_body_class(&mut self, class: &str, on: bool) -> bool {
        if on {
            self.body_classes.insert(class.to_string())
        } else {
            self.body_classes.remove(class)
        }
    }

    pub fn body_classes(&self) -> impl Iterator<Item = &str> {
        self.body_classes.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("div")
            .with_class("root")
            .with_child(
                Element::new("div")
                    .with_class("a")
                    .with_child(Element::new("span").with_class("target").with_text("first")),
            )
            .with_child(Element::new("span").with_class("target").with_text("second"))
    }

    #[test]
    fn find_is_depth_first_and_skips_self() {
        let root = sample();
        assert_eq!(root.find_by_class("target").unwrap().text(), "first");
        assert!(root.find_by_class("root").is_none());
        assert_eq!(root.count(&|e| e.has_class("target")), 2);
    }

    #[test]
    fn find_mut_edits_in_place() {
        let mut root = sample();
        root.find_by_class_mut("target").unwrap().set_text("edited");
        assert_eq!(root.find_by_class("target").unwrap().text(), "edited");
        assert_eq!(root.children()[1].text(), "second");
    }

    #[test]
    fn insert_child_clamps_index() {
        let mut root = Element::new("div");
        root.insert_child(5, Element::new("b"));
        root.prepend(Element::new("a"));
        root.append(Element::new("c"));
        let tags: Vec<_> = root.children().iter().map(Element::tag).collect();
        assert_eq!(tags, ["a", "b", "c"]);
    }

    #[test]
    fn body_class_toggle_reports_changes() {
        let mut doc = Document::default();
        assert!(doc.toggle_body_class("x", true));
        assert!(!doc.toggle_body_class("x", true));
        assert!(doc.has_body_class("x"));
        assert!(doc.toggle_body_class("x", false));
        assert!(!doc.toggle_body_class("x", false));
        assert_eq!(doc.body_classes().count(), 0);
    }
}
