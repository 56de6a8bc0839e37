//! Minimal virtual DOM for the simulated application.
//!
//! The simulated app renders its state into a [`Node`] tree on every query.
//! [`Dom`] flattens that tree in document order and resolves locators with
//! the same rules the browser-side resolver applies.

use crate::driver::ElementState;
use crate::locator::{normalize_whitespace, Locator, Selector};
use std::collections::BTreeSet;

/// One element of the virtual tree
#[derive(Debug, Clone, Default)]
pub struct Node {
    tag: &'static str,
    role: Option<&'static str>,
    aria_label: Option<String>,
    test_id: Option<String>,
    text: String,
    input_type: Option<&'static str>,
    value: Option<String>,
    checked: Option<bool>,
    disabled: bool,
    hidden: bool,
    modal: bool,
    action: Option<&'static str>,
    children: Vec<Node>,
}

impl Node {
    /// Element with a tag name
    #[must_use]
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            ..Self::default()
        }
    }

    /// `<button>` with text, routed to `action` when clicked
    #[must_use]
    pub fn button(text: impl Into<String>, action: &'static str) -> Self {
        Self::new("button").text(text).action(action)
    }

    /// `<input type="text">` with an accessible label
    #[must_use]
    pub fn text_input(label: impl Into<String>, value: impl Into<String>, action: &'static str) -> Self {
        let mut node = Self::new("input").label(label).action(action);
        node.input_type = Some("text");
        node.value = Some(value.into());
        node
    }

    /// `<input type="checkbox">`
    #[must_use]
    pub fn checkbox(label: impl Into<String>, checked: bool, action: &'static str) -> Self {
        let mut node = Self::new("input").label(label).action(action);
        node.input_type = Some("checkbox");
        node.checked = Some(checked);
        node
    }

    /// Own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// `aria-label`
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.aria_label = Some(label.into());
        self
    }

    /// Explicit `role`
    #[must_use]
    pub const fn role(mut self, role: &'static str) -> Self {
        self.role = Some(role);
        self
    }

    /// `data-testid`
    #[must_use]
    pub fn test_id(mut self, id: impl Into<String>) -> Self {
        self.test_id = Some(id.into());
        self
    }

    /// Click routing key
    #[must_use]
    pub const fn action(mut self, action: &'static str) -> Self {
        self.action = Some(action);
        self
    }

    /// `disabled` attribute
    #[must_use]
    pub const fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// `display: none`
    #[must_use]
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Modal dialog: while open, everything outside it is covered
    #[must_use]
    pub const fn modal(mut self) -> Self {
        self.modal = true;
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child when `cond` holds
    #[must_use]
    pub fn child_if(self, cond: bool, child: impl FnOnce() -> Self) -> Self {
        if cond {
            self.child(child())
        } else {
            self
        }
    }

    fn implicit_role(&self) -> Option<&'static str> {
        match (self.tag, self.input_type) {
            ("button", _) => Some("button"),
            ("input", Some("checkbox")) => Some("checkbox"),
            ("input", Some("number")) => Some("spinbutton"),
            ("input", _) | ("textarea", _) => Some("textbox"),
            ("nav", _) => Some("navigation"),
            ("dialog", _) => Some("dialog"),
            ("a", _) => Some("link"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Flat {
    tag: &'static str,
    role: Option<&'static str>,
    label: String,
    name: String,
    text: String,
    test_id: Option<String>,
    visible: bool,
    obscured: bool,
    enabled: bool,
    editable: bool,
    checked: Option<bool>,
    value: Option<String>,
    action: Option<&'static str>,
    modal: bool,
    parent: Option<usize>,
    /// One past the last descendant
    end: usize,
}

/// Flattened, queryable document
#[derive(Debug, Clone, Default)]
pub struct Dom {
    nodes: Vec<Flat>,
}

impl Dom {
    /// Flatten a rendered tree
    #[must_use]
    pub fn build(root: Node) -> Self {
        let mut dom = Self { nodes: Vec::new() };
        dom.flatten(root, None, true);
        dom.apply_modal_cover();
        dom
    }

    /// An empty document (about:blank)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    fn flatten(&mut self, node: Node, parent: Option<usize>, parent_visible: bool) -> String {
        let index = self.nodes.len();
        let visible = parent_visible && !node.hidden;
        let role = node.role.or_else(|| node.implicit_role());
        let editable = matches!(role, Some("textbox" | "spinbutton")) && !node.disabled;
        self.nodes.push(Flat {
            tag: node.tag,
            role,
            label: node.aria_label.clone().unwrap_or_default(),
            name: String::new(),
            text: String::new(),
            test_id: node.test_id,
            visible,
            obscured: false,
            enabled: !node.disabled,
            editable,
            checked: node.checked,
            value: if editable { node.value } else { None },
            action: node.action,
            modal: node.modal,
            parent,
            end: index + 1,
        });

        let mut text = node.text;
        for child in node.children {
            let child_text = self.flatten(child, Some(index), visible);
            text.push(' ');
            text.push_str(&child_text);
        }
        let text = normalize_whitespace(&text);

        let end = self.nodes.len();
        let flat = &mut self.nodes[index];
        flat.end = end;
        flat.name = match (&node.aria_label, flat.tag) {
            (Some(label), _) => normalize_whitespace(label),
            (None, "input" | "textarea") => String::new(),
            (None, _) => text.clone(),
        };
        flat.text = text.clone();
        text
    }

    fn apply_modal_cover(&mut self) {
        let top = self
            .nodes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, n)| n.modal && n.visible)
            .map(|(i, n)| (i, n.end));
        if let Some((start, end)) = top {
            for (i, node) in self.nodes.iter_mut().enumerate() {
                node.obscured = node.visible && !(start..end).contains(&i);
            }
        }
    }

    fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        (index + 1..self.nodes[index].end).filter(move |&j| self.nodes[j].parent == Some(index))
    }

    fn matches(&self, index: usize, selector: &Selector) -> bool {
        let node = &self.nodes[index];
        match selector {
            Selector::Role { role, name } => {
                node.visible
                    && node.role == Some(role.as_str())
                    && name.as_ref().map_or(true, |m| m.matches(&node.name))
            }
            Selector::Label(m) => !node.label.is_empty() && m.matches(&node.label),
            Selector::TestId { id } => node.test_id.as_deref() == Some(id.as_str()),
            Selector::Text(m) => {
                m.matches(&node.text)
                    && !self.children(index).any(|c| m.matches(&self.nodes[c].text))
            }
            Selector::Css { css } => css == "*" || css == node.tag,
        }
    }

    /// Resolve a locator to element indices in document order
    #[must_use]
    pub fn resolve(&self, locator: &Locator) -> Vec<usize> {
        let scope: Vec<usize> = match locator.parent() {
            None => (0..self.nodes.len()).collect(),
            Some(parent) => {
                let mut set = BTreeSet::new();
                for root in self.resolve(parent) {
                    set.extend(root + 1..self.nodes[root].end);
                }
                set.into_iter().collect()
            }
        };
        let mut found: Vec<usize> = scope
            .into_iter()
            .filter(|&i| self.matches(i, locator.selector()))
            .collect();
        if let Some(m) = locator.has_text() {
            found.retain(|&i| m.matches(&self.nodes[i].text));
        }
        if let Some(n) = locator.index() {
            found = found.get(n).copied().into_iter().collect();
        }
        found
    }

    /// Snapshot of one element
    #[must_use]
    pub fn state(&self, index: usize) -> ElementState {
        let node = &self.nodes[index];
        ElementState {
            visible: node.visible,
            enabled: node.enabled,
            editable: node.editable,
            checked: node.checked,
            value: node.value.clone(),
            text: node.text.clone(),
            name: node.name.clone(),
            obscured: node.obscured,
        }
    }

    /// Click routing key of one element
    #[must_use]
    pub fn action(&self, index: usize) -> Option<&'static str> {
        self.nodes[index].action
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document is blank
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
