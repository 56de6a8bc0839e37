//! Locator abstraction for element selection.
//!
//! Locators are descriptions, not handles: they are resolved afresh on every
//! poll, so they survive re-renders of the application under test. They
//! follow the accessible-role model (`role` + accessible `name`) first, and
//! fall back to labels, test ids, text and raw CSS.
//!
//! A locator compiles to a JavaScript expression for CDP drivers
//! ([`Locator::to_query`]) and is matched structurally by the simulated
//! driver, so both sides honour the same semantics:
//!
//! - role selectors only see visible elements
//! - names and texts are whitespace-normalised
//! - non-exact matching is a case-insensitive substring match
//! - text selectors pick the innermost matching element

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a text-like selector compares strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    /// Text to look for
    pub text: String,
    /// Whole-string, case-sensitive comparison
    #[serde(default)]
    pub exact: bool,
}

impl TextMatch {
    /// Substring match, case-insensitive
    #[must_use]
    pub fn loose(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exact: false,
        }
    }

    /// Whole-string match
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exact: true,
        }
    }

    /// Compare against an observed string
    #[must_use]
    pub fn matches(&self, actual: &str) -> bool {
        let actual = normalize_whitespace(actual);
        let expected = normalize_whitespace(&self.text);
        if self.exact {
            actual == expected
        } else {
            actual.to_lowercase().contains(&expected.to_lowercase())
        }
    }
}

/// Collapse runs of whitespace and trim, the way accessible names are computed
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Selector {
    /// ARIA role with an optional accessible name
    Role {
        /// ARIA role (button, textbox, checkbox, navigation, dialog, ...)
        role: String,
        /// Accessible name filter
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<TextMatch>,
    },
    /// Associated label or `aria-label`
    Label(TextMatch),
    /// `data-testid` attribute
    TestId {
        /// Test id value
        id: String,
    },
    /// Text content
    Text(TextMatch),
    /// Raw CSS selector
    Css {
        /// CSS selector
        css: String,
    },
}

impl Selector {
    fn js_predicate(&self) -> String {
        match self {
            Self::Role { role, name } => {
                let name_check = name.as_ref().map_or_else(
                    || "true".to_string(),
                    |m| format!("__ip.textMatch(__ip.name(el), {}, {})", js_str(&m.text), m.exact),
                );
                format!(
                    "__ip.visible(el) && __ip.role(el) === {} && {name_check}",
                    js_str(role)
                )
            }
            Self::Label(m) => format!(
                "__ip.textMatch(__ip.label(el), {}, {})",
                js_str(&m.text),
                m.exact
            ),
            Self::TestId { id } => format!("el.getAttribute('data-testid') === {}", js_str(id)),
            Self::Text(m) => format!(
                "__ip.textMatch(el.textContent, {t}, {e}) && !Array.from(el.children).some(c => __ip.textMatch(c.textContent, {t}, {e}))",
                t = js_str(&m.text),
                e = m.exact
            ),
            Self::Css { .. } => "true".to_string(),
        }
    }

    fn css_scope(&self) -> &str {
        match self {
            Self::Css { css } => css,
            _ => "*",
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role { role, name: None } => write!(f, "role={role}"),
            Self::Role {
                role,
                name: Some(m),
            } => {
                let suffix = if m.exact { "s" } else { "i" };
                write!(f, "role={role}[name=\"{}\"{suffix}]", m.text)
            }
            Self::Label(m) => write!(f, "label=\"{}\"", m.text),
            Self::TestId { id } => write!(f, "[data-testid=\"{id}\"]"),
            Self::Text(m) => write!(f, "text=\"{}\"", m.text),
            Self::Css { css } => write!(f, "{css}"),
        }
    }
}

/// Locator options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorOptions {
    /// Override of the action bound for this locator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Fail when more than one element matches
    #[serde(default = "default_strict")]
    pub strict: bool,
}

const fn default_strict() -> bool {
    true
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            strict: true,
        }
    }
}

/// A locator for finding elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// The selector for this level
    #[serde(flatten)]
    selector: Selector,
    /// Scope: only descendants of the parent's matches are considered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<Box<Locator>>,
    /// Keep matches whose full text content satisfies this filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    has_text: Option<TextMatch>,
    /// Pick the n-th match (zero-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nth: Option<usize>,
    /// Options for locator behaviour
    #[serde(default)]
    options: LocatorOptions,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            parent: None,
            has_text: None,
            nth: None,
            options: LocatorOptions::default(),
        }
    }

    /// Locate by ARIA role
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::from_selector(Selector::Role {
            role: role.into(),
            name: None,
        })
    }

    /// Locate a button by accessible name
    #[must_use]
    pub fn button(name: impl Into<String>) -> Self {
        Self::role("button").with_name(name)
    }

    /// Locate by label text
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Label(TextMatch::loose(text)))
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::TestId { id: id.into() })
    }

    /// Locate by text content
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text(TextMatch::loose(text)))
    }

    /// Locate by raw CSS
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css { css: css.into() })
    }

    /// Set the accessible-name filter. Ignored for non-role selectors.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        if let Selector::Role { name: slot, .. } = &mut self.selector {
            *slot = Some(TextMatch::loose(name));
        }
        self
    }

    /// Make the name or text comparison exact
    #[must_use]
    pub fn exact(mut self) -> Self {
        match &mut self.selector {
            Selector::Role { name: Some(m), .. } | Selector::Label(m) | Selector::Text(m) => {
                m.exact = true;
            }
            _ => {}
        }
        self
    }

    /// Scope `child` to descendants of this locator
    #[must_use]
    pub fn child(self, mut child: Self) -> Self {
        child.parent = Some(Box::new(self));
        child
    }

    /// Keep matches whose text content equals `text`
    #[must_use]
    pub fn filter_has_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(TextMatch::exact(text));
        self
    }

    /// Pick the n-th match (zero-based)
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    /// Override the action bound for this locator
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = Some(timeout_ms);
        self
    }

    /// Allow multiple matches
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the parent scope
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    /// Get the text-content filter
    #[must_use]
    pub const fn has_text(&self) -> Option<&TextMatch> {
        self.has_text.as_ref()
    }

    /// Get the index filter
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.nth
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Compile to a JavaScript expression evaluating to an array of elements.
    ///
    /// The expression expects [`RESOLVER_PRELUDE`] to be in scope.
    #[must_use]
    pub fn to_query(&self) -> String {
        let roots = self
            .parent
            .as_ref()
            .map_or_else(|| "[document]".to_string(), |p| p.to_query());
        let mut expr = format!(
            "Array.from(new Set({roots}.flatMap(r => Array.from(r.querySelectorAll({css}))))).filter(el => {pred})",
            css = js_str(self.selector.css_scope()),
            pred = self.selector.js_predicate()
        );
        if let Some(m) = &self.has_text {
            expr = format!(
                "{expr}.filter(el => __ip.textMatch(el.textContent, {}, {}))",
                js_str(&m.text),
                m.exact
            );
        }
        if let Some(n) = self.nth {
            expr = format!("{expr}.slice({n}, {})", n + 1);
        }
        expr
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent} >> ")?;
        }
        write!(f, "{}", self.selector)?;
        if let Some(m) = &self.has_text {
            write!(f, " >> has-text=\"{}\"", m.text)?;
        }
        if let Some(n) = self.nth {
            write!(f, " >> nth={n}")?;
        }
        Ok(())
    }
}

/// Quote a string as a JavaScript literal
fn js_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Helper functions the compiled queries rely on.
pub const RESOLVER_PRELUDE: &str = r#"
const __ip = {
  norm(s) { return (s || '').replace(/\s+/g, ' ').trim(); },
  textMatch(actual, expected, exact) {
    const a = __ip.norm(actual), e = __ip.norm(expected);
    return exact ? a === e : a.toLowerCase().includes(e.toLowerCase());
  },
  implicitRole(el) {
    const tag = el.tagName.toLowerCase();
    const type = (el.getAttribute('type') || '').toLowerCase();
    if (tag === 'button') return 'button';
    if (tag === 'input') {
      if (['button', 'submit', 'reset', 'image'].includes(type)) return 'button';
      if (type === 'checkbox') return 'checkbox';
      if (type === 'radio') return 'radio';
      if (type === 'number') return 'spinbutton';
      if (['', 'text', 'email', 'search', 'tel', 'url', 'password'].includes(type)) return 'textbox';
    }
    if (tag === 'textarea') return 'textbox';
    if (tag === 'nav') return 'navigation';
    if (tag === 'dialog') return 'dialog';
    if (tag === 'a' && el.hasAttribute('href')) return 'link';
    return null;
  },
  role(el) { return el.getAttribute('role') || __ip.implicitRole(el); },
  visible(el) {
    const style = getComputedStyle(el);
    if (style.visibility === 'hidden' || style.display === 'none') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  },
  label(el) {
    const aria = el.getAttribute('aria-label');
    if (aria) return aria;
    const by = el.getAttribute('aria-labelledby');
    if (by) return by.split(/\s+/).map(id => (document.getElementById(id) || {}).textContent || '').join(' ');
    if (el.labels && el.labels.length) return Array.from(el.labels).map(l => l.textContent).join(' ');
    return '';
  },
  name(el) {
    const label = __ip.label(el);
    if (label) return __ip.norm(label);
    const tag = el.tagName.toLowerCase();
    if (tag === 'input' || tag === 'textarea') return __ip.norm(el.getAttribute('placeholder') || el.getAttribute('title'));
    return __ip.norm(el.textContent || el.getAttribute('title'));
  },
  obscured(el) {
    const rect = el.getBoundingClientRect();
    const top = document.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2);
    return !!top && top !== el && !el.contains(top);
  },
  state(el) {
    const role = __ip.role(el);
    const editable = ['textbox', 'spinbutton', 'searchbox'].includes(role) && !el.readOnly;
    return {
      visible: __ip.visible(el),
      enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
      editable,
      checked: role === 'checkbox' ? !!el.checked : null,
      value: 'value' in el && editable ? String(el.value) : null,
      text: __ip.norm(el.textContent),
      name: __ip.name(el),
      obscured: __ip.visible(el) && __ip.obscured(el),
    };
  },
};
"#;
