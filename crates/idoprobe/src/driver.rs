//! Page driver abstraction.
//!
//! [`PageDriver`] is the seam between the auto-waiting [`crate::Page`] and a
//! concrete automation backend. Drivers are deliberately dumb: they resolve a
//! locator to a snapshot of element states and perform raw input on the
//! first match. Waiting, strictness and actionability live in `Page`.
//!
//! # Implementations
//!
//! - `CdpPageDriver` - Chromium over CDP (`browser` feature)
//! - `SimulatedPage` - in-process model of the application (see [`crate::mock`])

use crate::locator::Locator;
use crate::result::ProbeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Snapshot of one resolved element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Rendered with a non-empty box
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Accepts typed text
    #[serde(default)]
    pub editable: bool,
    /// Checkbox state, `None` for non-checkable elements
    #[serde(default)]
    pub checked: Option<bool>,
    /// Current value of an input
    #[serde(default)]
    pub value: Option<String>,
    /// Normalised text content
    #[serde(default)]
    pub text: String,
    /// Accessible name
    #[serde(default)]
    pub name: String,
    /// Covered by another element (a modal overlay)
    #[serde(default)]
    pub obscured: bool,
}

impl ElementState {
    /// Whether a pointer action would reach this element
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        self.visible && self.enabled && !self.obscured
    }

    /// Whether text can be typed into this element
    #[must_use]
    pub const fn is_fillable(&self) -> bool {
        self.is_actionable() && self.editable
    }
}

/// Screenshot data with metadata
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Timestamp when screenshot was taken
    pub timestamp: std::time::SystemTime,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            timestamp: std::time::SystemTime::now(),
        }
    }

    /// Check if screenshot carries data
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Abstract driver for a single page (tab)
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL and wait for the document to load
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Current URL
    async fn url(&self) -> ProbeResult<String>;

    /// Resolve the locator now and describe every match, in document order
    async fn inspect(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>>;

    /// Click the first match
    async fn click(&self, locator: &Locator) -> ProbeResult<()>;

    /// Replace the value of the first match, as if typed
    async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()>;

    /// Focus this tab
    async fn bring_to_front(&self) -> ProbeResult<()>;

    /// Capture the viewport
    async fn screenshot(&self) -> ProbeResult<Screenshot>;

    /// Close the tab
    async fn close(&self) -> ProbeResult<()>;
}
