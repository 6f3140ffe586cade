//! The UI automation collaborator driven by the explorer.
//!
//! Implementations wrap a device automation session. Every call is a
//! blocking round trip; the explorer never issues two at once.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Automation session lost: {0}")]
    SessionLost(String),

    #[error("Automation command failed: {0}")]
    Command(String),
}

impl AutomationError {
    /// Session loss ends exploration; anything else may be recovered.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AutomationError::SessionLost(_))
    }
}

/// On-screen center of an element, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A clickable element on the current screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Element {
    /// Fully qualified resource id, e.g. `com.example:id/save`.
    pub resource_id: Option<String>,
    pub class_name: String,
    pub center: Point,
    pub text: Option<String>,
    pub content_desc: Option<String>,
}

impl Element {
    /// Short id used in interaction markers.
    ///
    /// The part of the resource id after `/`, or the concatenated center
    /// coordinates when the element has no resource id. The flag is false
    /// in the second case.
    pub fn marker_id(&self) -> (String, bool) {
        match &self.resource_id {
            Some(id) => {
                let short = id.split_once('/').map_or(id.as_str(), |(_, name)| name);
                (short.to_string(), true)
            }
            None => (format!("{}{}", self.center.x, self.center.y), false),
        }
    }

    /// `[resource-id: .., text: .., ..]`, skipping empty attributes.
    pub fn describe(&self) -> String {
        let center = self.center.to_string();
        let fields = [
            ("resource-id", self.resource_id.as_deref()),
            ("text", self.text.as_deref()),
            ("content-desc", self.content_desc.as_deref()),
            ("centre", Some(center.as_str())),
            ("class", Some(self.class_name.as_str())),
        ];

        let body: Vec<String> = fields
            .iter()
            .filter_map(|(name, value)| match value {
                Some(v) if !v.is_empty() => Some(format!("{name}: {v}")),
                _ => None,
            })
            .collect();
        format!("[{}]", body.join(", "))
    }
}

/// Receives raw device log lines on the collaborator's own thread.
pub type LogSink = Box<dyn Fn(String) + Send + Sync>;

/// Operations the explorer needs from a UI automation session.
pub trait AutomationPort {
    /// Fully qualified identifier of the foreground screen.
    fn current_screen_id(&mut self) -> Result<String, AutomationError>;

    fn current_package(&mut self) -> Result<String, AutomationError>;

    /// Clickable elements on the current screen, in the collaborator's
    /// stable order.
    fn clickable_elements(&mut self) -> Result<Vec<Element>, AutomationError>;

    fn click(&mut self, element: &Element) -> Result<(), AutomationError>;

    fn navigate_back(&mut self) -> Result<(), AutomationError>;

    /// No-op when no keyboard is shown.
    fn hide_keyboard(&mut self) -> Result<(), AutomationError>;

    fn launch_app(&mut self) -> Result<(), AutomationError>;

    /// Start delivering device log lines to `sink`.
    fn subscribe_logs(&mut self, sink: LogSink) -> Result<(), AutomationError>;

    /// Stop log delivery, close the app and end the session.
    fn release(&mut self) -> Result<(), AutomationError>;
}
