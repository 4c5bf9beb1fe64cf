//! Normalized event model.
//!
//! Every payload received from the vendor cloud, whichever wire format it
//! arrived in, is normalized into one [`Event`]: a name, a flat string
//! attribute map and an optional list of child events. The codec guarantees
//! that parsing walks exactly two levels; children never carry children of
//! their own.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Event name used when a broadcast payload could not be parsed.
///
/// One malformed broadcast must never take the subscriber down, so the
/// decode path returns this sentinel instead of an error.
pub const UNKNOWN_EVENT: &str = "unknown";

/// Format-independent representation of a decoded wire payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name. Never empty once parsing succeeds; `"unknown"` when it
    /// did not.
    pub name: String,
    /// Attribute map. Always present, possibly empty.
    #[serde(default)]
    pub attrs: HashMap<String, String>,
    /// Immediate children, each itself a name plus attributes. The codec
    /// never populates children of children.
    #[serde(default)]
    pub children: Vec<Event>,
}

impl Event {
    /// Create an event with a name and no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: HashMap::new(),
            children: Vec::new(),
        }
    }

    /// The sentinel event produced for unparseable broadcast payloads.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_EVENT)
    }

    /// Set a single attribute (builder style).
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute value.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// The request id this event refers to, if it carries one.
    ///
    /// Both wire formats use an `id` attribute to correlate a result back
    /// to the command that caused it.
    pub fn request_id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whether this is the unparseable-payload sentinel.
    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_EVENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_is_empty() {
        let event = Event::unknown();
        assert!(event.is_unknown());
        assert!(event.attrs.is_empty());
        assert!(event.children.is_empty());
    }

    #[test]
    fn request_id_reads_id_attribute() {
        let event = Event::new("CleanReport").with_attr("id", "42");
        assert_eq!(event.request_id(), Some("42"));
        assert_eq!(Event::new("CleanReport").request_id(), None);
    }
}
