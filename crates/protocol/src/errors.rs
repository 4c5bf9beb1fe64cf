//! Vendor error-code classification.
//!
//! The vendor reports device conditions as numeric string codes. The mapping
//! below encodes real firmware behavior and must be reproduced verbatim by
//! any reimplementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Code the relay uses for "wait for response timed out".
pub const CODE_RESPONSE_TIMEOUT: &str = "500";

/// Code meaning "no error"; clears any previously recorded error state.
pub const CODE_NO_ERROR: &str = "0";

/// Predicate deciding whether a device class belongs to the family on which
/// the response-timeout code is benign. The family list lives outside this
/// crate, so the check is injected.
pub type FamilyPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// What the caller should do about a vendor error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Device is stuck or paused for an internal reason; issue a resume
    /// action after a short delay.
    Resume,
    /// Cleaning cycle finished; terminal for the current job.
    Complete,
    /// Benign transient on a legacy family; fully absorbed, never surfaced.
    Suppressed,
    /// Clears any previously recorded error state.
    Cleared,
    /// Surfaced to the caller with code and message, no automatic retry.
    Fatal,
}

impl Outcome {
    /// Whether the condition reaches the caller at all.
    pub fn surfaced(&self) -> bool {
        !matches!(self, Self::Suppressed)
    }
}

/// A vendor error code together with its classification, as published on the
/// session's error stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub code: String,
    pub message: String,
    pub outcome: Outcome,
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} code {} ({})", self.outcome, self.code, self.message)
    }
}

/// Maps vendor error codes to outcomes.
#[derive(Clone)]
pub struct ErrorClassifier {
    suppressed_family: FamilyPredicate,
}

impl ErrorClassifier {
    /// Create a classifier with an injected family predicate for the
    /// suppressed-timeout case.
    pub fn new(suppressed_family: FamilyPredicate) -> Self {
        Self { suppressed_family }
    }

    /// Classifier that never suppresses the response-timeout code.
    pub fn strict() -> Self {
        Self::new(Arc::new(|_| false))
    }

    /// Classify a vendor error code for the given device class.
    pub fn classify(&self, code: &str, device_class: &str) -> Outcome {
        match code {
            CODE_NO_ERROR => Outcome::Cleared,
            "128" | "1026" => Outcome::Resume,
            "1021" => Outcome::Complete,
            CODE_RESPONSE_TIMEOUT if (self.suppressed_family)(device_class) => Outcome::Suppressed,
            _ => Outcome::Fatal,
        }
    }

    /// Classify and pair the code with its message. An empty vendor message
    /// falls back to the known-code dictionary.
    pub fn classified_error(
        &self,
        code: &str,
        message: &str,
        device_class: &str,
    ) -> ClassifiedError {
        let message = if message.is_empty() {
            error_code_message(code).unwrap_or("unknown error").to_string()
        } else {
            message.to_string()
        };
        ClassifiedError {
            code: code.to_string(),
            message,
            outcome: self.classify(code, device_class),
        }
    }
}

/// Human-readable messages for the known vendor codes.
pub fn error_code_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "-3" => "Error parsing response data",
        "-2" => "Internal error",
        "-1" => "Host not reachable or communication malfunction",
        "0" => "NoError: robot is operational",
        "3" => "RequestOAuthError: authentication error",
        "5" => "Log data is not found",
        "101" => "BatteryLow: low battery",
        "102" => "HostHang: robot is off the floor",
        "103" => "WheelAbnormal: driving wheel abnormal",
        "104" => "DownSensorAbnormal: down sensor abnormal",
        "105" => "Stuck: robot is stuck",
        "110" => "NoDustBox: dust bin not installed",
        "128" => "Paused: robot paused itself",
        "500" => "Wait for response timed out",
        "1021" => "Cleaning cycle complete",
        "1026" => "Paused: robot paused itself",
        _ => return None,
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family_710(class: &str) -> bool {
        class == "uv242z"
    }

    #[test]
    fn resume_codes() {
        let classifier = ErrorClassifier::strict();
        assert_eq!(classifier.classify("128", "yna5xi"), Outcome::Resume);
        assert_eq!(classifier.classify("1026", "yna5xi"), Outcome::Resume);
    }

    #[test]
    fn complete_code_is_not_fatal() {
        let classifier = ErrorClassifier::strict();
        let outcome = classifier.classify("1021", "yna5xi");
        assert_eq!(outcome, Outcome::Complete);
        assert!(outcome.surfaced());
    }

    #[test]
    fn timeout_suppressed_only_on_flagged_family() {
        let classifier = ErrorClassifier::new(Arc::new(family_710));
        assert_eq!(classifier.classify("500", "uv242z"), Outcome::Suppressed);
        assert!(!classifier.classify("500", "uv242z").surfaced());
        // Same code on any other family is fatal and surfaced.
        assert_eq!(classifier.classify("500", "yna5xi"), Outcome::Fatal);
        assert!(classifier.classify("500", "yna5xi").surfaced());
    }

    #[test]
    fn zero_clears_error_state() {
        let classifier = ErrorClassifier::strict();
        assert_eq!(classifier.classify("0", "yna5xi"), Outcome::Cleared);
    }

    #[test]
    fn unknown_codes_are_fatal() {
        let classifier = ErrorClassifier::strict();
        assert_eq!(classifier.classify("1024", "yna5xi"), Outcome::Fatal);
        assert_eq!(classifier.classify("-1", "yna5xi"), Outcome::Fatal);
    }

    #[test]
    fn message_falls_back_to_dictionary() {
        let classifier = ErrorClassifier::strict();
        let err = classifier.classified_error("105", "", "yna5xi");
        assert_eq!(err.message, "Stuck: robot is stuck");
        let err = classifier.classified_error("105", "from relay", "yna5xi");
        assert_eq!(err.message, "from relay");
    }
}
