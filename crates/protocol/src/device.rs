//! Session identity: who we are, which robot we address and how.
//!
//! All three values are constructed once per session and stay read-only for
//! the lifetime of the connection. Reconnecting means building a new session,
//! not mutating these in place.

use crate::constants::{ATR_TOPIC_PREFIX, REALM};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Device generation, which selects the wire format and API quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceGeneration {
    /// Older models speaking the markup wire format.
    Legacy,
    /// 950-type and newer models speaking the structured wire format.
    Structured,
}

impl DeviceGeneration {
    pub fn payload_format(&self) -> PayloadFormat {
        match self {
            Self::Legacy => PayloadFormat::Xml,
            Self::Structured => PayloadFormat::Json,
        }
    }
}

/// Payload format tag used in the broker topic and the relay envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadFormat {
    Xml,
    Json,
}

impl PayloadFormat {
    /// Single-character tag as it appears on the wire.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Xml => "x",
            Self::Json => "j",
        }
    }
}

/// Credentials for the relay, obtained by session setup logic outside this
/// crate. The token carries no embedded expiry; the relay rejects expired
/// tokens via an error code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub realm: String,
    pub resource: String,
    pub token: String,
    pub user_id: String,
}

impl AuthContext {
    pub fn new(
        resource: impl Into<String>,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            realm: REALM.to_string(),
            resource: resource.into(),
            token: token.into(),
            user_id: user_id.into(),
        }
    }

    /// The `auth` block embedded in every relay request body.
    pub fn auth_object(&self) -> serde_json::Value {
        json!({
            "realm": self.realm,
            "resource": self.resource,
            "token": self.token,
            "userid": self.user_id,
            "with": "users",
        })
    }
}

/// The addressed robot. Device id, class and resource together form the
/// broker topic suffix and the relay `to*` routing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub did: String,
    pub class: String,
    pub resource: String,
}

impl DeviceDescriptor {
    pub fn new(
        did: impl Into<String>,
        class: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            did: did.into(),
            class: class.into(),
            resource: resource.into(),
        }
    }

    /// Broker topic for attribute reports from this device, with a wildcard
    /// sender segment.
    pub fn atr_topic(&self, format: PayloadFormat) -> String {
        format!(
            "{}/+/{}/{}/{}/{}",
            ATR_TOPIC_PREFIX,
            self.did,
            self.class,
            self.resource,
            format.as_tag()
        )
    }
}

/// Where the account is registered. The relay URL depends on the continent,
/// the clean-log envelope carries the country.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRegion {
    pub country: String,
    pub continent: String,
}

impl AccountRegion {
    pub fn new(country: impl Into<String>, continent: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            continent: continent.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atr_topic_uses_wildcard_sender_and_format_tag() {
        let device = DeviceDescriptor::new("E0001234", "yna5xi", "atom");
        assert_eq!(
            device.atr_topic(PayloadFormat::Json),
            "iot/atr/+/E0001234/yna5xi/atom/j"
        );
        assert_eq!(
            device.atr_topic(PayloadFormat::Xml),
            "iot/atr/+/E0001234/yna5xi/atom/x"
        );
    }

    #[test]
    fn auth_object_carries_users_scope() {
        let auth = AuthContext::new("atom", "token123", "user-1");
        let obj = auth.auth_object();
        assert_eq!(obj["realm"], "ecouser.net");
        assert_eq!(obj["with"], "users");
        assert_eq!(obj["userid"], "user-1");
    }
}
