//! Cloud relay HTTP client.
//!
//! Commands never reach the device directly: they are POSTed to the vendor
//! relay, which answers with a synchronous envelope acknowledging (or
//! refusing) the command. For legacy devices the envelope may embed the real
//! result; for structured devices the result usually arrives later over the
//! broker.

use crate::ErrorNotice;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};
use vaclink_core::{Bus, Error, Result};
use vaclink_protocol::constants::{
    CLEAN_LOGS_COMMAND, ENVELOPE_OK, IOT_DEVMANAGER_PATH, LG_LOG_PATH, PORTAL_QUERY,
    PORTAL_URL_FORMAT, PORTAL_URL_FORMAT_CN, USER_AGENT,
};
use vaclink_protocol::errors::CODE_NO_ERROR;
use vaclink_protocol::{
    AccountRegion, AuthContext, Command, DeviceDescriptor, DeviceGeneration, ErrorClassifier,
    WireCodec,
};

/// The relay's synchronous response to one command.
#[derive(Debug, Clone)]
pub struct WireEnvelope {
    raw: Value,
}

impl WireEnvelope {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Whether the status indicator equals the success sentinel. Two field
    /// names are in historical use.
    pub fn is_ok(&self) -> bool {
        self.raw.get("result").and_then(Value::as_str) == Some(ENVELOPE_OK)
            || self.raw.get("ret").and_then(Value::as_str) == Some(ENVELOPE_OK)
    }

    /// Vendor error code, normalized to a string.
    pub fn errno(&self) -> Option<String> {
        match self.raw.get("errno") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Vendor error message, if present.
    pub fn error_message(&self) -> Option<&str> {
        self.raw.get("error").and_then(Value::as_str)
    }

    /// The raw envelope, for inline-result extraction by the codec.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// HTTP client for the vendor cloud relay.
pub struct RelayClient {
    http: reqwest::Client,
    auth: AuthContext,
    device: DeviceDescriptor,
    region: AccountRegion,
    generation: DeviceGeneration,
    classifier: ErrorClassifier,
    errors: Bus<ErrorNotice>,
    /// Last vendor error code seen; success after a non-zero code emits an
    /// explicit error-cleared notification.
    last_error_code: Mutex<String>,
}

impl RelayClient {
    pub fn new(
        auth: AuthContext,
        device: DeviceDescriptor,
        region: AccountRegion,
        generation: DeviceGeneration,
        classifier: ErrorClassifier,
        errors: Bus<ErrorNotice>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            auth,
            device,
            region,
            generation,
            classifier,
            errors,
            last_error_code: Mutex::new(CODE_NO_ERROR.to_string()),
        })
    }

    /// Send a command to the relay and interpret the synchronous envelope.
    pub async fn send(&self, codec: &dyn WireCodec, cmd: &Command) -> Result<WireEnvelope> {
        let body = codec.encode_request(cmd, &self.auth, &self.device, &self.region)?;
        let url = self.portal_url(cmd);
        debug!(command = cmd.name(), %url, "sending command to relay");

        let mut request = self.http.post(&url).json(&body);
        if self.generation == DeviceGeneration::Structured {
            request = request.header(reqwest::header::USER_AGENT, USER_AGENT);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.network_failure(e.to_string())),
        };
        let value: Value = match response.json().await {
            Ok(value) => value,
            Err(e) => return Err(self.network_failure(e.to_string())),
        };
        self.interpret(value)
    }

    /// The API path for a command: the command's override wins, the legacy
    /// log-retrieval name has its own default, everything else goes to the
    /// device manager.
    pub fn api_path<'a>(&self, cmd: &'a Command) -> &'a str {
        if let Some(api) = cmd.api() {
            api
        } else if cmd.name() == CLEAN_LOGS_COMMAND {
            LG_LOG_PATH
        } else {
            IOT_DEVMANAGER_PATH
        }
    }

    /// Build the region-qualified URL for a command, with the extra query
    /// parameters structured devices require.
    pub fn portal_url(&self, cmd: &Command) -> String {
        let base = if self.region.country.eq_ignore_ascii_case("CN") {
            PORTAL_URL_FORMAT_CN.to_string()
        } else {
            PORTAL_URL_FORMAT.replace("{continent}", &self.region.continent)
        };
        let path = self.api_path(cmd);
        let mut url = format!("{}/{}", base, path);
        if self.generation == DeviceGeneration::Structured {
            url.push('?');
            url.push_str(PORTAL_QUERY);
            if path == IOT_DEVMANAGER_PATH {
                url.push_str(&format!(
                    "&mid={}&did={}&td=q&u={}",
                    self.device.class, self.device.did, self.auth.user_id
                ));
            }
        }
        url
    }

    /// Interpret the relay's synchronous envelope.
    ///
    /// A suppressed vendor code (the benign response-timeout on flagged
    /// legacy families) is absorbed entirely: the envelope is returned and
    /// nothing reaches the error stream.
    pub fn interpret(&self, value: Value) -> Result<WireEnvelope> {
        let envelope = WireEnvelope::new(value);
        if envelope.is_ok() {
            let mut last = self.last_error_code.lock().expect("relay state poisoned");
            if *last != CODE_NO_ERROR {
                *last = CODE_NO_ERROR.to_string();
                drop(last);
                let cleared =
                    self.classifier
                        .classified_error(CODE_NO_ERROR, "", &self.device.class);
                self.errors.publish(ErrorNotice::Vendor(cleared));
            }
            return Ok(envelope);
        }

        let code = envelope.errno().unwrap_or_else(|| "-1".to_string());
        let message = envelope.error_message().unwrap_or_default();
        *self.last_error_code.lock().expect("relay state poisoned") = code.clone();

        let classified = self
            .classifier
            .classified_error(&code, message, &self.device.class);
        if !classified.outcome.surfaced() {
            debug!(code, "suppressed benign relay failure");
            return Ok(envelope);
        }
        warn!(code, message = %classified.message, "relay refused command");
        self.errors.publish(ErrorNotice::Vendor(classified.clone()));
        Err(Error::relay(code, classified.message))
    }

    fn network_failure(&self, message: String) -> Error {
        warn!(error = %message, "network failure talking to relay");
        self.errors.publish(ErrorNotice::Network(message.clone()));
        Error::transport(message)
    }
}
