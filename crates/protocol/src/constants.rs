//! Wire constants for the vendor cloud.
//!
//! These values are part of the vendor protocol and must match what the
//! device firmware and relay expect.

/// Authentication realm sent with every relay request.
pub const REALM: &str = "ecouser.net";

/// Relay URL template. `{continent}` is substituted from the account region.
pub const PORTAL_URL_FORMAT: &str = "https://portal-{continent}.ecouser.net/api";

/// Relay URL for accounts registered in China.
pub const PORTAL_URL_FORMAT_CN: &str = "https://portal-cn.ecouser.net/api";

/// Default API path for device commands.
pub const IOT_DEVMANAGER_PATH: &str = "iot/devmanager.do";

/// API path for cleaning-log retrieval.
pub const LG_LOG_PATH: &str = "lg/log.do";

/// Legacy command name that is routed to the log API path.
pub const CLEAN_LOGS_COMMAND: &str = "GetLogApiCleanLogs";

/// App-version query string appended for structured-payload devices.
pub const PORTAL_QUERY: &str = "cv=1.67.3&t=a&av=1.3.1";

/// User agent the relay expects from structured-payload clients.
pub const USER_AGENT: &str = "Dalvik/2.1.0 (Linux; U; Android 5.1.1; A5010 Build/LMY48Z)";

/// Broker topic prefix for device-originated attribute reports.
pub const ATR_TOPIC_PREFIX: &str = "iot/atr";

/// Default broker port (TLS).
pub const DEFAULT_BROKER_PORT: u16 = 8883;

/// Broker keep-alive interval in seconds.
pub const BROKER_KEEP_ALIVE_SECS: u64 = 120;

/// Maximum number of entries carried in a normalized CleanLogs event.
///
/// The `count` attribute of that event is fixed to this value by the wire
/// contract even when fewer entries are present.
pub const CLEAN_LOG_MAX_ENTRIES: usize = 20;

/// Success sentinel in the relay's synchronous envelope.
pub const ENVELOPE_OK: &str = "ok";

/// Protocol version reported in the structured payload header.
pub const PAYLOAD_HEADER_VERSION: &str = "0.0.50";
