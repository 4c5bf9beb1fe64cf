//! Structured codec for 950-type devices.
//!
//! Newer models exchange JSON payloads with a header block (protocol
//! version, timestamp) and a body block holding the parameter map. Broadcast
//! topics carry the event name in their sender segment.

use super::{
    clean_logs_event, clean_logs_request_object, standard_request_object, value_to_string,
    WireCodec,
};
use crate::command::Command;
use crate::constants::{LG_LOG_PATH, PAYLOAD_HEADER_VERSION};
use crate::device::{AccountRegion, AuthContext, DeviceDescriptor, PayloadFormat};
use serde_json::{json, Value};
use std::collections::HashMap;
use vaclink_core::{Error, Event, Result};

/// Codec for the structured wire format (payload tag `j`).
pub struct JsonCodec;

impl WireCodec for JsonCodec {
    fn payload_format(&self) -> PayloadFormat {
        PayloadFormat::Json
    }

    fn encode_request(
        &self,
        cmd: &Command,
        auth: &AuthContext,
        device: &DeviceDescriptor,
        region: &AccountRegion,
    ) -> Result<Value> {
        if cmd.api() == Some(LG_LOG_PATH) {
            // The log API takes the requested entry count as its `td` field.
            let td = cmd
                .params()
                .get("count")
                .cloned()
                .unwrap_or_else(|| json!(cmd.name()));
            return Ok(clean_logs_request_object(td, auth, device, region));
        }
        let payload = json!({
            "header": {
                "pri": "1",
                "ts": chrono::Utc::now().timestamp_millis(),
                "tzm": 480,
                "ver": PAYLOAD_HEADER_VERSION,
            },
            "body": {
                "data": cmd.params_with_id(),
            },
        });
        Ok(standard_request_object(
            cmd,
            payload,
            PayloadFormat::Json,
            auth,
            device,
        ))
    }

    fn decode_broadcast(&self, topic: &str, payload: &[u8]) -> Event {
        // Topic shape: iot/atr/{name}/{did}/{class}/{resource}/j
        let Some(name) = topic.split('/').nth(2).filter(|s| !s.is_empty()) else {
            return Event::unknown();
        };
        let Ok(value) = serde_json::from_slice::<Value>(payload) else {
            return Event::unknown();
        };
        let data = value.pointer("/body/data").unwrap_or(&Value::Null);
        let (attrs, children) = split_data(data);
        Event {
            name: name.to_string(),
            attrs,
            children,
        }
    }

    fn decode_response(&self, cmd: &Command, envelope: &Value) -> Result<Option<Event>> {
        if let Some(resp) = envelope.get("resp") {
            return decode_correlated(cmd, resp).map(Some);
        }
        if let Some(logs) = envelope.get("logs").and_then(Value::as_array) {
            return Ok(Some(clean_logs_event(logs)));
        }
        // Plain acknowledgement; the real result arrives over the broker.
        Ok(None)
    }
}

/// Decode a result embedded in the synchronous envelope. The event takes the
/// command's name; attributes come from the fixed response body field.
fn decode_correlated(cmd: &Command, resp: &Value) -> Result<Event> {
    let body = resp
        .get("body")
        .ok_or_else(|| Error::protocol("structured response without body"))?;
    if let Some(code) = body.get("code").and_then(Value::as_i64) {
        if code != 0 {
            let msg = body
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("command failed");
            return Err(Error::relay(code.to_string(), msg));
        }
    }
    let data = body.get("data").unwrap_or(&Value::Null);
    let (mut attrs, children) = split_data(data);
    attrs.insert("id".to_string(), cmd.request_id().to_string());
    Ok(Event {
        name: cmd.name().to_string(),
        attrs,
        children,
    })
}

/// Split a body data value into string attributes and child events. Arrays
/// of objects become one child per entry, named after their key; everything
/// else is flattened into the attribute map. The walk stops there, nested
/// values stay as compact JSON strings.
fn split_data(data: &Value) -> (HashMap<String, String>, Vec<Event>) {
    let mut attrs = HashMap::new();
    let mut children = Vec::new();
    match data {
        Value::Object(map) => {
            for (key, value) in map {
                match value {
                    Value::Array(entries) if entries.iter().all(Value::is_object) => {
                        for entry in entries {
                            children.push(Event {
                                name: key.clone(),
                                attrs: super::flatten_value(entry),
                                children: Vec::new(),
                            });
                        }
                    }
                    other => {
                        attrs.insert(key.clone(), value_to_string(other));
                    }
                }
            }
        }
        Value::Null => {}
        other => {
            attrs.insert("value".to_string(), value_to_string(other));
        }
    }
    (attrs, children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::structured;

    fn auth() -> AuthContext {
        AuthContext::new("atom", "token123", "user-1")
    }

    fn device() -> DeviceDescriptor {
        DeviceDescriptor::new("E0001234", "yna5xi", "atom")
    }

    fn region() -> AccountRegion {
        AccountRegion::new("US", "na")
    }

    #[test]
    fn encode_wraps_params_in_header_and_body() {
        let cmd = structured::get_battery();
        let body = JsonCodec
            .encode_request(&cmd, &auth(), &device(), &region())
            .unwrap();
        assert_eq!(body["cmdName"], "getBattery");
        assert_eq!(body["payloadType"], "j");
        assert_eq!(body["td"], "q");
        assert_eq!(body["toType"], "yna5xi");
        assert_eq!(body["payload"]["header"]["ver"], PAYLOAD_HEADER_VERSION);
        assert_eq!(
            body["payload"]["body"]["data"]["id"],
            json!(cmd.request_id())
        );
    }

    #[test]
    fn clean_logs_request_takes_count_as_td() {
        let cmd = structured::get_clean_logs(3);
        let body = JsonCodec
            .encode_request(&cmd, &auth(), &device(), &region())
            .unwrap();
        assert_eq!(body["td"], json!(3));
        assert_eq!(body["country"], "US");
        assert!(body.get("cmdName").is_none());
    }

    #[test]
    fn broadcast_name_comes_from_topic_segment() {
        let payload = json!({
            "header": { "ver": "0.0.50" },
            "body": { "data": { "battery": 95, "isLow": 0 } },
        });
        let event = JsonCodec.decode_broadcast(
            "iot/atr/onBattery/E0001234/yna5xi/atom/j",
            payload.to_string().as_bytes(),
        );
        assert_eq!(event.name, "onBattery");
        assert_eq!(event.attr("battery"), Some("95"));
        assert_eq!(event.attr("isLow"), Some("0"));
    }

    #[test]
    fn broadcast_never_fails_on_garbage() {
        let event = JsonCodec.decode_broadcast("iot/atr/onError/d/c/r/j", b"{broken");
        assert!(event.is_unknown());
        assert!(event.attrs.is_empty());
        assert!(event.children.is_empty());

        let event = JsonCodec.decode_broadcast("", b"{}");
        assert!(event.is_unknown());
    }

    #[test]
    fn broadcast_object_arrays_become_children() {
        let payload = json!({
            "body": { "data": {
                "map": "m1",
                "subsets": [ { "mssid": "7" }, { "mssid": "8" } ],
            } },
        });
        let event =
            JsonCodec.decode_broadcast("iot/atr/onMapSet/d/c/r/j", payload.to_string().as_bytes());
        assert_eq!(event.attr("map"), Some("m1"));
        assert_eq!(event.children.len(), 2);
        assert_eq!(event.children[0].name, "subsets");
        assert_eq!(event.children[1].attr("mssid"), Some("8"));
    }

    #[test]
    fn correlated_response_is_named_after_the_command() {
        let cmd = structured::get_battery();
        let envelope = json!({
            "ret": "ok",
            "resp": { "body": { "code": 0, "msg": "ok", "data": { "value": 87 } } },
        });
        let event = JsonCodec.decode_response(&cmd, &envelope).unwrap().unwrap();
        assert_eq!(event.name, "getBattery");
        assert_eq!(event.attr("value"), Some("87"));
        assert_eq!(event.attr("id"), Some(cmd.request_id()));
    }

    #[test]
    fn correlated_response_with_error_code_fails() {
        let cmd = structured::get_battery();
        let envelope = json!({
            "ret": "ok",
            "resp": { "body": { "code": 500, "msg": "wait for response timed out" } },
        });
        let err = JsonCodec.decode_response(&cmd, &envelope).unwrap_err();
        match err {
            Error::Relay { code, message } => {
                assert_eq!(code, "500");
                assert_eq!(message, "wait for response timed out");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn plain_acknowledgement_yields_no_event() {
        let cmd = structured::clean(
            crate::builders::CleanMode::Auto,
            crate::builders::CleanAction::Start,
        );
        let envelope = json!({ "ret": "ok" });
        assert!(JsonCodec.decode_response(&cmd, &envelope).unwrap().is_none());
    }
}
