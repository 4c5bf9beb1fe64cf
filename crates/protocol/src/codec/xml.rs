//! Markup codec for legacy devices.
//!
//! Legacy models speak an attribute-heavy markup dialect: the root `ctl`
//! element carries the command name in its `td` attribute, scalar parameters
//! become root attributes and nested parameter objects become child elements.

use super::{clean_logs_event, clean_logs_request_object, standard_request_object, WireCodec};
use crate::command::Command;
use crate::constants::CLEAN_LOGS_COMMAND;
use crate::device::{AccountRegion, AuthContext, DeviceDescriptor, PayloadFormat};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::warn;
use vaclink_core::{Error, Event, Result};

/// Codec for the legacy markup wire format (payload tag `x`).
pub struct XmlCodec;

impl WireCodec for XmlCodec {
    fn payload_format(&self) -> PayloadFormat {
        PayloadFormat::Xml
    }

    fn encode_request(
        &self,
        cmd: &Command,
        auth: &AuthContext,
        device: &DeviceDescriptor,
        region: &AccountRegion,
    ) -> Result<Value> {
        if cmd.name() == CLEAN_LOGS_COMMAND {
            return Ok(clean_logs_request_object(
                json!("GetCleanLogs"),
                auth,
                device,
                region,
            ));
        }
        let payload = encode_payload(cmd);
        Ok(standard_request_object(
            cmd,
            json!(payload),
            PayloadFormat::Xml,
            auth,
            device,
        ))
    }

    fn decode_broadcast(&self, _topic: &str, payload: &[u8]) -> Event {
        let Ok(text) = std::str::from_utf8(payload) else {
            return Event::unknown();
        };
        let Ok(doc) = roxmltree::Document::parse(text) else {
            return Event::unknown();
        };
        let root = doc.root_element();
        // A broadcast without a root identifier is not interpretable.
        let Some(name) = root.attribute("td") else {
            return Event::unknown();
        };
        Event {
            name: name.to_string(),
            attrs: element_attrs(&root),
            children: child_events(&root),
        }
    }

    fn decode_response(&self, cmd: &Command, envelope: &Value) -> Result<Option<Event>> {
        if let Some(resp) = envelope.get("resp").and_then(Value::as_str) {
            return decode_correlated(cmd, resp).map(Some);
        }
        if let Some(logs) = envelope.get("logs").and_then(Value::as_array) {
            return Ok(Some(clean_logs_event(logs)));
        }
        warn!(command = cmd.name(), "unknown response type received");
        Ok(None)
    }
}

/// Serialize a command to its markup payload.
///
/// The `td` attribute is stripped for REST delivery; the relay injects the
/// routing itself.
fn encode_payload(cmd: &Command) -> String {
    let mut attrs = format!(" id=\"{}\"", escape(cmd.request_id()));
    let mut children = String::new();
    for (key, value) in cmd.params() {
        match value {
            Value::Object(fields) => {
                children.push('<');
                children.push_str(key);
                for (name, field) in fields {
                    push_attr(&mut children, name, field);
                }
                children.push_str("/>");
            }
            other => push_attr(&mut attrs, key, other),
        }
    }
    if children.is_empty() {
        format!("<ctl{}/>", attrs)
    } else {
        format!("<ctl{}>{}</ctl>", attrs, children)
    }
}

fn push_attr(out: &mut String, name: &str, value: &Value) {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(&text));
    out.push('"');
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode a correlated command result: the event is named after the command
/// and the command's own parameters seed the attribute map before the raw
/// attributes are merged on top.
fn decode_correlated(cmd: &Command, payload: &str) -> Result<Event> {
    let doc = roxmltree::Document::parse(payload)
        .map_err(|e| Error::protocol(format!("malformed markup response: {e}")))?;
    let root = doc.root_element();

    let mut attrs = HashMap::new();
    for (key, value) in cmd.params_with_id() {
        attrs.insert(key, super::value_to_string(&value));
    }
    attrs.extend(element_attrs(&root));

    Ok(Event {
        name: cmd.name().to_string(),
        attrs,
        children: child_events(&root),
    })
}

fn element_attrs(node: &roxmltree::Node<'_, '_>) -> HashMap<String, String> {
    node.attributes()
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect()
}

/// Walk exactly one level below the root. Deeper nesting is not interpreted.
fn child_events(root: &roxmltree::Node<'_, '_>) -> Vec<Event> {
    root.children()
        .filter(|n| n.is_element())
        .map(|n| Event {
            name: n.tag_name().name().to_string(),
            attrs: element_attrs(&n),
            children: Vec::new(),
        })
        .collect()
}
