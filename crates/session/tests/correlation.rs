//! End-to-end correlation scenario, no broker required: a command goes out,
//! its result comes back as a broker broadcast on the device topic, and the
//! registry resolves it exactly once.

use std::sync::Arc;
use vaclink_core::{Bus, Event};
use vaclink_protocol::{codec_for, DeviceDescriptor, DeviceGeneration};
use vaclink_session::subscriber::handle_publish;
use vaclink_session::PendingCommands;

#[tokio::test]
async fn broadcast_resolves_pending_command_exactly_once() {
    let device = DeviceDescriptor::new("E0001234", "yna5xi", "atom");
    let codec = codec_for(DeviceGeneration::Structured);
    let pending = Arc::new(PendingCommands::new());
    let events: Bus<Event> = Bus::new();
    let mut stream = events.subscribe();

    // A command with id 42 is outstanding.
    let ticket = pending.register("42");
    assert_eq!(pending.len(), 1);

    // The device broadcasts the result on its atr topic.
    let topic = format!(
        "iot/atr/clean/{}/{}/{}/j",
        device.did, device.class, device.resource
    );
    let payload = serde_json::json!({
        "header": { "ver": "0.0.50" },
        "body": { "data": { "id": "42", "state": "clean", "trigger": "app" } },
    });
    handle_publish(
        codec.as_ref(),
        &pending,
        &events,
        &topic,
        payload.to_string().as_bytes(),
    );

    // Resolved exactly once, with the event the codec produced.
    let result = ticket.await.expect("command resolved");
    assert_eq!(result.name, "clean");
    assert_eq!(result.attr("id"), Some("42"));
    assert_eq!(result.attr("state"), Some("clean"));
    assert!(pending.is_empty());

    // A duplicate delivery of the same broadcast is a no-op for the
    // registry but still reaches the event stream.
    handle_publish(
        codec.as_ref(),
        &pending,
        &events,
        &topic,
        payload.to_string().as_bytes(),
    );
    assert!(pending.is_empty());

    assert_eq!(stream.recv().await.unwrap().name, "clean");
    assert_eq!(stream.recv().await.unwrap().name, "clean");
}

#[tokio::test]
async fn unsolicited_telemetry_flows_while_commands_are_pending() {
    let codec = codec_for(DeviceGeneration::Structured);
    let pending = Arc::new(PendingCommands::new());
    let events: Bus<Event> = Bus::new();
    let mut stream = events.subscribe();

    let ticket = pending.register("7");

    // Telemetry without any id must not resolve nor be dropped.
    let payload = serde_json::json!({ "body": { "data": { "battery": 64 } } });
    handle_publish(
        codec.as_ref(),
        &pending,
        &events,
        "iot/atr/onBattery/E0001234/yna5xi/atom/j",
        payload.to_string().as_bytes(),
    );

    assert_eq!(pending.len(), 1);
    let event = stream.recv().await.unwrap();
    assert_eq!(event.name, "onBattery");
    assert_eq!(event.attr("battery"), Some("64"));

    pending.discard("7");
    assert!(ticket.await.is_err());
}
