//! Broadcast subscriber.
//!
//! One persistent broker connection per session. The device publishes status
//! changes, command results and telemetry on its attribute-report topic;
//! every message is normalized by the codec and published on the event
//! stream whether or not a command is outstanding. Connection problems are
//! published as recoverable broker notices so a supervising component can
//! decide whether to reconnect or abort.

use crate::pending::PendingCommands;
use crate::ErrorNotice;
use rumqttc::{
    AsyncClient, Event as MqttEvent, Incoming, MqttOptions, QoS, TlsConfiguration, Transport,
};
use rustls::{ClientConfig, RootCertStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vaclink_core::{Bus, Event};
use vaclink_protocol::constants::BROKER_KEEP_ALIVE_SECS;
use vaclink_protocol::{AuthContext, DeviceDescriptor, WireCodec};

/// Handle on the running subscriber task.
pub struct Subscriber {
    client: AsyncClient,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Subscriber {
    /// Connect to the broker and start the poll loop.
    ///
    /// The username is the user id qualified by the host prefix of the API
    /// endpoint; the access token is the password.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        broker_host: &str,
        broker_port: u16,
        api_hostname: &str,
        auth: &AuthContext,
        device: &DeviceDescriptor,
        codec: Arc<dyn WireCodec>,
        pending: Arc<PendingCommands>,
        events: Bus<Event>,
        errors: Bus<ErrorNotice>,
    ) -> Self {
        // The broker knows users by the API domain without its TLD.
        let domain_prefix = api_hostname.split('.').next().unwrap_or(api_hostname);
        let username = format!("{}@{}", auth.user_id, domain_prefix);
        let client_id = format!("{}/{}", username, auth.resource);

        let mut options = MqttOptions::new(client_id, broker_host, broker_port);
        options.set_credentials(&username, &auth.token);
        options.set_keep_alive(Duration::from_secs(BROKER_KEEP_ALIVE_SECS));
        options.set_transport(Transport::tls_with_config(broker_tls()));

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let topic = device.atr_topic(codec.payload_format());
        let running = Arc::new(AtomicBool::new(true));

        let loop_client = client.clone();
        let running_flag = running.clone();
        let task = tokio::spawn(async move {
            info!(%topic, "broadcast subscriber started");
            while running_flag.load(Ordering::SeqCst) {
                match eventloop.poll().await {
                    Ok(MqttEvent::Incoming(Incoming::ConnAck(_))) => {
                        // Covers both the initial connect and every
                        // reconnect after the broker dropped us.
                        info!("broker connected, subscribing to atr channel");
                        if let Err(e) = loop_client.subscribe(&topic, QoS::AtMostOnce).await {
                            warn!(error = %e, "subscribe failed");
                            errors.publish(ErrorNotice::Broker(format!("subscribe failed: {e}")));
                        }
                    }
                    Ok(MqttEvent::Incoming(Incoming::Publish(publish))) => {
                        handle_publish(
                            codec.as_ref(),
                            &pending,
                            &events,
                            &publish.topic,
                            &publish.payload,
                        );
                    }
                    Ok(MqttEvent::Incoming(Incoming::Disconnect)) => {
                        if !running_flag.load(Ordering::SeqCst) {
                            break;
                        }
                        warn!("broker sent disconnect");
                        errors.publish(ErrorNotice::Broker(
                            "broker sent disconnect".to_string(),
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if !running_flag.load(Ordering::SeqCst) {
                            break;
                        }
                        warn!(error = %e, "broker connection error, retrying");
                        errors.publish(ErrorNotice::Broker(e.to_string()));
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
            debug!("broadcast subscriber stopped");
        });

        Self {
            client,
            running,
            task,
        }
    }

    /// Gracefully close the broker connection. Never fails, even when the
    /// connection is already gone.
    pub async fn close(self) {
        self.running.store(false, Ordering::SeqCst);
        if let Err(e) = self.client.disconnect().await {
            debug!(error = %e, "broker connection already closed");
        }
        self.task.abort();
        let _ = self.task.await;
    }
}

/// Webpki root store for the broker's public TLS endpoint.
fn broker_root_store() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

fn broker_tls() -> TlsConfiguration {
    let config = ClientConfig::builder()
        .with_root_certificates(broker_root_store())
        .with_no_client_auth();
    TlsConfiguration::Rustls(Arc::new(config))
}

/// Normalize one inbound message and fan it out.
///
/// Delivery to the event stream is unconditional: unsolicited telemetry is
/// valid and must not be dropped. When the event references a pending
/// request id, the registry resolves it (at most once).
pub fn handle_publish(
    codec: &dyn WireCodec,
    pending: &PendingCommands,
    events: &Bus<Event>,
    topic: &str,
    payload: &[u8],
) {
    let event = codec.decode_broadcast(topic, payload);
    if event.is_unknown() {
        debug!(%topic, "unparseable broadcast normalized to unknown event");
    }
    if let Some(id) = event.request_id() {
        if pending.resolve(id, event.clone()) {
            debug!(id, event = %event.name, "broadcast resolved pending command");
        }
    }
    events.publish(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaclink_protocol::{codec_for, DeviceGeneration};

    #[test]
    fn broker_tls_carries_real_roots() {
        // An empty root store is rejected by the TLS stack before any
        // connection attempt, leaving the subscriber unable to ever
        // receive a broadcast.
        assert!(!broker_root_store().is_empty());
        assert!(matches!(broker_tls(), TlsConfiguration::Rustls(_)));
    }

    #[tokio::test]
    async fn broadcast_is_delivered_even_without_pending_command() {
        let codec = codec_for(DeviceGeneration::Structured);
        let pending = PendingCommands::new();
        let events: Bus<Event> = Bus::new();
        let mut rx = events.subscribe();

        let payload = serde_json::json!({ "body": { "data": { "battery": 42 } } });
        handle_publish(
            codec.as_ref(),
            &pending,
            &events,
            "iot/atr/onBattery/d/c/r/j",
            payload.to_string().as_bytes(),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "onBattery");
        assert_eq!(event.attr("battery"), Some("42"));
    }

    #[tokio::test]
    async fn malformed_broadcast_becomes_unknown_event() {
        let codec = codec_for(DeviceGeneration::Legacy);
        let pending = PendingCommands::new();
        let events: Bus<Event> = Bus::new();
        let mut rx = events.subscribe();

        handle_publish(
            codec.as_ref(),
            &pending,
            &events,
            "iot/atr/x/d/c/r/x",
            b"definitely not markup",
        );

        let event = rx.recv().await.unwrap();
        assert!(event.is_unknown());
        assert!(event.attrs.is_empty());
        assert!(event.children.is_empty());
    }

    #[tokio::test]
    async fn duplicate_broadcast_resolves_only_once() {
        let codec = codec_for(DeviceGeneration::Legacy);
        let pending = PendingCommands::new();
        let events: Bus<Event> = Bus::new();
        let mut rx = events.subscribe();

        let ticket = pending.register("42");
        let payload = br#"<ctl td="CleanReport" id="42" type="auto"/>"#;
        handle_publish(codec.as_ref(), &pending, &events, "t/x", payload);
        handle_publish(codec.as_ref(), &pending, &events, "t/x", payload);

        let resolved = ticket.await.unwrap();
        assert_eq!(resolved.name, "CleanReport");
        assert_eq!(resolved.attr("id"), Some("42"));
        assert!(pending.is_empty());

        // Both deliveries still reach the event stream.
        assert_eq!(rx.recv().await.unwrap().name, "CleanReport");
        assert_eq!(rx.recv().await.unwrap().name, "CleanReport");
    }
}
