//! The session: one robot, one broker connection, one relay client.
//!
//! All per-connection state lives in this explicit value with an open/close
//! lifecycle. Reconnecting means closing the session and opening a new one;
//! auth context and device descriptor are read-only once the session exists.

use crate::pending::PendingCommands;
use crate::relay::{RelayClient, WireEnvelope};
use crate::subscriber::Subscriber;
use crate::ErrorNotice;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};
use vaclink_core::{Bus, BusReceiver, Error, Event, Result};
use vaclink_protocol::constants::DEFAULT_BROKER_PORT;
use vaclink_protocol::{
    codec_for, AccountRegion, AuthContext, Command, DeviceDescriptor, DeviceGeneration,
    ErrorClassifier, WireCodec,
};

/// Configuration for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub auth: AuthContext,
    pub device: DeviceDescriptor,
    pub region: AccountRegion,
    pub generation: DeviceGeneration,
    /// Hostname of the vendor API endpoint; its first label qualifies the
    /// broker username.
    pub api_hostname: String,
    pub broker_host: String,
    pub broker_port: u16,
    /// Timeout for the relay's synchronous response.
    pub http_timeout_secs: u64,
}

impl SessionConfig {
    pub fn new(
        auth: AuthContext,
        device: DeviceDescriptor,
        region: AccountRegion,
        generation: DeviceGeneration,
        broker_host: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            device,
            region,
            generation,
            api_hostname: "ecovacs.com".to_string(),
            broker_host: broker_host.into(),
            broker_port: DEFAULT_BROKER_PORT,
            http_timeout_secs: 60,
        }
    }

    pub fn with_broker_port(mut self, port: u16) -> Self {
        self.broker_port = port;
        self
    }

    pub fn with_api_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.api_hostname = hostname.into();
        self
    }

    pub fn with_http_timeout(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }
}

/// An open session against one robot.
pub struct Session {
    device: DeviceDescriptor,
    codec: Arc<dyn WireCodec>,
    relay: RelayClient,
    pending: Arc<PendingCommands>,
    events: Bus<Event>,
    errors: Bus<ErrorNotice>,
    subscriber: Subscriber,
}

impl Session {
    /// Open a session with a classifier that never suppresses codes.
    pub fn open(config: SessionConfig) -> Result<Self> {
        Self::open_with_classifier(config, ErrorClassifier::strict())
    }

    /// Open a session. Connects the broadcast subscriber and prepares the
    /// relay client; the synchronous relay is only contacted per command.
    pub fn open_with_classifier(
        config: SessionConfig,
        classifier: ErrorClassifier,
    ) -> Result<Self> {
        let codec = codec_for(config.generation);
        let pending = Arc::new(PendingCommands::new());
        let events: Bus<Event> = Bus::new();
        let errors: Bus<ErrorNotice> = Bus::new();

        let relay = RelayClient::new(
            config.auth.clone(),
            config.device.clone(),
            config.region.clone(),
            config.generation,
            classifier,
            errors.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )?;

        let subscriber = Subscriber::spawn(
            &config.broker_host,
            config.broker_port,
            &config.api_hostname,
            &config.auth,
            &config.device,
            codec.clone(),
            pending.clone(),
            events.clone(),
            errors.clone(),
        );

        info!(did = %config.device.did, "session opened");
        Ok(Self {
            device: config.device,
            codec,
            relay,
            pending,
            events,
            errors,
            subscriber,
        })
    }

    /// Send a command through the relay.
    ///
    /// Suspends only until the relay's synchronous envelope arrives. The
    /// returned ticket resolves when the real result does, which for
    /// structured devices is a later broker broadcast and may never happen
    /// if that broadcast is dropped.
    pub async fn send(&self, cmd: Command) -> Result<CommandTicket> {
        // Register before the POST: the broadcast result may overtake the
        // synchronous acknowledgement.
        let rx = self.pending.register(cmd.request_id());
        let ticket = CommandTicket {
            request_id: cmd.request_id().to_string(),
            rx,
        };

        let envelope = match self.relay.send(self.codec.as_ref(), &cmd).await {
            Ok(envelope) => envelope,
            Err(e) => {
                self.pending.discard(cmd.request_id());
                return Err(e);
            }
        };

        if let Err(e) = self.accept_envelope(&cmd, &envelope) {
            self.pending.discard(cmd.request_id());
            return Err(e);
        }
        Ok(ticket)
    }

    /// Handle the relay's synchronous envelope for one command.
    ///
    /// An inline result (legacy devices) is a normalized event like any
    /// broadcast: it goes out on the event stream and resolves through the
    /// registry, so a racing broadcast cannot double-fire and subscribers
    /// see it even when the caller drops the ticket.
    fn accept_envelope(&self, cmd: &Command, envelope: &WireEnvelope) -> Result<()> {
        if !envelope.is_ok() {
            return Ok(());
        }
        match self.codec.decode_response(cmd, envelope.raw()) {
            Ok(Some(event)) => {
                self.events.publish(event.clone());
                self.pending.resolve(cmd.request_id(), event);
                Ok(())
            }
            Ok(None) => {
                debug!(command = cmd.name(), "acknowledged, awaiting broadcast");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Send a command and wait for its correlated result.
    pub async fn send_and_wait(&self, cmd: Command, timeout: Duration) -> Result<Event> {
        let ticket = self.send(cmd).await?;
        ticket.wait_timeout(timeout).await
    }

    /// Subscribe to the stream of normalized events.
    pub fn events(&self) -> BusReceiver<Event> {
        self.events.subscribe()
    }

    /// Subscribe to the stream of classified errors and network notices.
    pub fn errors(&self) -> BusReceiver<ErrorNotice> {
        self.errors.subscribe()
    }

    /// The device this session addresses.
    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    /// Number of commands still awaiting a result.
    pub fn pending_commands(&self) -> usize {
        self.pending.len()
    }

    /// Close the session: unsubscribe and disconnect the broker connection
    /// and abandon every pending command. Safe to call with the connection
    /// already gone.
    pub async fn close(self) {
        let abandoned = self.pending.drain();
        if abandoned > 0 {
            debug!(abandoned, "discarded pending commands at disconnect");
        }
        self.subscriber.close().await;
        info!(did = %self.device.did, "session closed");
    }
}

/// Handle on one in-flight command.
pub struct CommandTicket {
    request_id: String,
    rx: oneshot::Receiver<Event>,
}

impl CommandTicket {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait for the correlated result. Resolves with an error if the session
    /// was closed with this command still pending.
    pub async fn wait(self) -> Result<Event> {
        let id = self.request_id;
        self.rx
            .await
            .map_err(|_| Error::correlation_timeout(format!("command {id} abandoned")))
    }

    /// Wait for the correlated result, giving up after `timeout`.
    pub async fn wait_timeout(self, timeout: Duration) -> Result<Event> {
        let id = self.request_id.clone();
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(result) => result,
            Err(_) => Err(Error::correlation_timeout(format!(
                "no result for command {id} within {timeout:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders() {
        let config = SessionConfig::new(
            AuthContext::new("atom", "token123", "user-1"),
            DeviceDescriptor::new("E0001234", "yna5xi", "atom"),
            AccountRegion::new("US", "na"),
            DeviceGeneration::Structured,
            "mq-na.ecouser.net",
        )
        .with_broker_port(8884)
        .with_http_timeout(10);

        assert_eq!(config.broker_port, 8884);
        assert_eq!(config.http_timeout_secs, 10);
        assert_eq!(config.api_hostname, "ecovacs.com");
    }

    #[tokio::test]
    async fn inline_result_reaches_stream_and_ticket() {
        let config = SessionConfig::new(
            AuthContext::new("atom", "token123", "user-1"),
            DeviceDescriptor::new("E0001234", "126", "atom"),
            AccountRegion::new("DE", "eu"),
            DeviceGeneration::Legacy,
            "localhost",
        )
        .with_broker_port(1);
        let session = Session::open(config).unwrap();
        let mut events = session.events();

        let cmd = vaclink_protocol::builders::legacy::get_battery_state();
        let rx = session.pending.register(cmd.request_id());
        let envelope = WireEnvelope::new(serde_json::json!({
            "ret": "ok",
            "resp": "<ctl td=\"BatteryInfo\"><battery power=\"82\"/></ctl>",
        }));
        session.accept_envelope(&cmd, &envelope).unwrap();

        // The result is on the stream for every subscriber, not only on
        // the ticket.
        let streamed = events.recv().await.unwrap();
        assert_eq!(streamed.name, "GetBatteryInfo");
        assert_eq!(streamed.children[0].attr("power"), Some("82"));
        let resolved = rx.await.unwrap();
        assert_eq!(resolved.name, "GetBatteryInfo");

        session.close().await;
    }

    #[tokio::test]
    async fn ticket_times_out_without_result() {
        let pending = PendingCommands::new();
        let rx = pending.register("42");
        let ticket = CommandTicket {
            request_id: "42".to_string(),
            rx,
        };
        let err = ticket
            .wait_timeout(Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CorrelationTimeout(_)));
    }
}
