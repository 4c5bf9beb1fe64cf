//! Minimal controller: start a cleaning cycle and react to device errors.
//!
//! Credentials and device routing come from the environment; obtaining them
//! (login/token exchange, device listing) is outside this crate.
//!
//! ```text
//! VACLINK_TOKEN=... VACLINK_USER=... VACLINK_DID=... VACLINK_CLASS=... \
//! VACLINK_RESOURCE=... VACLINK_BROKER=mq-na.ecouser.net \
//! cargo run --example clean_demo
//! ```

use std::time::Duration;
use vaclink_protocol::builders::{structured, CleanAction, CleanMode};
use vaclink_protocol::{
    AccountRegion, AuthContext, DeviceDescriptor, DeviceGeneration, Outcome,
};
use vaclink_session::{ErrorNotice, Session, SessionConfig};

fn env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = SessionConfig::new(
        AuthContext::new(env("VACLINK_RESOURCE"), env("VACLINK_TOKEN"), env("VACLINK_USER")),
        DeviceDescriptor::new(env("VACLINK_DID"), env("VACLINK_CLASS"), env("VACLINK_RESOURCE")),
        AccountRegion::new("US", "na"),
        DeviceGeneration::Structured,
        env("VACLINK_BROKER"),
    );
    let session = Session::open(config)?;

    let mut events = session.events();
    let mut errors = session.errors();

    let ticket = session.send(structured::clean(CleanMode::Auto, CleanAction::Start)).await?;
    println!("clean command acknowledged, request id {}", ticket.request_id());

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                println!("event: {} {:?}", event.name, event.attrs);
            }
            Some(notice) = errors.recv() => {
                match notice {
                    ErrorNotice::Vendor(err) => match err.outcome {
                        Outcome::Resume => {
                            // Device paused itself; nudge it after a moment.
                            println!("device paused ({}), resuming shortly", err.code);
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            session.send(structured::resume()).await?;
                        }
                        Outcome::Complete => {
                            println!("cleaning complete");
                            break;
                        }
                        _ => println!("device error: {err}"),
                    },
                    ErrorNotice::Broker(msg) => println!("broker trouble: {msg}"),
                    ErrorNotice::Network(msg) => println!("network trouble: {msg}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("shutting down");
                break;
            }
        }
    }

    session.close().await;
    Ok(())
}
