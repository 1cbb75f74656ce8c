//! Publish client on top of a pluggable MQTT backend

use log::{info, warn};

use crate::retry::{Attempt, RetryError, RetryPolicy, retry};

/// Trait for message broker backends.
pub trait Broker {
    /// Error type for broker operations
    type Error: std::fmt::Debug;

    /// Attempt one connection to the broker, identifying as `client_id`
    fn connect(&mut self, client_id: &str) -> Result<(), Self::Error>;

    /// Whether the backend currently holds a live session
    fn is_connected(&self) -> bool;

    /// Process keepalive and inbound traffic
    fn poll(&mut self) -> Result<(), Self::Error>;

    /// Queue a QoS 0 message; does not wait for delivery
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Errors that will never clear by retrying (bad configuration and the like)
    fn is_fatal(_error: &Self::Error) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// Broker connection with lazy disconnect detection and blocking reconnect
pub struct PublishClient<B: Broker> {
    broker: B,
    client_id: String,
    policy: RetryPolicy,
    state: LinkState,
}

impl<B: Broker> PublishClient<B> {
    pub fn new(broker: B, client_id: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            broker,
            client_id: client_id.into(),
            policy,
            state: LinkState::Disconnected,
        }
    }

    /// Make sure the broker session is up, reconnecting per the retry policy.
    ///
    /// Blocks while reconnecting. With an unlimited policy this only returns
    /// once connected or on a fatal backend error.
    pub fn ensure_connected(&mut self) -> Result<(), RetryError<B::Error>> {
        if self.broker.is_connected() {
            self.state = LinkState::Connected;
            return Ok(());
        }
        if self.state == LinkState::Connected {
            warn!("Broker connection lost");
        }
        self.state = LinkState::Disconnected;

        let broker = &mut self.broker;
        let client_id = &self.client_id;
        retry(&self.policy, "MQTT connection", |_| {
            info!("Attempting MQTT connection...");
            broker.connect(client_id).map_err(|e| {
                if B::is_fatal(&e) {
                    Attempt::Abort(e)
                } else {
                    Attempt::Retry(e)
                }
            })
        })?;

        info!("MQTT connected as {}", self.client_id);
        self.state = LinkState::Connected;
        Ok(())
    }

    /// Drive keepalive and inbound traffic; no-op while disconnected
    pub fn service(&mut self) {
        if self.state != LinkState::Connected {
            return;
        }
        if let Err(e) = self.broker.poll() {
            warn!("MQTT service error: {:?}", e);
            self.state = LinkState::Disconnected;
        }
    }

    /// Fire-and-forget publish. A failure is logged and the message is dropped;
    /// the next [`PublishClient::ensure_connected`] picks up the broken link.
    pub fn publish(&mut self, topic: &str, payload: &str) -> Result<(), B::Error> {
        self.broker
            .publish(topic, payload.as_bytes())
            .inspect_err(|e| {
                warn!("Publish to {} failed: {:?}", topic, e);
                self.state = LinkState::Disconnected;
            })
    }

    pub fn state(&self) -> LinkState {
        self.state
    }
}
