//! Main loop context

use embedded_hal::digital::InputPin;
use log::{info, warn};
use std::fmt::Debug;
use std::time::{Duration, Instant};

use crate::broker::{Broker, PublishClient};
use crate::network::{Network, connect_network};
use crate::retry::{RetryError, RetryPolicy};
use crate::scanner::TagScanner;
use crate::transport::Pn532Transport;

/// Link the main loop could not bring back up
#[derive(Debug, thiserror::Error)]
pub enum LinkError<N: Debug, B: Debug> {
    #[error("network: {0}")]
    Network(RetryError<N>),
    #[error("broker: {0}")]
    Broker(RetryError<B>),
}

/// Owns everything the main loop touches
pub struct App<T: Pn532Transport, P: InputPin, N: Network, B: Broker> {
    network: N,
    network_policy: RetryPolicy,
    scanner: TagScanner<T, P>,
    client: PublishClient<B>,
    topic: String,
}

impl<T: Pn532Transport, P: InputPin, N: Network, B: Broker> App<T, P, N, B> {
    pub fn new(
        network: N,
        network_policy: RetryPolicy,
        scanner: TagScanner<T, P>,
        client: PublishClient<B>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            network,
            network_policy,
            scanner,
            client,
            topic: topic.into(),
        }
    }

    /// One main-loop iteration at time `now`.
    ///
    /// Returns the payload handed to the publish client in this iteration, if
    /// any. Scanning is suspended while the network or the broker link is being
    /// re-established.
    pub fn step(&mut self, now: Instant) -> Result<Option<String>, LinkError<N::Error, B::Error>> {
        if !self.network.is_associated() {
            warn!("Network association lost");
            connect_network(&mut self.network, &self.network_policy).map_err(LinkError::Network)?;
        }
        self.client.ensure_connected().map_err(LinkError::Broker)?;
        self.client.service();

        let Some(uid) = self.scanner.poll(now) else {
            return Ok(None);
        };

        let payload = uid.to_hex();
        info!("Publishing tag: {}", payload);
        // dropped on failure; the link is rechecked next iteration
        let _ = self.client.publish(&self.topic, &payload);
        Ok(Some(payload))
    }

    /// Run the main loop until a link gives up, sleeping `idle` between
    /// iterations so lower-priority tasks get to run.
    pub fn run(&mut self, idle: Duration) -> LinkError<N::Error, B::Error> {
        loop {
            if let Err(e) = self.step(Instant::now()) {
                return e;
            }
            std::thread::sleep(idle);
        }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn scanner(&self) -> &TagScanner<T, P> {
        &self.scanner
    }

    pub fn client(&self) -> &PublishClient<B> {
        &self.client
    }
}
