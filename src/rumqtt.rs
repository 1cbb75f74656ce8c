//! MQTT backend for desktop using rumqttc

use log::debug;
use rumqttc::{
    Client, ClientError, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions,
    Packet, QoS, RecvTimeoutError,
};
use std::time::{Duration, Instant};

use crate::broker::Broker;

#[derive(Debug, thiserror::Error)]
pub enum RumqttError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("client error: {0}")]
    Client(#[from] ClientError),
    #[error("broker refused connection: {0:?}")]
    Refused(ConnectReturnCode),
    #[error("timed out waiting for CONNACK")]
    Timeout,
    #[error("not connected to broker")]
    NotConnected,
}

/// Synchronous rumqttc client; network I/O only happens inside `connect` and `poll`
pub struct RumqttBroker {
    host: String,
    port: u16,
    keep_alive: Duration,
    connect_timeout: Duration,
    session: Option<(Client, Connection)>,
}

impl RumqttBroker {
    // how long one `poll` may wait for traffic
    const SERVICE_SLICE: Duration = Duration::from_millis(5);

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            keep_alive: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            session: None,
        }
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

impl Broker for RumqttBroker {
    type Error = RumqttError;

    fn connect(&mut self, client_id: &str) -> Result<(), Self::Error> {
        self.session = None;

        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        let (client, mut connection) = Client::new(options, 10);

        let start = Instant::now();
        loop {
            let remaining = self
                .connect_timeout
                .checked_sub(start.elapsed())
                .ok_or(RumqttError::Timeout)?;

            match connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(RumqttError::Refused(ack.code));
                    }
                    self.session = Some((client, connection));
                    return Ok(());
                }
                Ok(Ok(event)) => debug!("MQTT event while connecting: {:?}", event),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(RumqttError::Timeout),
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn poll(&mut self) -> Result<(), Self::Error> {
        let (_, connection) = self.session.as_mut().ok_or(RumqttError::NotConnected)?;

        loop {
            match connection.recv_timeout(Self::SERVICE_SLICE) {
                Ok(Ok(Event::Incoming(Packet::Disconnect))) => {
                    self.session = None;
                    return Err(RumqttError::NotConnected);
                }
                Ok(Ok(event)) => debug!("MQTT event: {:?}", event),
                Ok(Err(e)) => {
                    self.session = None;
                    return Err(e.into());
                }
                Err(RecvTimeoutError::Timeout) => return Ok(()),
                Err(RecvTimeoutError::Disconnected) => {
                    self.session = None;
                    return Err(RumqttError::NotConnected);
                }
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        let (client, _) = self.session.as_mut().ok_or(RumqttError::NotConnected)?;
        client.try_publish(topic, QoS::AtMostOnce, false, payload.to_vec())?;
        Ok(())
    }
}
