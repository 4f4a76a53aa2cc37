//! MqttBroker - MQTT v5 client on top of rumqttc

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use contracts::{BrokerConfig, PublishedMessage};
use rumqttc::v5::mqttbytes::v5::{ConnectReturnCode, Packet};
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::v5::{AsyncClient, Event, EventLoop, MqttOptions};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::broker::BrokerClient;
use crate::error::{BrokerError, Result};

/// Capacity of the request channel between client and event loop
const REQUEST_CAPACITY: usize = 256;

/// Pause after an event loop error before polling again (which reconnects)
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

struct MqttSession {
    client: AsyncClient,
    cancel_token: CancellationToken,
    poller: JoinHandle<()>,
}

/// MQTT broker client
pub struct MqttBroker {
    name: String,
    config: BrokerConfig,
    session: Mutex<Option<MqttSession>>,
}

impl MqttBroker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            name: format!("mqtt://{}:{}", config.host, config.port),
            config,
            session: Mutex::new(None),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    fn options(&self) -> MqttOptions {
        let client_id = self.config.client_id.clone().unwrap_or_else(|| {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default();
            format!("telemetry-bridge-{millis}")
        });

        let mut opts = MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        opts.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs))
            .set_clean_start(true);
        opts
    }

    /// Drive the event loop until ConnAck arrives
    async fn await_connack(&self, eventloop: &mut EventLoop) -> Result<()> {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    return match ack.code {
                        ConnectReturnCode::Success => Ok(()),
                        code => Err(BrokerError::connection(
                            self.endpoint(),
                            format!("connection refused: {code:?}"),
                        )),
                    };
                }
                Ok(event) => trace!(?event, "event before connack"),
                Err(e) => return Err(BrokerError::connection(self.endpoint(), e.to_string())),
            }
        }
    }
}

/// Map a configured QoS level to the protocol enum
pub fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Keep the connection alive and log broker events until cancelled
async fn poll_events(mut eventloop: EventLoop, cancel_token: CancellationToken, name: String) {
    debug!(broker = %name, "event loop started");
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                debug!(broker = %name, "shutting down event loop");
                break;
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::Disconnect(_))) => {
                    warn!(broker = %name, "broker sent disconnect");
                }
                Ok(event) => trace!(broker = %name, ?event, "mqtt event"),
                Err(e) => {
                    warn!(broker = %name, error = %e, "mqtt connection error, retrying");
                    tokio::select! {
                        _ = cancel_token.cancelled() => break,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
    }
}

impl BrokerClient for MqttBroker {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "mqtt_broker_connect", skip(self), fields(broker = %self.name))]
    async fn connect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(());
        }

        let (client, mut eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        match tokio::time::timeout(timeout, self.await_connack(&mut eventloop)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(BrokerError::connection(
                    self.endpoint(),
                    format!("no connack within {}ms", timeout.as_millis()),
                ))
            }
        }

        let cancel_token = CancellationToken::new();
        let poller = tokio::spawn(poll_events(
            eventloop,
            cancel_token.clone(),
            self.name.clone(),
        ));
        *session = Some(MqttSession {
            client,
            cancel_token,
            poller,
        });

        info!(qos = self.config.qos, "connected to broker");
        Ok(())
    }

    async fn publish(&self, message: &PublishedMessage) -> Result<()> {
        let client = match self.session.lock().await.as_ref() {
            Some(session) => session.client.clone(),
            None => return Err(BrokerError::NotConnected),
        };

        client
            .publish(
                message.topic,
                qos_from_level(self.config.qos),
                false,
                message.value.to_payload(),
            )
            .await
            .map_err(|e| BrokerError::publish(message.topic, e.to_string()))
    }

    #[instrument(name = "mqtt_broker_disconnect", skip(self), fields(broker = %self.name))]
    async fn disconnect(&self) -> Result<()> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };

        // queue the DISCONNECT before stopping the loop that would send it
        if let Err(e) = session.client.disconnect().await {
            warn!(error = %e, "failed to queue mqtt disconnect");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.cancel_token.cancel();
        if let Err(e) = session.poller.await {
            warn!(error = ?e, "mqtt event loop task failed");
        }

        info!("disconnected from broker");
        Ok(())
    }
}
