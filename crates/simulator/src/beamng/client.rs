//! BeamNG TCP control client

use std::collections::HashSet;
use std::time::Duration;

use contracts::{AutopilotMode, Pose, ScenarioSpec, SensorKind, TelemetrySample};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::codec::{write_frame, FrameReader};
use super::electrics::sample_from_electrics;
use crate::client::{SimulatorClient, SimulatorEndpoint};
use crate::error::{Result, SimulatorError};

/// Protocol version announced in the handshake
pub const PROTOCOL_VERSION: &str = "v1.26";

/// Client tuning
#[derive(Debug, Clone)]
pub struct BeamngOptions {
    /// Upper bound for a single request/response exchange
    pub request_timeout: Duration,
}

impl Default for BeamngOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

struct Connection {
    endpoint: SimulatorEndpoint,
    stream: TcpStream,
    reader: FrameReader,
    /// Set while a request frame is being written
    write_pending: bool,
    next_id: u64,
    sensors: HashSet<(String, SensorKind)>,
    /// Vehicle of the loaded scenario
    vehicle: Option<String>,
}

impl Connection {
    /// Send `request` and wait for the response with the same id
    async fn request(&mut self, kind: &str, mut request: Value) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;
        if let Some(map) = request.as_object_mut() {
            map.insert("type".to_string(), json!(kind));
            map.insert("_id".to_string(), json!(id));
        }

        self.write_pending = true;
        write_frame(&mut self.stream, &request).await?;
        self.write_pending = false;

        loop {
            let response = self.reader.read(&mut self.stream).await?;
            if response.get("_id").and_then(Value::as_u64) != Some(id) {
                debug!(request_id = id, ?response, "skipping unrelated message");
                continue;
            }
            return check_response(kind, response);
        }
    }
}

fn check_response(kind: &str, response: Value) -> Result<Value> {
    let response_type = response.get("type").and_then(Value::as_str).unwrap_or("");
    match response_type {
        "BNGError" | "BNGValueError" => {
            let message = response
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unspecified error")
                .to_string();
            Err(SimulatorError::command(kind, format!("{response_type}: {message}")))
        }
        _ => Ok(response),
    }
}

/// Errors after which the byte stream can no longer be trusted
fn breaks_connection(error: &SimulatorError) -> bool {
    matches!(error, SimulatorError::Io(_) | SimulatorError::Protocol { .. })
}

fn expect_type(response: &Value, expected: &str) -> Result<()> {
    match response.get("type").and_then(Value::as_str) {
        Some(t) if t == expected => Ok(()),
        other => Err(SimulatorError::protocol(format!(
            "expected '{expected}' response, got {other:?}"
        ))),
    }
}

/// BeamNG control client
///
/// One control connection shared by all operations; requests are
/// serialized through an async mutex.
pub struct BeamngClient {
    options: BeamngOptions,
    conn: Mutex<Option<Connection>>,
}

impl BeamngClient {
    pub fn new(options: BeamngOptions) -> Self {
        Self {
            options,
            conn: Mutex::new(None),
        }
    }

    /// One request/response under the request timeout
    ///
    /// A response that arrives after its request timed out stays buffered
    /// and is skipped by id on the next exchange. A request cut off while
    /// writing, or a broken stream, drops the connection.
    async fn exchange(&self, kind: &str, request: Value) -> Result<Value> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(SimulatorError::NotConnected)?;
        if conn.write_pending {
            let endpoint = conn.endpoint.to_string();
            warn!(endpoint = %endpoint, "previous request was cut off while sending, dropping connection");
            *guard = None;
            return Err(SimulatorError::connection(
                endpoint,
                "previous request interrupted while sending",
            ));
        }

        let timeout = self.options.request_timeout;
        let result = match tokio::time::timeout(timeout, conn.request(kind, request)).await {
            Ok(result) => result,
            Err(_) => Err(SimulatorError::timeout(kind, timeout)),
        };
        if let Err(e) = &result {
            if breaks_connection(e) {
                warn!(request = kind, error = %e, "simulator stream broken, dropping connection");
                *guard = None;
            }
        }
        result
    }

    async fn exchange_expect(&self, kind: &str, request: Value, expected: &str) -> Result<Value> {
        let response = self.exchange(kind, request).await?;
        expect_type(&response, expected)?;
        Ok(response)
    }
}

impl Default for BeamngClient {
    fn default() -> Self {
        Self::new(BeamngOptions::default())
    }
}

impl SimulatorClient for BeamngClient {
    #[instrument(name = "beamng_open", skip(self), fields(endpoint = %endpoint))]
    async fn open(&self, endpoint: &SimulatorEndpoint) -> Result<()> {
        let mut guard = self.conn.lock().await;
        if guard.is_some() {
            warn!("connection already open, reusing it");
            return Ok(());
        }

        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| SimulatorError::connection(endpoint.to_string(), e.to_string()))?;
        stream.set_nodelay(true)?;

        let mut conn = Connection {
            endpoint: endpoint.clone(),
            stream,
            reader: FrameReader::new(),
            write_pending: false,
            next_id: 0,
            sensors: HashSet::new(),
            vehicle: None,
        };
        let hello = conn
            .request("Hello", json!({ "protocolVersion": PROTOCOL_VERSION }))
            .await
            .map_err(|e| SimulatorError::connection(endpoint.to_string(), e.to_string()))?;
        expect_type(&hello, "Hello")?;

        let remote_version = hello
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or("?");
        info!(remote_version, "connected to simulator");
        *guard = Some(conn);
        Ok(())
    }

    #[instrument(name = "beamng_close", skip(self))]
    async fn close(&self) -> Result<()> {
        let Some(mut conn) = self.conn.lock().await.take() else {
            return Ok(());
        };
        info!(endpoint = %conn.endpoint, "closing simulator connection");
        // the game may drop the socket before answering a quit
        if let Err(e) = write_frame(&mut conn.stream, &json!({ "type": "Quit", "_id": conn.next_id })).await {
            debug!(error = %e, "quit not delivered");
        }
        Ok(())
    }

    #[instrument(name = "beamng_load_scenario", skip(self, scenario), fields(scenario = %scenario.name))]
    async fn load_scenario(&self, scenario: &ScenarioSpec) -> Result<()> {
        let vehicle = &scenario.vehicle;
        let spawn = vehicle.spawn;
        let created = self
            .exchange_expect(
                "CreateScenario",
                json!({
                    "level": scenario.level,
                    "name": scenario.name,
                    "vehicles": [{
                        "vid": vehicle.id,
                        "model": vehicle.model,
                        "color": vehicle.color,
                        "licenseText": vehicle.license,
                        "pos": [spawn.position.x, spawn.position.y, spawn.position.z],
                        "rot": [spawn.rotation.x, spawn.rotation.y, spawn.rotation.z, spawn.rotation.w],
                    }],
                }),
                "ScenarioCreated",
            )
            .await
            .map_err(|e| SimulatorError::scenario_load(&scenario.name, e.to_string()))?;

        let path = created
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| SimulatorError::scenario_load(&scenario.name, "no scenario path returned"))?
            .to_string();

        self.exchange_expect("LoadScenario", json!({ "path": path }), "MapLoaded")
            .await
            .map_err(|e| SimulatorError::scenario_load(&scenario.name, e.to_string()))?;

        if let Some(conn) = self.conn.lock().await.as_mut() {
            conn.vehicle = Some(vehicle.id.clone());
        }
        info!(path = %path, "scenario loaded");
        Ok(())
    }

    #[instrument(name = "beamng_start_scenario", skip(self))]
    async fn start_scenario(&self) -> Result<()> {
        self.exchange_expect("StartScenario", json!({}), "ScenarioStarted")
            .await
            .map(|_| ())
    }

    #[instrument(name = "beamng_stop_scenario", skip(self))]
    async fn stop_scenario(&self) -> Result<()> {
        self.exchange_expect("StopScenario", json!({}), "ScenarioStopped")
            .await
            .map(|_| ())
    }

    #[instrument(name = "beamng_attach_sensor", skip(self), fields(vehicle_id = %vehicle_id, sensor = sensor.name()))]
    async fn attach_sensor(&self, vehicle_id: &str, sensor: SensorKind) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(SimulatorError::NotConnected)?;
        if conn.vehicle.as_deref() != Some(vehicle_id) {
            return Err(SimulatorError::command(
                "attach_sensor",
                format!("vehicle '{vehicle_id}' not in scenario"),
            ));
        }
        // electrics is polled on demand, attaching only registers it
        conn.sensors.insert((vehicle_id.to_string(), sensor));
        Ok(())
    }

    async fn poll_sensors(&self, vehicle_id: &str) -> Result<TelemetrySample> {
        {
            let guard = self.conn.lock().await;
            let conn = guard.as_ref().ok_or(SimulatorError::NotConnected)?;
            if !conn
                .sensors
                .contains(&(vehicle_id.to_string(), SensorKind::Electrics))
            {
                return Err(SimulatorError::sensor_poll(
                    vehicle_id,
                    "electrics sensor not attached",
                ));
            }
        }

        let response = self
            .exchange_expect(
                "SensorRequest",
                json!({ "vid": vehicle_id, "sensors": { "electrics": { "type": "Electrics" } } }),
                "SensorData",
            )
            .await
            .map_err(|e| SimulatorError::sensor_poll(vehicle_id, e.to_string()))?;

        let electrics = response
            .pointer("/data/electrics")
            .ok_or_else(|| SimulatorError::sensor_poll(vehicle_id, "no electrics in response"))?;
        sample_from_electrics(vehicle_id, electrics)
    }

    #[instrument(name = "beamng_set_autopilot", skip(self), fields(vehicle_id = %vehicle_id, mode = mode.as_str()))]
    async fn set_autopilot_mode(&self, vehicle_id: &str, mode: AutopilotMode) -> Result<()> {
        self.exchange_expect(
            "SetAiMode",
            json!({ "vid": vehicle_id, "mode": mode.as_str() }),
            "AiModeSet",
        )
        .await
        .map(|_| ())
    }

    #[instrument(name = "beamng_teleport", skip(self, pose), fields(vehicle_id = %vehicle_id))]
    async fn teleport(&self, vehicle_id: &str, pose: Pose) -> Result<()> {
        let response = self
            .exchange_expect(
                "Teleport",
                json!({
                    "vehicle": vehicle_id,
                    "pos": [pose.position.x, pose.position.y, pose.position.z],
                    "rot": [pose.rotation.x, pose.rotation.y, pose.rotation.z, pose.rotation.w],
                    "reset": true,
                }),
                "Teleported",
            )
            .await?;

        if response.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(SimulatorError::command("teleport", "simulator refused teleport"));
        }
        Ok(())
    }
}
