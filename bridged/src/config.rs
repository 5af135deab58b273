use anyhow::{Result, bail};
use dotenv::dotenv;
use std::{
    fmt::{self, Display, Formatter},
    net::SocketAddr,
    str::FromStr,
    time::Duration,
};
use url::Url;

#[derive(Clone, Debug, PartialEq)]
pub enum BusKind {
    InMem,
    Mqtt,
}

impl FromStr for BusKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inmem" => Ok(BusKind::InMem),
            "mqtt" => Ok(BusKind::Mqtt),
            _ => Err(()),
        }
    }
}

impl BusKind {
    fn as_str(&self) -> &'static str {
        match self {
            BusKind::InMem => "inmem",
            BusKind::Mqtt => "mqtt",
        }
    }
}

impl Display for BusKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StorageKind {
    InMem,
    Postgres,
}

impl FromStr for StorageKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inmem" => Ok(StorageKind::InMem),
            "postgres" => Ok(StorageKind::Postgres),
            _ => Err(()),
        }
    }
}

impl StorageKind {
    fn as_str(&self) -> &'static str {
        match self {
            StorageKind::InMem => "inmem",
            StorageKind::Postgres => "postgres",
        }
    }
}

impl Display for StorageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind: SocketAddr,
    pub bus: BusKind,
    pub mqtt: MqttConfig,
    /// Bus topic carrying raw telemetry.
    pub topic: String,
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".parse().unwrap(),
            bus: BusKind::InMem,
            mqtt: MqttConfig::default(),
            topic: "data".to_string(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let mut c = Self::default();
        if let Ok(s) = std::env::var("BRIDGE_BIND") {
            c.bind = s.parse()?;
        }
        if let Ok(s) = std::env::var("BRIDGE_BUS") {
            let Ok(kind) = BusKind::from_str(&s) else {
                bail!("unknown bus kind: {s}");
            };
            c.bus = kind;
        }
        if let Ok(conn) = std::env::var("BRIDGE_MQTT_URL") {
            c.mqtt = MqttConfig::from_connection_string(&conn)?;
        }
        if let Ok(s) = std::env::var("BRIDGE_MQTT_HOST") {
            c.mqtt.host = s;
        }
        if let Ok(s) = std::env::var("BRIDGE_MQTT_PORT") {
            c.mqtt.port = s.parse()?;
        }
        if let Ok(s) = std::env::var("BRIDGE_MQTT_CLIENT_ID") {
            c.mqtt.client_id = s;
        }
        if let Ok(s) = std::env::var("BRIDGE_TOPIC") {
            c.topic = s;
        }
        if let Ok(s) = std::env::var("BRIDGE_STORAGE") {
            let Ok(kind) = StorageKind::from_str(&s) else {
                bail!("unknown storage kind: {s}");
            };
            c.storage.kind = kind;
        }
        if let Ok(s) = std::env::var("BRIDGE_DATABASE_URL") {
            c.storage.database_url = Some(s);
        }
        if let Ok(s) = std::env::var("BRIDGE_STORAGE_TIMEOUT_MS") {
            c.storage.op_timeout = Duration::from_millis(s.parse()?);
        }
        Ok(c)
    }
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub database_url: Option<String>,
    /// Upper bound for a single storage operation; an unresponsive store
    /// fails that message instead of piling up tasks.
    pub op_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { kind: StorageKind::InMem, database_url: None, op_timeout: Duration::from_secs(5) }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 1883, client_id: "bridged".to_string() }
    }
}

impl MqttConfig {
    fn from_connection_string(conn: &str) -> Result<Self> {
        let url = Url::parse(conn)?;
        if url.scheme() != "mqtt" {
            anyhow::bail!("unsupported mqtt url scheme: {}", url.scheme());
        }

        let host =
            url.host_str().ok_or_else(|| anyhow::anyhow!("mqtt url missing host"))?.to_string();
        let port = url.port().unwrap_or(1883);
        let client_id = url
            .query_pairs()
            .find(|(k, _)| k == "client_id")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| "bridged".to_string());

        Ok(Self { host, port, client_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mqtt_url_parses_host_port_and_client_id() {
        let cfg =
            MqttConfig::from_connection_string("mqtt://broker.local:2883?client_id=edge-1").unwrap();
        assert_eq!(cfg, MqttConfig {
            host: "broker.local".into(),
            port: 2883,
            client_id: "edge-1".into()
        });
    }

    #[test]
    fn mqtt_url_defaults() {
        let cfg = MqttConfig::from_connection_string("mqtt://broker.local").unwrap();
        assert_eq!(cfg.port, 1883);
        assert_eq!(cfg.client_id, "bridged");
    }

    #[test]
    fn mqtt_url_rejects_other_schemes() {
        assert!(MqttConfig::from_connection_string("http://broker.local").is_err());
    }
}
