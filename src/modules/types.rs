use derive_more::with_trait::Display;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Data-source kinds offered by the interface selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Deserialize, Serialize)]
pub enum InterfaceType {
    #[display("filestreamNmea0183")]
    #[serde(rename = "filestreamNmea0183")]
    FileStreamNmea0183,
    #[display("filestreamNmea2000")]
    #[serde(rename = "filestreamNmea2000")]
    FileStreamNmea2000,
    #[display("gpsd")]
    #[serde(rename = "gpsd")]
    Gpsd,
    #[display("actisense")]
    #[serde(rename = "actisense")]
    Actisense,
    #[display("canusb")]
    #[serde(rename = "canusb")]
    CanUsb,
}

impl InterfaceType {
    pub const ALL: [InterfaceType; 5] = [
        InterfaceType::FileStreamNmea0183,
        InterfaceType::FileStreamNmea2000,
        InterfaceType::Gpsd,
        InterfaceType::Actisense,
        InterfaceType::CanUsb,
    ];

    /// Maps a selector value to a type. Empty and unknown values map to `None`.
    pub fn from_form_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.to_string() == value)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            InterfaceType::FileStreamNmea0183 => "NMEA 0183 Recording",
            InterfaceType::FileStreamNmea2000 => "NMEA 2000 Recording",
            InterfaceType::Gpsd => "GPSd",
            InterfaceType::Actisense => "Actisense NGT-1",
            InterfaceType::CanUsb => "Lawicel CAN-USB",
        }
    }

    pub fn is_file_stream(self) -> bool {
        matches!(
            self,
            InterfaceType::FileStreamNmea0183 | InterfaceType::FileStreamNmea2000
        )
    }

    pub fn is_device(self) -> bool {
        matches!(self, InterfaceType::Actisense | InterfaceType::CanUsb)
    }
}

/// Result of coercing an integer input. `None` is the "not a number"
/// outcome and goes over the wire as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntField(pub Option<i64>);

impl IntField {
    pub fn is_nan(&self) -> bool {
        self.0.is_none()
    }
}

impl Serialize for IntField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(v) => serializer.serialize_i64(v),
            None => serializer.serialize_none(),
        }
    }
}

impl std::fmt::Display for IntField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("NaN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VesselPayload {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub year: IntField,
    pub registration: String,
    pub mmsi: IntField,
    pub callsign: String,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerPayload {
    pub listen_on: String,
    pub port: IntField,
    pub use_tls: bool,
    pub enable_websockets: bool,
    pub certificate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MqttPayload {
    pub enable: bool,
    pub use_tls: bool,
    pub host: String,
    pub port: IntField,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InterfacePayload {
    pub path: String,
    #[serde(rename = "Type")]
    pub kind: InterfaceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<IntField>,
}

/// Body of `POST /admin`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigPayload {
    pub vessel: VesselPayload,
    pub server: ServerPayload,
    pub mqtt: MqttPayload,
    pub interfaces: BTreeMap<String, InterfacePayload>,
}

/// Body of `POST /apps/install`.
#[derive(Debug, Clone, PartialEq, Eq, Display, Deserialize, Serialize)]
#[display("{package}@{version}")]
pub struct InstallRequest {
    pub package: String,
    pub version: String,
}

/// Response of `GET /admin/uuid`.
#[derive(Debug, Clone, Deserialize)]
pub struct UuidResponse {
    pub uuid: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PgnField {
    #[serde(rename = "Name")]
    pub name: String,
}

/// Message metadata served at `/signalk/v1/api/messages/{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PgnDescriptor {
    pub description: String,
    pub pgn: u32,
    pub category: String,
    pub field_list: Vec<PgnField>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub repeating_fields: Option<u32>,
    #[serde(default)]
    pub is_known: Option<bool>,
}

impl PgnDescriptor {
    pub fn field_names(&self) -> Vec<&str> {
        self.field_list.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn frame_type(&self) -> Option<&'static str> {
        self.size.map(|size| match size {
            0..=8 => "Single Frame",
            9..=223 => "Fast Packet",
            224..=1785 => "ISO 11783 Multi-Packet",
            _ => "Invalid",
        })
    }
}
