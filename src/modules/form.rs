use crate::modules::types::{
    ConfigPayload, IntField, InterfacePayload, InterfaceType, MqttPayload, ServerPayload,
    VesselPayload,
};
use derive_more::with_trait::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

pub const UUID_SEGMENTS: usize = 5;

/// Every control of the configuration form, named by its page identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FieldId {
    #[display("vesselName")]
    VesselName,
    #[display("vesselManufacturer")]
    VesselManufacturer,
    #[display("vesselModel")]
    VesselModel,
    #[display("vesselYear")]
    VesselYear,
    #[display("registration")]
    Registration,
    #[display("mmsi")]
    Mmsi,
    #[display("callsign")]
    Callsign,
    #[display("uuid_{_0}")]
    Uuid(usize),
    #[display("listenOn")]
    ListenOn,
    #[display("port")]
    Port,
    #[display("useTls")]
    UseTls,
    #[display("enableWebsockets")]
    EnableWebsockets,
    #[display("certificate")]
    Certificate,
    #[display("mqttEnable")]
    MqttEnable,
    #[display("mqttUseTls")]
    MqttUseTls,
    #[display("mqttHost")]
    MqttHost,
    #[display("mqttPort")]
    MqttPort,
    #[display("mqttClientId")]
    MqttClientId,
    #[display("mqttUsername")]
    MqttUsername,
    #[display("mqttPassword")]
    MqttPassword,
    #[display("mqttChannel")]
    MqttChannel,
    #[display("interfaceType")]
    InterfaceType,
    #[display("devicePath")]
    DevicePath,
    #[display("baudRate")]
    BaudRate,
    #[display("fileName")]
    FileName,
    #[display("gpsdPort")]
    GpsdPort,
}

impl FieldId {
    pub fn all() -> Vec<FieldId> {
        let mut ids = vec![
            FieldId::VesselName,
            FieldId::VesselManufacturer,
            FieldId::VesselModel,
            FieldId::VesselYear,
            FieldId::Registration,
            FieldId::Mmsi,
            FieldId::Callsign,
        ];
        ids.extend((0..UUID_SEGMENTS).map(FieldId::Uuid));
        ids.extend([
            FieldId::ListenOn,
            FieldId::Port,
            FieldId::UseTls,
            FieldId::EnableWebsockets,
            FieldId::Certificate,
            FieldId::MqttEnable,
            FieldId::MqttUseTls,
            FieldId::MqttHost,
            FieldId::MqttPort,
            FieldId::MqttClientId,
            FieldId::MqttUsername,
            FieldId::MqttPassword,
            FieldId::MqttChannel,
            FieldId::InterfaceType,
            FieldId::DevicePath,
            FieldId::BaudRate,
            FieldId::FileName,
            FieldId::GpsdPort,
        ]);
        ids
    }
}

impl FromStr for FieldId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldId::all()
            .into_iter()
            .find(|id| id.to_string() == s)
            .ok_or_else(|| format!("unknown form field `{s}`"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VesselInputs {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub year: String,
    pub registration: String,
    pub mmsi: String,
    pub callsign: String,
    pub uuid: [String; UUID_SEGMENTS],
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerInputs {
    pub listen_on: String,
    pub port: String,
    pub use_tls: bool,
    pub enable_websockets: bool,
    pub certificate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MqttInputs {
    pub enable: bool,
    pub use_tls: bool,
    pub host: String,
    pub port: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub channel: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderInputs {
    pub interface_type: String,
    pub device_path: String,
    pub baud_rate: String,
    pub file_name: String,
    pub gpsd_port: String,
}

/// One row of the provider list.
#[derive(Debug, Clone, PartialEq, Display, Deserialize, Serialize)]
#[display("{name} path={path} file={file}")]
pub struct ProviderEntry {
    pub kind: InterfaceType,
    pub name: String,
    pub path: String,
    pub file: String,
    pub speed: String,
}

impl ProviderEntry {
    fn to_payload(&self) -> InterfacePayload {
        let path = if self.kind.is_file_stream() {
            self.file.clone()
        } else {
            self.path.clone()
        };
        InterfacePayload {
            path,
            kind: self.kind,
            speed: self.kind.is_device().then(|| parse_int(&self.speed)),
        }
    }
}

/// In-memory mirror of the configuration form controls. Numeric inputs
/// stay as typed text until the payload is built.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigForm {
    pub vessel: VesselInputs,
    pub server: ServerInputs,
    pub mqtt: MqttInputs,
    pub provider: ProviderInputs,
    pub providers: Vec<ProviderEntry>,
}

impl ConfigForm {
    pub fn get(&self, field: FieldId) -> String {
        match field {
            FieldId::VesselName => self.vessel.name.clone(),
            FieldId::VesselManufacturer => self.vessel.manufacturer.clone(),
            FieldId::VesselModel => self.vessel.model.clone(),
            FieldId::VesselYear => self.vessel.year.clone(),
            FieldId::Registration => self.vessel.registration.clone(),
            FieldId::Mmsi => self.vessel.mmsi.clone(),
            FieldId::Callsign => self.vessel.callsign.clone(),
            FieldId::Uuid(i) => self.vessel.uuid.get(i).cloned().unwrap_or_default(),
            FieldId::ListenOn => self.server.listen_on.clone(),
            FieldId::Port => self.server.port.clone(),
            FieldId::UseTls => self.server.use_tls.to_string(),
            FieldId::EnableWebsockets => self.server.enable_websockets.to_string(),
            FieldId::Certificate => self.server.certificate.clone(),
            FieldId::MqttEnable => self.mqtt.enable.to_string(),
            FieldId::MqttUseTls => self.mqtt.use_tls.to_string(),
            FieldId::MqttHost => self.mqtt.host.clone(),
            FieldId::MqttPort => self.mqtt.port.clone(),
            FieldId::MqttClientId => self.mqtt.client_id.clone(),
            FieldId::MqttUsername => self.mqtt.username.clone(),
            FieldId::MqttPassword => self.mqtt.password.clone(),
            FieldId::MqttChannel => self.mqtt.channel.clone(),
            FieldId::InterfaceType => self.provider.interface_type.clone(),
            FieldId::DevicePath => self.provider.device_path.clone(),
            FieldId::BaudRate => self.provider.baud_rate.clone(),
            FieldId::FileName => self.provider.file_name.clone(),
            FieldId::GpsdPort => self.provider.gpsd_port.clone(),
        }
    }

    fn checkbox_mut(&mut self, field: FieldId) -> Option<&mut bool> {
        match field {
            FieldId::UseTls => Some(&mut self.server.use_tls),
            FieldId::EnableWebsockets => Some(&mut self.server.enable_websockets),
            FieldId::MqttEnable => Some(&mut self.mqtt.enable),
            FieldId::MqttUseTls => Some(&mut self.mqtt.use_tls),
            _ => None,
        }
    }

    fn text_mut(&mut self, field: FieldId) -> Option<&mut String> {
        let slot = match field {
            FieldId::VesselName => &mut self.vessel.name,
            FieldId::VesselManufacturer => &mut self.vessel.manufacturer,
            FieldId::VesselModel => &mut self.vessel.model,
            FieldId::VesselYear => &mut self.vessel.year,
            FieldId::Registration => &mut self.vessel.registration,
            FieldId::Mmsi => &mut self.vessel.mmsi,
            FieldId::Callsign => &mut self.vessel.callsign,
            FieldId::Uuid(i) => return self.vessel.uuid.get_mut(i),
            FieldId::ListenOn => &mut self.server.listen_on,
            FieldId::Port => &mut self.server.port,
            FieldId::Certificate => &mut self.server.certificate,
            FieldId::MqttHost => &mut self.mqtt.host,
            FieldId::MqttPort => &mut self.mqtt.port,
            FieldId::MqttClientId => &mut self.mqtt.client_id,
            FieldId::MqttUsername => &mut self.mqtt.username,
            FieldId::MqttPassword => &mut self.mqtt.password,
            FieldId::MqttChannel => &mut self.mqtt.channel,
            FieldId::InterfaceType => &mut self.provider.interface_type,
            FieldId::DevicePath => &mut self.provider.device_path,
            FieldId::BaudRate => &mut self.provider.baud_rate,
            FieldId::FileName => &mut self.provider.file_name,
            FieldId::GpsdPort => &mut self.provider.gpsd_port,
            FieldId::UseTls
            | FieldId::EnableWebsockets
            | FieldId::MqttEnable
            | FieldId::MqttUseTls => return None,
        };
        Some(slot)
    }

    /// Writes the raw text of a control. Checkbox controls only accept
    /// boolean spellings; text controls accept anything.
    pub fn set(&mut self, field: FieldId, value: &str) -> Result<(), String> {
        if let Some(checkbox) = self.checkbox_mut(field) {
            *checkbox = parse_checkbox(value)
                .ok_or_else(|| format!("`{value}` is not a checkbox state for {field}"))?;
            return Ok(());
        }
        let slot = self
            .text_mut(field)
            .ok_or_else(|| format!("no form control {field}"))?;
        *slot = value.to_string();
        Ok(())
    }

    /// Fills the five identifier inputs positionally.
    pub fn fill_uuid(&mut self, segments: &[String]) -> Result<(), String> {
        if segments.len() != UUID_SEGMENTS {
            return Err(format!(
                "expected {UUID_SEGMENTS} identifier segments, got {}",
                segments.len()
            ));
        }
        for (slot, segment) in self.vessel.uuid.iter_mut().zip(segments) {
            slot.clone_from(segment);
        }
        Ok(())
    }

    pub fn joined_uuid(&self) -> String {
        self.vessel.uuid.join("-")
    }

    pub fn interface_type(&self) -> Option<InterfaceType> {
        InterfaceType::from_form_value(&self.provider.interface_type)
    }

    /// Appends the currently selected provider to the provider list.
    pub fn add_provider(&mut self) -> Option<&ProviderEntry> {
        let kind = self.interface_type()?;
        let path = if kind == InterfaceType::Gpsd {
            self.provider.gpsd_port.clone()
        } else {
            self.provider.device_path.clone()
        };
        self.providers.push(ProviderEntry {
            kind,
            name: kind.display_name().to_string(),
            path,
            file: self.provider.file_name.clone(),
            speed: self.provider.baud_rate.clone(),
        });
        self.providers.last()
    }

    /// Builds the `POST /admin` body from every bound control.
    pub fn to_payload(&self) -> ConfigPayload {
        let vessel = VesselPayload {
            name: self.vessel.name.clone(),
            manufacturer: self.vessel.manufacturer.clone(),
            model: self.vessel.model.clone(),
            year: parse_int(&self.vessel.year),
            registration: self.vessel.registration.clone(),
            mmsi: parse_int(&self.vessel.mmsi),
            callsign: self.vessel.callsign.clone(),
            uuid: self.joined_uuid(),
        };
        let server = ServerPayload {
            listen_on: self.server.listen_on.clone(),
            port: parse_int(&self.server.port),
            use_tls: self.server.use_tls,
            enable_websockets: self.server.enable_websockets,
            certificate: self.server.certificate.clone(),
        };
        let mqtt = MqttPayload {
            enable: self.mqtt.enable,
            use_tls: self.mqtt.use_tls,
            host: self.mqtt.host.clone(),
            port: parse_int(&self.mqtt.port),
            client_id: self.mqtt.client_id.clone(),
            username: self.mqtt.username.clone(),
            password: self.mqtt.password.clone(),
            channel: self.mqtt.channel.clone(),
        };

        let mut interfaces = BTreeMap::new();
        let mut counters: BTreeMap<InterfaceType, usize> = BTreeMap::new();
        let pending = self.pending_provider();
        for entry in self.providers.iter().chain(pending.as_ref()) {
            let n = counters.entry(entry.kind).or_insert(0);
            *n += 1;
            interfaces.insert(format!("{}{}", entry.kind, n), entry.to_payload());
        }

        ConfigPayload {
            vessel,
            server,
            mqtt,
            interfaces,
        }
    }

    /// The selected provider, when it has not been added to the list yet.
    fn pending_provider(&self) -> Option<ProviderEntry> {
        let mut scratch = ConfigForm {
            provider: self.provider.clone(),
            ..ConfigForm::default()
        };
        let entry = scratch.add_provider()?.clone();
        let listed = self.providers.iter().any(|p| *p == entry);
        (!listed).then_some(entry)
    }
}

fn parse_checkbox(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "checked" => Some(true),
        "false" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}

/// Integer coercion with `parseInt` rules: leading whitespace, an
/// optional sign, then as many decimal digits as are present.
pub fn parse_int(text: &str) -> IntField {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return IntField(None);
    }
    let value = rest[..digits_len].parse::<i64>().ok().map(|v| if negative { -v } else { v });
    IntField(value)
}

/// Input groups that depend on the selected interface type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Section {
    #[display("fileSelectGroup")]
    FileSelect,
    #[display("gpsdPortGroup")]
    GpsdPort,
    #[display("devicePathGroup")]
    DevicePath,
    #[display("deviceBaudGroup")]
    DeviceBaud,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::FileSelect,
        Section::GpsdPort,
        Section::DevicePath,
        Section::DeviceBaud,
    ];

    pub fn required_field(self) -> FieldId {
        match self {
            Section::FileSelect => FieldId::FileName,
            Section::GpsdPort => FieldId::GpsdPort,
            Section::DevicePath => FieldId::DevicePath,
            Section::DeviceBaud => FieldId::BaudRate,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    pub file_select: bool,
    pub gpsd_port: bool,
    pub device_path: bool,
    pub device_baud: bool,
}

impl Visibility {
    /// Hides every group, then shows the ones mapped to `kind`.
    pub fn for_interface(kind: Option<InterfaceType>) -> Self {
        let mut v = Visibility::default();
        match kind {
            Some(t) if t.is_file_stream() => v.file_select = true,
            Some(InterfaceType::Gpsd) => v.gpsd_port = true,
            Some(t) if t.is_device() => {
                v.device_path = true;
                v.device_baud = true;
            }
            _ => {}
        }
        v
    }

    pub fn is_visible(&self, section: Section) -> bool {
        match section {
            Section::FileSelect => self.file_select,
            Section::GpsdPort => self.gpsd_port,
            Section::DevicePath => self.device_path,
            Section::DeviceBaud => self.device_baud,
        }
    }

    pub fn visible_sections(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| self.is_visible(*s))
            .collect()
    }

    pub fn required_fields(&self) -> Vec<FieldId> {
        self.visible_sections()
            .into_iter()
            .map(Section::required_field)
            .collect()
    }
}
