use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::snapshot::Snapshot;
use crate::store::ConfigWrite;
use crate::wallbox::{BridgeError, Wallbox};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Sensor,
    BinarySensor,
    Switch,
    Number,
    Lock,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Sensor => "sensor",
            Component::BinarySensor => "binary_sensor",
            Component::Switch => "switch",
            Component::Number => "number",
            Component::Lock => "lock",
        }
    }
}

pub type Getter = fn(&Snapshot) -> String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setter {
    MaxChargingCurrent,
    HaloBrightness,
    CarBattery,
    CarConsumption,
    EnergyCost,
    Lock,
    ChargingEnable,
}

impl Setter {
    pub async fn apply(self, wallbox: &Wallbox, payload: &str) -> Result<(), BridgeError> {
        match self {
            Setter::MaxChargingCurrent => {
                wallbox
                    .write_config(ConfigWrite::MaxChargingCurrent(coerce_int(payload)))
                    .await
            }
            Setter::HaloBrightness => {
                wallbox
                    .write_config(ConfigWrite::HaloBrightness(coerce_int(payload)))
                    .await
            }
            Setter::CarBattery => {
                wallbox
                    .write_config(ConfigWrite::CarBattery(coerce_float(payload)))
                    .await
            }
            Setter::CarConsumption => {
                wallbox
                    .write_config(ConfigWrite::CarConsumption(coerce_float(payload)))
                    .await
            }
            Setter::EnergyCost => {
                wallbox
                    .write_config(ConfigWrite::EnergyCost(coerce_float(payload)))
                    .await
            }
            Setter::Lock => wallbox.set_lock(coerce_int(payload)).await,
            Setter::ChargingEnable => wallbox.set_charging_enable(coerce_int(payload)).await,
        }
    }
}

pub fn coerce_int(payload: &str) -> i64 {
    payload.trim().parse().unwrap_or_default()
}

pub fn coerce_float(payload: &str) -> f64 {
    payload
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or_default()
}

pub fn format_number(value: f64) -> String {
    value.to_string()
}

#[derive(Clone)]
pub struct Entity {
    id: &'static str,
    component: Component,
    getter: Getter,
    setter: Option<Setter>,
    metadata: Metadata,
}

impl Entity {
    pub fn new(id: &'static str, component: Component, getter: Getter) -> Self {
        Self {
            id,
            component,
            getter,
            setter: None,
            metadata: Metadata::default(),
        }
    }

    pub fn with_setter(mut self, setter: Setter) -> Self {
        self.setter = Some(setter);
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value.into());
        self
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn setter(&self) -> Option<Setter> {
        self.setter
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn read(&self, snapshot: &Snapshot) -> String {
        (self.getter)(snapshot)
    }

    pub async fn write(&self, wallbox: &Wallbox, payload: &str) -> Result<(), BridgeError> {
        match self.setter {
            Some(setter) => setter.apply(wallbox, payload).await,
            None => Err(BridgeError::ReadOnly(self.id.to_string())),
        }
    }

    pub fn descriptor(&self) -> EntityDescriptor {
        EntityDescriptor {
            id: self.id.to_string(),
            component: self.component,
            writable: self.is_writable(),
            metadata: self.metadata.clone(),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("component", &self.component)
            .field("setter", &self.setter)
            .field("metadata", &self.metadata)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDescriptor {
    pub id: String,
    pub component: Component,
    pub writable: bool,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn insert(&mut self, key: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
