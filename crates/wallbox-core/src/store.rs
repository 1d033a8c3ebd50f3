use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("read failed: {0}")]
    Read(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("query returned no row: {0}")]
    MissingRow(&'static str),
    #[error("store did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    values: HashMap<String, String>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn text(&self, key: &str) -> String {
        self.values.get(key).cloned().unwrap_or_default()
    }

    pub fn int(&self, key: &str) -> i64 {
        self.values.get(key).map(|raw| decode_int(raw)).unwrap_or_default()
    }

    pub fn float(&self, key: &str) -> f64 {
        self.values.get(key).map(|raw| decode_float(raw)).unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

// Telemetry sometimes carries integral codes as "193.000000".
fn decode_int(raw: &str) -> i64 {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.trunc() as i64)
        })
        .unwrap_or_default()
}

fn decode_float(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigWrite {
    Lock(i64),
    MaxChargingCurrent(i64),
    HaloBrightness(i64),
    CarBattery(f64),
    CarConsumption(f64),
    EnergyCost(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoredValue {
    Int(i64),
    Float(f64),
}

impl ConfigWrite {
    pub fn column(&self) -> &'static str {
        match self {
            ConfigWrite::Lock(_) => "lock",
            ConfigWrite::MaxChargingCurrent(_) => "max_charging_current",
            ConfigWrite::HaloBrightness(_) => "halo_brightness",
            ConfigWrite::CarBattery(_) => "battery",
            ConfigWrite::CarConsumption(_) => "consumption",
            ConfigWrite::EnergyCost(_) => "cost",
        }
    }

    // Battery in Wh, consumption in tenths of kWh/100km.
    pub fn stored_value(&self) -> StoredValue {
        match *self {
            ConfigWrite::Lock(v)
            | ConfigWrite::MaxChargingCurrent(v)
            | ConfigWrite::HaloBrightness(v) => StoredValue::Int(v),
            ConfigWrite::CarBattery(kwh) => StoredValue::Float(kwh * 1000.0),
            ConfigWrite::CarConsumption(v) => StoredValue::Float(v * 10.0),
            ConfigWrite::EnergyCost(v) => StoredValue::Float(v),
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn hash_fields(&self, key: &str, fields: &[&str]) -> Result<Fields, StoreError>;
}

#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn snapshot_row(&self) -> Result<Fields, StoreError>;
    async fn part_number(&self) -> Result<String, StoreError>;
    async fn serial_number(&self) -> Result<String, StoreError>;
    async fn latest_user_id(&self) -> Result<Option<i64>, StoreError>;
    async fn available_current(&self) -> Result<i64, StoreError>;
    async fn apply(&self, write: ConfigWrite) -> Result<(), StoreError>;
}
