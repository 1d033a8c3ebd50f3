use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::queue::{Command, CommandQueue, QueueError};
use crate::store::{ConfigWrite, Fields, KeyValueStore, RelationalStore, StoreError, StoredValue};
use crate::wallbox::{ChargerInfo, ChargerVariant, Wallbox};

#[derive(Default)]
pub struct FakeKv {
    hashes: Mutex<HashMap<String, HashMap<String, String>>>,
    pub fail: AtomicBool,
    pub stall: AtomicBool,
    pub reads: AtomicUsize,
}

impl FakeKv {
    pub fn set(&self, key: &str, field: &str, value: impl ToString) {
        self.hashes
            .lock()
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }
}

#[async_trait]
impl KeyValueStore for FakeKv {
    async fn hash_fields(&self, key: &str, fields: &[&str]) -> Result<Fields, StoreError> {
        tokio::task::yield_now().await;
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Read(format!("HMGET {key}: connection reset")));
        }
        let hashes = self.hashes.lock();
        let Some(hash) = hashes.get(key) else {
            return Ok(Fields::new());
        };
        Ok(fields
            .iter()
            .filter_map(|field| hash.get(*field).map(|v| (*field, v.clone())))
            .collect())
    }
}

pub struct FakeDb {
    pub row: Mutex<HashMap<String, String>>,
    pub writes: Mutex<Vec<ConfigWrite>>,
    pub user_id: Mutex<Option<i64>>,
    pub part_number: String,
    pub fail: AtomicBool,
}

impl Default for FakeDb {
    fn default() -> Self {
        Self {
            row: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            user_id: Mutex::new(Some(42)),
            part_number: "PLP1-0-2-4-9-002-E".to_string(),
            fail: AtomicBool::new(false),
        }
    }
}

impl FakeDb {
    pub fn set(&self, column: &str, value: impl ToString) {
        self.row.lock().insert(column.to_string(), value.to_string());
    }

    pub fn column(&self, column: &str) -> Option<String> {
        self.row.lock().get(column).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }
}

#[async_trait]
impl RelationalStore for FakeDb {
    async fn snapshot_row(&self) -> Result<Fields, StoreError> {
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Read("lost connection to mysql".to_string()));
        }
        Ok(self.row.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    async fn part_number(&self) -> Result<String, StoreError> {
        Ok(self.part_number.clone())
    }

    async fn serial_number(&self) -> Result<String, StoreError> {
        Ok("123456".to_string())
    }

    async fn latest_user_id(&self) -> Result<Option<i64>, StoreError> {
        Ok(*self.user_id.lock())
    }

    async fn available_current(&self) -> Result<i64, StoreError> {
        Ok(32)
    }

    async fn apply(&self, write: ConfigWrite) -> Result<(), StoreError> {
        let column = match write {
            ConfigWrite::CarBattery(_) => "car_battery",
            ConfigWrite::CarConsumption(_) => "car_consumption",
            ConfigWrite::EnergyCost(_) => "energy_cost",
            other => other.column(),
        };
        let value = match write.stored_value() {
            StoredValue::Int(v) => v.to_string(),
            StoredValue::Float(v) => v.to_string(),
        };
        self.set(column, value);
        self.writes.lock().push(write);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeQueue {
    pub sent: Mutex<Vec<Command>>,
    pub control: Option<Arc<FakeDb>>,
    pub fail: AtomicBool,
}

impl FakeQueue {
    pub fn with_control(db: Arc<FakeDb>) -> Self {
        Self {
            control: Some(db),
            ..Self::default()
        }
    }

    pub fn payloads(&self) -> Vec<String> {
        self.sent.lock().iter().map(|c| c.payload.clone()).collect()
    }
}

#[async_trait]
impl CommandQueue for FakeQueue {
    async fn send(&self, command: &Command) -> Result<(), QueueError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(QueueError::Send {
                queue: command.queue.to_string(),
                reason: "Resource temporarily unavailable".to_string(),
            });
        }
        command.encode()?;
        self.sent.lock().push(command.clone());

        if let Some(db) = &self.control {
            let payload = command.payload.as_str();
            if payload == "EVENT_REQUEST_LOCK" {
                db.set("lock", 1);
            } else if payload.starts_with("EVENT_REQUEST_LOGIN#") {
                db.set("lock", 0);
            } else if payload == "EVENT_REQUEST_USER_ACTION#1.000000" {
                db.set("charging_enable", 1);
            } else if payload == "EVENT_REQUEST_USER_ACTION#2.000000" {
                db.set("charging_enable", 0);
            }
        }
        Ok(())
    }
}

pub struct Rig {
    pub kv: Arc<FakeKv>,
    pub db: Arc<FakeDb>,
    pub queue: Arc<FakeQueue>,
    pub wallbox: Arc<Wallbox>,
}

pub fn rig(variant: ChargerVariant) -> Rig {
    let kv = Arc::new(FakeKv::default());
    let db = Arc::new(FakeDb::default());
    let queue = Arc::new(FakeQueue::with_control(db.clone()));
    rig_with(variant, kv, db, queue)
}

pub fn rig_with(
    variant: ChargerVariant,
    kv: Arc<FakeKv>,
    db: Arc<FakeDb>,
    queue: Arc<FakeQueue>,
) -> Rig {
    let wallbox = Arc::new(Wallbox::with_info(
        kv.clone(),
        db.clone(),
        queue.clone(),
        charger_info(variant),
    ));
    Rig {
        kv,
        db,
        queue,
        wallbox,
    }
}

pub fn charger_info(variant: ChargerVariant) -> ChargerInfo {
    ChargerInfo {
        variant,
        serial_number: "123456".to_string(),
        available_current: 32,
    }
}

pub fn pulsar() -> ChargerVariant {
    ChargerVariant::Other("PLP1".to_string())
}
