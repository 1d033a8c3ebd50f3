use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::queue::{CommandQueue, QueueError};
use crate::snapshot::{ConfigFields, M2wFields, Snapshot, SnapshotCell, StateFields};
use crate::store::{ConfigWrite, KeyValueStore, RelationalStore, StoreError};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("entity {0} is read-only")]
    ReadOnly(String),
    #[error("unknown entity {0}")]
    UnknownEntity(String),
    #[error("no user account to log in as")]
    NoUserAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargerVariant {
    Cpb1,
    Other(String),
}

impl ChargerVariant {
    pub fn from_part_number(part_number: &str) -> Self {
        let prefix = part_number.split('-').next().unwrap_or_default().trim();
        match prefix {
            "CPB1" => ChargerVariant::Cpb1,
            other => ChargerVariant::Other(other.to_string()),
        }
    }

    pub fn writes_lock_directly(&self) -> bool {
        matches!(self, ChargerVariant::Cpb1)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChargerVariant::Cpb1 => "CPB1",
            ChargerVariant::Other(prefix) => prefix,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargerInfo {
    pub variant: ChargerVariant,
    pub serial_number: String,
    pub available_current: i64,
}

pub struct Wallbox {
    kv: Arc<dyn KeyValueStore>,
    db: Arc<dyn RelationalStore>,
    queue: Arc<dyn CommandQueue>,
    info: ChargerInfo,
    snapshot: SnapshotCell,
    store_timeout: Duration,
    pub(crate) lock_guard: Mutex<()>,
    pub(crate) charging_guard: Mutex<()>,
}

impl Wallbox {
    pub async fn connect(
        kv: Arc<dyn KeyValueStore>,
        db: Arc<dyn RelationalStore>,
        queue: Arc<dyn CommandQueue>,
        store_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let part_number = within(store_timeout, db.part_number()).await?;
        let info = ChargerInfo {
            variant: ChargerVariant::from_part_number(&part_number),
            serial_number: within(store_timeout, db.serial_number()).await?,
            available_current: within(store_timeout, db.available_current()).await?,
        };
        info!(
            variant = info.variant.as_str(),
            serial = %info.serial_number,
            available_current = info.available_current,
            "charger identified"
        );
        Ok(Self::with_info(kv, db, queue, info).with_store_timeout(store_timeout))
    }

    pub fn with_info(
        kv: Arc<dyn KeyValueStore>,
        db: Arc<dyn RelationalStore>,
        queue: Arc<dyn CommandQueue>,
        info: ChargerInfo,
    ) -> Self {
        Self {
            kv,
            db,
            queue,
            info,
            snapshot: SnapshotCell::default(),
            store_timeout: BridgeConfig::default().store_timeout,
            lock_guard: Mutex::new(()),
            charging_guard: Mutex::new(()),
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn info(&self) -> &ChargerInfo {
        &self.info
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load()
    }

    // On error the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, StoreError> {
        let reads = async {
            tokio::try_join!(
                self.kv.hash_fields(StateFields::HASH, &StateFields::KEYS),
                self.kv.hash_fields(M2wFields::HASH, &M2wFields::KEYS),
                self.db.snapshot_row(),
            )
        };
        let (state, m2w, row) = within(self.store_timeout, reads).await?;

        let next = Snapshot {
            refreshed_at: Some(Utc::now()),
            config: ConfigFields::decode(&row),
            state: StateFields::decode(&state),
            m2w: M2wFields::decode(&m2w),
        };
        debug!(refreshed_at = ?next.refreshed_at, "snapshot refreshed");
        Ok(self.snapshot.replace(next))
    }

    pub async fn write_config(&self, write: ConfigWrite) -> Result<(), BridgeError> {
        within(self.store_timeout, self.db.apply(write)).await?;
        info!(column = write.column(), value = ?write.stored_value(), "config written");
        Ok(())
    }

    pub(crate) async fn latest_user_id(&self) -> Result<Option<i64>, StoreError> {
        within(self.store_timeout, self.db.latest_user_id()).await
    }

    pub(crate) fn queue(&self) -> &dyn CommandQueue {
        self.queue.as_ref()
    }
}

async fn within<T, F>(limit: Duration, op: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    timeout(limit, op)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
