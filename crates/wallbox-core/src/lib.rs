pub mod config;
pub mod dispatch;
pub mod entity;
pub mod mysql_store;
pub mod queue;
pub mod redis_store;
pub mod registry;
pub mod snapshot;
pub mod status;
pub mod store;
pub mod wallbox;

#[cfg(test)]
mod fakes;
#[cfg(test)]
mod wallbox_tests;

pub use config::BridgeConfig;
pub use entity::{Component, Entity, EntityDescriptor, Metadata, Setter};
pub use mysql_store::MysqlStore;
pub use queue::{Command, CommandQueue, PosixQueue, QueueError};
pub use redis_store::RedisStore;
pub use registry::{build_debug_registry, build_registry, Registry};
pub use snapshot::{ConfigFields, M2wFields, Snapshot, SnapshotCell, StateFields};
pub use store::{ConfigWrite, Fields, KeyValueStore, RelationalStore, StoreError};
pub use wallbox::{BridgeError, ChargerInfo, ChargerVariant, Wallbox};
