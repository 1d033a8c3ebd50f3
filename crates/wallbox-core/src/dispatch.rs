use tracing::{debug, info};

use crate::queue::Command;
use crate::store::ConfigWrite;
use crate::wallbox::{BridgeError, Wallbox};

impl Wallbox {
    pub async fn set_lock(&self, requested: i64) -> Result<(), BridgeError> {
        let _guard = self.lock_guard.lock().await;
        let current = self.refresh().await?;

        let lock = requested == 1;
        if lock == (current.config.lock == 1) {
            debug!(lock, "lock already in requested state");
            return Ok(());
        }

        if self.info().variant.writes_lock_directly() {
            return self.write_config(ConfigWrite::Lock(i64::from(lock))).await;
        }

        let command = if lock {
            Command::request_lock()
        } else {
            let user_id = self
                .latest_user_id()
                .await?
                .ok_or(BridgeError::NoUserAccount)?;
            Command::request_login(user_id)
        };
        self.queue().send(&command).await?;
        info!(lock, payload = %command.payload, "lock change requested");
        Ok(())
    }

    pub async fn set_charging_enable(&self, requested: i64) -> Result<(), BridgeError> {
        let _guard = self.charging_guard.lock().await;
        let current = self.refresh().await?;

        let enable = requested == 1;
        if enable == (current.config.charging_enable == 1) {
            debug!(enable, "charging already in requested state");
            return Ok(());
        }

        let command = Command::user_action(enable);
        self.queue().send(&command).await?;
        info!(enable, payload = %command.payload, "charging change requested");
        Ok(())
    }
}
