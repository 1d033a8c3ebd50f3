use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, Pool, Row, Value};
use tracing::debug;

use crate::store::{ConfigWrite, Fields, RelationalStore, StoreError, StoredValue};

// While a session is running its live values win; otherwise the most recent
// finished session is reported.
const SNAPSHOT_QUERY: &str = r#"
SELECT
  `wallbox_config`.`charging_enable`,
  `wallbox_config`.`lock`,
  `wallbox_config`.`max_charging_current`,
  `wallbox_config`.`halo_brightness`,
  `power_outage_values`.`charged_energy` AS cumulative_added_energy,
  IF(`active_session`.`unique_id` != 0, 0, `latest_session`.`total_cost`) AS total_cost,
  IF(`active_session`.`unique_id` != 0,
    `active_session`.`charging_time`,
    `latest_session`.`charging_time`) AS charging_time,
  IF(`active_session`.`unique_id` != 0, 0, `latest_session`.`green_energy`) AS green_energy,
  `first_energy`.`cost` AS energy_cost,
  `first_car`.`consumption` AS car_consumption,
  `first_car`.`battery` AS car_battery,
  IF(`active_session`.`unique_id` != 0,
    'Session en cours',
    to_char(`latest_session`.`end_time`, 'YYYY-MM-DD HH24:MI:SS')) AS end_time,
  IF(`active_session`.`unique_id` != 0,
    to_char(`active_session`.`start_timestamp`, 'YYYY-MM-DD HH24:MI:SS'),
    to_char(`latest_session`.`start_time`, 'YYYY-MM-DD HH24:MI:SS')) AS start_time,
  IF(`active_session`.`unique_id` != 0,
    `active_session`.`charged_range`,
    `latest_session`.`charged_range`) AS added_range,
  IF(`active_session`.`unique_id` != 0,
    `active_session`.`energy_total`,
    `latest_session`.`energy_total`) AS energy_total
FROM `wallbox_config`,
  `active_session`,
  `power_outage_values`,
  (SELECT * FROM `session` ORDER BY `id` DESC LIMIT 1) AS latest_session,
  (SELECT * FROM `energy` ORDER BY `id` ASC LIMIT 1) AS first_energy,
  (SELECT * FROM `cars` ORDER BY `car_id` ASC LIMIT 1) AS first_car
"#;

const PART_NUMBER_QUERY: &str = "SELECT `part_number` FROM `charger_info`";
const SERIAL_NUMBER_QUERY: &str = "SELECT `serial_num` FROM `charger_info`";
const LATEST_USER_QUERY: &str =
    "SELECT `user_id` FROM `users` WHERE `user_id` != 1 ORDER BY `user_id` DESC LIMIT 1";
const AVAILABLE_CURRENT_QUERY: &str =
    "SELECT `max_avbl_current` FROM `state_values` ORDER BY `id` DESC LIMIT 1";

pub struct MysqlStore {
    pool: Pool,
}

impl MysqlStore {
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let opts = Opts::from_url(url)
            .map_err(|err| StoreError::Connect(format!("invalid mysql url: {err}")))?;
        Ok(Self {
            pool: Pool::new(opts),
        })
    }

    pub async fn close(&self) -> Result<(), StoreError> {
        self.pool
            .clone()
            .disconnect()
            .await
            .map_err(|err| StoreError::Connect(format!("mysql disconnect: {err}")))
    }

    async fn conn(&self) -> Result<Conn, StoreError> {
        self.pool
            .get_conn()
            .await
            .map_err(|err| StoreError::Connect(format!("mysql: {err}")))
    }

    async fn first_row(&self, query: &'static str) -> Result<Option<Row>, StoreError> {
        let mut conn = self.conn().await?;
        let row: Option<Row> = conn
            .query_first(query)
            .await
            .map_err(|err| StoreError::Read(err.to_string()))?;
        Ok(row)
    }

    async fn scalar(&self, query: &'static str) -> Result<Option<String>, StoreError> {
        Ok(self
            .first_row(query)
            .await?
            .and_then(|row| row.as_ref(0).and_then(value_text)))
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::Int(v) => Some(v.to_string()),
        Value::UInt(v) => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Double(v) => Some(v.to_string()),
        _ => None,
    }
}

fn row_fields(row: &Row) -> Fields {
    let mut fields = Fields::new();
    for (idx, column) in row.columns_ref().iter().enumerate() {
        if let Some(text) = row.as_ref(idx).and_then(value_text) {
            fields.insert(column.name_str().into_owned(), text);
        }
    }
    fields
}

fn update_statement(write: &ConfigWrite) -> &'static str {
    match write {
        ConfigWrite::Lock(_) => "UPDATE `wallbox_config` SET `lock`=?",
        ConfigWrite::MaxChargingCurrent(_) => "UPDATE `wallbox_config` SET `max_charging_current`=?",
        ConfigWrite::HaloBrightness(_) => "UPDATE `wallbox_config` SET `halo_brightness`=?",
        ConfigWrite::CarBattery(_) => "UPDATE `cars` SET `battery`=? WHERE `car_id`=1",
        ConfigWrite::CarConsumption(_) => "UPDATE `cars` SET `consumption`=? WHERE `car_id`=1",
        ConfigWrite::EnergyCost(_) => "UPDATE `energy` SET `cost`=? WHERE `id`=1",
    }
}

#[async_trait]
impl RelationalStore for MysqlStore {
    // No recorded session means no row; the columns then decode to zero.
    async fn snapshot_row(&self) -> Result<Fields, StoreError> {
        let row = self.first_row(SNAPSHOT_QUERY).await?;
        Ok(row.as_ref().map(row_fields).unwrap_or_default())
    }

    async fn part_number(&self) -> Result<String, StoreError> {
        self.scalar(PART_NUMBER_QUERY)
            .await?
            .ok_or(StoreError::MissingRow("charger_info.part_number"))
    }

    async fn serial_number(&self) -> Result<String, StoreError> {
        Ok(self.scalar(SERIAL_NUMBER_QUERY).await?.unwrap_or_default())
    }

    async fn latest_user_id(&self) -> Result<Option<i64>, StoreError> {
        Ok(self
            .scalar(LATEST_USER_QUERY)
            .await?
            .and_then(|raw| raw.trim().parse().ok()))
    }

    async fn available_current(&self) -> Result<i64, StoreError> {
        Ok(self
            .scalar(AVAILABLE_CURRENT_QUERY)
            .await?
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or_default())
    }

    async fn apply(&self, write: ConfigWrite) -> Result<(), StoreError> {
        let statement = update_statement(&write);
        let mut conn = self.conn().await?;
        let result = match write.stored_value() {
            StoredValue::Int(v) => conn.exec_drop(statement, (v,)).await,
            StoredValue::Float(v) => conn.exec_drop(statement, (v,)).await,
        };
        result.map_err(|err| StoreError::Write(format!("{}: {err}", write.column())))?;
        debug!(column = write.column(), "config row updated");
        Ok(())
    }
}
