use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::status;
use crate::store::Fields;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub refreshed_at: Option<DateTime<Utc>>,
    pub config: ConfigFields,
    pub state: StateFields,
    pub m2w: M2wFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFields {
    pub lock: i64,
    pub charging_enable: i64,
    pub max_charging_current: i64,
    pub halo_brightness: i64,
    pub cumulative_added_energy: f64,
    pub added_range: f64,
    pub charging_time: f64,
    pub green_energy: f64,
    pub total_cost: f64,
    pub car_consumption: f64,
    pub car_battery: f64,
    pub energy_cost: f64,
    pub added_energy: f64,
    pub start_time: String,
    pub end_time: String,
}

impl ConfigFields {
    pub fn decode(row: &Fields) -> Self {
        Self {
            lock: row.int("lock"),
            charging_enable: row.int("charging_enable"),
            max_charging_current: row.int("max_charging_current"),
            halo_brightness: row.int("halo_brightness"),
            cumulative_added_energy: row.float("cumulative_added_energy"),
            added_range: row.float("added_range"),
            charging_time: row.float("charging_time"),
            green_energy: row.float("green_energy"),
            total_cost: row.float("total_cost"),
            car_consumption: row.float("car_consumption"),
            car_battery: row.float("car_battery"),
            energy_cost: row.float("energy_cost"),
            added_energy: row.float("energy_total"),
            start_time: row.text("start_time"),
            end_time: row.text("end_time"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateFields {
    pub session_state: i64,
    pub control_pilot: i64,
    pub s2_open: i64,
    pub schedule_energy: f64,
    pub green_energy: f64,
    pub added_range: f64,
    pub charging_time: f64,
    pub charging_speed: f64,
}

impl StateFields {
    pub const HASH: &'static str = "state";
    pub const SESSION_STATE: &'static str = "session.state";
    pub const CONTROL_PILOT: &'static str = "ctrlPilot";
    pub const S2_OPEN: &'static str = "S2open";
    pub const SCHEDULE_ENERGY: &'static str = "scheduleEnergy";
    pub const GREEN_ENERGY: &'static str = "session.green_energy";
    pub const ADDED_RANGE: &'static str = "session.charged_range";
    pub const CHARGING_TIME: &'static str = "session.charging_time";
    pub const CHARGING_SPEED: &'static str = "session.charging_speed";

    pub const KEYS: [&'static str; 8] = [
        Self::SESSION_STATE,
        Self::CONTROL_PILOT,
        Self::S2_OPEN,
        Self::SCHEDULE_ENERGY,
        Self::GREEN_ENERGY,
        Self::ADDED_RANGE,
        Self::CHARGING_TIME,
        Self::CHARGING_SPEED,
    ];

    pub fn decode(fields: &Fields) -> Self {
        Self {
            session_state: fields.int(Self::SESSION_STATE),
            control_pilot: fields.int(Self::CONTROL_PILOT),
            s2_open: fields.int(Self::S2_OPEN),
            schedule_energy: fields.float(Self::SCHEDULE_ENERGY),
            green_energy: fields.float(Self::GREEN_ENERGY),
            added_range: fields.float(Self::ADDED_RANGE),
            charging_time: fields.float(Self::CHARGING_TIME),
            charging_speed: fields.float(Self::CHARGING_SPEED),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct M2wFields {
    pub charger_status: i64,
    pub line_power: [f64; 3],
}

impl M2wFields {
    pub const HASH: &'static str = "m2w";
    pub const CHARGER_STATUS: &'static str = "tms.charger_status";
    pub const LINE_POWER: [&'static str; 3] = [
        "tms.line1.power_watt.value",
        "tms.line2.power_watt.value",
        "tms.line3.power_watt.value",
    ];

    pub const KEYS: [&'static str; 4] = [
        Self::CHARGER_STATUS,
        Self::LINE_POWER[0],
        Self::LINE_POWER[1],
        Self::LINE_POWER[2],
    ];

    pub fn decode(fields: &Fields) -> Self {
        Self {
            charger_status: fields.int(Self::CHARGER_STATUS),
            line_power: Self::LINE_POWER.map(|key| fields.float(key)),
        }
    }
}

impl Snapshot {
    // No cable: status 0 (ready) or 6 (locked).
    pub fn cable_connected(&self) -> bool {
        !matches!(self.m2w.charger_status, 0 | 6)
    }

    pub fn charging_power(&self) -> f64 {
        self.m2w.line_power.iter().sum()
    }

    pub fn effective_status(&self) -> &'static str {
        status::effective_status(self.m2w.charger_status, self.state.session_state)
    }
}

#[derive(Debug, Default)]
pub struct SnapshotCell {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotCell {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn load(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(snapshot);
        *self.current.write() = next.clone();
        next
    }
}
