use std::collections::BTreeMap;

use crate::entity::{format_number, Component, Entity, EntityDescriptor, Getter, Setter};
use crate::snapshot::Snapshot;
use crate::status;
use crate::wallbox::{BridgeError, Wallbox};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    entities: BTreeMap<&'static str, Entity>,
}

impl Registry {
    fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            entities: entities.into_iter().map(|e| (e.id(), e)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn extend(&mut self, other: Registry) {
        self.entities.extend(other.entities);
    }

    pub fn values(&self, snapshot: &Snapshot) -> BTreeMap<&'static str, String> {
        self.iter().map(|e| (e.id(), e.read(snapshot))).collect()
    }

    pub fn descriptors(&self) -> Vec<EntityDescriptor> {
        self.iter().map(Entity::descriptor).collect()
    }

    pub async fn set(&self, wallbox: &Wallbox, id: &str, payload: &str) -> Result<(), BridgeError> {
        let entity = self
            .get(id)
            .ok_or_else(|| BridgeError::UnknownEntity(id.to_string()))?;
        entity.write(wallbox, payload).await
    }
}

fn energy_kwh(
    id: &'static str,
    name: &str,
    state_class: &str,
    precision: &str,
    getter: Getter,
) -> Entity {
    Entity::new(id, Component::Sensor, getter)
        .meta("name", name)
        .meta("device_class", "energy")
        .meta("unit_of_measurement", "kWh")
        .meta("state_class", state_class)
        .meta("suggested_display_precision", precision)
}

fn monetary(id: &'static str, name: &str, getter: Getter) -> Entity {
    Entity::new(id, Component::Sensor, getter)
        .meta("name", name)
        .meta("device_class", "monetary")
        .meta("unit_of_measurement", "€")
        .meta("state_class", "total")
        .meta("suggested_display_precision", "2")
}

pub fn build_registry(wallbox: &Wallbox) -> Registry {
    let available_current = wallbox.info().available_current;

    Registry::from_entities([
        // Live session telemetry.
        energy_kwh("added_energy_active", "Active added energy", "total", "1", |s| {
            format_number(s.state.schedule_energy / 1000.0)
        }),
        energy_kwh("green_energy_active", "Active green energy", "total", "1", |s| {
            format_number(s.state.green_energy / 1000.0)
        }),
        energy_kwh("grid_energy_active", "Active grid energy", "measurement", "2", |s| {
            format_number((s.state.schedule_energy - s.state.green_energy) / 1000.0)
        }),
        Entity::new("added_range_active", Component::Sensor, |s| {
            format_number(s.state.added_range)
        })
        .meta("name", "Active added range")
        .meta("device_class", "distance")
        .meta("unit_of_measurement", "km")
        .meta("state_class", "total")
        .meta("suggested_display_precision", "1")
        .meta("icon", "mdi:map-marker-distance"),
        Entity::new("charging_time_active", Component::Sensor, |s| {
            format_number(s.state.charging_time)
        })
        .meta("name", "Active charging time")
        .meta("device_class", "duration")
        .meta("unit_of_measurement", "s")
        .meta("state_class", "total")
        .meta("suggested_display_precision", "0"),
        Entity::new("charging_speed_active", Component::Sensor, |s| {
            format_number(s.state.charging_speed)
        })
        .meta("name", "Active charging speed")
        .meta("device_class", "speed")
        .meta("unit_of_measurement", "km/h")
        .meta("state_class", "measurement")
        .meta("suggested_display_precision", "1"),
        // Current or most recent session.
        energy_kwh("added_energy", "Added energy", "total", "1", |s| {
            format_number(s.config.added_energy / 1000.0)
        }),
        Entity::new("added_range", Component::Sensor, |s| {
            format_number(s.config.added_range)
        })
        .meta("name", "Added range")
        .meta("device_class", "distance")
        .meta("unit_of_measurement", "km")
        .meta("state_class", "total")
        .meta("suggested_display_precision", "1")
        .meta("icon", "mdi:map-marker-distance"),
        energy_kwh("green_energy", "Added green energy", "measurement", "2", |s| {
            format_number(s.config.green_energy / 1000.0)
        }),
        energy_kwh("grid_energy", "Added grid energy", "measurement", "2", |s| {
            format_number((s.config.added_energy - s.config.green_energy) / 1000.0)
        }),
        Entity::new("charging_time", Component::Sensor, |s| {
            format_number(s.config.charging_time)
        })
        .meta("name", "Effective charging time")
        .meta("device_class", "duration")
        .meta("unit_of_measurement", "s")
        .meta("state_class", "measurement")
        .meta("suggested_display_precision", "0"),
        monetary("total_cost", "Cost of charge session", |s| {
            format_number(s.config.total_cost)
        }),
        monetary("grid_cost", "Cost of grid", |s| {
            format_number(
                s.config.energy_cost * (s.config.added_energy - s.config.green_energy) / 1000.0,
            )
        }),
        Entity::new("start_time", Component::Sensor, |s| s.config.start_time.clone())
            .meta("name", "Start time"),
        Entity::new("end_time", Component::Sensor, |s| s.config.end_time.clone())
            .meta("name", "End time"),
        energy_kwh("cumulative_added_energy", "Cumulative added energy", "total_increasing", "1", |s| {
            format_number(s.config.cumulative_added_energy / 1000.0)
        }),
        // Charger state.
        Entity::new("cable_connected", Component::BinarySensor, |s| {
            u8::from(s.cable_connected()).to_string()
        })
        .meta("name", "Cable connected")
        .meta("payload_on", "1")
        .meta("payload_off", "0")
        .meta("icon", "mdi:ev-plug-type1")
        .meta("device_class", "plug"),
        Entity::new("charging_power", Component::Sensor, |s| {
            format_number(s.charging_power())
        })
        .meta("name", "Charging power")
        .meta("device_class", "power")
        .meta("unit_of_measurement", "W")
        .meta("state_class", "measurement")
        .meta("suggested_display_precision", "1"),
        Entity::new("status", Component::Sensor, |s| {
            s.effective_status().to_string()
        })
        .meta("name", "Status"),
        // Controls.
        Entity::new("charging_enable", Component::Switch, |s| {
            s.config.charging_enable.to_string()
        })
        .with_setter(Setter::ChargingEnable)
        .meta("name", "Charging enable")
        .meta("payload_on", "1")
        .meta("payload_off", "0")
        .meta("icon", "mdi:ev-station"),
        Entity::new("lock", Component::Lock, |s| s.config.lock.to_string())
            .with_setter(Setter::Lock)
            .meta("name", "Lock")
            .meta("payload_lock", "1")
            .meta("payload_unlock", "0")
            .meta("state_locked", "1")
            .meta("state_unlocked", "0")
            .meta("command_topic", "~/set"),
        Entity::new("max_charging_current", Component::Number, |s| {
            s.config.max_charging_current.to_string()
        })
        .with_setter(Setter::MaxChargingCurrent)
        .meta("name", "Max charging current")
        .meta("command_topic", "~/set")
        .meta("min", "6")
        .meta("max", available_current.to_string())
        .meta("unit_of_measurement", "A")
        .meta("device_class", "current"),
        Entity::new("halo_brightness", Component::Number, |s| {
            s.config.halo_brightness.to_string()
        })
        .with_setter(Setter::HaloBrightness)
        .meta("name", "Halo brightness")
        .meta("command_topic", "~/set")
        .meta("min", "0")
        .meta("max", "100")
        .meta("icon", "mdi:brightness-percent")
        .meta("unit_of_measurement", "%")
        .meta("entity_category", "config"),
        // Car and tariff profile, writable for cost and range estimates.
        energy_kwh("car_battery", "Car battery", "measurement", "2", |s| {
            format_number(s.config.car_battery / 1000.0)
        })
        .with_setter(Setter::CarBattery)
        .meta("command_topic", "~/set"),
        Entity::new("car_consumption", Component::Sensor, |s| {
            format_number(s.config.car_consumption / 10.0)
        })
        .with_setter(Setter::CarConsumption)
        .meta("name", "Car consumption")
        .meta("command_topic", "~/set")
        .meta("unit_of_measurement", "kWh/100km")
        .meta("state_class", "measurement")
        .meta("suggested_display_precision", "2"),
        Entity::new("energy_cost", Component::Sensor, |s| {
            format_number(s.config.energy_cost)
        })
        .with_setter(Setter::EnergyCost)
        .meta("name", "Energy cost")
        .meta("command_topic", "~/set")
        .meta("unit_of_measurement", "€/kWh")
        .meta("state_class", "measurement")
        .meta("suggested_display_precision", "2"),
    ])
}

pub fn build_debug_registry() -> Registry {
    Registry::from_entities([
        Entity::new("control_pilot", Component::Sensor, |s| {
            let code = s.state.control_pilot;
            status::describe(code, status::control_pilot_name(code))
        })
        .meta("name", "Control pilot"),
        Entity::new("m2w_status", Component::Sensor, |s| {
            s.m2w.charger_status.to_string()
        })
        .meta("name", "M2W status"),
        Entity::new("state_machine_state", Component::Sensor, |s| {
            let code = s.state.session_state;
            status::describe(code, status::session_state_name(code))
        })
        .meta("name", "State machine"),
        Entity::new("s2_open", Component::Sensor, |s| s.state.s2_open.to_string())
            .meta("name", "S2 open"),
    ])
}
