use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::fakes::{pulsar, rig, FakeDb, FakeKv, FakeQueue};
use crate::snapshot::{M2wFields, StateFields};
use crate::store::StoreError;
use crate::wallbox::{ChargerVariant, Wallbox};

fn seed(kv: &FakeKv, db: &FakeDb) {
    kv.set(StateFields::HASH, StateFields::SESSION_STATE, 0xC1);
    kv.set(StateFields::HASH, StateFields::CONTROL_PILOT, 0xC2);
    kv.set(StateFields::HASH, StateFields::SCHEDULE_ENERGY, 7400);
    kv.set(M2wFields::HASH, M2wFields::CHARGER_STATUS, 1);
    kv.set(M2wFields::HASH, M2wFields::LINE_POWER[0], 2300.5);
    kv.set(M2wFields::HASH, M2wFields::LINE_POWER[1], 2300);
    kv.set(M2wFields::HASH, M2wFields::LINE_POWER[2], "garbage");
    db.set("lock", 0);
    db.set("charging_enable", 1);
    db.set("max_charging_current", 16);
    db.set("energy_total", 12500);
    db.set("start_time", "2026-10-17 21:04:11");
}

#[tokio::test]
async fn connect_reads_identity_from_part_number() {
    // Arrange
    let db = Arc::new(FakeDb {
        part_number: "CPB1-0-2-4-9-002-E".to_string(),
        ..FakeDb::default()
    });

    // Act
    let wallbox = Wallbox::connect(
        Arc::new(FakeKv::default()),
        db.clone(),
        Arc::new(FakeQueue::default()),
        Duration::from_secs(1),
    )
    .await
    .expect("connect");

    // Assert
    assert_eq!(wallbox.info().variant, ChargerVariant::Cpb1);
    assert_eq!(wallbox.info().serial_number, "123456");
    assert_eq!(wallbox.info().available_current, 32);
}

#[test]
fn variant_prefix_is_text_before_first_dash() {
    assert_eq!(
        ChargerVariant::from_part_number("PLP1-0-2-4"),
        ChargerVariant::Other("PLP1".to_string())
    );
    assert!(ChargerVariant::from_part_number("CPB1").writes_lock_directly());
    assert!(!ChargerVariant::from_part_number("").writes_lock_directly());
}

#[tokio::test]
async fn refresh_decodes_both_stores() {
    // Arrange
    let rig = rig(pulsar());
    seed(&rig.kv, &rig.db);

    // Act
    let snapshot = rig.wallbox.refresh().await.expect("refresh");

    // Assert
    assert!(snapshot.refreshed_at.is_some());
    assert_eq!(snapshot.state.session_state, 0xC1);
    assert_eq!(snapshot.state.schedule_energy, 7400.0);
    assert_eq!(snapshot.config.charging_enable, 1);
    assert_eq!(snapshot.config.max_charging_current, 16);
    assert_eq!(snapshot.config.added_energy, 12500.0);
    assert_eq!(snapshot.config.start_time, "2026-10-17 21:04:11");
    assert_eq!(snapshot.m2w.line_power, [2300.5, 2300.0, 0.0]);
    assert_eq!(rig.wallbox.snapshot().config.added_energy, 12500.0);
}

#[tokio::test]
async fn missing_fields_decode_to_zero() {
    // Arrange
    let rig = rig(pulsar());

    // Act
    let snapshot = rig.wallbox.refresh().await.expect("refresh");

    // Assert
    assert_eq!(snapshot.config.lock, 0);
    assert_eq!(snapshot.state.control_pilot, 0);
    assert_eq!(snapshot.config.end_time, "");
    assert_eq!(snapshot.charging_power(), 0.0);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    // Arrange
    let rig = rig(pulsar());
    seed(&rig.kv, &rig.db);
    let before = rig.wallbox.refresh().await.expect("refresh");
    rig.kv.set(StateFields::HASH, StateFields::SCHEDULE_ENERGY, 9999);
    rig.db.set("energy_total", 99999);
    rig.db.fail.store(true, Ordering::SeqCst);

    // Act
    let result = rig.wallbox.refresh().await;

    // Assert
    assert!(result.is_err(), "relational failure must surface");
    let current = rig.wallbox.snapshot();
    assert!(Arc::ptr_eq(&before, &current), "no partial commit");
    assert_eq!(current.state.schedule_energy, 7400.0);
    assert_eq!(current.config.added_energy, 12500.0);
}

#[tokio::test]
async fn key_value_failure_also_keeps_previous_snapshot() {
    // Arrange
    let rig = rig(pulsar());
    seed(&rig.kv, &rig.db);
    let before = rig.wallbox.refresh().await.expect("refresh");
    rig.kv.fail.store(true, Ordering::SeqCst);

    // Act
    let result = rig.wallbox.refresh().await;

    // Assert
    assert!(result.is_err());
    assert!(Arc::ptr_eq(&before, &rig.wallbox.snapshot()));
}

#[tokio::test]
async fn derived_accessors() {
    // Arrange
    let rig = rig(pulsar());
    seed(&rig.kv, &rig.db);

    // Act
    let snapshot = rig.wallbox.refresh().await.expect("refresh");

    // Assert
    assert!(snapshot.cable_connected());
    assert_eq!(snapshot.charging_power(), 4600.5);
    assert_eq!(snapshot.effective_status(), "Charging");

    rig.kv.set(M2wFields::HASH, M2wFields::CHARGER_STATUS, 6);
    let snapshot = rig.wallbox.refresh().await.expect("refresh");
    assert!(!snapshot.cable_connected());

    rig.kv.set(StateFields::HASH, StateFields::SESSION_STATE, 0xB4);
    let snapshot = rig.wallbox.refresh().await.expect("refresh");
    assert_eq!(snapshot.effective_status(), "Connected waiting schedule");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_mixed_generations() {
    // Arrange
    let rig = rig(pulsar());
    let wallbox = rig.wallbox.clone();
    let generations = 300_u32;

    let mut readers = Vec::new();
    for _ in 0..3 {
        let wallbox = wallbox.clone();
        readers.push(tokio::spawn(async move {
            let mut observed = 0_u32;
            loop {
                let snapshot = wallbox.snapshot();
                let kv_gen = snapshot.state.schedule_energy;
                assert_eq!(kv_gen, snapshot.config.added_energy, "torn snapshot");
                assert_eq!(kv_gen, snapshot.m2w.line_power[0], "torn snapshot");
                observed += 1;
                if kv_gen as u32 == generations {
                    return observed;
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    // Act
    for generation in 1..=generations {
        rig.kv.set(StateFields::HASH, StateFields::SCHEDULE_ENERGY, generation);
        rig.kv.set(M2wFields::HASH, M2wFields::LINE_POWER[0], generation);
        rig.db.set("energy_total", generation);
        wallbox.refresh().await.expect("refresh");
    }

    // Assert
    for reader in readers {
        let observed = reader.await.expect("reader task");
        assert!(observed > 0);
    }
}

#[tokio::test]
async fn refresh_without_session_row_still_serves_telemetry() {
    // Arrange
    let rig = rig(pulsar());
    rig.kv.set(StateFields::HASH, StateFields::SCHEDULE_ENERGY, 7400);
    rig.kv.set(M2wFields::HASH, M2wFields::CHARGER_STATUS, 1);
    rig.db.row.lock().clear();

    // Act
    let snapshot = rig.wallbox.refresh().await.expect("refresh");

    // Assert
    assert_eq!(snapshot.state.schedule_energy, 7400.0);
    assert_eq!(snapshot.m2w.charger_status, 1);
    assert_eq!(snapshot.config.lock, 0);
    assert_eq!(snapshot.config.added_energy, 0.0);
    assert_eq!(snapshot.config.start_time, "");
}

#[tokio::test]
async fn refresh_times_out_on_stalled_key_value_store() {
    // Arrange
    let kv = Arc::new(FakeKv::default());
    kv.stall.store(true, Ordering::SeqCst);
    let wallbox = Wallbox::connect(
        kv,
        Arc::new(FakeDb::default()),
        Arc::new(FakeQueue::default()),
        Duration::from_millis(50),
    )
    .await
    .expect("identity comes from the relational store only");

    // Act
    let result = wallbox.refresh().await;

    // Assert
    assert!(matches!(result, Err(StoreError::Timeout(_))));
    assert!(wallbox.snapshot().refreshed_at.is_none());
}
