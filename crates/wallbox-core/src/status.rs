const UNKNOWN: &str = "Unknown";

const CHARGER_STATUS_NAMES: [&str; 19] = [
    "Ready",
    "Charging",
    "Connected waiting car",
    "Connected waiting schedule",
    "Paused",
    "Schedule end",
    "Locked",
    "Error",
    "Connected waiting current assignation",
    "Unconfigured power sharing",
    "Queue by power boost",
    "Discharging",
    "Connected waiting admin auth for mid",
    "Connected mid safety margin exceeded",
    "OCPP unavailable",
    "OCPP charge finishing",
    "OCPP reserved",
    "Updating",
    "Queue by eco smart",
];

const CONTROL_PILOT_NAMES: [(i64, &str); 8] = [
    (0x0E, "Error"),
    (0x0F, "Failure"),
    (0xA1, "Ready 1"),
    (0xA2, "Ready 2"),
    (0xB1, "Connected 1"),
    (0xB2, "Connected 2"),
    (0xC1, "Charging 1"),
    (0xC2, "Charging 2"),
];

const SESSION_STATE_NAMES: [(i64, &str); 23] = [
    (0x0E, "Error"),
    (0x0F, "Failure"),
    (0xA1, "Ready"),
    (0xA2, "PS Unconfig"),
    (0xA3, "Unviable"),
    (0xA4, "Auto-restart"),
    (0xA6, "Updating"),
    (0xB1, "Connected 1"),
    (0xB2, "Connected 2"),
    (0xB3, "Waiting"),
    (0xB4, "Scheduled"),
    (0xB5, "Paused"),
    (0xB6, "Finish"),
    (0xB7, "Locked"),
    (0xB8, "Locked car connected"),
    (0xB9, "Waiting unlock"),
    (0xBA, "Waiting ownership"),
    (0xC1, "Charging 1"),
    (0xC2, "Charging 2"),
    (0xC3, "Discharging 1"),
    (0xC4, "Discharging 2"),
    (0xD1, "Reserved 1"),
    (0xD2, "Reserved 2"),
];

// Session states shown as a different charger status.
pub const STATUS_OVERRIDES: [(i64, i64); 4] = [
    (0xA6, 17),
    (0xB3, 2),
    (0xB4, 3),
    (0xB8, 6),
];

fn lookup(table: &[(i64, &'static str)], code: i64) -> &'static str {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN)
}

pub fn charger_status_name(code: i64) -> &'static str {
    usize::try_from(code)
        .ok()
        .and_then(|idx| CHARGER_STATUS_NAMES.get(idx))
        .copied()
        .unwrap_or(UNKNOWN)
}

pub fn control_pilot_name(code: i64) -> &'static str {
    lookup(&CONTROL_PILOT_NAMES, code)
}

pub fn session_state_name(code: i64) -> &'static str {
    lookup(&SESSION_STATE_NAMES, code)
}

pub fn status_override(session_state: i64) -> Option<i64> {
    STATUS_OVERRIDES
        .iter()
        .find(|(state, _)| *state == session_state)
        .map(|(_, status)| *status)
}

pub fn effective_status(charger_status: i64, session_state: i64) -> &'static str {
    let code = status_override(session_state).unwrap_or(charger_status);
    charger_status_name(code)
}

pub fn describe(code: i64, name: &str) -> String {
    format!("{code}: {name}")
}
