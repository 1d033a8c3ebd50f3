use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};
use wallbox_core::{Registry, Wallbox};

pub async fn run_publisher(
    wallbox: Arc<Wallbox>,
    registry: Arc<Registry>,
    interval: Duration,
) -> Result<()> {
    let mut publisher = Publisher::default();
    let mut ticker = interval_at(Instant::now() + Duration::from_millis(50), interval);
    let mut requests = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = match wallbox.refresh().await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!(error = %err, "refresh failed, keeping last published values");
                        continue;
                    }
                };
                let changed = publisher.changes(registry.values(&snapshot));
                for (entity, value) in &changed {
                    let line = serde_json::json!({
                        "ts": Utc::now(),
                        "entity": entity,
                        "value": value,
                    });
                    println!("{line}");
                }
                debug!(changed = changed.len(), "tick");
            }
            line = requests.next_line(), if stdin_open => {
                match line? {
                    Some(line) => spawn_write(&wallbox, &registry, &line),
                    None => stdin_open = false,
                }
            }
        }
    }

    Ok(())
}

fn spawn_write(wallbox: &Arc<Wallbox>, registry: &Arc<Registry>, line: &str) {
    let Some((entity, payload)) = parse_request(line) else {
        if !line.trim().is_empty() {
            warn!(line, "expected `<entity> <value>`");
        }
        return;
    };

    let wallbox = wallbox.clone();
    let registry = registry.clone();
    tokio::spawn(async move {
        match registry.set(&wallbox, &entity, &payload).await {
            Ok(()) => info!(entity = %entity, payload = %payload, "write applied"),
            Err(err) => warn!(entity = %entity, payload = %payload, error = %err, "write failed"),
        }
    });
}

pub(crate) fn parse_request(line: &str) -> Option<(String, String)> {
    let (entity, payload) = line.trim().split_once(char::is_whitespace)?;
    Some((entity.to_string(), payload.trim().to_string()))
}

#[derive(Debug, Default)]
pub(crate) struct Publisher {
    last: BTreeMap<&'static str, String>,
}

impl Publisher {
    pub(crate) fn changes(
        &mut self,
        values: BTreeMap<&'static str, String>,
    ) -> Vec<(&'static str, String)> {
        let mut changed = Vec::new();
        for (entity, value) in values {
            if self.last.get(entity) != Some(&value) {
                self.last.insert(entity, value.clone());
                changed.push((entity, value));
            }
        }
        changed
    }
}
