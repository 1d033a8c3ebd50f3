use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub redis_url: String,
    pub mysql_url: String,
    pub poll_interval: Duration,
    pub queue_send_timeout: Duration,
    pub store_timeout: Duration,
    pub debug_entities: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            mysql_url: "mysql://root@127.0.0.1:3306/wallbox".to_string(),
            poll_interval: Duration::from_secs(1),
            queue_send_timeout: Duration::from_secs(1),
            store_timeout: Duration::from_secs(5),
            debug_entities: false,
        }
    }
}
