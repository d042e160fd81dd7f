pub const TOPIC_MOISTURE_TELEMETRY: &str = "home/feuchtesensor/01";

pub const STATUS_ONLINE: &str = "online";

pub fn status_topic(telemetry_topic: &str) -> String {
    format!("{}/status", telemetry_topic.trim_end_matches('/'))
}
