use crate::domain::DriverId;

pub const GEO_INDEX: &str = "drivers:last";

const CHANNEL_PREFIX: &str = "locations";

pub fn idempotency_key(driver_id: &DriverId, seq: i64) -> String {
    format!("idem:{}:{}", driver_id, seq)
}

pub fn rate_window_key(driver_id: &DriverId, unix_second: i64) -> String {
    format!("rl:{}:{}", driver_id, unix_second)
}

pub fn heartbeat_key(driver_id: &DriverId) -> String {
    format!("driver:heartbeat:{}", driver_id)
}

pub fn driver_channel(driver_id: &DriverId) -> String {
    format!("{}:driver:{}", CHANNEL_PREFIX, driver_id)
}

pub fn order_channel(order_id: &str) -> String {
    format!("{}:order:{}", CHANNEL_PREFIX, order_id)
}
