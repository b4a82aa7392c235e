use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// seconds since `1970-1-1 00:00:00`, named as [UNIX_EPOCH]
pub fn now() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        // clock set before the epoch
        Err(before_epoch) => -(before_epoch.duration().as_secs() as i64),
    }
}

/// turn stored unix seconds back into a [SystemTime]
pub fn to_system_time(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}
