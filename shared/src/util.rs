/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Format a container number from its sequence value (`SEAU` + 7 digits)
pub fn container_number(seq: u64) -> String {
    format!("SEAU{:07}", seq % 10_000_000)
}
