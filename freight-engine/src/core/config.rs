use std::path::PathBuf;
use std::time::Duration;

use crate::market::DEFAULT_MAX_CHAIN_DEPTH;

/// 引擎配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录（数据库、日志） |
/// | DB_FILE | freight.redb | 数据库文件名 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | 未设置 | 按天滚动的日志目录 |
/// | EXPIRY_SWEEP_INTERVAL_SECS | 3600 | 转售过期扫描间隔 |
/// | EVENT_CHANNEL_CAPACITY | 4096 | 事件广播通道容量 |
/// | NOTIFY_BUFFER | 1024 | 通知通道容量 |
/// | MAX_RESALE_CHAIN_DEPTH | 64 | 转售链最大深度 |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/freight EXPIRY_SWEEP_INTERVAL_SECS=600 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    pub db_file: String,
    pub log_level: String,
    /// 设置后启用文件日志
    pub log_dir: Option<String>,
    /// 转售过期扫描间隔（秒）
    pub expiry_sweep_interval_secs: u64,
    pub event_channel_capacity: usize,
    pub notify_buffer: usize,
    /// 转售链遍历上限，超过视为数据损坏
    pub max_resale_chain_depth: usize,
    /// 运行环境: development | staging | production
    pub environment: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            db_file: std::env::var("DB_FILE").unwrap_or_else(|_| "freight.redb".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty()),
            expiry_sweep_interval_secs: env_or("EXPIRY_SWEEP_INTERVAL_SECS", 3600),
            event_channel_capacity: env_or("EVENT_CHANNEL_CAPACITY", 4096),
            notify_buffer: env_or("NOTIFY_BUFFER", 1024),
            max_resale_chain_depth: env_or("MAX_RESALE_CHAIN_DEPTH", DEFAULT_MAX_CHAIN_DEPTH),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 使用自定义工作目录覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// 数据库完整路径
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.db_file)
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        // 0 会让 tokio interval panic
        Duration::from_secs(self.expiry_sweep_interval_secs.max(1))
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back() {
        // SAFETY: 测试内独占使用此变量名
        unsafe {
            std::env::set_var("FREIGHT_TEST_BUFFER", "not-a-number");
        }
        assert_eq!(env_or("FREIGHT_TEST_BUFFER", 7usize), 7);
        unsafe {
            std::env::set_var("FREIGHT_TEST_BUFFER", " 32 ");
        }
        assert_eq!(env_or("FREIGHT_TEST_BUFFER", 7usize), 32);
        assert_eq!(env_or("FREIGHT_TEST_UNSET_KEY", 3u64), 3);
    }

    #[test]
    fn test_derived_values() {
        let mut config = Config::with_work_dir("/tmp/freight");
        config.db_file = "market.redb".into();
        assert_eq!(config.db_path(), PathBuf::from("/tmp/freight/market.redb"));

        config.expiry_sweep_interval_secs = 0;
        assert_eq!(config.expiry_sweep_interval(), Duration::from_secs(1));

        config.environment = "production".into();
        assert!(config.is_production());
        assert!(!config.is_development());
    }
}
