//! Freight Engine - 集装箱舱位分配与转售链引擎
//!
//! # 架构概述
//!
//! - **市场** (`market`): 舱位账本、报价确认、转售链、集装箱里程碑
//! - **核心** (`core`): 配置、后台任务、事件路由
//! - **通知** (`notify`): 事件 → 用户通知
//!
//! # 模块结构
//!
//! ```text
//! freight-engine/src/
//! ├── market/        # 命令处理、redb 存储、账本、转售链
//! ├── core/          # 配置、状态、后台任务、事件路由
//! ├── notify/        # 通知工作者、连接注册表
//! └── utils/         # 日志
//! ```

pub mod core;
pub mod market;
pub mod notify;
pub mod utils;

// Re-export 公共类型
pub use core::{BackgroundTasks, Config, EngineState};
pub use market::{FreightManager, ManagerError, ManagerResult, MarketError};
pub use notify::{ConnectionRegistry, Notification};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境：加载 .env，初始化日志
pub fn setup_environment() -> Config {
    // .env 不存在时忽略
    let _ = dotenv::dotenv();
    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    config
}
