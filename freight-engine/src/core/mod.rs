//! 核心模块 - 配置、后台任务和事件路由
//!
//! # 模块结构
//!
//! - [`Config`] - 引擎配置
//! - [`BackgroundTasks`] - 后台任务注册与关闭
//! - [`EventRouter`] - 事件分发到通知通道
//! - [`EngineState`] - 服务装配

pub mod config;
pub mod event_router;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use event_router::EventRouter;
pub use state::EngineState;
pub use tasks::{BackgroundTasks, TaskKind};
