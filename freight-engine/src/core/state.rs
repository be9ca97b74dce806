use std::sync::Arc;

use crate::core::{BackgroundTasks, Config, EventRouter, TaskKind};
use crate::market::{ExpiryScheduler, FreightManager, ManagerResult};
use crate::notify::{ConnectionRegistry, NotificationWorker};

/// 引擎状态 - 持有所有服务的共享引用
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | manager | FreightManager | 命令处理与查询 |
/// | registry | ConnectionRegistry | 在线用户通知连接 |
#[derive(Clone, Debug)]
pub struct EngineState {
    pub config: Config,
    pub manager: FreightManager,
    pub registry: ConnectionRegistry,
}

impl EngineState {
    /// 打开数据库并创建状态
    pub fn initialize(config: &Config) -> ManagerResult<Self> {
        let db_path = config.db_path();
        if let Some(parent) = db_path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            tracing::error!(path = %parent.display(), error = %e, "Failed to create work dir");
        }

        let manager = FreightManager::new(
            &db_path,
            config.event_channel_capacity,
            config.max_resale_chain_depth,
        )?;
        Ok(Self::with_manager(config.clone(), manager))
    }

    pub fn with_manager(config: Config, manager: FreightManager) -> Self {
        let registry = ConnectionRegistry::new(config.notify_buffer);
        Self {
            config,
            manager,
            registry,
        }
    }

    /// 启动后台任务
    ///
    /// - 事件路由 (Listener)
    /// - 通知投递 (Worker)
    /// - 转售过期扫描 (Periodic)
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let (router, notify_rx) = EventRouter::new(self.config.notify_buffer);
        let source = self.manager.subscribe();
        let token = tasks.shutdown_token();
        tasks.spawn("event_router", TaskKind::Listener, router.run(source, token));

        let worker = NotificationWorker::new(Arc::new(self.registry.clone()));
        let token = tasks.shutdown_token();
        tasks.spawn("notification_worker", TaskKind::Worker, worker.run(notify_rx, token));

        let scheduler = ExpiryScheduler::new(
            self.manager.clone(),
            self.config.expiry_sweep_interval(),
            tasks.shutdown_token(),
        );
        tasks.spawn("expiry_scheduler", TaskKind::Periodic, scheduler.run());

        tasks.log_summary();
        tasks
    }
}
