//! 转售过期调度器
//!
//! 启动时先扫一次，之后按固定间隔触发 `FreightManager::expire_resales`。
//! 每个过期转售在独立事务中回滚，与确认竞争失败的计为 skipped。

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::manager::FreightManager;
use shared::util::now_millis;

/// 转售过期调度器
///
/// 注册为 `TaskKind::Periodic`。
pub struct ExpiryScheduler {
    manager: FreightManager,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ExpiryScheduler {
    pub fn new(manager: FreightManager, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            manager,
            interval,
            shutdown,
        }
    }

    /// 主循环：首个 tick 立即触发（补扫停机期间过期的转售）
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Expiry scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Expiry scheduler received shutdown signal");
                    break;
                }
            }
            self.sweep();
        }

        tracing::info!("Expiry scheduler stopped");
    }

    fn sweep(&self) {
        match self.manager.expire_resales(now_millis()) {
            Ok(report) => {
                if report.stale_originals > 0 {
                    tracing::info!(
                        stale_originals = report.stale_originals,
                        "Original requests past deadline without bids"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Resale expiry sweep failed");
            }
        }
    }
}
