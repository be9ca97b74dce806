use freight_engine::{EngineState, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 日志) 并加载配置
    let config = setup_environment();
    tracing::info!(
        work_dir = %config.work_dir,
        environment = %config.environment,
        "Freight engine starting..."
    );

    // 2. 打开数据库，初始化状态
    let state = EngineState::initialize(&config)?;

    // 3. 启动后台任务（事件路由、通知投递、过期扫描）
    let tasks = state.start_background_tasks();

    // 4. 等待退出信号
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    if tasks.check_health() > 0 {
        tracing::warn!("Some background tasks had already stopped");
    }
    tasks.shutdown().await;

    let stats = state.manager.stats()?;
    tracing::info!(
        events = stats.event_count,
        requests = stats.request_count,
        "Freight engine stopped"
    );
    Ok(())
}
