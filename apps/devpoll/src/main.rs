//! 设备轮询进程：加载档案，按配置连接设备，周期性采集测点。

mod link;
mod poller;
mod profile;

use devpoll_config::PollerConfig;
use devpoll_protocol::{DeviceProtocol, FrameReceiver, ProtocolOptions};
use devpoll_telemetry::init_tracing;
use poller::Poller;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = PollerConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let profile = profile::load_profile(&config.profile_path)?;
    info!(
        target: "devpoll.poll",
        path = %config.profile_path,
        device = %profile.dev.name,
        mode = profile.transmission_mode().as_str(),
        target_link = ?config.target,
        "profile_loaded"
    );

    let options = ProtocolOptions {
        soi: config.frame_soi,
        eoi: config.frame_eoi,
        receiver: FrameReceiver::new(
            Duration::from_millis(config.response_timeout_ms),
            Duration::from_millis(config.read_slice_ms),
        ),
    };
    let protocol = DeviceProtocol::for_profile(&profile, options);
    let transport = link::build_transport(&config);
    let mut poller = Poller::new(
        profile,
        protocol,
        transport,
        Duration::from_millis(config.command_delay_ms),
    )?;

    let cycles = poller
        .run(config.max_cycles, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(target: "devpoll.poll", error = %e, "ctrl_c_listener_failed");
                std::future::pending::<()>().await;
            }
        })
        .await;
    info!(target: "devpoll.poll", cycles, "poller_stopped");
    Ok(())
}
