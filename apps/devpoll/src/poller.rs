//! 轮询循环
//!
//! 命令在启动时生成一次，之后每个周期按命令键顺序逐条收发：
//!
//! ```text
//! cycle ─► send(frame) ─► parse_response ─► 记录测点值
//!              │ 失败：记录并继续下一条命令
//!              ▼
//!          sleep(command_delay)
//! ```

use devpoll_protocol::{DeviceProtocol, Protocol, ProtocolError, validate_profile};
use devpoll_telemetry::{
    metrics, new_cycle_id, record_cycle, record_exchange_latency_ms, record_frame_sent,
    record_metrics_decoded, record_metrics_dropped, record_response_complete,
    record_response_partial, record_timeout, record_transport_failure,
};
use devpoll_transport::Transport;
use domain::{CommandSet, DeviceProfile};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{Instrument, info, info_span, warn};

/// 单个周期的统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub commands: usize,
    pub failed_commands: usize,
    pub decoded: usize,
    pub dropped: usize,
}

/// 单设备轮询器
pub struct Poller {
    profile: DeviceProfile,
    protocol: DeviceProtocol,
    commands: CommandSet,
    transport: Box<dyn Transport>,
    command_delay: Duration,
}

impl Poller {
    /// 校验档案并生成命令。
    pub fn new(
        profile: DeviceProfile,
        protocol: DeviceProtocol,
        transport: Box<dyn Transport>,
        command_delay: Duration,
    ) -> Result<Self, ProtocolError> {
        validate_profile(&profile)?;
        let commands = protocol.generate_commands(&profile)?;
        info!(
            target: "devpoll.poll",
            device = %profile.dev.name,
            protocol = protocol.name(),
            metrics = profile.addrs.len(),
            commands = commands.len(),
            "poller_ready"
        );
        Ok(Self {
            profile,
            protocol,
            commands,
            transport,
            command_delay,
        })
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// 执行一个轮询周期。
    pub async fn poll_cycle(&mut self) -> CycleReport {
        let span = info_span!("cycle", cycle_id = %new_cycle_id(), device = %self.profile.dev.name);
        self.run_cycle().instrument(span).await
    }

    async fn run_cycle(&mut self) -> CycleReport {
        record_cycle();
        let mut report = CycleReport::default();

        for (key, frame) in &self.commands {
            report.commands += 1;
            let addrs = self.protocol.command_addrs(&self.profile, key);

            record_frame_sent();
            let started = Instant::now();
            let result = self
                .protocol
                .send(self.transport.as_mut(), frame, &self.profile)
                .await;
            record_exchange_latency_ms(started.elapsed().as_millis() as u64);

            match result {
                Ok(data) => {
                    if self.is_partial(frame, &data) {
                        record_response_partial();
                    } else {
                        record_response_complete();
                    }

                    let values = self.protocol.parse_response(&data, &self.profile, &addrs);
                    for decoded in values.values() {
                        let address = decoded.address;
                        info!(
                            target: "devpoll.poll",
                            metric = %address.metric_name,
                            code = %address.metric_code,
                            value = decoded.value,
                            unit = %address.metric_unit,
                            enum_str = %address.enum_str,
                            "metric_value"
                        );
                    }
                    let dropped = addrs.len().saturating_sub(values.len());
                    report.decoded += values.len();
                    report.dropped += dropped;
                    record_metrics_decoded(values.len() as u64);
                    record_metrics_dropped(dropped as u64);
                }
                Err(err) => {
                    report.failed_commands += 1;
                    report.dropped += addrs.len();
                    record_metrics_dropped(addrs.len() as u64);
                    match &err {
                        ProtocolError::Timeout(_) => record_timeout(),
                        ProtocolError::IncompleteFrame(_) => record_response_partial(),
                        ProtocolError::Transport(_) => record_transport_failure(),
                        _ => {}
                    }
                    warn!(target: "devpoll.poll", command = %key, error = %err, "command_failed");
                }
            }

            if !self.command_delay.is_zero() {
                tokio::time::sleep(self.command_delay).await;
            }
        }

        let totals = metrics().snapshot();
        info!(
            target: "devpoll.poll",
            commands = report.commands,
            failed = report.failed_commands,
            decoded = report.decoded,
            dropped = report.dropped,
            total_frames = totals.frames_sent,
            total_timeouts = totals.timeouts,
            avg_exchange_ms = totals.average_exchange_latency_ms().unwrap_or(0),
            "cycle_finished"
        );
        report
    }

    /// 文本协议在超时时返回不完整数据。
    fn is_partial(&self, frame: &[u8], data: &[u8]) -> bool {
        match &self.protocol {
            DeviceProtocol::DelimitedText(text) => {
                !text.terminator(&self.profile, frame).is_satisfied(data)
            }
            DeviceProtocol::Framed(_) => false,
        }
    }

    /// 循环轮询，直到达到周期上限或收到停止信号，返回完成的周期数。
    pub async fn run<F>(&mut self, max_cycles: Option<u64>, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut completed = 0;
        loop {
            if max_cycles.is_some_and(|max| completed >= max) {
                info!(target: "devpoll.poll", cycles = completed, "max_cycles_reached");
                break;
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(target: "devpoll.poll", cycles = completed, "shutdown_requested");
                    break;
                }
                _ = self.poll_cycle() => {
                    completed += 1;
                }
            }
        }
        completed
    }
}
