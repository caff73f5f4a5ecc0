//! 追踪初始化、轮询周期标识与采集计数。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 采集计数快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSnapshot {
    pub cycles: u64,
    pub frames_sent: u64,
    pub responses_complete: u64,
    pub responses_partial: u64,
    pub timeouts: u64,
    pub transport_failures: u64,
    pub metrics_decoded: u64,
    pub metrics_dropped: u64,
    pub exchange_latency_ms_total: u64,
    pub exchange_latency_ms_count: u64,
}

impl PollSnapshot {
    /// 平均收发耗时（毫秒），无样本时为 None。
    pub fn average_exchange_latency_ms(&self) -> Option<u64> {
        self.exchange_latency_ms_total
            .checked_div(self.exchange_latency_ms_count)
    }
}

/// 进程级采集计数。
pub struct PollMetrics {
    cycles: AtomicU64,
    frames_sent: AtomicU64,
    responses_complete: AtomicU64,
    responses_partial: AtomicU64,
    timeouts: AtomicU64,
    transport_failures: AtomicU64,
    metrics_decoded: AtomicU64,
    metrics_dropped: AtomicU64,
    exchange_latency_ms_total: AtomicU64,
    exchange_latency_ms_count: AtomicU64,
}

impl PollMetrics {
    pub fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            responses_complete: AtomicU64::new(0),
            responses_partial: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            metrics_decoded: AtomicU64::new(0),
            metrics_dropped: AtomicU64::new(0),
            exchange_latency_ms_total: AtomicU64::new(0),
            exchange_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            responses_complete: self.responses_complete.load(Ordering::Relaxed),
            responses_partial: self.responses_partial.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            metrics_decoded: self.metrics_decoded.load(Ordering::Relaxed),
            metrics_dropped: self.metrics_dropped.load(Ordering::Relaxed),
            exchange_latency_ms_total: self.exchange_latency_ms_total.load(Ordering::Relaxed),
            exchange_latency_ms_count: self.exchange_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for PollMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<PollMetrics> = OnceLock::new();

/// 获取全局计数实例。
pub fn metrics() -> &'static PollMetrics {
    METRICS.get_or_init(PollMetrics::new)
}

/// 初始化 tracing（默认 info，`RUST_LOG` 覆盖）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的轮询周期标识。
pub fn new_cycle_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录轮询周期开始。
pub fn record_cycle() {
    metrics().cycles.fetch_add(1, Ordering::Relaxed);
}

/// 记录发出的命令帧。
pub fn record_frame_sent() {
    metrics().frames_sent.fetch_add(1, Ordering::Relaxed);
}

/// 记录完整应答。
pub fn record_response_complete() {
    metrics().responses_complete.fetch_add(1, Ordering::Relaxed);
}

/// 记录不完整应答（文本协议按部分数据继续解析，帧协议丢弃）。
pub fn record_response_partial() {
    metrics().responses_partial.fetch_add(1, Ordering::Relaxed);
}

pub fn record_timeout() {
    metrics().timeouts.fetch_add(1, Ordering::Relaxed);
}

pub fn record_transport_failure() {
    metrics().transport_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录解码成功的测点数。
pub fn record_metrics_decoded(count: u64) {
    metrics().metrics_decoded.fetch_add(count, Ordering::Relaxed);
}

/// 记录解码失败被跳过的测点数。
pub fn record_metrics_dropped(count: u64) {
    metrics().metrics_dropped.fetch_add(count, Ordering::Relaxed);
}

/// 记录一次收发耗时（毫秒）。
pub fn record_exchange_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .exchange_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .exchange_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
