use devpoll_telemetry::{
    PollMetrics, PollSnapshot, metrics, new_cycle_id, record_exchange_latency_ms,
    record_frame_sent, record_metrics_decoded,
};

#[test]
fn cycle_ids_are_unique() {
    let first = new_cycle_id();
    let second = new_cycle_id();
    assert!(!first.is_empty());
    assert_ne!(first, second);
}

#[test]
fn fresh_metrics_start_at_zero() {
    let snapshot = PollMetrics::new().snapshot();
    assert_eq!(snapshot, PollSnapshot::default());
    assert_eq!(snapshot.average_exchange_latency_ms(), None);
}

#[test]
fn record_functions_update_global_counters() {
    let before = metrics().snapshot();
    record_frame_sent();
    record_metrics_decoded(3);
    record_exchange_latency_ms(40);
    record_exchange_latency_ms(60);
    let after = metrics().snapshot();

    // 全局计数在测试间共享，只比较增量
    assert!(after.frames_sent >= before.frames_sent + 1);
    assert!(after.metrics_decoded >= before.metrics_decoded + 3);
    assert!(after.exchange_latency_ms_count >= before.exchange_latency_ms_count + 2);
    assert!(after.average_exchange_latency_ms().is_some());
}
