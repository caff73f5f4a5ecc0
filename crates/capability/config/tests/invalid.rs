use devpoll_config::{ConfigError, PollerConfig};

/// 环境变量为进程级共享，按顺序在同一个测试中检查。
#[test]
fn rejects_missing_and_invalid_values() {
    unsafe {
        std::env::remove_var("DEVPOLL_PROFILE");
        std::env::set_var("DEVPOLL_TARGET", "/dev/ttyS1");
    }
    assert!(matches!(
        PollerConfig::from_env(),
        Err(ConfigError::Missing(key)) if key == "DEVPOLL_PROFILE"
    ));

    unsafe {
        std::env::set_var("DEVPOLL_PROFILE", "ac.json");
        std::env::set_var("DEVPOLL_PARITY", "X");
    }
    assert!(matches!(
        PollerConfig::from_env(),
        Err(ConfigError::Invalid(key, _)) if key == "DEVPOLL_PARITY"
    ));

    unsafe {
        std::env::set_var("DEVPOLL_PARITY", "e");
        std::env::set_var("DEVPOLL_RESPONSE_TIMEOUT_MS", "100");
        std::env::set_var("DEVPOLL_READ_SLICE_MS", "500");
    }
    assert!(matches!(
        PollerConfig::from_env(),
        Err(ConfigError::Invalid(key, _)) if key == "DEVPOLL_READ_SLICE_MS"
    ));

    unsafe {
        std::env::set_var("DEVPOLL_READ_SLICE_MS", "50");
        std::env::set_var("DEVPOLL_FRAME_EOI", "ZZ");
    }
    assert!(matches!(
        PollerConfig::from_env(),
        Err(ConfigError::Invalid(key, _)) if key == "DEVPOLL_FRAME_EOI"
    ));

    unsafe {
        std::env::remove_var("DEVPOLL_FRAME_EOI");
    }
    let config = PollerConfig::from_env().expect("config");
    assert_eq!(config.serial.parity, 'E');
    assert_eq!(config.max_cycles, None);
}
