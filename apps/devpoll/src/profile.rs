//! 设备协议档案加载（JSON）。

use domain::DeviceProfile;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 档案加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse profile {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// 从文件读取档案，未填写编码的测点按指标名称补齐编码。
pub fn load_profile(path: impl AsRef<Path>) -> Result<DeviceProfile, ProfileError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut profile: DeviceProfile =
        serde_json::from_str(&content).map_err(|source| ProfileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let filled = profile.fill_metric_codes();
    if filled > 0 {
        debug!(path = %path.display(), filled, "derived missing metric codes");
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devpoll_protocol::validate_profile;
    use domain::TransmissionMode;

    fn sample(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../profiles")
            .join(name)
    }

    #[test]
    fn test_bundled_profiles_load_and_validate() {
        let rectifier = load_profile(sample("rectifier-ac.json")).expect("rectifier profile");
        assert_eq!(rectifier.transmission_mode(), TransmissionMode::Framed);
        validate_profile(&rectifier).expect("rectifier profile is valid");

        let ups = load_profile(sample("ups-q1.json")).expect("ups profile");
        assert_eq!(ups.transmission_mode(), TransmissionMode::Delimited);
        validate_profile(&ups).expect("ups profile is valid");
    }

    #[test]
    fn test_load_derives_missing_codes() {
        let path = std::env::temp_dir().join(format!("devpoll-codes-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"dev": {"code": "ups", "devType": "ups", "revPre": "(", "revSuf": "\\r",
                        "sendSuf": "\\r", "separator": "空格"},
                "addrs": [
                  {"command": "Q1", "metricName": "频率", "metricIndex": 1, "dataType": "FLOAT"},
                  {"command": "Q1", "metricName": "温度", "metricIndex": 2, "dataType": "FLOAT"}
                ]}"#,
        )
        .expect("write profile");
        let profile = load_profile(&path).expect("profile");
        std::fs::remove_file(&path).ok();

        assert_eq!(profile.addrs[0].metric_code, "el_frequency");
        assert_eq!(profile.addrs[1].metric_code, "device_temperature");
        validate_profile(&profile).expect("derived codes are unique");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_profile("/nonexistent/profile.json").expect_err("missing file");
        assert!(matches!(err, ProfileError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/profile.json"));
    }
}
