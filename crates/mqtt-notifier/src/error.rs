//! MQTT 알림 에러 타입
//!
//! [`MqttNotifierError`]는 브로커 연결 수립과 설정 검증 단계의 에러를 표현합니다.
//! 실행 중 전송 실패는 core의 `NotifyError`로 보고됩니다.

use connrate_core::error::{ConfigError, ConnRateError, PipelineError};

/// MQTT 알림 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum MqttNotifierError {
    /// 브로커 연결 실패
    #[error("mqtt connection error: {broker}: {reason}")]
    Connection {
        /// 브로커 주소 (host:port)
        broker: String,
        /// 실패 사유
        reason: String,
    },

    /// 첫 연결 확인 대기 시간 초과
    #[error("mqtt connection to {broker} timed out after {timeout_secs}s")]
    ConnectTimeout {
        /// 브로커 주소 (host:port)
        broker: String,
        /// 대기 시간 (초)
        timeout_secs: u64,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<MqttNotifierError> for ConnRateError {
    fn from(err: MqttNotifierError) -> Self {
        match err {
            MqttNotifierError::Config { field, reason } => {
                ConnRateError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => ConnRateError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
