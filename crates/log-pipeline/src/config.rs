//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`MonitorConfig`]에서 파이프라인이
//! 사용하는 필드만 추려낸 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use connrate_core::config::MonitorConfig;
//! use connrate_log_pipeline::config::PipelineConfig;
//!
//! let core_config = MonitorConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! ```

use connrate_core::config::{MonitorConfig, OverflowPolicy};
use serde::{Deserialize, Serialize};

use crate::error::LogPipelineError;

/// UDP 데이터그램 최대 크기
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

/// 로그 파이프라인 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Syslog 수신 바인드 주소 (예: "0.0.0.0:5514")
    pub syslog_bind: String,
    /// 데이터그램 최대 크기 (바이트)
    pub max_message_size: usize,
    /// 수집기와 드라이버 사이 채널 용량
    pub channel_capacity: usize,
    /// 채널 포화 시 정책
    pub overflow_policy: OverflowPolicy,
    /// 알림을 보낼 토픽
    pub notify_topic: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            syslog_bind: "0.0.0.0:5514".to_owned(),
            max_message_size: MAX_DATAGRAM_SIZE,
            channel_capacity: 1024,
            overflow_policy: OverflowPolicy::default(),
            notify_topic: String::new(),
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &MonitorConfig) -> Self {
        Self {
            syslog_bind: core.syslog_bind(),
            channel_capacity: core.channel_capacity,
            overflow_policy: core.overflow_policy,
            notify_topic: core.notify_topic.clone(),
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.syslog_bind.is_empty() {
            return Err(LogPipelineError::Config {
                field: "syslog_bind".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.max_message_size == 0 || self.max_message_size > MAX_DATAGRAM_SIZE {
            return Err(LogPipelineError::Config {
                field: "max_message_size".to_owned(),
                reason: format!("must be 1-{}", MAX_DATAGRAM_SIZE),
            });
        }

        if self.channel_capacity == 0 {
            return Err(LogPipelineError::Config {
                field: "channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.notify_topic.is_empty() {
            return Err(LogPipelineError::Config {
                field: "notify_topic".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}
