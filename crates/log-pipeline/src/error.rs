//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for ConnRateError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use connrate_core::error::{ConnRateError, ParseError, PipelineError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 로그 파싱 실패
    #[error("parse error: {format} at offset {offset}: {reason}")]
    Parse {
        /// 파서 형식 (rfc3164 등)
        format: String,
        /// 실패 위치 (바이트 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
    },

    /// 입력 크기 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge {
        /// 입력 크기
        size: usize,
        /// 허용 최대 크기
        max: usize,
    },

    /// 수집기 에러 (소켓 바인드, 수신 실패 등)
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 수집 소스 유형 (syslog_udp 등)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LogPipelineError> for ConnRateError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Parse { offset, reason, .. } => {
                ConnRateError::Parse(ParseError::Failed { offset, reason })
            }
            LogPipelineError::TooLarge { size, max } => {
                ConnRateError::Parse(ParseError::TooLarge { size, max })
            }
            LogPipelineError::Io(e) => ConnRateError::Io(e),
            other => ConnRateError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = LogPipelineError::Parse {
            format: "rfc3164".to_owned(),
            offset: 42,
            reason: "unexpected character".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("rfc3164"));
        assert!(msg.contains("42"));
        assert!(msg.contains("unexpected character"));
    }

    #[test]
    fn parse_error_converts_to_parse_variant() {
        let err = LogPipelineError::Parse {
            format: "rfc3164".to_owned(),
            offset: 1,
            reason: "bad pri".to_owned(),
        };
        let top: ConnRateError = err.into();
        assert!(matches!(top, ConnRateError::Parse(_)));
    }

    #[test]
    fn collector_error_converts_to_pipeline_variant() {
        let err = LogPipelineError::Collector {
            source_type: "syslog_udp".to_owned(),
            reason: "address in use".to_owned(),
        };
        let top: ConnRateError = err.into();
        assert!(matches!(top, ConnRateError::Pipeline(_)));
        assert!(top.to_string().contains("address in use"));
    }
}
