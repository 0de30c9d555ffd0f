//! 에러 타입 -- 도메인별 에러 정의

/// connrate 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ConnRateError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 파싱 실패
    #[error("parse failed at offset {offset}: {reason}")]
    Failed { offset: usize, reason: String },

    /// 입력 데이터 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

/// 알림 전송 에러
///
/// [`Notifier::publish`](crate::pipeline::Notifier::publish)가 반환합니다.
/// 호출자는 이 에러를 기록하고 해당 메시지를 버립니다 (재시도 없음).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// 브로커 연결이 끊어진 상태
    #[error("broker disconnected")]
    Disconnected,

    /// 전송 확인 대기 시간 초과
    #[error("delivery confirmation timed out after {timeout_ms}ms")]
    AckTimeout { timeout_ms: u64 },

    /// 클라이언트가 요청을 거부함
    #[error("publish rejected: {0}")]
    Rejected(String),
}
