//! 로그 수집 모듈 -- 네트워크에서 syslog 레코드를 수집합니다.
//!
//! # 수집 소스
//! - [`SyslogUdpCollector`]: UDP syslog 수신 (RFC 3164)
//!
//! # 아키텍처
//! 수집기는 자체 tokio 태스크에서 실행되며, 파싱된 레코드를
//! `tokio::mpsc::Sender<LogRecord>` 채널을 통해 파이프라인 드라이버로 전달합니다.

pub mod syslog_udp;

pub use syslog_udp::{SyslogUdpCollector, SyslogUdpConfig};

/// 수집기 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorStatus {
    /// 실행 대기 중
    Idle,
    /// 실행 중
    Running,
    /// 정상 종료됨
    Stopped,
}
