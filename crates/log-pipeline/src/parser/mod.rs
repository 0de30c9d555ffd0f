//! 로그 파싱 모듈 -- syslog 데이터그램을 `LogRecord`로 변환
//!
//! 각 파서는 core의 [`RecordParser`](connrate_core::pipeline::RecordParser) trait을 구현합니다.
//!
//! # 지원 형식
//! - Syslog RFC 3164 / BSD syslog ([`SyslogParser`])

pub mod syslog;

pub use syslog::SyslogParser;
