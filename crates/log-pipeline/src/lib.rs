#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`collector`]: UDP syslog 수신
//! - [`parser`]: Syslog RFC 3164 파서
//! - [`classifier`]: 연결 속도 제한 초과 레코드 판별
//! - [`formatter`]: 알림 문자열 생성
//! - [`pipeline`]: 채널 소비 및 알림 전송 드라이버
//! - [`config`]: 파이프라인 설정 (core 설정에서 파생)
//! - [`error`]: 도메인 에러 타입

pub mod classifier;
pub mod config;
pub mod error;
pub mod formatter;
pub mod pipeline;

pub mod collector;
pub mod parser;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{DriverStats, PipelineDriver, PipelineDriverBuilder};

// 설정
pub use config::PipelineConfig;

// 에러
pub use error::LogPipelineError;

// 파서
pub use parser::SyslogParser;

// 분류 / 포맷
pub use classifier::classify;
pub use formatter::format_notification;

// 수집기
pub use collector::{CollectorStatus, SyslogUdpCollector, SyslogUdpConfig};
