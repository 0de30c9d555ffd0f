#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`notifier`]: `Notifier` trait의 MQTT 구현 ([`MqttNotifier`])
//! - [`config`]: 브로커 연결 설정 (core 설정에서 파생)
//! - [`error`]: 도메인 에러 타입

pub mod config;
pub mod error;
pub mod notifier;

pub use config::{MqttConfig, qos_from_level};
pub use error::MqttNotifierError;
pub use notifier::MqttNotifier;
