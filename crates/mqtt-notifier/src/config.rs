//! MQTT 알림 설정
//!
//! [`MqttConfig`]는 core의 [`MonitorConfig`]에서 브로커 연결에 필요한 필드만 추려냅니다.
//!
//! # 사용 예시
//! ```ignore
//! use connrate_core::config::MonitorConfig;
//! use connrate_mqtt_notifier::MqttConfig;
//!
//! let core_config = MonitorConfig::default();
//! let config = MqttConfig::from_core(&core_config);
//! ```

use std::fmt;
use std::time::Duration;

use connrate_core::config::MonitorConfig;
use rumqttc::{MqttOptions, QoS};

use crate::error::MqttNotifierError;

/// rumqttc 요청 채널 용량
pub(crate) const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// MQTT 알림 설정
#[derive(Clone, PartialEq, Eq)]
pub struct MqttConfig {
    /// 브로커 호스트
    pub broker_host: String,
    /// 브로커 포트
    pub broker_port: u16,
    /// 클라이언트 ID
    pub client_id: String,
    /// (username, password), 사용자명이 비어 있으면 None
    pub credentials: Option<(String, String)>,
    /// 발행 QoS 레벨 (0, 1, 2)
    pub qos: u8,
    /// keep-alive 주기
    pub keep_alive: Duration,
    /// 전송 확인 대기 시간
    pub publish_timeout: Duration,
    /// 첫 연결 대기 시간
    pub connect_timeout: Duration,
    /// 재연결 시도 간격
    pub reconnect_delay: Duration,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_owned(),
            broker_port: 1883,
            client_id: "conn-rate-monitor".to_owned(),
            credentials: None,
            qos: 0,
            keep_alive: Duration::from_secs(30),
            publish_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl fmt::Debug for MqttConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttConfig")
            .field("broker_host", &self.broker_host)
            .field("broker_port", &self.broker_port)
            .field("client_id", &self.client_id)
            .field(
                "credentials",
                &self.credentials.as_ref().map(|(user, _)| (user, "[REDACTED]")),
            )
            .field("qos", &self.qos)
            .field("keep_alive", &self.keep_alive)
            .field("publish_timeout", &self.publish_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish()
    }
}

impl MqttConfig {
    /// core 설정에서 MQTT 설정을 생성합니다.
    pub fn from_core(core: &MonitorConfig) -> Self {
        Self {
            broker_host: core.mqtt_broker.clone(),
            broker_port: core.mqtt_port,
            client_id: core.client_id.clone(),
            credentials: core
                .credentials()
                .map(|(user, pass)| (user.to_owned(), pass.to_owned())),
            qos: core.qos,
            keep_alive: Duration::from_secs(core.keep_alive_secs),
            publish_timeout: core.publish_timeout(),
            connect_timeout: Duration::from_secs(core.connect_timeout_secs),
            reconnect_delay: Duration::from_secs(core.reconnect_delay_secs),
        }
    }

    /// 로그 출력용 브로커 주소 (host:port)
    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.broker_host, self.broker_port)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), MqttNotifierError> {
        if self.broker_host.is_empty() {
            return Err(config_error("broker_host", "must not be empty"));
        }
        if self.broker_port == 0 {
            return Err(config_error("broker_port", "must be 1-65535"));
        }
        if self.client_id.is_empty() {
            return Err(config_error("client_id", "must not be empty"));
        }
        qos_from_level(self.qos)?;
        if self.keep_alive < Duration::from_secs(5) {
            return Err(config_error("keep_alive", "must be at least 5 seconds"));
        }
        if self.publish_timeout.is_zero() {
            return Err(config_error("publish_timeout", "must be greater than 0"));
        }
        if self.connect_timeout.is_zero() {
            return Err(config_error("connect_timeout", "must be greater than 0"));
        }
        Ok(())
    }

    /// rumqttc 연결 옵션을 생성합니다.
    pub(crate) fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.client_id.clone(),
            self.broker_host.clone(),
            self.broker_port,
        );
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some((user, pass)) = &self.credentials {
            options.set_credentials(user.clone(), pass.clone());
        }
        options
    }
}

/// QoS 레벨 숫자를 rumqttc QoS로 변환합니다.
pub fn qos_from_level(level: u8) -> Result<QoS, MqttNotifierError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(config_error(
            "qos",
            &format!("must be one of: 0, 1, 2 (got {other})"),
        )),
    }
}

fn config_error(field: &str, reason: &str) -> MqttNotifierError {
    MqttNotifierError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}
