//! 설정 관리 -- config.json 파싱 및 런타임 설정
//!
//! [`MonitorConfig`]는 프로세스 전체 설정을 담는 최상위 구조체입니다.
//! 시작 시 한 번 로드되고 이후에는 읽기 전용으로 각 컴포넌트에 전달됩니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`CONNRATE_MQTT_BROKER=10.1.1.5` 형식)
//! 2. 설정 파일 (`config.json`)
//! 3. 기본값 (`Default` 구현)
//!
//! 파일이 없거나, JSON이 잘못되었거나, 값이 유효하지 않으면 모두 에러입니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), connrate_core::error::ConnRateError> {
//! use connrate_core::config::MonitorConfig;
//!
//! let config = MonitorConfig::load("./config.json").await?;
//! let config = MonitorConfig::parse(r#"{"notify_topic": "a10/alerts"}"#)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ConnRateError};

/// 기본 설정 파일 경로
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// 브로커 연결 로그의 tracing target
///
/// `debug` 값과 관계없이 항상 info 레벨로 출력됩니다.
pub const BROKER_LOG_TARGET: &str = "connrate::broker";

/// 레코드 채널이 가득 찼을 때의 처리 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// 빈 자리가 생길 때까지 수집기가 대기 (기본값)
    #[default]
    Block,
    /// 새 레코드를 버림
    Drop,
}

impl OverflowPolicy {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "block" => Some(Self::Block),
            "drop" => Some(Self::Drop),
            _ => None,
        }
    }
}

/// 모니터 통합 설정
///
/// `config.json` 파일의 최상위 구조를 나타냅니다.
/// `debug` ~ `password`는 기존 설정 파일과 호환되는 필드이며,
/// 나머지는 생략 가능한 확장 필드입니다.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 로그 상세도 (0 = 출력 없음, >3 = 전송 실패, >5 = 정보, >9 = 레코드별 출력)
    pub debug: u32,
    /// MQTT 브로커 호스트
    pub mqtt_broker: String,
    /// MQTT 클라이언트 ID
    pub client_id: String,
    /// syslog UDP 수신 포트
    pub syslog_port: u16,
    /// MQTT 브로커 포트
    pub mqtt_port: u16,
    /// 알림을 발행할 토픽
    pub notify_topic: String,
    /// 브로커 사용자명 (비어 있으면 인증 없이 접속)
    pub username: String,
    /// 브로커 비밀번호
    #[serde(skip_serializing)]
    pub password: String,

    // --- 확장 설정 ---
    /// 발행 QoS (0, 1, 2)
    pub qos: u8,
    /// MQTT keep-alive 주기 (초)
    pub keep_alive_secs: u64,
    /// 전송 확인 대기 시간 (초)
    pub publish_timeout_secs: u64,
    /// 최초 연결 대기 시간 (초)
    pub connect_timeout_secs: u64,
    /// 연결 끊김 후 재연결 시도 간격 (초)
    pub reconnect_delay_secs: u64,
    /// 수집기 -> 드라이버 채널 용량
    pub channel_capacity: usize,
    /// 채널 포화 시 정책
    pub overflow_policy: OverflowPolicy,
    /// syslog 바인드 IP
    pub syslog_bind_addr: String,
    /// 로그 형식 (pretty, json)
    pub log_format: String,
    /// Prometheus 메트릭 포트 (없으면 비활성화)
    pub metrics_port: Option<u16>,
    /// Prometheus 메트릭 바인드 IP
    pub metrics_bind_addr: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debug: 0,
            mqtt_broker: "localhost".to_owned(),
            client_id: "conn-rate-monitor".to_owned(),
            syslog_port: 5514,
            mqtt_port: 1883,
            notify_topic: String::new(),
            username: String::new(),
            password: String::new(),
            qos: 0,
            keep_alive_secs: 30,
            publish_timeout_secs: 5,
            connect_timeout_secs: 10,
            reconnect_delay_secs: 1,
            channel_capacity: 1024,
            overflow_policy: OverflowPolicy::Block,
            syslog_bind_addr: "0.0.0.0".to_owned(),
            log_format: "pretty".to_owned(),
            metrics_port: None,
            metrics_bind_addr: "0.0.0.0".to_owned(),
        }
    }
}

impl fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("debug", &self.debug)
            .field("mqtt_broker", &self.mqtt_broker)
            .field("client_id", &self.client_id)
            .field("syslog_port", &self.syslog_port)
            .field("mqtt_port", &self.mqtt_port)
            .field("notify_topic", &self.notify_topic)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("qos", &self.qos)
            .field("keep_alive_secs", &self.keep_alive_secs)
            .field("publish_timeout_secs", &self.publish_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("reconnect_delay_secs", &self.reconnect_delay_secs)
            .field("channel_capacity", &self.channel_capacity)
            .field("overflow_policy", &self.overflow_policy)
            .field("syslog_bind_addr", &self.syslog_bind_addr)
            .field("log_format", &self.log_format)
            .field("metrics_port", &self.metrics_port)
            .field("metrics_bind_addr", &self.metrics_bind_addr)
            .finish()
    }
}

impl MonitorConfig {
    /// 설정 파일을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConnRateError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일을 읽어 파싱합니다 (환경변수 오버라이드, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConnRateError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConnRateError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ConnRateError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// JSON 문자열에서 설정을 파싱합니다.
    pub fn parse(json_str: &str) -> Result<Self, ConnRateError> {
        serde_json::from_str(json_str).map_err(|e| {
            ConnRateError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CONNRATE_{FIELD}`
    /// 예: `CONNRATE_NOTIFY_TOPIC=a10/alerts`
    pub fn apply_env_overrides(&mut self) {
        override_parsed(&mut self.debug, "CONNRATE_DEBUG");
        override_string(&mut self.mqtt_broker, "CONNRATE_MQTT_BROKER");
        override_string(&mut self.client_id, "CONNRATE_CLIENT_ID");
        override_parsed(&mut self.syslog_port, "CONNRATE_SYSLOG_PORT");
        override_parsed(&mut self.mqtt_port, "CONNRATE_MQTT_PORT");
        override_string(&mut self.notify_topic, "CONNRATE_NOTIFY_TOPIC");
        override_string(&mut self.username, "CONNRATE_USERNAME");
        override_string(&mut self.password, "CONNRATE_PASSWORD");

        override_parsed(&mut self.qos, "CONNRATE_QOS");
        override_parsed(&mut self.keep_alive_secs, "CONNRATE_KEEP_ALIVE_SECS");
        override_parsed(
            &mut self.publish_timeout_secs,
            "CONNRATE_PUBLISH_TIMEOUT_SECS",
        );
        override_parsed(
            &mut self.connect_timeout_secs,
            "CONNRATE_CONNECT_TIMEOUT_SECS",
        );
        override_parsed(
            &mut self.reconnect_delay_secs,
            "CONNRATE_RECONNECT_DELAY_SECS",
        );
        override_parsed(&mut self.channel_capacity, "CONNRATE_CHANNEL_CAPACITY");
        override_string(&mut self.syslog_bind_addr, "CONNRATE_SYSLOG_BIND_ADDR");
        override_string(&mut self.log_format, "CONNRATE_LOG_FORMAT");
        override_string(&mut self.metrics_bind_addr, "CONNRATE_METRICS_BIND_ADDR");

        if let Ok(val) = std::env::var("CONNRATE_OVERFLOW_POLICY") {
            match OverflowPolicy::from_name(&val) {
                Some(policy) => self.overflow_policy = policy,
                None => warn!(
                    env_key = "CONNRATE_OVERFLOW_POLICY",
                    value = val.as_str(),
                    "unknown overflow policy in env var, ignoring"
                ),
            }
        }

        if let Ok(val) = std::env::var("CONNRATE_METRICS_PORT") {
            match val.parse::<u16>() {
                Ok(0) => self.metrics_port = None,
                Ok(port) => self.metrics_port = Some(port),
                Err(_) => warn!(
                    env_key = "CONNRATE_METRICS_PORT",
                    value = val.as_str(),
                    "failed to parse metrics port from env var, ignoring"
                ),
            }
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConnRateError> {
        require_non_empty("mqtt_broker", &self.mqtt_broker)?;
        require_non_empty("client_id", &self.client_id)?;
        require_non_empty("notify_topic", &self.notify_topic)?;
        require_non_empty("syslog_bind_addr", &self.syslog_bind_addr)?;
        require_non_empty("metrics_bind_addr", &self.metrics_bind_addr)?;

        if self.notify_topic.contains(['+', '#']) {
            return Err(invalid(
                "notify_topic",
                "wildcards '+' and '#' are not allowed in a publish topic",
            ));
        }

        if self.syslog_port == 0 {
            return Err(invalid("syslog_port", "must be 1-65535"));
        }
        if self.mqtt_port == 0 {
            return Err(invalid("mqtt_port", "must be 1-65535"));
        }

        if self.qos > 2 {
            return Err(invalid("qos", "must be one of: 0, 1, 2"));
        }

        const MAX_CHANNEL_CAPACITY: usize = 1_000_000;
        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(invalid(
                "channel_capacity",
                &format!("must be 1-{}", MAX_CHANNEL_CAPACITY),
            ));
        }

        if self.keep_alive_secs < 5 {
            return Err(invalid("keep_alive_secs", "must be at least 5"));
        }
        if self.publish_timeout_secs == 0 {
            return Err(invalid("publish_timeout_secs", "must be greater than 0"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(invalid("connect_timeout_secs", "must be greater than 0"));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            return Err(invalid(
                "log_format",
                &format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.metrics_port == Some(0) {
            return Err(invalid("metrics_port", "must be 1-65535 or omitted"));
        }

        if !self.username.is_empty() && self.password.is_empty() {
            warn!("username is set but password is empty");
        }

        Ok(())
    }

    /// `debug` 값에 대응하는 기본 로그 필터를 반환합니다.
    ///
    /// | debug | 필터 |
    /// |---|---|
    /// | 0 | off |
    /// | 1-3 | error |
    /// | 4-5 | warn |
    /// | 6-9 | info |
    /// | 10+ | debug |
    ///
    /// [`BROKER_LOG_TARGET`]은 모든 레벨에서 info까지 출력됩니다.
    pub fn log_filter(&self) -> &'static str {
        match self.debug {
            0 => "off,connrate::broker=info",
            1..=3 => "error,connrate::broker=info",
            4..=5 => "warn,connrate::broker=info",
            6..=9 => "info",
            _ => "debug",
        }
    }

    /// 인증 정보가 설정되어 있으면 (username, password)를 반환합니다.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() {
            None
        } else {
            Some((self.username.as_str(), self.password.as_str()))
        }
    }

    /// syslog 수신 소켓 주소 문자열 (예: "0.0.0.0:5514")
    pub fn syslog_bind(&self) -> String {
        format!("{}:{}", self.syslog_bind_addr, self.syslog_port)
    }

    /// 전송 확인 대기 시간
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}

fn invalid(field: &str, reason: &str) -> ConnRateError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
    .into()
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConnRateError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(())
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse value from env var, ignoring"
            ),
        }
    }
}
