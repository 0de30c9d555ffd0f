//! 도메인 타입 -- 파이프라인 전역에서 사용되는 공통 타입
//!
//! 수집기가 만든 [`LogRecord`]는 파이프라인을 한 번 통과한 뒤 버려지고,
//! 조건에 맞는 레코드만 [`Notification`]으로 변환되어 브로커로 전달됩니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 수신된 syslog 레코드
///
/// RFC 3164 메시지를 디코딩한 결과입니다. 생성 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// 송신 측 주소 (예: "10.1.11.44:5456")
    pub client: String,
    /// 메시지 본문 (TAG 이후 부분)
    pub content: String,
    /// 송신 호스트명
    pub hostname: String,
    /// syslog TAG (예: "a10logd")
    pub tag: String,
    /// 원본 PRI 값
    pub priority: u8,
    /// syslog facility (PRI / 8)
    pub facility: u8,
    /// syslog severity (PRI % 8)
    pub severity: u8,
    /// 메시지 타임스탬프
    pub timestamp: SystemTime,
}

impl LogRecord {
    /// 본문과 호스트명만으로 레코드를 만듭니다. 나머지 필드는 기본값입니다.
    pub fn new(content: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            client: String::new(),
            content: content.into(),
            hostname: hostname.into(),
            tag: String::new(),
            priority: 0,
            facility: 0,
            severity: 0,
            timestamp: SystemTime::now(),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "client={} hostname={} tag={} facility={} severity={} content={}",
            self.client, self.hostname, self.tag, self.facility, self.severity, self.content,
        )
    }
}

/// 브로커로 전송될 알림 문자열
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Notification(String);

impl Notification {
    /// 알림을 생성합니다.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// 알림 본문을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 내부 문자열을 꺼냅니다.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Notification {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
