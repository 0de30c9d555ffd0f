//! Syslog RFC 3164 (BSD syslog) 파서
//!
//! [RFC 3164](https://tools.ietf.org/html/rfc3164) 형식의 syslog 메시지를 파싱합니다.
//! A10 Thunder 장비는 이 형식으로 로그를 전송합니다.
//!
//! # RFC 3164 메시지 형식
//! ```text
//! <PRI>MMM DD HH:MM:SS HOSTNAME TAG[PID]: CONTENT
//! ```
//!
//! # 사용 예시
//! ```ignore
//! use connrate_log_pipeline::parser::SyslogParser;
//! use connrate_core::pipeline::RecordParser;
//!
//! let parser = SyslogParser::new();
//! let record = parser.parse(
//!     b"<132>May 18 22:03:04 Testing1 a10logd: [ACOS]<4> Virtual server ws-vip connection rate limit 100 exceeded",
//!     "10.1.11.44:5456",
//! )?;
//! assert_eq!(record.tag, "a10logd");
//! ```

use std::time::SystemTime;

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use connrate_core::error::ConnRateError;
use connrate_core::pipeline::RecordParser;
use connrate_core::types::LogRecord;

use crate::error::LogPipelineError;

/// 유효한 최대 PRI 값
/// facility 최댓값 23 * 8 + severity 최댓값 7 = 191
const MAX_SYSLOG_PRI: u8 = 191;

/// `MMM DD HH:MM:SS` 타임스탬프 길이
const BSD_TIMESTAMP_LEN: usize = 15;

/// RFC 3164 TAG 최대 길이
const MAX_TAG_LEN: usize = 32;

/// Syslog RFC 3164 파서
///
/// core의 [`RecordParser`] trait을 구현하여 syslog 데이터그램을 `LogRecord`로 변환합니다.
///
/// ## 지원 기능
/// - PRI 필드에서 facility/severity 디코딩
/// - 공백 패딩된 일자(`May  8`)를 포함한 BSD 타임스탬프 파싱
/// - `tag:` 및 `tag[pid]:` 형식의 TAG 추출
/// - 타임스탬프가 없는 메시지는 수신 시각과 송신 IP로 대체
pub struct SyslogParser {
    /// 최대 허용 입력 크기 (바이트)
    max_input_size: usize,
}

impl SyslogParser {
    /// 기본 설정으로 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            max_input_size: 64 * 1024, // 64KB
        }
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// PRI 값에서 facility와 severity를 분리합니다.
    ///
    /// PRI = facility * 8 + severity
    fn decode_pri(pri: u8) -> (u8, u8) {
        (pri / 8, pri % 8)
    }

    fn parse_error(offset: usize, reason: impl Into<String>) -> LogPipelineError {
        LogPipelineError::Parse {
            format: "rfc3164".to_owned(),
            offset,
            reason: reason.into(),
        }
    }

    /// 원시 데이터그램을 레코드로 파싱합니다.
    pub fn parse_record(&self, raw: &[u8], client: &str) -> Result<LogRecord, LogPipelineError> {
        if raw.len() > self.max_input_size {
            return Err(LogPipelineError::TooLarge {
                size: raw.len(),
                max: self.max_input_size,
            });
        }

        let input = String::from_utf8_lossy(raw);
        let input = input.trim_matches(|c: char| c.is_whitespace() || c == '\0');

        if input.is_empty() {
            return Err(Self::parse_error(0, "empty input"));
        }

        // PRI 파싱: <NNN>
        if !input.starts_with('<') {
            return Err(Self::parse_error(0, "missing PRI field (expected '<')"));
        }

        let pri_end = input
            .find('>')
            .filter(|&idx| idx <= 4)
            .ok_or_else(|| Self::parse_error(0, "unterminated PRI field"))?;

        let pri_str = &input[1..pri_end];
        let pri: u8 = pri_str
            .parse()
            .map_err(|_| Self::parse_error(1, format!("invalid PRI value: '{pri_str}'")))?;

        if pri > MAX_SYSLOG_PRI {
            return Err(Self::parse_error(
                1,
                format!("PRI value {pri} out of valid range (0-{MAX_SYSLOG_PRI})"),
            ));
        }

        let (facility, severity) = Self::decode_pri(pri);
        let remainder = &input[pri_end + 1..];

        let (timestamp, hostname, body) = match Self::split_timestamp(remainder) {
            Some((timestamp, rest)) => {
                let (hostname, body) = rest.split_once(' ').unwrap_or((rest, ""));
                (timestamp, hostname.to_owned(), body)
            }
            // 헤더가 없으면 수신 시각과 송신 주소로 대체
            None => (SystemTime::now(), Self::client_host(client), remainder),
        };

        let (tag, content) = Self::split_tag(body);

        Ok(LogRecord {
            client: client.to_owned(),
            content: content.to_owned(),
            hostname,
            tag: tag.to_owned(),
            priority: pri,
            facility,
            severity,
            timestamp,
        })
    }

    /// 헤더 앞부분의 BSD 타임스탬프를 분리합니다.
    ///
    /// 성공하면 (타임스탬프, 나머지)를 반환합니다.
    fn split_timestamp(remainder: &str) -> Option<(SystemTime, &str)> {
        let candidate = remainder.get(..BSD_TIMESTAMP_LEN)?;
        let rest = remainder.get(BSD_TIMESTAMP_LEN..)?;
        let rest = rest.strip_prefix(' ')?;
        let timestamp = Self::parse_bsd_timestamp(candidate).ok()?;
        Some((timestamp, rest.trim_start()))
    }

    /// BSD syslog 타임스탬프를 파싱합니다.
    ///
    /// 형식: `MMM DD HH:MM:SS` (예: `Jan 15 12:00:00`, `May  8 01:02:03`)
    /// 연도 정보가 없으므로 현재 연도를 가정하고, 결과가 하루 이상 미래이면
    /// 작년 메시지로 간주합니다 (연말에 보낸 메시지를 연초에 받는 경우).
    fn parse_bsd_timestamp(timestamp: &str) -> Result<SystemTime, LogPipelineError> {
        let normalized = timestamp.split_whitespace().collect::<Vec<_>>().join(" ");
        let now = Utc::now();

        let parse_with_year = |year: i32| {
            NaiveDateTime::parse_from_str(&format!("{year} {normalized}"), "%Y %b %d %H:%M:%S")
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        };

        let dt = parse_with_year(now.year()).map_err(|e| {
            Self::parse_error(0, format!("invalid BSD timestamp '{timestamp}': {e}"))
        })?;

        let dt = if dt > now + chrono::Duration::days(1) {
            parse_with_year(now.year() - 1).unwrap_or(dt)
        } else {
            dt
        };

        Ok(SystemTime::from(dt))
    }

    /// TAG와 본문을 분리합니다.
    ///
    /// - `tag: content` -> ("tag", "content")
    /// - `tag[123]: content` -> ("tag", "content")
    /// - 그 외 -> ("", 전체)
    fn split_tag(body: &str) -> (&str, &str) {
        for (idx, ch) in body.char_indices() {
            if idx > MAX_TAG_LEN {
                break;
            }
            match ch {
                ':' if idx > 0 => {
                    let content = &body[idx + 1..];
                    return (&body[..idx], content.strip_prefix(' ').unwrap_or(content));
                }
                '[' if idx > 0 => {
                    let after = &body[idx + 1..];
                    if let Some(close) = after.find("]:")
                        && close > 0
                        && after[..close].bytes().all(|b| b.is_ascii_digit())
                    {
                        let content = &after[close + 2..];
                        return (&body[..idx], content.strip_prefix(' ').unwrap_or(content));
                    }
                    break;
                }
                ':' | '[' | ' ' => break,
                _ => {}
            }
        }
        ("", body)
    }

    /// "ip:port" 형식의 송신 주소에서 호스트 부분만 꺼냅니다.
    fn client_host(client: &str) -> String {
        client
            .parse::<std::net::SocketAddr>()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|_| client.to_owned())
    }
}

impl Default for SyslogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser for SyslogParser {
    fn format_name(&self) -> &str {
        "rfc3164"
    }

    fn parse(&self, raw: &[u8], client: &str) -> Result<LogRecord, ConnRateError> {
        self.parse_record(raw, client).map_err(ConnRateError::from)
    }
}
