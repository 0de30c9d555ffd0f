//! 알림 문자열 생성
//!
//! 분류를 통과한 레코드에서 심각도 태그(`[ACOS]<4> `)를 떼어내고
//! 호스트명과 결합해 [`Notification`]을 만듭니다.
//!
//! 태그는 고정 길이로 자르지 않고 첫 번째 `>` 위치를 기준으로 제거합니다.
//! `<4>`처럼 한 자리가 아닌 태그도 올바르게 처리됩니다.

use connrate_core::types::{LogRecord, Notification};

use crate::classifier::ACOS_MARKER;

/// 알림 접두어
pub const NOTIFICATION_PREFIX: &str = "A10 Thunder node = ";

/// 호스트명과 메시지 구분자
pub const HOST_SEPARATOR: &str = "::";

/// 레코드를 알림으로 변환합니다.
///
/// 결과 형식: `A10 Thunder node = {hostname}::{message}`
///
/// [`classify`](crate::classifier::classify)가 true인 레코드에만 호출해야 합니다.
pub fn format_notification(record: &LogRecord) -> Notification {
    let message = strip_severity_tag(&record.content);
    let mut text = String::with_capacity(
        NOTIFICATION_PREFIX.len() + record.hostname.len() + HOST_SEPARATOR.len() + message.len(),
    );
    text.push_str(NOTIFICATION_PREFIX);
    text.push_str(&record.hostname);
    text.push_str(HOST_SEPARATOR);
    text.push_str(message);
    Notification::new(text)
}

/// 본문 앞의 `[ACOS]<N>` 태그와 뒤따르는 공백 한 칸을 제거합니다.
///
/// `>`가 없으면 `[ACOS]` 접두어와 앞쪽 공백만 제거합니다.
pub fn strip_severity_tag(content: &str) -> &str {
    match content.find('>') {
        Some(idx) => {
            let rest = &content[idx + 1..];
            rest.strip_prefix(' ').unwrap_or(rest)
        }
        None => content
            .strip_prefix(ACOS_MARKER)
            .unwrap_or(content)
            .trim_start(),
    }
}
