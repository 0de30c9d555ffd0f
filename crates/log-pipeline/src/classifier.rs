//! 레코드 분류 -- 연결 속도 제한 초과 이벤트 판별
//!
//! [`classify`]는 ACOS가 남긴 "connection rate limit ... exceeded" 로그만
//! 알림 경로로 통과시키는 순수 함수입니다.
//!
//! ```text
//! [ACOS]<4> Virtual server ws-vip connection rate limit 100 exceeded   -> true
//! [AFLEX]<6> http-error-status-log:HTTP Error: ...                       -> false
//! [ACOS]<4> something unrelated                                          -> false
//! ```

use connrate_core::types::LogRecord;

/// ACOS 서브시스템 로그 접두어
pub const ACOS_MARKER: &str = "[ACOS]";

/// 연결 속도 제한 키워드
pub const RATE_LIMIT_PHRASE: &str = "connection rate limit";

/// 초과 키워드
pub const EXCEEDED_PHRASE: &str = "exceeded";

/// 레코드가 연결 속도 제한 초과 이벤트인지 판별합니다.
///
/// `content`가 `[ACOS]`로 시작하고 두 키워드를 모두 포함할 때만 true입니다.
/// 대소문자를 구분하며, 빈 본문은 항상 false입니다.
pub fn classify(record: &LogRecord) -> bool {
    is_rate_limit_exceeded(&record.content)
}

/// 본문 문자열에 대한 판별 로직
pub fn is_rate_limit_exceeded(content: &str) -> bool {
    content.starts_with(ACOS_MARKER)
        && content.contains(RATE_LIMIT_PHRASE)
        && content.contains(EXCEEDED_PHRASE)
}
