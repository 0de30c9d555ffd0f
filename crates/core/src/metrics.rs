//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `connrate_`
//! - 모듈명: `collector_`, `pipeline_`, `notifier_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use connrate_core::metrics as m;
//!
//! metrics::counter!(m::PIPELINE_MATCHES_TOTAL).increment(1);
//! ```

use metrics::{describe_counter, describe_gauge};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Collector 메트릭 ──────────────────────────────────────────────

/// Collector: 수신한 데이터그램 수 (counter)
pub const COLLECTOR_DATAGRAMS_TOTAL: &str = "connrate_collector_datagrams_total";

/// Collector: 파싱 실패 수 (counter)
pub const COLLECTOR_PARSE_ERRORS_TOTAL: &str = "connrate_collector_parse_errors_total";

/// Collector: 채널 포화로 버려진 레코드 수 (counter)
pub const COLLECTOR_RECORDS_DROPPED_TOTAL: &str = "connrate_collector_records_dropped_total";

// ─── Pipeline 메트릭 ───────────────────────────────────────────────

/// Pipeline: 드라이버가 처리한 레코드 수 (counter)
pub const PIPELINE_RECORDS_TOTAL: &str = "connrate_pipeline_records_total";

/// Pipeline: 연결 속도 제한 초과로 분류된 레코드 수 (counter)
pub const PIPELINE_MATCHES_TOTAL: &str = "connrate_pipeline_matches_total";

/// Pipeline: 알림 전송 시도 결과 (counter, label: result)
pub const PIPELINE_NOTIFICATIONS_TOTAL: &str = "connrate_pipeline_notifications_total";

// ─── Notifier 메트릭 ───────────────────────────────────────────────

/// Notifier: 브로커 연결 상태 (gauge, 1=connected)
pub const NOTIFIER_CONNECTED: &str = "connrate_notifier_connected";

/// Notifier: 브로커 연결 끊김 횟수 (counter)
pub const NOTIFIER_DISCONNECTS_TOTAL: &str = "connrate_notifier_disconnects_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없어도 안전합니다.
pub fn describe_all() {
    describe_counter!(
        COLLECTOR_DATAGRAMS_TOTAL,
        "Total number of syslog datagrams received"
    );
    describe_counter!(
        COLLECTOR_PARSE_ERRORS_TOTAL,
        "Total number of datagrams that could not be decoded"
    );
    describe_counter!(
        COLLECTOR_RECORDS_DROPPED_TOTAL,
        "Total number of records dropped because the pipeline channel was full"
    );

    describe_counter!(
        PIPELINE_RECORDS_TOTAL,
        "Total number of log records processed by the pipeline driver"
    );
    describe_counter!(
        PIPELINE_MATCHES_TOTAL,
        "Total number of connection-rate-limit-exceeded records"
    );
    describe_counter!(
        PIPELINE_NOTIFICATIONS_TOTAL,
        "Total number of notification publish attempts by result"
    );

    describe_gauge!(
        NOTIFIER_CONNECTED,
        "Whether the broker connection is currently up (1) or down (0)"
    );
    describe_counter!(
        NOTIFIER_DISCONNECTS_TOTAL,
        "Total number of broker connection losses"
    );
}
