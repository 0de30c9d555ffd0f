//! 파이프라인 trait -- 모듈 확장 포인트 정의

use std::future::Future;

use crate::error::{ConnRateError, NotifyError};
use crate::types::LogRecord;

/// 레코드 파서 trait
///
/// 새로운 syslog 형식을 지원하려면 이 trait을 구현합니다.
pub trait RecordParser: Send + Sync {
    /// 지원하는 형식 이름
    fn format_name(&self) -> &str;

    /// 원시 바이트를 레코드로 파싱
    ///
    /// `client`는 데이터그램을 보낸 주소이며 레코드에 그대로 기록됩니다.
    fn parse(&self, raw: &[u8], client: &str) -> Result<LogRecord, ConnRateError>;
}

/// 알림 전송 trait
///
/// 파이프라인 드라이버는 이 trait만 알고 있으며, 실제 전송은
/// 브로커 클라이언트 구현체(MQTT 등)가 담당합니다.
///
/// `publish`는 브로커의 전송 확인을 받은 뒤에 반환합니다.
/// 실패한 메시지는 재시도하지 않습니다.
pub trait Notifier: Send + Sync + 'static {
    /// 구현체 이름
    fn name(&self) -> &str;

    /// `topic`으로 `message`를 전송하고 확인을 기다립니다.
    fn publish(
        &self,
        topic: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}
