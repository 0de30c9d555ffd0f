//! UDP Syslog 수집기
//!
//! RFC 3164 형식의 syslog 메시지를 UDP 소켓으로 수신합니다.
//! 각 데이터그램을 하나의 레코드로 파싱한 뒤 파이프라인 채널로 전달합니다.
//!
//! 파싱에 실패한 데이터그램은 버리고 다음 데이터그램을 계속 수신합니다.
//! 채널 수신측이 닫히거나 취소 토큰이 발동되면 수신 루프를 종료합니다.

use std::net::SocketAddr;
use std::ops::ControlFlow;

use connrate_core::config::OverflowPolicy;
use connrate_core::metrics as m;
use connrate_core::types::LogRecord;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::CollectorStatus;
use crate::config::{MAX_DATAGRAM_SIZE, PipelineConfig};
use crate::error::LogPipelineError;
use crate::parser::SyslogParser;

const SOURCE_TYPE: &str = "syslog_udp";

/// UDP syslog 수집기 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogUdpConfig {
    /// 바인드 주소 (예: "0.0.0.0:5514")
    pub bind_addr: String,
    /// 최대 메시지 크기 (바이트, 초과분은 잘림)
    pub max_message_size: usize,
    /// 채널 포화 시 정책
    pub overflow_policy: OverflowPolicy,
}

impl Default for SyslogUdpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5514".to_owned(),
            max_message_size: MAX_DATAGRAM_SIZE,
            overflow_policy: OverflowPolicy::Block,
        }
    }
}

impl From<&PipelineConfig> for SyslogUdpConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            bind_addr: config.syslog_bind.clone(),
            max_message_size: config.max_message_size,
            overflow_policy: config.overflow_policy,
        }
    }
}

/// UDP Syslog 수집기
///
/// [`bind`](Self::bind)로 소켓을 연 뒤 [`run`](Self::run)으로 수신 루프를 실행합니다.
/// 바인드와 실행을 분리해 두었기 때문에, 포트 충돌은 수신 태스크를 띄우기 전에
/// 호출자에게 에러로 보고됩니다.
pub struct SyslogUdpCollector {
    config: SyslogUdpConfig,
    socket: UdpSocket,
    parser: SyslogParser,
    tx: mpsc::Sender<LogRecord>,
    cancel_token: CancellationToken,
    status: CollectorStatus,
    received: u64,
    dropped: u64,
}

impl SyslogUdpCollector {
    /// 설정된 주소에 UDP 소켓을 바인드합니다.
    pub async fn bind(
        config: SyslogUdpConfig,
        tx: mpsc::Sender<LogRecord>,
        cancel_token: CancellationToken,
    ) -> Result<Self, LogPipelineError> {
        let socket =
            UdpSocket::bind(&config.bind_addr)
                .await
                .map_err(|e| LogPipelineError::Collector {
                    source_type: SOURCE_TYPE.to_owned(),
                    reason: format!("failed to bind to {}: {}", config.bind_addr, e),
                })?;

        let parser = SyslogParser::new().with_max_input_size(config.max_message_size);

        Ok(Self {
            config,
            socket,
            parser,
            tx,
            cancel_token,
            status: CollectorStatus::Idle,
            received: 0,
            dropped: 0,
        })
    }

    /// 실제로 바인드된 로컬 주소를 반환합니다.
    pub fn local_addr(&self) -> Result<SocketAddr, LogPipelineError> {
        Ok(self.socket.local_addr()?)
    }

    /// 수신 루프를 실행합니다.
    ///
    /// 취소 토큰이 발동되거나 채널 수신측이 닫힐 때까지 실행됩니다.
    /// 반환 시 송신측 채널은 수집기와 함께 drop되어 드라이버가 종료를 인지합니다.
    pub async fn run(&mut self) -> Result<(), LogPipelineError> {
        self.status = CollectorStatus::Running;
        let local_addr = self.local_addr()?;
        info!(
            bind_addr = %local_addr,
            overflow_policy = ?self.config.overflow_policy,
            "UDP syslog collector listening"
        );

        let mut buf = vec![0u8; self.config.max_message_size];

        loop {
            let (len, peer) = tokio::select! {
                result = self.socket.recv_from(&mut buf) => match result {
                    Ok(received) => received,
                    Err(e) => {
                        // ICMP port unreachable 등은 수신 루프를 중단시키지 않음
                        warn!(error = %e, "UDP receive error");
                        continue;
                    }
                },
                _ = self.cancel_token.cancelled() => {
                    info!("UDP syslog collector received shutdown signal");
                    break;
                }
            };

            if self.handle_datagram(&buf[..len], peer).await.is_break() {
                break;
            }
        }

        self.status = CollectorStatus::Stopped;
        info!(
            received = self.received,
            dropped = self.dropped,
            "UDP syslog collector stopped"
        );
        Ok(())
    }

    /// 데이터그램 하나를 파싱하여 채널로 전달합니다.
    async fn handle_datagram(&mut self, data: &[u8], peer: SocketAddr) -> ControlFlow<()> {
        self.received += 1;
        metrics::counter!(m::COLLECTOR_DATAGRAMS_TOTAL).increment(1);

        let client = peer.to_string();
        let record = match self.parser.parse_record(data, &client) {
            Ok(record) => record,
            Err(e) => {
                metrics::counter!(m::COLLECTOR_PARSE_ERRORS_TOTAL).increment(1);
                debug!(client = %client, error = %e, "discarding undecodable datagram");
                return ControlFlow::Continue(());
            }
        };

        debug!(
            client = %record.client,
            hostname = %record.hostname,
            tag = %record.tag,
            content = %record.content,
            "syslog record received"
        );

        match self.config.overflow_policy {
            OverflowPolicy::Block => {
                tokio::select! {
                    result = self.tx.send(record) => {
                        if result.is_err() {
                            debug!("record channel closed");
                            return ControlFlow::Break(());
                        }
                    }
                    _ = self.cancel_token.cancelled() => {
                        self.dropped += 1;
                        return ControlFlow::Break(());
                    }
                }
            }
            OverflowPolicy::Drop => match self.tx.try_send(record) {
                Ok(()) => {}
                Err(TrySendError::Full(record)) => {
                    self.dropped += 1;
                    metrics::counter!(m::COLLECTOR_RECORDS_DROPPED_TOTAL).increment(1);
                    warn!(hostname = %record.hostname, "record channel full, dropping record");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("record channel closed");
                    return ControlFlow::Break(());
                }
            },
        }

        ControlFlow::Continue(())
    }

    /// 현재 상태를 반환합니다.
    pub fn status(&self) -> &CollectorStatus {
        &self.status
    }

    /// 지금까지 수신한 데이터그램 수
    pub fn received_count(&self) -> u64 {
        self.received
    }

    /// 채널 포화 또는 종료로 전달하지 못한 레코드 수
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}
