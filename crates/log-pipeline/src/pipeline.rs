//! 파이프라인 드라이버 -- 분류/포맷/알림 전송의 전체 흐름을 관리합니다.
//!
//! [`PipelineDriver`]는 수집기가 보낸 레코드를 채널에서 하나씩 꺼내
//! 연결 속도 제한 초과 이벤트만 골라 [`Notifier`]로 전송합니다.
//!
//! # 내부 아키텍처
//! ```text
//! SyslogUdpCollector -> mpsc -> PipelineDriver -> classify -> format -> Notifier
//! ```
//!
//! 전송 실패는 경고 로그만 남기고 다음 레코드로 넘어갑니다.
//! 채널의 모든 송신측이 닫히면 남은 레코드를 처리한 뒤 종료합니다.
//! [`PipelineDriver::stop_token`]이 취소되면 남은 레코드를 버리고 즉시 종료합니다.

use std::sync::Arc;

use connrate_core::metrics as m;
use connrate_core::pipeline::Notifier;
use connrate_core::types::LogRecord;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::formatter::format_notification;

/// 드라이버 처리 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// 채널에서 꺼낸 레코드 수
    pub received: u64,
    /// 연결 속도 제한 초과로 분류된 레코드 수
    pub matched: u64,
    /// 전송 확인을 받은 알림 수
    pub published: u64,
    /// 전송에 실패한 알림 수
    pub failed: u64,
}

/// 파이프라인 드라이버
///
/// 단일 소비자로 동작하므로 알림은 레코드가 도착한 순서대로 전송됩니다.
///
/// # 사용 예시
/// ```ignore
/// use connrate_log_pipeline::PipelineDriverBuilder;
///
/// let (driver, record_tx) = PipelineDriverBuilder::new(notifier)
///     .config(config)
///     .build()?;
///
/// let handle = driver.spawn();
/// // record_tx를 수집기에 전달
/// ```
pub struct PipelineDriver<N: Notifier> {
    notifier: Arc<N>,
    topic: String,
    record_rx: mpsc::Receiver<LogRecord>,
    stats: DriverStats,
    stop_token: CancellationToken,
}

impl<N: Notifier> PipelineDriver<N> {
    /// 새 드라이버를 생성합니다.
    pub fn new(
        notifier: Arc<N>,
        topic: impl Into<String>,
        record_rx: mpsc::Receiver<LogRecord>,
    ) -> Self {
        Self {
            notifier,
            topic: topic.into(),
            record_rx,
            stats: DriverStats::default(),
            stop_token: CancellationToken::new(),
        }
    }

    /// 알림 토픽을 반환합니다.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// 드라이버를 중단시키는 토큰을 반환합니다.
    ///
    /// 취소되면 진행 중인 전송을 포기하고 그때까지의 통계를 반환합니다.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop_token.clone()
    }

    /// 채널이 닫히거나 중단될 때까지 레코드를 처리합니다.
    pub async fn run(mut self) -> DriverStats {
        info!(
            notifier = self.notifier.name(),
            topic = %self.topic,
            "pipeline driver started"
        );

        let stop = self.stop_token.clone();
        loop {
            let record = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                record = self.record_rx.recv() => record,
            };
            let Some(record) = record else {
                break;
            };
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = self.process(record) => {}
            }
        }

        if stop.is_cancelled() {
            warn!(
                abandoned = self.record_rx.len(),
                "pipeline driver stopped before draining"
            );
        }

        info!(
            received = self.stats.received,
            matched = self.stats.matched,
            published = self.stats.published,
            failed = self.stats.failed,
            "pipeline driver stopped"
        );
        self.stats
    }

    /// 드라이버를 별도 tokio 태스크에서 실행합니다.
    pub fn spawn(self) -> JoinHandle<DriverStats> {
        tokio::spawn(self.run())
    }

    async fn process(&mut self, record: LogRecord) {
        self.stats.received += 1;
        metrics::counter!(m::PIPELINE_RECORDS_TOTAL).increment(1);

        debug!(
            client = %record.client,
            hostname = %record.hostname,
            tag = %record.tag,
            priority = record.priority,
            content = %record.content,
            "processing record"
        );

        if !classify(&record) {
            return;
        }

        self.stats.matched += 1;
        metrics::counter!(m::PIPELINE_MATCHES_TOTAL).increment(1);

        let notification = format_notification(&record);
        info!(notification = %notification, "connection rate limit exceeded");

        match self
            .notifier
            .publish(&self.topic, notification.as_str())
            .await
        {
            Ok(()) => {
                self.stats.published += 1;
                metrics::counter!(m::PIPELINE_NOTIFICATIONS_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);
            }
            Err(e) => {
                self.stats.failed += 1;
                metrics::counter!(m::PIPELINE_NOTIFICATIONS_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                warn!(
                    error = %e,
                    topic = %self.topic,
                    hostname = %record.hostname,
                    "failed to publish notification"
                );
            }
        }
    }
}

/// 파이프라인 드라이버 빌더
///
/// 드라이버와 수집기를 잇는 레코드 채널을 생성합니다.
pub struct PipelineDriverBuilder<N: Notifier> {
    notifier: Arc<N>,
    config: PipelineConfig,
}

impl<N: Notifier> PipelineDriverBuilder<N> {
    /// 새 빌더를 생성합니다.
    pub fn new(notifier: Arc<N>) -> Self {
        Self {
            notifier,
            config: PipelineConfig::default(),
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 드라이버를 빌드합니다.
    ///
    /// # Returns
    /// - `PipelineDriver`: 드라이버 인스턴스
    /// - `mpsc::Sender<LogRecord>`: 수집기에 전달할 레코드 송신측
    pub fn build(self) -> Result<(PipelineDriver<N>, mpsc::Sender<LogRecord>), LogPipelineError> {
        self.config.validate()?;

        let (record_tx, record_rx) = mpsc::channel(self.config.channel_capacity);
        let driver = PipelineDriver::new(self.notifier, self.config.notify_topic, record_rx);

        Ok((driver, record_tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connrate_core::error::NotifyError;
    use std::sync::Mutex;

    const MATCHING: &str = "[ACOS]<4> Virtual server ws-vip connection rate limit 100 exceeded";

    /// 전송 내역을 기록하고, 앞의 `fail_first`건은 실패시키는 테스트용 Notifier
    #[derive(Default)]
    struct MockNotifier {
        fail_first: usize,
        /// 이 번호 이후의 전송은 끝나지 않음
        hang_after: Option<usize>,
        attempts: Mutex<usize>,
        published: Mutex<Vec<(String, String)>>,
    }

    impl MockNotifier {
        fn failing(fail_first: usize) -> Self {
            Self {
                fail_first,
                ..Self::default()
            }
        }

        fn published(&self) -> Vec<(String, String)> {
            self.published.lock().unwrap().clone()
        }
    }

    impl Notifier for MockNotifier {
        fn name(&self) -> &str {
            "mock"
        }

        async fn publish(&self, topic: &str, message: &str) -> Result<(), NotifyError> {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                *attempts += 1;
                *attempts
            };
            if self.hang_after.is_some_and(|n| attempt > n) {
                std::future::pending::<()>().await;
            }
            if attempt <= self.fail_first {
                return Err(NotifyError::Rejected("broker unavailable".to_owned()));
            }
            self.published
                .lock()
                .unwrap()
                .push((topic.to_owned(), message.to_owned()));
            Ok(())
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            notify_topic: "a10/alerts".to_owned(),
            ..PipelineConfig::default()
        }
    }

    fn record(content: &str, hostname: &str) -> LogRecord {
        LogRecord::new(content, hostname)
    }

    #[test]
    fn builder_requires_topic() {
        let notifier = Arc::new(MockNotifier::default());
        let result = PipelineDriverBuilder::new(notifier)
            .config(PipelineConfig::default())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_creates_driver() {
        let notifier = Arc::new(MockNotifier::default());
        let (driver, _tx) = PipelineDriverBuilder::new(notifier)
            .config(config())
            .build()
            .unwrap();
        assert_eq!(driver.topic(), "a10/alerts");
    }

    #[tokio::test]
    async fn publishes_matching_record() {
        let notifier = Arc::new(MockNotifier::default());
        let (driver, tx) = PipelineDriverBuilder::new(Arc::clone(&notifier))
            .config(config())
            .build()
            .unwrap();

        tx.send(record(MATCHING, "Testing1")).await.unwrap();
        drop(tx);

        let stats = driver.run().await;
        assert_eq!(
            stats,
            DriverStats {
                received: 1,
                matched: 1,
                published: 1,
                failed: 0,
            }
        );
        assert_eq!(
            notifier.published(),
            vec![(
                "a10/alerts".to_owned(),
                "A10 Thunder node = Testing1::Virtual server ws-vip connection rate limit 100 exceeded"
                    .to_owned()
            )]
        );
    }

    #[tokio::test]
    async fn ignores_non_matching_records() {
        let notifier = Arc::new(MockNotifier::default());
        let (driver, tx) = PipelineDriverBuilder::new(Arc::clone(&notifier))
            .config(config())
            .build()
            .unwrap();

        tx.send(record(
            "[AFLEX]<6> http-error-status-log:HTTP Error: 10.147.95.128 - 404 - /blatt",
            "Testing1",
        ))
        .await
        .unwrap();
        tx.send(record("[ACOS]<4> something unrelated", "Testing1"))
            .await
            .unwrap();
        drop(tx);

        let stats = driver.run().await;
        assert_eq!(stats.received, 2);
        assert_eq!(stats.matched, 0);
        assert!(notifier.published().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_does_not_stop_driver() {
        let notifier = Arc::new(MockNotifier::failing(3));
        let (driver, tx) = PipelineDriverBuilder::new(Arc::clone(&notifier))
            .config(config())
            .build()
            .unwrap();

        for host in ["n1", "n2", "n3", "n4"] {
            tx.send(record(MATCHING, host)).await.unwrap();
        }
        drop(tx);

        let stats = driver.run().await;
        assert_eq!(stats.matched, 4);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.published, 1);

        let published = notifier.published();
        assert_eq!(published.len(), 1);
        assert!(published[0].1.starts_with("A10 Thunder node = n4::"));
    }

    #[tokio::test]
    async fn notifications_preserve_arrival_order() {
        let notifier = Arc::new(MockNotifier::default());
        let (driver, tx) = PipelineDriverBuilder::new(Arc::clone(&notifier))
            .config(config())
            .build()
            .unwrap();
        let handle = driver.spawn();

        let hosts: Vec<String> = (0..50).map(|i| format!("node-{i}")).collect();
        for host in &hosts {
            tx.send(record(MATCHING, host)).await.unwrap();
        }
        drop(tx);

        let stats = handle.await.unwrap();
        assert_eq!(stats.published, 50);

        let order: Vec<String> = notifier
            .published()
            .into_iter()
            .map(|(_, message)| message)
            .collect();
        let expected: Vec<String> = hosts
            .iter()
            .map(|h| format!("A10 Thunder node = {h}::Virtual server ws-vip connection rate limit 100 exceeded"))
            .collect();
        assert_eq!(order, expected);
    }

    #[tokio::test]
    async fn stop_token_ends_stuck_driver_with_partial_stats() {
        let notifier = Arc::new(MockNotifier {
            hang_after: Some(1),
            ..MockNotifier::default()
        });
        let (driver, tx) = PipelineDriverBuilder::new(Arc::clone(&notifier))
            .config(config())
            .build()
            .unwrap();
        let stop = driver.stop_token();
        let handle = driver.spawn();

        for host in ["n1", "n2", "n3"] {
            tx.send(record(MATCHING, host)).await.unwrap();
        }

        // n1 전송 완료, n2 전송은 멈춤
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while *notifier.attempts.lock().unwrap() < 2 {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        stop.cancel();
        let stats = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("driver should stop promptly")
            .unwrap();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.matched, 2);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.failed, 0);
        // 송신측이 살아 있어도 종료됨
        drop(tx);
    }

    #[tokio::test]
    async fn closed_channel_ends_driver_with_empty_stats() {
        let notifier = Arc::new(MockNotifier::default());
        let (driver, tx) = PipelineDriverBuilder::new(notifier)
            .config(config())
            .build()
            .unwrap();
        drop(tx);

        assert_eq!(driver.run().await, DriverStats::default());
    }
}
