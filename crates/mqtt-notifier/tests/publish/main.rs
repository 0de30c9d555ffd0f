//! 발행 및 전송 확인 테스트
//!
//! 프로세스 내 [`FakeBroker`]를 상대로 QoS별 완료 조건, 시간 초과,
//! 연결 끊김, 재연결 동작을 검증합니다.

mod fake_broker;

use std::time::Duration;

use connrate_core::error::NotifyError;
use connrate_core::pipeline::Notifier;
use connrate_mqtt_notifier::{MqttConfig, MqttNotifier};

use fake_broker::{FakeBroker, Session};

const TOPIC: &str = "a10/thunder/conn-rate";

fn config(broker: &FakeBroker, qos: u8) -> MqttConfig {
    MqttConfig {
        broker_host: "127.0.0.1".to_owned(),
        broker_port: broker.port(),
        qos,
        publish_timeout: Duration::from_millis(500),
        connect_timeout: Duration::from_secs(5),
        reconnect_delay: Duration::from_millis(100),
        ..MqttConfig::default()
    }
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

/// 첫 연결이 끊긴 뒤 두 번째 연결이 수립될 때까지 대기
async fn wait_reconnected(broker: &FakeBroker, notifier: &MqttNotifier) {
    wait_until("reconnect", || {
        broker.connections() >= 2 && notifier.is_connected()
    })
    .await;
}

#[tokio::test]
async fn qos0_publish_completes_once_written() {
    let broker = FakeBroker::start(vec![Session::ACKING]).await;
    let notifier = MqttNotifier::connect(config(&broker, 0)).await.unwrap();
    assert!(notifier.is_connected());

    notifier.publish(TOPIC, "hello").await.unwrap();

    wait_until("payload", || !broker.received().is_empty()).await;
    let received = broker.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].topic, TOPIC);
    assert_eq!(received[0].qos, 0);
    assert_eq!(received[0].payload, "hello");
}

#[tokio::test]
async fn qos1_publish_waits_for_puback() {
    let broker = FakeBroker::start(vec![Session::ACKING]).await;
    let notifier = MqttNotifier::connect(config(&broker, 1)).await.unwrap();

    for n in 0..3 {
        notifier
            .publish(TOPIC, &format!("alert-{n}"))
            .await
            .unwrap();
    }

    // PUBACK은 브로커가 기록한 뒤에 전송되므로 이미 도착해 있음
    let received = broker.received();
    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|r| r.qos == 1));
    assert_eq!(
        broker.payloads(),
        vec![
            (0, "alert-0".to_owned()),
            (0, "alert-1".to_owned()),
            (0, "alert-2".to_owned()),
        ]
    );
}

#[tokio::test]
async fn qos2_publish_waits_for_pubcomp() {
    let broker = FakeBroker::start(vec![Session::ACKING]).await;
    let notifier = MqttNotifier::connect(config(&broker, 2)).await.unwrap();

    notifier.publish(TOPIC, "exactly-once").await.unwrap();

    let received = broker.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].qos, 2);
}

#[tokio::test]
async fn qos1_publish_times_out_without_puback() {
    let broker = FakeBroker::start(vec![Session::SILENT]).await;
    let notifier = MqttNotifier::connect(config(&broker, 1)).await.unwrap();

    let result = notifier.publish(TOPIC, "unacked").await;
    assert_eq!(result, Err(NotifyError::AckTimeout { timeout_ms: 500 }));
    assert_eq!(broker.payloads(), vec![(0, "unacked".to_owned())]);
}

#[tokio::test]
async fn publish_fails_fast_while_disconnected() {
    let broker =
        FakeBroker::start(vec![Session::ACKING.closing_after(Duration::from_millis(100))]).await;
    let notifier = MqttNotifier::connect(MqttConfig {
        // 테스트 동안 재연결하지 않음
        reconnect_delay: Duration::from_secs(30),
        ..config(&broker, 1)
    })
    .await
    .unwrap();

    wait_until("disconnect", || !notifier.is_connected()).await;

    let result = tokio::time::timeout(
        Duration::from_millis(100),
        notifier.publish(TOPIC, "while-down"),
    )
    .await
    .expect("publish should not wait while disconnected");
    assert_eq!(result, Err(NotifyError::Disconnected));
    assert!(broker.received().is_empty());
}

#[tokio::test]
async fn publish_succeeds_after_reconnect() {
    let broker = FakeBroker::start(vec![
        Session::ACKING.closing_after(Duration::from_millis(200)),
        Session::ACKING,
    ])
    .await;
    let notifier = MqttNotifier::connect(config(&broker, 1)).await.unwrap();

    wait_reconnected(&broker, &notifier).await;

    notifier.publish(TOPIC, "after-reconnect").await.unwrap();
    assert_eq!(broker.payloads(), vec![(1, "after-reconnect".to_owned())]);
}

#[tokio::test]
async fn unconfirmed_publish_is_not_resent_after_reconnect() {
    // 첫 연결은 PUBACK 없이 1초 후 종료, 두 번째 연결은 정상 응답
    let broker = FakeBroker::start(vec![
        Session::SILENT.closing_after(Duration::from_secs(1)),
        Session::ACKING,
    ])
    .await;
    let notifier = MqttNotifier::connect(config(&broker, 1)).await.unwrap();

    let first = notifier.publish(TOPIC, "first").await;
    assert_eq!(first, Err(NotifyError::AckTimeout { timeout_ms: 500 }));

    wait_reconnected(&broker, &notifier).await;
    notifier.publish(TOPIC, "second").await.unwrap();

    // 실패로 보고된 "first"는 새 연결에서 다시 전송되지 않아야 함
    assert_eq!(
        broker.payloads(),
        vec![(0, "first".to_owned()), (1, "second".to_owned())]
    );
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let broker = FakeBroker::start(vec![Session::ACKING]).await;
    let notifier = MqttNotifier::connect(config(&broker, 0)).await.unwrap();

    notifier.disconnect().await;
    notifier.disconnect().await;

    assert!(!notifier.is_connected());
    let result = notifier.publish(TOPIC, "after-disconnect").await;
    assert_eq!(result, Err(NotifyError::Disconnected));
}
