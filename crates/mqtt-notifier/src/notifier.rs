//! MQTT [`Notifier`] 구현
//!
//! # 아키텍처
//!
//! ```text
//!  PipelineDriver ──publish──▶ MqttNotifier ──AsyncClient──▶ rumqttc request queue
//!                                   ▲                               │
//!                                   │ Confirmation (mpsc)           ▼
//!                                   └──────────────── event loop task ──▶ broker
//!                                     connected (watch)
//! ```
//!
//! 이벤트 루프 태스크가 `EventLoop::poll`을 계속 호출하여 재연결을 수행하고,
//! 전송 확인 이벤트를 `publish` 호출자에게 전달합니다.
//!
//! | QoS | 완료 조건 |
//! |---|---|
//! | 0 | PUBLISH 패킷이 연결에 기록됨 |
//! | 1 | PUBACK 수신 |
//! | 2 | PUBCOMP 수신 |

use std::time::Duration;

use connrate_core::config::BROKER_LOG_TARGET;
use connrate_core::error::NotifyError;
use connrate_core::metrics as m;
use connrate_core::pipeline::Notifier;
use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet, QoS};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{MqttConfig, REQUEST_CHANNEL_CAPACITY, qos_from_level};
use crate::error::MqttNotifierError;

/// 확인 이벤트 채널 용량 (소비자가 없으면 초과분은 버려짐)
const CONFIRMATION_CHANNEL_CAPACITY: usize = 64;

/// 이벤트 루프 종료 대기 시간
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// 이벤트 루프가 전달하는 전송 확인 이벤트
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Confirmation {
    /// PUBLISH 패킷 기록 완료 (packet id, QoS 0이면 0)
    Written(u16),
    /// PUBACK 수신
    Acked(u16),
    /// PUBCOMP 수신
    Completed(u16),
}

/// MQTT 브로커로 알림을 전송하는 [`Notifier`]
///
/// [`connect`](Self::connect)로 생성하며, 이후 `Arc`로 감싸 파이프라인 드라이버와 공유합니다.
/// `publish` 호출은 내부 잠금으로 직렬화되므로 한 번에 하나의 메시지만 전송 중입니다.
pub struct MqttNotifier {
    client: AsyncClient,
    qos: QoS,
    broker: String,
    publish_timeout: Duration,
    confirmations: Mutex<mpsc::Receiver<Confirmation>>,
    connected: watch::Receiver<bool>,
    cancel_token: CancellationToken,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttNotifier {
    /// 브로커에 연결하고 첫 CONNACK을 받을 때까지 대기합니다.
    ///
    /// # Errors
    ///
    /// - `MqttNotifierError::Config`: 설정값이 유효하지 않음
    /// - `MqttNotifierError::Connection`: 첫 연결 시도가 실패함
    /// - `MqttNotifierError::ConnectTimeout`: `connect_timeout` 안에 CONNACK을 받지 못함
    pub async fn connect(config: MqttConfig) -> Result<Self, MqttNotifierError> {
        config.validate()?;
        let qos = qos_from_level(config.qos)?;
        let broker = config.broker_addr();

        info!(
            broker = %broker,
            client_id = %config.client_id,
            qos = config.qos,
            authenticated = config.credentials.is_some(),
            "connecting to MQTT broker"
        );

        let (client, eventloop) = AsyncClient::new(config.mqtt_options(), REQUEST_CHANNEL_CAPACITY);
        let (confirm_tx, confirm_rx) = mpsc::channel(CONFIRMATION_CHANNEL_CAPACITY);
        let (connected_tx, connected_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();
        let cancel_token = CancellationToken::new();

        let event_task = tokio::spawn(drive_event_loop(
            eventloop,
            EventLoopContext {
                broker: broker.clone(),
                confirm_tx,
                connected_tx,
                ready_tx: Some(ready_tx),
                reconnect_delay: config.reconnect_delay,
                cancel_token: cancel_token.clone(),
            },
        ));

        let ready = match tokio::time::timeout(config.connect_timeout, ready_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(MqttNotifierError::Connection {
                broker: broker.clone(),
                reason: "event loop stopped before connecting".to_owned(),
            }),
            Err(_) => Err(MqttNotifierError::ConnectTimeout {
                broker: broker.clone(),
                timeout_secs: config.connect_timeout.as_secs(),
            }),
        };

        if let Err(e) = ready {
            cancel_token.cancel();
            event_task.abort();
            return Err(e);
        }

        Ok(Self {
            client,
            qos,
            broker,
            publish_timeout: config.publish_timeout,
            confirmations: Mutex::new(confirm_rx),
            connected: connected_rx,
            cancel_token,
            event_task: Mutex::new(Some(event_task)),
        })
    }

    /// 현재 브로커 연결 여부
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// 브로커 주소 (host:port)
    pub fn broker(&self) -> &str {
        &self.broker
    }

    /// DISCONNECT를 전송하고 이벤트 루프 태스크를 종료합니다.
    ///
    /// 여러 번 호출해도 안전합니다.
    pub async fn disconnect(&self) {
        let Some(handle) = self.event_task.lock().await.take() else {
            return;
        };

        if let Err(e) = self.client.disconnect().await {
            debug!(error = %e, "failed to queue MQTT disconnect");
        }

        // DISCONNECT 패킷이 기록되면 이벤트 루프가 스스로 종료함
        let mut handle = handle;
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut handle).await.is_err() {
            self.cancel_token.cancel();
            handle.abort();
        }
        info!(broker = %self.broker, "disconnected from MQTT broker");
    }

    async fn publish_confirmed(&self, topic: &str, message: &str) -> Result<(), NotifyError> {
        if !self.is_connected() {
            return Err(NotifyError::Disconnected);
        }

        let mut confirmations = self.confirmations.lock().await;

        // 이전 호출에서 시간 초과로 남은 확인 이벤트 제거
        while confirmations.try_recv().is_ok() {}

        self.client
            .publish(topic, self.qos, false, message.as_bytes().to_vec())
            .await
            .map_err(|e| NotifyError::Rejected(e.to_string()))?;

        let deadline = tokio::time::sleep(self.publish_timeout);
        tokio::pin!(deadline);
        let disconnected = wait_disconnected(self.connected.clone());
        tokio::pin!(disconnected);

        let mut written: Option<u16> = None;
        loop {
            let confirmation = tokio::select! {
                confirmation = confirmations.recv() => {
                    confirmation.ok_or(NotifyError::Disconnected)?
                }
                _ = &mut deadline => {
                    return Err(NotifyError::AckTimeout {
                        timeout_ms: u64::try_from(self.publish_timeout.as_millis())
                            .unwrap_or(u64::MAX),
                    });
                }
                _ = &mut disconnected => return Err(NotifyError::Disconnected),
            };

            match (self.qos, confirmation) {
                (QoS::AtMostOnce, Confirmation::Written(_)) => return Ok(()),
                (_, Confirmation::Written(pkid)) if written.is_none() => written = Some(pkid),
                (QoS::AtLeastOnce, Confirmation::Acked(pkid))
                | (QoS::ExactlyOnce, Confirmation::Completed(pkid))
                    if written == Some(pkid) =>
                {
                    return Ok(());
                }
                (_, other) => debug!(?other, "ignoring unrelated delivery confirmation"),
            }
        }
    }
}

impl Notifier for MqttNotifier {
    fn name(&self) -> &str {
        "mqtt"
    }

    async fn publish(&self, topic: &str, message: &str) -> Result<(), NotifyError> {
        self.publish_confirmed(topic, message).await
    }
}

impl Drop for MqttNotifier {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// 연결이 끊길 때까지 대기합니다.
async fn wait_disconnected(mut connected: watch::Receiver<bool>) {
    loop {
        let is_connected = *connected.borrow_and_update();
        if !is_connected {
            return;
        }
        if connected.changed().await.is_err() {
            return;
        }
    }
}

struct EventLoopContext {
    broker: String,
    confirm_tx: mpsc::Sender<Confirmation>,
    connected_tx: watch::Sender<bool>,
    ready_tx: Option<oneshot::Sender<Result<(), MqttNotifierError>>>,
    reconnect_delay: Duration,
    cancel_token: CancellationToken,
}

impl EventLoopContext {
    fn set_connected(&self, connected: bool) -> bool {
        metrics::gauge!(m::NOTIFIER_CONNECTED).set(if connected { 1.0 } else { 0.0 });
        self.connected_tx.send_replace(connected)
    }

    fn confirm(&self, confirmation: Confirmation) {
        // publish 대기자가 없으면 버림
        let _ = self.confirm_tx.try_send(confirmation);
    }
}

/// rumqttc 이벤트 루프를 구동합니다.
///
/// 첫 연결 결과는 `ready_tx`로 한 번만 보고합니다. 첫 연결에 실패하면 종료하고,
/// 이후의 연결 끊김은 `reconnect_delay` 간격으로 재시도합니다.
/// 연결이 끊길 때 전송 확인을 받지 못한 발행 요청은 재전송하지 않습니다.
async fn drive_event_loop(mut eventloop: EventLoop, mut ctx: EventLoopContext) {
    loop {
        let event = tokio::select! {
            event = eventloop.poll() => event,
            _ = ctx.cancel_token.cancelled() => break,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!(
                    target: BROKER_LOG_TARGET,
                    broker = %ctx.broker,
                    session_present = ack.session_present,
                    "MQTT broker connected"
                );
                ctx.set_connected(true);
                if let Some(ready_tx) = ctx.ready_tx.take() {
                    let _ = ready_tx.send(Ok(()));
                }
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => ctx.confirm(Confirmation::Acked(ack.pkid)),
            Ok(Event::Incoming(Packet::PubComp(comp))) => {
                ctx.confirm(Confirmation::Completed(comp.pkid))
            }
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => {
                ctx.confirm(Confirmation::Written(pkid))
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!(broker = %ctx.broker, "MQTT disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if let Some(ready_tx) = ctx.ready_tx.take() {
                    let _ = ready_tx.send(Err(MqttNotifierError::Connection {
                        broker: ctx.broker.clone(),
                        reason: e.to_string(),
                    }));
                    break;
                }

                // 확인받지 못한 요청은 재연결 후 다시 보내지 않고 버림
                let discarded = eventloop.pending.len();
                eventloop.pending.clear();
                if discarded > 0 {
                    debug!(
                        broker = %ctx.broker,
                        discarded,
                        "discarding unconfirmed MQTT requests"
                    );
                }

                if ctx.set_connected(false) {
                    metrics::counter!(m::NOTIFIER_DISCONNECTS_TOTAL).increment(1);
                    warn!(broker = %ctx.broker, error = %e, "MQTT connection lost, reconnecting");
                } else {
                    debug!(broker = %ctx.broker, error = %e, "MQTT reconnect attempt failed");
                }

                tokio::select! {
                    _ = tokio::time::sleep(ctx.reconnect_delay) => {}
                    _ = ctx.cancel_token.cancelled() => break,
                }
            }
        }
    }

    ctx.set_connected(false);
}
