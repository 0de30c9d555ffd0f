//! 테스트용 MQTT 3.1.1 브로커
//!
//! CONNECT, PUBLISH (QoS 0/1/2), PUBREL, PINGREQ, DISCONNECT만 처리합니다.
//! 연결마다 [`Session`]으로 응답 여부와 강제 종료 시점을 정할 수 있습니다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// 연결별 브로커 동작
#[derive(Debug, Clone, Copy)]
pub struct Session {
    /// PUBACK / PUBREC / PUBCOMP 응답 여부
    pub acknowledge: bool,
    /// CONNACK 이후 이 시간이 지나면 연결을 끊음
    pub close_after: Option<Duration>,
}

impl Session {
    /// 모든 발행에 응답
    pub const ACKING: Self = Self {
        acknowledge: true,
        close_after: None,
    };

    /// 발행을 받기만 하고 응답하지 않음
    pub const SILENT: Self = Self {
        acknowledge: false,
        close_after: None,
    };

    pub fn closing_after(self, delay: Duration) -> Self {
        Self {
            close_after: Some(delay),
            ..self
        }
    }
}

/// 브로커가 받은 PUBLISH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    /// 몇 번째 연결에서 받았는지 (0부터)
    pub connection: usize,
    pub topic: String,
    pub qos: u8,
    pub payload: String,
}

pub struct FakeBroker {
    port: u16,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Received>>>,
    accept_task: JoinHandle<()>,
}

impl FakeBroker {
    /// `sessions[n]`은 n번째 연결에 적용되며, 이후 연결에는 마지막 항목이 적용됩니다.
    pub async fn start(sessions: Vec<Session>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let connections = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));

        let accept_task = tokio::spawn({
            let connections = Arc::clone(&connections);
            let received = Arc::clone(&received);
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let index = connections.fetch_add(1, Ordering::SeqCst);
                    let session = sessions
                        .get(index)
                        .or(sessions.last())
                        .copied()
                        .unwrap_or(Session::ACKING);
                    tokio::spawn(serve(stream, index, session, Arc::clone(&received)));
                }
            }
        });

        Self {
            port,
            connections,
            received,
            accept_task,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// 지금까지 수락한 TCP 연결 수
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    /// (연결 번호, payload) 목록
    pub fn payloads(&self) -> Vec<(usize, String)> {
        self.received()
            .into_iter()
            .map(|r| (r.connection, r.payload))
            .collect()
    }
}

impl Drop for FakeBroker {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    connection: usize,
    session: Session,
    received: Arc<Mutex<Vec<Received>>>,
) {
    match read_packet(&mut stream).await {
        Some((header, _)) if header >> 4 == 1 => {}
        _ => return,
    }
    // CONNACK: session present = 0, return code = accepted
    if stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await.is_err() {
        return;
    }

    let deadline = session
        .close_after
        .map(|delay| tokio::time::Instant::now() + delay);

    loop {
        let packet = match deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, read_packet(&mut stream)).await {
                    Ok(packet) => packet,
                    // 스트림을 드롭하여 연결을 끊음
                    Err(_) => return,
                }
            }
            None => read_packet(&mut stream).await,
        };
        let Some((header, body)) = packet else {
            return;
        };

        let reply = match header >> 4 {
            3 => handle_publish(header, &body, connection, session, &received),
            // PUBREL -> PUBCOMP
            6 if session.acknowledge => packet_id(&body).map(|id| ack(0x70, id)),
            // PINGREQ -> PINGRESP
            12 => Some(vec![0xD0, 0x00]),
            // DISCONNECT
            14 => return,
            _ => None,
        };

        if let Some(reply) = reply {
            if stream.write_all(&reply).await.is_err() {
                return;
            }
        }
    }
}

fn handle_publish(
    header: u8,
    body: &[u8],
    connection: usize,
    session: Session,
    received: &Mutex<Vec<Received>>,
) -> Option<Vec<u8>> {
    let qos = (header >> 1) & 0x03;
    let topic_len = usize::from(packet_id(body)?);
    let topic = String::from_utf8_lossy(body.get(2..2 + topic_len)?).into_owned();

    let mut offset = 2 + topic_len;
    let id = if qos > 0 {
        let id = packet_id(body.get(offset..)?)?;
        offset += 2;
        Some(id)
    } else {
        None
    };
    let payload = String::from_utf8_lossy(body.get(offset..)?).into_owned();

    received.lock().unwrap().push(Received {
        connection,
        topic,
        qos,
        payload,
    });

    if !session.acknowledge {
        return None;
    }
    match (qos, id) {
        (1, Some(id)) => Some(ack(0x40, id)),
        (2, Some(id)) => Some(ack(0x50, id)),
        _ => None,
    }
}

/// 앞 2바이트를 big-endian u16으로 읽습니다.
fn packet_id(body: &[u8]) -> Option<u16> {
    Some(u16::from_be_bytes([*body.first()?, *body.get(1)?]))
}

fn ack(header: u8, id: u16) -> Vec<u8> {
    let [hi, lo] = id.to_be_bytes();
    vec![header, 0x02, hi, lo]
}

/// 고정 헤더 1바이트 + 가변 길이 remaining length + 본문
async fn read_packet(stream: &mut TcpStream) -> Option<(u8, Vec<u8>)> {
    let header = stream.read_u8().await.ok()?;
    let mut len = 0usize;
    for shift in [0, 7, 14, 21] {
        let byte = stream.read_u8().await.ok()?;
        len |= usize::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            let mut body = vec![0; len];
            stream.read_exact(&mut body).await.ok()?;
            return Some((header, body));
        }
    }
    None
}
