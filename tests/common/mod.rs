#![allow(dead_code)]

use xcom_bridge::config::{TransportKind, Xcom};
use xcom_bridge::prelude::*;
use xcom_bridge::xcom::packet::HEADER_LEN;

use async_trait::async_trait;
use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory();
impl Factory {
    /// Ephemeral port, short timeouts.
    pub fn tcp_config() -> Xcom {
        Xcom {
            transport: TransportKind::Tcp,
            host: None,
            local_port: Some(0),
            remote_port: None,
            src_addr: None,
            dst_addr: None,
            read_timeout: Some(1),
            reply_timeout_ms: None,
            accept_timeout: Some(5),
            exchange_timeout: Some(10),
            max_retries: Some(5),
        }
    }

    /// Replies go to an ephemeral port, requests to `device_port` on loopback.
    pub fn udp_config(device_port: u16) -> Xcom {
        Xcom {
            transport: TransportKind::Udp,
            host: Some("127.0.0.1".to_string()),
            local_port: Some(0),
            remote_port: Some(device_port),
            src_addr: None,
            dst_addr: None,
            read_timeout: None,
            reply_timeout_ms: Some(300),
            accept_timeout: None,
            exchange_timeout: None,
            max_retries: None,
        }
    }

    /// A well-formed reply to something nobody asked about.
    pub fn unrelated_response() -> Frame {
        Frame::request(
            ServiceId::ReadProperty,
            ObjectType::Info,
            datapoint::BATT_VOLTAGE.id,
            PropertyId::Value,
            None,
        )
        .response_to(Some(Value::Float(51.2)))
    }

    /// Valid header, broken data checksum.
    pub fn corrupt_response(request: &Frame) -> Vec<u8> {
        let mut bytes = request.response_to(Some(Value::Float(1.0))).bytes().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        bytes
    }
}

pub enum Reply {
    Payload(Option<Value>),
    Error(u16),
    Frame(Frame),
}

/// Answers requests from a script, in order. Every reply goes through
/// `bytes()` and `decode()` like it would on the wire.
#[derive(Default)]
pub struct MockTransport {
    pub sent: Vec<Frame>,
    replies: VecDeque<Reply>,
    stats: PacketStats,
}

impl MockTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_package(&mut self, request: &Frame) -> xcom_bridge::Result<Frame> {
        self.sent.push(request.clone());
        self.stats.packets_sent += 1;

        let reply = match self.replies.pop_front() {
            Some(Reply::Payload(payload)) => request.response_to(payload),
            Some(Reply::Error(code)) => request.error_response_to(code),
            Some(Reply::Frame(frame)) => frame,
            None => {
                self.stats.timeouts += 1;
                return Err(Error::ResponseTimeout(Duration::from_millis(0)));
            }
        };
        self.stats.packets_received += 1;

        Frame::decode(&reply.bytes()?)
    }

    fn stats(&self) -> &PacketStats {
        &self.stats
    }
}

/// Plays the Xcom-LAN side of a TCP server connection.
pub struct MockDevice {
    stream: TcpStream,
}

impl MockDevice {
    pub async fn connect(server: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect((Ipv4Addr::LOCALHOST, server.port())).await?;
        Ok(Self { stream })
    }

    /// Reads exactly one frame.
    pub async fn recv(&mut self) -> Result<Frame> {
        let mut buf = vec![0u8; HEADER_LEN];
        self.stream.read_exact(&mut buf).await?;

        let data_length = u16::from_le_bytes([buf[12], buf[13]]) as usize;
        let mut rest = vec![0u8; data_length + 2];
        self.stream.read_exact(&mut rest).await?;
        buf.extend_from_slice(&rest);

        Ok(Frame::decode(&buf)?)
    }

    pub async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    pub async fn reply(&mut self, frame: &Frame) -> Result<()> {
        self.send(&frame.bytes()?).await
    }
}
