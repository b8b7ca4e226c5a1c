use crate::config;
use crate::error::{Error, Result};
use crate::xcom::packet::{Frame, Hex};
use crate::xcom::transport::{PacketStats, Transport, MAX_FRAME_SIZE};

use async_trait::async_trait;
use bytes::BytesMut;
use log::{debug, info, warn};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::{timeout, Instant};

const WRITE_TIMEOUT_SECS: u64 = 5;

/// Bound and listening, waiting for the gateway to dial in.
pub struct Listening {
    listener: TcpListener,
    settings: Settings,
}

#[derive(Clone, Debug)]
struct Settings {
    read_timeout: Duration,
    exchange_timeout: Duration,
    accept_timeout: Option<Duration>,
    max_retries: u32,
}

/// Server-mode transport: the Xcom-LAN (MOXA) gateway is the TCP client and
/// connects to us. Holds the listener and the single accepted connection;
/// both close together when this is dropped.
pub struct TcpServer {
    // kept open for the connection's lifetime
    _listener: TcpListener,
    stream: TcpStream,
    peer: SocketAddr,
    settings: Settings,
    stats: PacketStats,
}

impl Listening {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Blocks until the one expected peer connects.
    pub async fn accept(self) -> Result<TcpServer> {
        info!("Waiting for Xcom-LAN to connect on {}...", self.local_addr()?);

        let accepted = match self.settings.accept_timeout {
            Some(limit) => timeout(limit, self.listener.accept())
                .await
                .map_err(|_| Error::ConnectTimeout(limit))?,
            None => self.listener.accept().await,
        };
        let (stream, peer) = accepted?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        info!("Got connection from {}", peer);

        Ok(TcpServer {
            _listener: self.listener,
            stream,
            peer,
            settings: self.settings,
            stats: PacketStats::default(),
        })
    }
}

impl TcpServer {
    /// Binds the configured port with a backlog of one.
    pub fn listen(xcom: &config::Xcom) -> Result<Listening> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, xcom.local_port()));
        info!("Starting TCP server on port {}", xcom.local_port());

        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(1)?;

        Ok(Listening {
            listener,
            settings: Settings {
                read_timeout: xcom.read_timeout(),
                exchange_timeout: xcom.exchange_timeout(),
                accept_timeout: xcom.accept_timeout(),
                max_retries: xcom.max_retries(),
            },
        })
    }

    /// `listen` followed by `accept`.
    pub async fn bind(xcom: &config::Xcom) -> Result<Self> {
        Self::listen(xcom)?.accept().await
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub async fn close(mut self) -> Result<()> {
        info!("Closing connection from {}", self.peer);
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let limit = Duration::from_secs(WRITE_TIMEOUT_SECS);
        match timeout(limit, self.stream.write_all(data)).await {
            Ok(Ok(())) => {
                self.stream.flush().await?;
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(Error::ResponseTimeout(limit)),
        }
    }

    async fn read(&mut self, limit: Duration) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(MAX_FRAME_SIZE);

        let len = match timeout(limit, self.stream.read_buf(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                self.stats.timeouts += 1;
                return Err(Error::ResponseTimeout(limit));
            }
        };

        if len == 0 {
            return Err(Error::PeerClosed);
        }

        Ok(buf)
    }
}

#[async_trait]
impl Transport for TcpServer {
    /// The gateway sometimes sends unrelated data on the connection, so a
    /// reply that doesn't decode or doesn't match gets the request re-sent.
    async fn send_package(&mut self, request: &Frame) -> Result<Frame> {
        let data = request.bytes()?;
        let deadline = Instant::now() + self.settings.exchange_timeout;
        let mut attempts = 0;

        loop {
            attempts += 1;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.stats.timeouts += 1;
                return Err(Error::ResponseTimeout(self.settings.exchange_timeout));
            }

            debug!(" --> {}", Hex(&data));
            self.write(&data).await?;
            self.stats.packets_sent += 1;

            let bytes = self.read(remaining.min(self.settings.read_timeout)).await?;
            self.stats.packets_received += 1;
            debug!(" <-- {}", Hex(&bytes));

            let failure = match Frame::decode(&bytes) {
                Ok(frame) if frame.corresponds_to(request) => {
                    debug!("{:?}", frame);
                    return Ok(frame);
                }
                Ok(frame) => Error::UnexpectedResponse {
                    expected_service: request.service,
                    expected_type: request.object_type,
                    expected_object: request.object_id,
                    got_service: frame.service,
                    got_type: frame.object_type,
                    got_object: frame.object_id,
                },
                Err(e) if e.is_framing() => e,
                Err(e) => return Err(e),
            };

            self.stats.packets_discarded += 1;
            warn!(
                "discarding reply ({}), attempt {}/{}",
                failure, attempts, self.settings.max_retries
            );

            if attempts >= self.settings.max_retries {
                return Err(Error::RetriesExhausted {
                    attempts,
                    service: request.service,
                    object_id: request.object_id,
                    last: Box::new(failure),
                });
            }
        }
    }

    fn stats(&self) -> &PacketStats {
        &self.stats
    }
}
