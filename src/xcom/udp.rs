use crate::config;
use crate::error::{Error, Result};
use crate::xcom::packet::{Frame, Hex};
use crate::xcom::transport::{PacketStats, Transport, MAX_FRAME_SIZE};

use async_trait::async_trait;
use log::{debug, error, info};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Client-mode UDP transport.
///
/// Xcom-LAN doesn't answer to the source endpoint of a request but to
/// `<our ip>:local_port`, so a second socket bound to that port has to be
/// listening before anything is sent. Any datagram arriving there within the
/// reply window is taken as the answer; there is no resend on mismatch.
pub struct UdpClient {
    listener: Arc<UdpSocket>,
    sender: UdpSocket,
    server: SocketAddr,
    reply_timeout: Duration,
    stats: PacketStats,
}

impl UdpClient {
    pub async fn bind(xcom: &config::Xcom) -> Result<Self> {
        let host = xcom.host().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "udp transport needs xcom.host")
        })?;

        let server = tokio::net::lookup_host((host, xcom.remote_port()))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("cannot resolve {}", host))
            })?;

        let listener = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, xcom.local_port())).await?;
        let sender = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;

        info!(
            "Sending to {} from {}, listening for replies on {}",
            server,
            sender.local_addr()?,
            listener.local_addr()?
        );

        Ok(Self {
            listener: Arc::new(listener),
            sender,
            server,
            reply_timeout: xcom.reply_timeout(),
            stats: PacketStats::default(),
        })
    }

    /// Where the device has to send its replies.
    pub fn reply_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    // anything still queued belongs to an exchange that already timed out
    fn drain_stale(&mut self) {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        while let Ok((len, from)) = self.listener.try_recv_from(&mut buf) {
            debug!("dropping stale datagram from {}: {}", from, Hex(&buf[..len]));
            self.stats.packets_discarded += 1;
        }
    }
}

type Received = io::Result<Option<(Vec<u8>, SocketAddr)>>;

// aborts the pending receive on drop, so a cancelled exchange can't take
// the next exchange's reply
struct ReplyWaiter(JoinHandle<Received>);

impl Drop for ReplyWaiter {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[async_trait]
impl Transport for UdpClient {
    async fn send_package(&mut self, request: &Frame) -> Result<Frame> {
        let data = request.bytes()?;
        self.drain_stale();

        // arm the receiver before the request leaves
        let listener = self.listener.clone();
        let limit = self.reply_timeout;
        let mut waiter = ReplyWaiter(tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_FRAME_SIZE];
            match timeout(limit, listener.recv_from(&mut buf)).await {
                Ok(Ok((len, from))) => {
                    buf.truncate(len);
                    Ok(Some((buf, from)))
                }
                Ok(Err(e)) => Err(e),
                Err(_) => Ok(None),
            }
        }));

        debug!(" --> {}", Hex(&data));
        self.sender.send_to(&data, self.server).await?;
        self.stats.packets_sent += 1;

        let received = (&mut waiter.0)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;

        let (bytes, from) = match received {
            Some(r) => r,
            None => {
                error!("Waiting for response from Xcom-LAN timed out");
                self.stats.timeouts += 1;
                return Err(Error::ResponseTimeout(limit));
            }
        };
        self.stats.packets_received += 1;
        debug!(" <-- {} (from {})", Hex(&bytes), from);

        let frame = Frame::decode(&bytes)?;
        debug!("{:?}", frame);

        Ok(frame)
    }

    fn stats(&self) -> &PacketStats {
        &self.stats
    }
}
