use crate::error::Result;
use crate::xcom::packet::Frame;

use async_trait::async_trait;
use log::info;

/// Largest frame either transport reads in one go.
pub const MAX_FRAME_SIZE: usize = 256;

/// Moves one request to the device and brings back its reply.
///
/// Implementations own their sockets and release them on drop. One exchange
/// is in flight at a time, which `&mut self` enforces.
#[async_trait]
pub trait Transport: Send {
    async fn send_package(&mut self, request: &Frame) -> Result<Frame>;

    fn stats(&self) -> &PacketStats;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PacketStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    // replies that didn't decode or didn't match the request
    pub packets_discarded: u64,
    pub timeouts: u64,
}

impl PacketStats {
    pub fn print_summary(&self) {
        info!("Packet Statistics:");
        info!("  Total packets sent: {}", self.packets_sent);
        info!("  Total packets received: {}", self.packets_received);
        info!("  Discarded packets: {}", self.packets_discarded);
        info!("  Timeouts: {}", self.timeouts);
    }
}
