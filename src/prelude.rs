pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};

pub use crate::config::{self, Config, TransportKind};
pub use crate::error::Error;
pub use crate::options::Options;
pub use crate::xcom::client::Client;
pub use crate::xcom::datapoint::{self, Datapoint, Registry};
pub use crate::xcom::packet::{Frame, ObjectType, PropertyId, ServiceId};
pub use crate::xcom::tcp::TcpServer;
pub use crate::xcom::transport::{PacketStats, Transport};
pub use crate::xcom::udp::UdpClient;
pub use crate::xcom::value::{Value, ValueKind};
