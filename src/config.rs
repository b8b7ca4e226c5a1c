use crate::prelude::*;

use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub xcom: Xcom,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Udp,
}

// Xcom {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Xcom {
    pub transport: TransportKind,

    pub host: Option<String>,
    pub local_port: Option<u16>,
    pub remote_port: Option<u16>,

    pub src_addr: Option<u32>,
    pub dst_addr: Option<u32>,

    pub read_timeout: Option<u64>,
    pub reply_timeout_ms: Option<u64>,
    pub accept_timeout: Option<u64>,
    pub exchange_timeout: Option<u64>,
    pub max_retries: Option<u32>,
}
impl Xcom {
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn local_port(&self) -> u16 {
        self.local_port.unwrap_or(4001)
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port.unwrap_or(4002)
    }

    pub fn src_addr(&self) -> u32 {
        self.src_addr.unwrap_or(1)
    }

    /// `None` lets each datapoint go to the unit that owns it.
    pub fn dst_addr(&self) -> Option<u32> {
        self.dst_addr
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout.unwrap_or(10))
    }

    pub fn reply_timeout(&self) -> Duration {
        // 2s is what the Studer documentation recommends
        Duration::from_millis(self.reply_timeout_ms.unwrap_or(2000))
    }

    pub fn accept_timeout(&self) -> Option<Duration> {
        self.accept_timeout.map(Duration::from_secs)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout.unwrap_or(30))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(10)
    }
} // }}}

impl Config {
    pub fn new(file: String) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("config.rs:error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;

        config.validate()?;
        Ok(config)
    }

    /// Logs the effective settings, defaults filled in.
    pub fn log_summary(&self) {
        let xcom = &self.xcom;
        info!("Configuration loaded successfully:");
        info!("  Transport: {:?}", xcom.transport());
        if let Some(host) = xcom.host() {
            info!("  Host: {}", host);
        }
        info!("  Local Port: {}", xcom.local_port());
        if xcom.transport() == TransportKind::Udp {
            info!("  Remote Port: {}", xcom.remote_port());
            info!("  Reply Timeout: {:?}", xcom.reply_timeout());
        } else {
            info!("  Read Timeout: {:?}", xcom.read_timeout());
            info!("  Exchange Timeout: {:?}", xcom.exchange_timeout());
            info!("  Max Retries: {}", xcom.max_retries());
        }
        info!("  Source Address: {}", xcom.src_addr());
        match xcom.dst_addr() {
            Some(dst) => info!("  Destination Address: {}", dst),
            None => info!("  Destination Address: per datapoint"),
        }
        info!("  Log Level: {}", self.loglevel);
    }

    fn validate(&self) -> anyhow::Result<()> {
        let xcom = &self.xcom;

        if xcom.local_port == Some(0) {
            bail!("xcom.local_port must be between 1 and 65535");
        }

        match xcom.transport() {
            TransportKind::Udp => {
                if xcom.host().map_or(true, str::is_empty) {
                    bail!("xcom.host is required for the udp transport");
                }
                if xcom.remote_port() == 0 {
                    bail!("xcom.remote_port must be between 1 and 65535");
                }
                if xcom.reply_timeout().is_zero() {
                    return Err(anyhow!("config.rs:Invalid reply timeout: 0"));
                }
            }
            TransportKind::Tcp => {
                if xcom.read_timeout().is_zero() {
                    return Err(anyhow!("config.rs:Invalid read timeout: 0"));
                }
                if xcom.exchange_timeout().is_zero() {
                    return Err(anyhow!("config.rs:Invalid exchange timeout: 0"));
                }
                if xcom.max_retries() == 0 {
                    return Err(anyhow!("config.rs:max_retries must be at least 1"));
                }
            }
        }

        Ok(())
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
