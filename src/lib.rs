pub mod command;
pub mod config;
pub mod error;
pub mod options;
pub mod prelude;
pub mod xcom;

pub use error::{Error, Result};

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::command::Command;
use crate::prelude::*;
use std::io::Write;

pub async fn app(options: Options) -> anyhow::Result<()> {
    let config = match Config::new(options.config_file.clone()) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            return Err(e);
        }
    };

    init_logging(&config.loglevel);
    info!("xcom-bridge {} starting with config file {}", CARGO_PKG_VERSION, options.config_file);
    config.log_summary();

    let command = Command::from_args(&options.command)?;
    let json = options.command.json();
    let xcom = &config.xcom;

    match xcom.transport() {
        TransportKind::Tcp => {
            let server = TcpServer::bind(xcom).await?;
            let mut client = Client::new(server).with_addresses(xcom.src_addr(), xcom.dst_addr());
            let result = run_command(&mut client, &command, json).await;
            if let Err(e) = client.into_transport().close().await {
                warn!("Closing connection failed: {}", e);
            }
            result
        }
        TransportKind::Udp => {
            let udp = UdpClient::bind(xcom).await?;
            let mut client = Client::new(udp).with_addresses(xcom.src_addr(), xcom.dst_addr());
            run_command(&mut client, &command, json).await
        }
    }
}

async fn run_command<T: Transport>(client: &mut Client<T>, command: &Command, json: bool) -> anyhow::Result<()> {
    let result = command.run(client).await;
    client.stats().print_summary();
    let readings = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&readings)?);
    } else {
        for reading in &readings {
            println!("{}", reading);
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level.
pub fn init_logging(level: &str) {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();

    if let Err(e) = result {
        eprintln!("Failed to initialise logging: {}", e);
    }
}
