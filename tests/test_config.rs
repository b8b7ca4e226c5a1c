use std::io::Write;
use std::time::Duration;
use xcom_bridge::prelude::*;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn tcp_defaults() -> Result<()> {
    let file = write_config("xcom:\n  transport: tcp\n");
    let config = Config::new(file.path().to_string_lossy().to_string())?;

    assert_eq!(config.loglevel, "info");
    let xcom = &config.xcom;
    assert_eq!(xcom.transport(), TransportKind::Tcp);
    assert_eq!(xcom.local_port(), 4001);
    assert_eq!(xcom.src_addr(), 1);
    assert_eq!(xcom.dst_addr(), None);
    assert_eq!(xcom.read_timeout(), Duration::from_secs(10));
    assert_eq!(xcom.exchange_timeout(), Duration::from_secs(30));
    assert_eq!(xcom.accept_timeout(), None);
    assert_eq!(xcom.max_retries(), 10);

    Ok(())
}

#[test]
fn udp_settings() -> Result<()> {
    let config = Config::from_yaml(
        r#"
loglevel: debug
xcom:
  transport: udp
  host: 192.168.1.50
  local_port: 4101
  remote_port: 4102
  dst_addr: 601
  reply_timeout_ms: 500
"#,
    )?;

    assert_eq!(config.loglevel, "debug");
    let xcom = &config.xcom;
    assert_eq!(xcom.transport(), TransportKind::Udp);
    assert_eq!(xcom.host(), Some("192.168.1.50"));
    assert_eq!(xcom.local_port(), 4101);
    assert_eq!(xcom.remote_port(), 4102);
    assert_eq!(xcom.dst_addr(), Some(601));
    assert_eq!(xcom.reply_timeout(), Duration::from_millis(500));

    Ok(())
}

#[test]
fn rejects_invalid_settings() {
    for yaml in [
        "xcom:\n  transport: udp\n",
        "xcom:\n  transport: udp\n  host: ''\n",
        "xcom:\n  transport: udp\n  host: gw\n  remote_port: 0\n",
        "xcom:\n  transport: udp\n  host: gw\n  reply_timeout_ms: 0\n",
        "xcom:\n  transport: tcp\n  local_port: 0\n",
        "xcom:\n  transport: tcp\n  read_timeout: 0\n",
        "xcom:\n  transport: tcp\n  exchange_timeout: 0\n",
        "xcom:\n  transport: tcp\n  max_retries: 0\n",
        "xcom:\n  transport: serial\n",
        "loglevel: info\n",
    ] {
        assert!(Config::from_yaml(yaml).is_err(), "accepted {:?}", yaml);
    }
}

#[test]
fn missing_file() {
    let err = Config::new("/nonexistent/xcom-bridge.yaml".to_string()).unwrap_err();
    assert!(err.to_string().contains("error reading"));
}
