use log::{LevelFilter, Log, Metadata, Record};
use std::io::Write;
use std::sync::Mutex;
use xcom_bridge::prelude::*;

static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct Recorder;

impl Log for Recorder {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut lines) = LINES.lock() {
            lines.push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static RECORDER: Recorder = Recorder;

// one test per binary: the logger is process-wide
#[test]
fn config_summary_waits_for_the_logger() -> Result<()> {
    log::set_logger(&RECORDER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(b"loglevel: debug\nxcom:\n  transport: tcp\n  max_retries: 3\n")?;

    // runs before the level is known, so anything it logs is lost
    let config = Config::new(file.path().to_string_lossy().to_string())?;
    assert!(LINES.lock().unwrap().is_empty());

    config.log_summary();
    let lines = LINES.lock().unwrap();
    assert_eq!(lines[0], "Configuration loaded successfully:");
    assert!(lines.iter().any(|l| l == "  Transport: Tcp"));
    assert!(lines.iter().any(|l| l == "  Max Retries: 3"));
    assert!(lines.iter().any(|l| l == "  Log Level: debug"));

    Ok(())
}
