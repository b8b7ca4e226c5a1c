use xcom_bridge::prelude::*;

#[tokio::main]
async fn main() {
    let options = Options::new();

    let result = tokio::select! {
        r = xcom_bridge::app(options) => r,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, exiting");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(255);
    }
}
