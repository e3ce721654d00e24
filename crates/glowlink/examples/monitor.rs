//! Monitor a controller's serial output.
//!
//! Connects to the first available serial device and prints every line the
//! controller sends, with parsed JSON flagged, until Ctrl-C.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p glowlink --example monitor
//! ```

use glowlink::{ConnectOptions, ConnectionStatus, NativePortProvider, SerialManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let ports = NativePortProvider::available_ports()?;
    println!("Serial devices: {:?}", ports);

    let manager = SerialManager::new(Box::new(NativePortProvider::first_available()));

    let status_sub = manager.on_status(|event| match &event.error {
        Some(err) => println!("status: {} ({err})", event.status),
        None => println!("status: {}", event.status),
    });

    let data_sub = manager.on_data(|event| {
        if event.value.is_some() {
            println!("<- [json] {}", event.line);
        } else {
            println!("<- {}", event.line);
        }
    });

    manager.connect(ConnectOptions::default()).await?;

    tokio::signal::ctrl_c().await?;
    manager.disconnect().await;
    assert_eq!(manager.status(), ConnectionStatus::Disconnected);

    data_sub.unsubscribe();
    status_sub.unsubscribe();
    Ok(())
}
