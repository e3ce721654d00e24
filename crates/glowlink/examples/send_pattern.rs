//! Push a blink pattern to a controller.
//!
//! Sends a structured pattern command as NDJSON and prints the transport
//! log afterwards, most recent exchange last.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p glowlink --example send_pattern -- /dev/ttyACM0
//! ```

use std::time::Duration;

use glowlink::{ConnectOptions, NativePortProvider, SerialManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyACM0".to_string());

    let manager = SerialManager::new(Box::new(NativePortProvider::new(&path)));
    manager.connect(ConnectOptions::baud(115_200)).await?;

    manager
        .send(serde_json::json!({
            "cmd": "pattern",
            "name": "heartbeat",
            "period_ms": 800,
            "duty": 0.3,
        }))
        .await?;

    // Give the controller a moment to acknowledge.
    tokio::time::sleep(Duration::from_millis(250)).await;

    for entry in manager.log() {
        println!("{} {}: {}", entry.timestamp, entry.direction, entry.payload);
    }

    manager.disconnect().await;
    Ok(())
}
