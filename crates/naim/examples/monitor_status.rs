//! Monitor amplifier status reports.
//!
//! Opens the serial link, asks for the current status, then prints every
//! frame the amplifier sends for 60 seconds. Changing the volume or input on
//! the front panel produces a fresh status report.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p naim --example monitor_status -- /dev/ttyS0
//! ```

use std::sync::Arc;
use std::time::Duration;

use naim::Av2Builder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let serial_port = std::env::args().nth(1).unwrap_or_else(|| "/dev/ttyS0".to_string());

    println!("Connecting to Naim AV2 on {}...", serial_port);

    let amp = Av2Builder::new()
        .serial_port(&serial_port)
        .on_system_status(|status| {
            println!("status: {status}");
            Ok(())
        })
        .on_unknown(|response| {
            println!("message 0x{:02X}: {:02X?}", response.code, response.payload);
            Ok(())
        })
        .build()
        .await?;
    let amp = Arc::new(amp);

    let reader = tokio::spawn({
        let amp = amp.clone();
        async move { amp.read_all().await }
    });

    amp.query_status().await?;
    println!("Monitoring for 60 seconds...\n");

    match tokio::time::timeout(Duration::from_secs(60), reader).await {
        Ok(joined) => joined??,
        Err(_) => println!("\nDone."),
    }
    Ok(())
}
