//! Example: Broadcast a spoofed sensor reading
//!
//! Builds a signed data message for a made-up sensor and fires it at the
//! local broadcast address, the same way a real sensor reports in. The
//! thermostat only accepts the reading after it has seen a pairing message
//! for the same sensor name.

use clap::Parser;
use std::error::Error;
use tracing::info;
use tsensor_lib::{SensorParams, SensorSocket, Temperature, build_data};

#[derive(Parser, Debug)]
#[command(about = "Broadcast a spoofed sensor reading")]
struct Args {
    /// Sensor name, also the seed for its MAC and pairing key
    #[arg(default_value = "Sensor1")]
    name: String,

    /// Temperature to report
    #[arg(default_value = "68.0")]
    temp: f64,

    /// Interpret the temperature as Celsius instead of Fahrenheit
    #[arg(long)]
    celsius: bool,

    /// Unit id to report under (0-19)
    #[arg(short, long, default_value = "1")]
    unit_id: i32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut params = SensorParams::new(&args.name);
    params.unit_id = args.unit_id;
    let temp = Temperature {
        value: args.temp,
        celsius: args.celsius,
    };

    let msg = build_data(&params, temp)?;
    info!("Built message: {}", msg);

    let socket = SensorSocket::bind_sender().await?;
    socket
        .send(&msg.to_bytes(), SensorSocket::default_destination())
        .await?;
    info!("Reading sent");

    Ok(())
}
