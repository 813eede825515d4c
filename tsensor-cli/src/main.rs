use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::fs::File;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tsensor_lib::constants::SENSOR_PORT;
use tsensor_lib::{
    KeyStore, Message, SensorParams, SensorSocket, SensorType, Temperature, build_data,
    build_pair, validate,
};

/// Simulate and monitor the wifi temperature sensors of a home thermostat.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a reading
    Send(SendArgs),
    /// Listen and output messages as they arrive
    Dump(DumpArgs),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Sensor name, also the seed for the generated MAC and key
    sensor_name: String,
    /// Temperature to report (ignored for pairing messages)
    #[arg(allow_negative_numbers = true)]
    temp: f64,
    /// Temperature is Celsius instead of Fahrenheit
    #[arg(long)]
    celsius: bool,
    /// Send as a pairing message
    #[arg(short, long)]
    pair: bool,
    /// MAC address of simulated sensor (blank will be generated from sensorName)
    #[arg(short, long)]
    mac: Option<String>,
    /// Signature Key (blank will be generated from sensorName)
    #[arg(short, long)]
    key: Option<String>,
    /// Sensor type (outdoor, remote, supply, return)
    #[arg(short = 't', long = "type", default_value = "remote")]
    sensor_type: String,
    /// Reading sequence number (default derives from time of day)
    #[arg(short, long)]
    seqnum: Option<i32>,
    /// Unit ID
    #[arg(short, long, default_value_t = 1)]
    unitid: i32,
    /// Destination IP (default is the limited broadcast address)
    #[arg(short, long)]
    addr: Option<IpAddr>,
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// Show duplicate messages
    #[arg(short = 'd', long)]
    show_duplicates: bool,
    /// Emit one JSON object per message instead of text
    #[arg(long)]
    json: bool,
}

fn setup_logging(
    log_file_path: Option<PathBuf>,
    verbosity: &Verbosity<InfoLevel>,
) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .without_time();

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file = File::create(path)
            .with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file, &cli.verbose)?;

    let result = match cli.command {
        Command::Send(args) => run_send(args).await,
        Command::Dump(args) => run_dump(args).await,
    };
    if let Err(e) = result {
        error!("Command failed: {:?}", e);
        process::exit(1);
    }

    Ok(())
}

async fn run_send(args: SendArgs) -> Result<()> {
    let sensor_type = SensorType::from_token(&args.sensor_type)?;
    let params = SensorParams {
        sensor_name: args.sensor_name,
        mac: args.mac,
        key: args.key.map(String::into_bytes),
        sensor_type,
        unit_id: args.unitid,
        seq_num: args.seqnum,
    };

    let msg = if args.pair {
        build_pair(&params)?
    } else {
        let temp = Temperature {
            value: args.temp,
            celsius: args.celsius,
        };
        build_data(&params, temp)?
    };
    debug!(payload = %msg, "Built message");

    let socket = SensorSocket::bind_sender().await?;
    let dest = args
        .addr
        .map(|ip| SocketAddr::new(ip, SENSOR_PORT))
        .unwrap_or_else(SensorSocket::default_destination);
    socket.send(&msg.to_bytes(), dest).await?;
    info!(kind = %msg.kind(), %dest, "Sent message");

    Ok(())
}

async fn run_dump(args: DumpArgs) -> Result<()> {
    let socket = SensorSocket::bind_listener().await?;
    let store = KeyStore::new();
    let mut filter = DuplicateFilter::new(args.show_duplicates);

    loop {
        let (payload, from) = socket.recv().await?;
        let msg = match Message::try_from(payload) {
            Ok(msg) => msg,
            Err(e) => {
                println!("error decoding message: {e}");
                continue;
            }
        };

        let canonical = msg.to_string();
        if !filter.should_emit(&canonical) {
            continue;
        }
        let status = signature_status(&msg, &store);

        if args.json {
            let line = serde_json::json!({
                "from": from.to_string(),
                "type": msg.kind().to_string(),
                "data": msg.data(),
                "hash": msg.hash(),
                "signature": status,
            });
            println!("{line}");
        } else {
            println!("From {from}");
            println!("Signature: {status}");
            println!("{canonical}");
            println!();
        }
    }
}

/// Classify a message's hash field against the keys learned so far, learning
/// the key as a side effect when the message is a pairing one.
fn signature_status(msg: &Message, store: &KeyStore) -> String {
    match msg {
        Message::Pair { data, .. } => match msg.hash_bytes() {
            Err(e) => format!("Error decoding hash: {e}"),
            Ok(key) => {
                if let Some(mac) = data.mac.as_deref() {
                    store.observe_pairing(mac, key);
                }
                "Pairing message (key received)".to_string()
            }
        },
        Message::Data { data, .. } => {
            match data.mac.as_deref().and_then(|mac| store.lookup(mac)) {
                Some(key) => match validate(msg, &key) {
                    Ok(()) => "Valid signature".to_string(),
                    Err(e) => e.to_string(),
                },
                None => "No key seen, press pair button on device to receive key data".to_string(),
            }
        }
    }
}

/// Suppresses a message identical to the one immediately before it. Sensors
/// rebroadcast each reading a handful of times back to back, so only the
/// previous message needs remembering.
struct DuplicateFilter {
    last: Option<String>,
    show_duplicates: bool,
}

impl DuplicateFilter {
    fn new(show_duplicates: bool) -> Self {
        Self {
            last: None,
            show_duplicates,
        }
    }

    fn should_emit(&mut self, canonical: &str) -> bool {
        if !self.show_duplicates && self.last.as_deref() == Some(canonical) {
            return false;
        }
        self.last = Some(canonical.to_string());
        true
    }
}
