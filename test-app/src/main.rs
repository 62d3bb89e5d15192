// naimctl -- command-line control of a Naim AV2 amplifier over RS-232.
//
// Usage:
//   naimctl --port /dev/ttyS0 power on
//   naimctl --port /dev/ttyS0 input op1
//   naimctl --port /dev/ttyS0 volume 40
//   naimctl --port /dev/ttyS0 status --timeout 2000
//   naimctl --port /dev/ttyS0 monitor --duration 60
//   naimctl --mock raw 0x23 0x32

mod logging;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use naim::av2::commands::decode_command;
use naim::{Av2Builder, Error, Input, NaimAv2};
use naim_test_harness::{MockReader, MockWriter, SentLog};

use crate::logging::{LogFormat, LogLevel, init_logging};

/// Status report served in `--mock` mode: on, OP1, volume 50, unmuted.
const MOCK_STATUS: &[u8] = b"#AV2 \x69\x81\x07\x32\x00\xff";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// naimctl -- control a Naim AV2 amplifier from the command line.
#[derive(Parser)]
#[command(name = "naimctl", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyS0, COM3).
    #[arg(long, default_value = "/dev/ttyS0")]
    port: String,

    /// Serial baud rate.
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Use a mock transport instead of a real serial port.
    /// Sent bytes are printed; the read side serves one status report.
    #[arg(long)]
    mock: bool,

    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Power operations.
    Power {
        #[command(subcommand)]
        action: PowerAction,
    },

    /// Mute operations.
    Mute {
        #[command(subcommand)]
        action: MuteAction,
    },

    /// Select an input: vip1, vip2, op1, op2.
    Input { input: Input },

    /// Set the volume (0-99).
    Volume {
        #[arg(allow_hyphen_values = true)]
        level: i32,
    },

    /// Request and print the amplifier's system status.
    Status {
        /// How long to wait for the report, in milliseconds.
        #[arg(long, default_value_t = 2000)]
        timeout: u64,
    },

    /// Print every message from the amplifier as it arrives.
    Monitor {
        /// Duration in seconds (0 = until the stream ends).
        #[arg(long, default_value_t = 0)]
        duration: u64,
    },

    /// Send a raw opcode with an optional argument byte (hex, e.g. 0x23 0x32).
    Raw {
        #[arg(value_parser = parse_hex_u8)]
        opcode: u8,
        #[arg(value_parser = parse_hex_u8)]
        arg: Option<u8>,
    },
}

#[derive(Subcommand)]
enum PowerAction {
    On,
    Standby,
}

#[derive(Subcommand)]
enum MuteAction {
    On,
    Off,
}

/// Parse a hex string like "0x23" or "23" into a u8.
fn parse_hex_u8(s: &str) -> std::result::Result<u8, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(s, 16).map_err(|e| format!("invalid hex byte: {e}"))
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Build the adapter over the serial port, or over mocks with `--mock`.
async fn connect(cli: &Cli, builder: Av2Builder) -> Result<(Arc<NaimAv2>, Option<SentLog>)> {
    if cli.mock {
        let (writer, log) = MockWriter::new();
        let amp = builder.build_with_transport(MockReader::from_bytes(MOCK_STATUS), writer);
        return Ok((Arc::new(amp), Some(log)));
    }

    let amp = builder
        .serial_port(&cli.port)
        .baud_rate(cli.baud)
        .build()
        .await
        .with_context(|| format!("failed to open {}", cli.port))?;
    Ok((Arc::new(amp), None))
}

/// Read and dispatch until the stream ends, skipping frames that fail to
/// parse or that a handler rejects.
async fn read_loop(amp: Arc<NaimAv2>) -> naim::Result<()> {
    loop {
        match amp.read().await {
            Ok(()) => {}
            Err(e) if e.is_end_of_stream() => return Ok(()),
            Err(e @ (Error::Frame(_) | Error::PayloadLength { .. } | Error::Handler { .. })) => {
                tracing::warn!(error = %e, "Skipping message");
            }
            Err(e) => return Err(e),
        }
    }
}

fn spawn_reader(amp: &Arc<NaimAv2>) -> JoinHandle<naim::Result<()>> {
    tokio::spawn(read_loop(amp.clone()))
}

fn print_sent(log: Option<&SentLog>) {
    if let Some(log) = log {
        println!("[mock] sent: {:02X?}", log.bytes());
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_simple(cli: &Cli) -> Result<()> {
    let (amp, log) = connect(cli, Av2Builder::new()).await?;

    match &cli.command {
        Command::Power { action } => {
            amp.set_standby(matches!(action, PowerAction::Standby)).await?;
        }
        Command::Mute { action } => amp.set_mute(matches!(action, MuteAction::On)).await?,
        Command::Input { input } => amp.set_input(*input).await?,
        Command::Volume { level } => amp.set_volume(*level).await?,
        Command::Raw { opcode, arg } => {
            let mut body = vec![*opcode];
            body.extend(*arg);
            let command = decode_command(&body)?;
            tracing::info!(?command, "Sending raw command");
            amp.send_command(command).await?;
        }
        Command::Status { .. } | Command::Monitor { .. } => {
            bail!("not a single-shot command")
        }
    }

    print_sent(log.as_ref());
    println!("OK");
    Ok(())
}

async fn cmd_status(cli: &Cli, timeout_ms: u64) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let builder = Av2Builder::new().on_system_status(move |status| {
        tx.send(*status)?;
        Ok(())
    });
    let (amp, log) = connect(cli, builder).await?;
    let reader = spawn_reader(&amp);

    amp.query_status().await?;
    print_sent(log.as_ref());

    let waited = tokio::time::timeout(Duration::from_millis(timeout_ms), rx.recv()).await;
    reader.abort();

    let status = waited
        .context("no status report from amplifier")?
        .context("amplifier stream ended before a status report")?;

    println!("Power:  {}", if status.is_on() { "on" } else { "standby" });
    println!("Input:  {}", status.input());
    println!("Volume: {}", status.volume());
    println!("Muted:  {}", status.muted());
    println!("Raw:    {:02X?}", status.raw());
    Ok(())
}

async fn cmd_monitor(cli: &Cli, duration_secs: u64) -> Result<()> {
    let builder = Av2Builder::new()
        .on_system_status(|status| {
            println!("[status] {status}");
            Ok(())
        })
        .on_unknown(|response| {
            println!("[0x{:02X}] {:02X?}", response.code, response.payload);
            Ok(())
        });
    let (amp, _log) = connect(cli, builder).await?;

    println!("Monitoring amplifier messages (Ctrl-C to stop)...");
    let reader = spawn_reader(&amp);

    if duration_secs == 0 {
        reader.await??;
        println!("Stream ended.");
        return Ok(());
    }

    match tokio::time::timeout(Duration::from_secs(duration_secs), reader).await {
        Ok(joined) => {
            joined??;
            println!("Stream ended.");
        }
        Err(_) => println!("Monitor duration elapsed."),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match &cli.command {
        Command::Status { timeout } => cmd_status(&cli, *timeout).await,
        Command::Monitor { duration } => cmd_monitor(&cli, *duration).await,
        _ => cmd_simple(&cli).await,
    }
}
