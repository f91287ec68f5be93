//! polaris-bridge - Polaris race timer to vMix title bridge.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use polaris_bridge::bridge::{Bridge, StopReason};
use polaris_bridge::config::Config;
use polaris_bridge::framing::{Delimiter, ReadingStream};
use polaris_bridge::frontend::{self, FrontendKind, TerminalGuard};
use polaris_bridge::input::{DeviceSource, SerialDevice, TestDataGenerator};
use polaris_bridge::output::{OutputChannel, TcpConnector};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "polaris-bridge")]
#[command(version = VERSION)]
#[command(about = "Send Farmtek Polaris timer data to a vMix title")]
struct Cli {
    /// Serial device the console is attached to (e.g. /dev/ttyUSB0, COM3)
    #[arg(short, long)]
    device: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// vMix host
    #[arg(short = 'a', long = "vmix")]
    vmix_host: Option<String>,

    /// vMix TCP API port
    #[arg(short, long)]
    port: Option<u16>,

    /// vMix input number holding the title
    #[arg(short = 'i', long = "vmixinput")]
    vmix_input: Option<u32>,

    /// Title field to update
    #[arg(short = 'f', long = "fieldname")]
    field_name: Option<String>,

    /// Frame delimiter sent by the console (crlf or cr)
    #[arg(long)]
    delimiter: Option<Delimiter>,

    /// Generate test data instead of reading the serial port
    #[arg(short, long)]
    test: bool,

    /// Print log lines instead of showing the dashboard
    #[arg(long)]
    plain: bool,

    /// Config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(device) = &self.device {
            config.device = Some(device.clone());
        }
        if let Some(baud) = self.baud {
            config.baud = baud;
        }
        if let Some(host) = &self.vmix_host {
            config.vmix_host = host.clone();
        }
        if let Some(port) = self.port {
            config.vmix_port = port;
        }
        if let Some(input) = self.vmix_input {
            config.vmix_input = input;
        }
        if let Some(field) = &self.field_name {
            config.field_name = field.clone();
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
    }
}

fn init_logging() -> Result<()> {
    // Log to a file so the dashboard is not garbled.
    let log_path = std::env::var("POLARIS_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp/polaris-bridge.log"));
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("Failed to create log file at {}", log_path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .format_timestamp_secs()
        .init();
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log::error!("PANIC: {:?}", panic_info);
        TerminalGuard::restore();
        default_hook(panic_info);
    }));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging()?;
    install_panic_hook();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate(cli.test)?;
    log::info!("[Bridge] Starting polaris-bridge {} with {:?}", VERSION, config);

    let target = config.channel_target();

    let source: Box<dyn DeviceSource> = if cli.test {
        Box::new(TestDataGenerator::default())
    } else {
        // validate() guarantees a device outside test mode.
        let device = config.device.clone().unwrap_or_default();
        Box::new(SerialDevice::new(device, config.baud))
    };

    let kind = if cli.plain {
        FrontendKind::Plain
    } else {
        FrontendKind::Dashboard
    };
    let mut frontend = frontend::build(kind, &target)?;

    frontend.add_log(&source.describe());
    let input = source.open()?;
    let readings = ReadingStream::new(input, config.delimiter);

    let channel = OutputChannel::new(target, TcpConnector);
    let mut bridge = Bridge::new(channel);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("[Bridge] Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    let stop = bridge.run(readings, frontend.as_mut(), shutdown).await?;

    // Leave the alternate screen before printing anything.
    drop(frontend);
    if stop == StopReason::InputEnded {
        eprintln!("Input closed, exiting");
    }
    Ok(())
}
