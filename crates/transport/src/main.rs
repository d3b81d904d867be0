//! hci-usb
//!
//! Binds a USB Bluetooth controller and dumps the HCI traffic it produces.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use common::config::parse_int;
use common::{UsbParams, known_controller, setup_logging};
use tokio::signal;
use tracing::{error, info};
use transport::config::AppConfig;
use transport::usb::writer::hex_string;
use transport::{Transport, create_transport, parse_backend_choice, resolve_current};

#[derive(Parser, Debug)]
#[command(name = "hci-usb")]
#[command(author, version, about = "Talk HCI to a USB Bluetooth controller")]
#[command(long_about = "
Binds a USB Bluetooth controller directly through libusb, bypassing the
operating system Bluetooth stack, and prints every HCI packet it sends.

EXAMPLES:
    # List attached controllers
    hci-usb --list-devices

    # Reset the first known controller and dump traffic
    hci-usb

    # Bind a specific controller without resetting it
    hci-usb --mode user --vid 0x0a12 --pid 0x0001

    # Bind the controller on bus 1, address 7
    hci-usb --bus 1 --address 7

ENVIRONMENT:
    BLUETOOTH_HCI_SOCKET_USB_VID, BLUETOOTH_HCI_SOCKET_USB_PID,
    BLUETOOTH_HCI_SOCKET_USB_BUS, BLUETOOTH_HCI_SOCKET_USB_ADDRESS
        Controller selection, used for fields not given on the command
        line or in the config file.
    BLUETOOTH_HCI_SOCKET_FORCE_USB
        Use the USB backend on every platform.
    RUST_LOG
        Log filter, overrides --log-level.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// List known controllers and exit
    #[arg(long)]
    list_devices: bool,

    /// Print the device list as JSON
    #[arg(long, requires = "list_devices")]
    json: bool,

    /// Bind mode
    #[arg(short, long, value_enum, default_value_t = BindMode::Raw)]
    mode: BindMode,

    /// 1-based index among controllers matching --vid/--pid
    #[arg(long, value_name = "N")]
    dev_id: Option<i32>,

    /// Vendor ID, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_u16)]
    vid: Option<u16>,

    /// Product ID, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_u16)]
    pid: Option<u16>,

    /// USB bus number
    #[arg(long, requires = "address")]
    bus: Option<u8>,

    /// USB device address on --bus
    #[arg(long, requires = "bus")]
    address: Option<u8>,

    /// Transport backend (usb, native, auto)
    #[arg(short, long, value_name = "BACKEND")]
    backend: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BindMode {
    /// Reset the controller and report when it is up
    Raw,
    /// Leave controller state alone
    User,
}

fn parse_u16(value: &str) -> std::result::Result<u16, String> {
    parse_int(value).ok_or_else(|| format!("'{}' is not a 16-bit integer", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = AppConfig::default();
        let path = AppConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        AppConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        AppConfig::load_or_default()
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.general.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("hci-usb v{}", env!("CARGO_PKG_VERSION"));

    let requested = match args.backend.as_deref() {
        Some(name) => parse_backend_choice(name)?,
        None => config.backend()?,
    };
    let mut transport = create_transport(resolve_current(requested))
        .context("Failed to create HCI transport")?;

    if args.list_devices {
        return list_devices_mode(transport.as_ref(), args.json);
    }

    let cli = UsbParams {
        vid: args.vid,
        pid: args.pid,
        bus: args.bus,
        address: args.address,
    };
    let params = UsbParams::resolve(Some(&cli), &config.usb.params());
    let dev_id = args.dev_id.unwrap_or(config.usb.dev_id);

    match args.mode {
        BindMode::Raw => transport.bind_raw(dev_id, Some(&params)),
        BindMode::User => transport.bind_user(dev_id, Some(&params)),
    }
    .context("Failed to bind controller")?;

    transport.start().context("Failed to start polling")?;
    info!("Bound in {} mode, press Ctrl+C to exit", transport.mode());

    let result = dump_packets(transport.as_ref(), args.mode == BindMode::Raw).await;

    if let Err(e) = transport.stop() {
        error!("Error stopping transport: {:#}", e);
    }

    result
}

/// Print known controllers and exit
fn list_devices_mode(transport: &dyn Transport, json: bool) -> Result<()> {
    let devices = transport.device_list().context("Failed to list devices")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No known Bluetooth controllers found.");
        return Ok(());
    }

    println!("Found {} controller(s):\n", devices.len());
    for device in devices {
        let name = known_controller(device.id_vendor, device.id_product)
            .map(|c| c.name)
            .unwrap_or("Unknown");
        println!(
            "  {:04x}:{:04x} - {}",
            device.id_vendor, device.id_product, name
        );
        println!(
            "      Bus {:03} Device {:03}",
            device.bus_number, device.device_address
        );
    }

    Ok(())
}

/// Print inbound packets until Ctrl+C
async fn dump_packets(transport: &dyn Transport, announce_ready: bool) -> Result<()> {
    let packets = transport.packets();
    let mut announced = false;

    loop {
        tokio::select! {
            packet = packets.recv() => {
                let packet = packet.map_err(|e| anyhow!("Packet channel closed: {}", e))?;
                println!("{}", hex_string(&packet.to_tagged()));

                if announce_ready && !announced && transport.is_dev_up() {
                    info!("Controller is up");
                    announced = true;
                }
            }
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received Ctrl+C, shutting down..."),
                    Err(e) => error!("Error waiting for Ctrl+C: {}", e),
                }
                return Ok(());
            }
        }
    }
}
