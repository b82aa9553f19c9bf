//! wearslot command-line tool
//!
//! Operates a wear-leveled slot store on an emulated EEPROM image file:
//! - Configuration bootstrap (init)
//! - Region erase
//! - Slot reads and writes
//! - Block introspection
//! - Wear simulation against an in-memory device
//!
//! # Examples
//!
//! ```bash
//! # Write a default configuration
//! wearslot init --output wearslot.toml
//!
//! # Store and read back a value
//! wearslot --config wearslot.toml put 2 1500
//! wearslot --config wearslot.toml get 2
//!
//! # Inspect the ring cursors of every slot
//! wearslot --config wearslot.toml info --json
//! ```

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wearslot::device::{erase_region, FileDevice, MemoryDevice};
use wearslot::{CellValue, SlotStore, StoreConfig, ValueKind};

/// wearslot - wear-leveled value slots on EEPROM-class memory
#[derive(Parser, Debug)]
#[command(name = "wearslot")]
#[command(version = wearslot::VERSION)]
#[command(about = "Wear-leveled value slots on EEPROM-class memory", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "WEARSLOT_CONFIG")]
    config: Option<PathBuf>,

    /// Device image path, overrides the configuration
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Directory for rolling log files
    #[arg(long, global = true, env = "WEARSLOT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a configuration file with default settings
    Init {
        /// Output path
        #[arg(short, long, default_value = "wearslot.toml")]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Fill the configured region with the erase pattern
    Erase {
        /// Byte to write, defaults to the configured erase_pattern
        #[arg(long)]
        pattern: Option<u8>,
    },

    /// Store a value in a slot
    Put {
        /// Slot index
        slot: usize,
        /// Value, parsed as the configured value type
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Print the current value of a slot
    Get {
        /// Slot index
        slot: usize,
    },

    /// Show ring bounds and cursors
    Info(InfoArgs),

    /// Measure wear spreading on an in-memory device
    Simulate {
        /// Number of puts to perform
        #[arg(short, long, default_value = "10000")]
        writes: u64,
        /// Slot receiving the writes
        #[arg(short, long, default_value = "0")]
        slot: usize,
    },

    /// Show version
    Version,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Single slot, all slots when omitted
    slot: Option<usize>,

    /// Emit JSON
    #[arg(long)]
    json: bool,
}

/// Run `$body` with `$ty` bound to the Rust type of a `ValueKind`
macro_rules! with_value_type {
    ($kind:expr, $ty:ident => $body:expr) => {
        match $kind {
            ValueKind::U8 => {
                type $ty = u8;
                $body
            }
            ValueKind::U16 => {
                type $ty = u16;
                $body
            }
            ValueKind::U32 => {
                type $ty = u32;
                $body
            }
            ValueKind::U64 => {
                type $ty = u64;
                $body
            }
            ValueKind::I8 => {
                type $ty = i8;
                $body
            }
            ValueKind::I16 => {
                type $ty = i16;
                $body
            }
            ValueKind::I32 => {
                type $ty = i32;
                $body
            }
            ValueKind::I64 => {
                type $ty = i64;
                $body
            }
            ValueKind::F32 => {
                type $ty = f32;
                $body
            }
            ValueKind::F64 => {
                type $ty = f64;
                $body
            }
        }
    };
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli)?;

    let mut config = StoreConfig::load(cli.config.as_deref())
        .with_context(|| "Failed to load configuration")?;
    if let Some(device) = &cli.device {
        config.device.path = device.clone();
    }

    match cli.command {
        Commands::Init { output, force } => init_command(&config, output, force),
        Commands::Erase { pattern } => erase_command(&config, pattern),
        Commands::Put { slot, value } => {
            with_value_type!(config.value_type, V => put_command::<V>(&config, slot, &value))
        }
        Commands::Get { slot } => {
            with_value_type!(config.value_type, V => get_command::<V>(&config, slot))
        }
        Commands::Info(args) => {
            with_value_type!(config.value_type, V => info_command::<V>(&config, args))
        }
        Commands::Simulate { writes, slot } => {
            with_value_type!(config.value_type, V => simulate_command::<V>(&config, writes, slot))
        }
        Commands::Version => {
            println!("wearslot {}", wearslot::VERSION);
            Ok(())
        }
    }
}

/// Setup logging to stderr, plus daily rolling files when a log directory is given
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::WARN);

    let file_layer = match &cli.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "wearslot.log");
            Some(fmt::layer().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(file_layer)
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

fn open_store<V: CellValue>(config: &StoreConfig) -> anyhow::Result<SlotStore<FileDevice, V>> {
    let device = FileDevice::open(&config.device.path, config.device.capacity)
        .with_context(|| format!("Failed to open device {}", config.device.path.display()))?;
    Ok(SlotStore::from_config(device, config)?)
}

fn init_command(config: &StoreConfig, output: PathBuf, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }
    std::fs::write(&output, config.to_toml()?)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(path = ?output, "Wrote configuration");
    println!("Configuration written to {}", output.display());
    Ok(())
}

fn erase_command(config: &StoreConfig, pattern: Option<u8>) -> anyhow::Result<()> {
    let pattern = pattern.unwrap_or(config.erase_pattern);
    let mut device = FileDevice::open(&config.device.path, config.device.capacity)?;
    erase_region(&mut device, config.base_address, config.total_bytes, pattern)?;
    println!(
        "Erased {} bytes at {} with 0x{:02X}",
        config.total_bytes, config.base_address, pattern
    );
    Ok(())
}

fn put_command<V>(config: &StoreConfig, slot: usize, raw: &str) -> anyhow::Result<()>
where
    V: CellValue + FromStr + Display,
    V::Err: Display,
{
    let value: V = raw
        .parse()
        .map_err(|e| anyhow!("Invalid {} value '{}': {}", config.value_type, raw, e))?;
    let mut store = open_store::<V>(config)?;
    store.put(slot, value)?;
    store.flush()?;
    println!("Slot {} = {}", slot, store.get(slot)?);
    Ok(())
}

fn get_command<V>(config: &StoreConfig, slot: usize) -> anyhow::Result<()>
where
    V: CellValue + Display,
{
    let store = open_store::<V>(config)?;
    let info = store.block_info(slot)?;
    if !info.seam_found {
        warn!(slot, "Ring has no seam; value may be uninitialized");
    }
    println!("{}", store.get(slot)?);
    Ok(())
}

fn info_command<V: CellValue>(config: &StoreConfig, args: InfoArgs) -> anyhow::Result<()> {
    let store = open_store::<V>(config)?;
    let infos = match args.slot {
        Some(slot) => vec![store.block_info(slot)?],
        None => store.blocks_info()?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
    } else {
        println!("Device: {}", config.device.path.display());
        println!("───────────────────────────────");
        for info in infos {
            println!("{}", info);
        }
    }
    Ok(())
}

fn simulate_command<V: CellValue>(
    config: &StoreConfig,
    writes: u64,
    slot: usize,
) -> anyhow::Result<()> {
    let device = MemoryDevice::new(config.device.capacity);
    let mut store = SlotStore::<_, V>::from_config(device, config)?;
    let capacity = store.block_info(slot)?.capacity;

    for i in 0..writes {
        let value = V::decode(&i.to_le_bytes()[..V::SIZE]);
        store.put(slot, value)?;
    }

    let device = store.device();
    let max = device.max_write_count();
    println!("Writes:               {}", writes);
    println!("Ring capacity:        {}", capacity);
    println!("Physical writes:      {}", device.total_writes());
    println!("Max writes per cell:  {}", max);
    println!("Fixed-address max:    {}", writes);
    if max > 0 {
        println!("Endurance gain:       {:.1}x", writes as f64 / max as f64);
    }
    Ok(())
}
