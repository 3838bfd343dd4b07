//! circstore CLI
//!
//! Command-line interface for a circular log kept in a flash image file.
//! The image geometry is stored next to the image in `<image>.geom`.

use std::path::{Path, PathBuf};

use circstore::config::Config;
use circstore::medium::{FileFlash, SyncStrategy};
use circstore::{CircStore, Record};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// circstore CLI
#[derive(Parser, Debug)]
#[command(name = "circstore-cli")]
#[command(about = "Circular log store over a flash image file")]
#[command(version)]
struct Args {
    /// Flash image file
    #[arg(short, long, default_value = "./circstore.img")]
    image: PathBuf,

    /// Sync the image every N writes (1 = every write)
    #[arg(long, default_value = "1")]
    sync_every: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new, erased image
    Format {
        /// Physical address of region 0
        #[arg(long, default_value = "0")]
        flash_start: u32,

        /// Erase region size in bytes
        #[arg(long, default_value = "4096")]
        region_size: u32,

        /// Slot size in bytes (8-byte header included)
        #[arg(long, default_value = "32")]
        slot_size: u32,

        /// Number of regions
        #[arg(long, default_value = "2")]
        regions: u32,
    },

    /// Append a record
    Append {
        /// Record text
        text: String,
    },

    /// Print the latest record
    Latest,

    /// Print the record with the given index
    Get {
        /// Logical index
        index: u32,
    },

    /// Print the number of retained records
    Count,

    /// Erase all records
    Clear,

    /// Print every retained record, oldest first
    Dump,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,circstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("circstore v{}", circstore::VERSION);
    tracing::debug!("Image: {}", args.image.display());

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> circstore::Result<()> {
    let geometry = geometry_path(&args.image);

    if let Commands::Format {
        flash_start,
        region_size,
        slot_size,
        regions,
    } = args.command
    {
        let config = Config::builder()
            .flash_start(flash_start)
            .region_size(region_size)
            .slot_size(slot_size)
            .region_count(regions)
            .build();
        config.validate()?;

        FileFlash::create(&args.image, flash_start, region_size * regions, region_size)?;
        config.save(&geometry)?;

        tracing::info!(
            "Formatted {} ({} regions of {} bytes, {}-byte slots)",
            args.image.display(),
            regions,
            region_size,
            slot_size
        );
        return Ok(());
    }

    let config = Config::load(&geometry)?;
    let sync = if args.sync_every <= 1 {
        SyncStrategy::EveryWrite
    } else {
        SyncStrategy::EveryNWrites {
            count: args.sync_every,
        }
    };
    let medium = FileFlash::open(&args.image, config.flash_start, config.region_size)?
        .with_sync_strategy(sync);
    let mut store = CircStore::open(config, medium)?;

    match args.command {
        Commands::Format { .. } => {}
        Commands::Append { text } => {
            let index = store.append(text.as_bytes())?;
            println!("{}", index);
        }
        Commands::Latest => print_record(&store.read_latest()?),
        Commands::Get { index } => print_record(&store.read_by_index(index)?),
        Commands::Count => println!("{}", store.count()?),
        Commands::Clear => {
            store.clear()?;
            tracing::info!("Cleared {}", args.image.display());
        }
        Commands::Dump => {
            for record in store.iter()? {
                print_record(&record?);
            }
        }
    }

    Ok(())
}

/// "<image>.geom"
fn geometry_path(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_os_string();
    name.push(".geom");
    PathBuf::from(name)
}

fn print_record(record: &Record) {
    println!("{}\t{}", record.log_index, String::from_utf8_lossy(&record.payload));
}
