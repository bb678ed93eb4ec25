use clap::Parser;
use tapkit::CardOperations;
use tapkit_transport_pcsc::PcscDeviceManager;
use tracing::info;

mod commands;
mod config;
mod utils;

use commands::*;
use utils::{HexBytes, display, reader};

#[derive(Parser)]
#[command(version, about = "Read, write and protect NFC tags on PC/SC readers")]
struct Cli {
    /// Optional reader name to use (will auto-detect if not specified)
    #[arg(short, long)]
    reader: Option<String>,

    /// Debug level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    let config = config::load_config()?;
    let manager = PcscDeviceManager::with_config(config.pcsc()?)?;
    let reader_name = cli.reader.or(config.reader.clone());

    match cli.command {
        Commands::List => return reader::list_readers(&manager),
        Commands::Wait => {
            let reader = reader::find_reader_to_wait_on(&manager, reader_name.as_deref())?;
            info!("Waiting for a card on {}", reader.name());
            let reader = manager.wait_for_card(reader.name())?;
            let atr = reader.atr().map(hex::encode).unwrap_or_default();
            println!(
                "{}",
                display::key_value_box(
                    "Card present",
                    vec![("Reader", reader.name().to_string()), ("ATR", atr)],
                )
            );
            return Ok(());
        }
        _ => {}
    }

    // For all other commands, find appropriate reader
    let reader = match &reader_name {
        Some(name) => reader::find_reader_by_name(&manager, name)?,
        None => reader::find_reader_with_card(&manager)?,
    };
    info!("Using reader: {}", reader.name());

    let default_key = config
        .classic_key
        .as_deref()
        .map(str::parse::<HexBytes>)
        .transpose()?;
    let with_default_key = |mut auth: KeyArgs| {
        auth.key = auth.key.or_else(|| default_key.clone());
        auth
    };

    let operations = CardOperations::new(manager);
    let reader = reader.name();

    match cli.command {
        Commands::List | Commands::Wait => unreachable!(), // Already handled above
        Commands::Read => read_command(&operations, reader)?,
        Commands::Write {
            data,
            data_type,
            url,
        } => write_command(
            &operations,
            reader,
            data.as_deref(),
            data_type,
            url.as_deref(),
        )?,
        Commands::WriteRecords { file } => write_records_command(&operations, reader, &file)?,
        Commands::Erase => erase_command(&operations, reader)?,
        Commands::Lock { yes } => lock_command(&operations, reader, yes)?,
        Commands::SetPassword {
            password,
            pack,
            start_page,
        } => set_password_command(&operations, reader, &password, &pack, start_page)?,
        Commands::RemovePassword { password } => {
            remove_password_command(&operations, reader, &password)?
        }
        Commands::ReadBlock { block, auth } => {
            read_block_command(&operations, reader, block, &with_default_key(auth))?
        }
        Commands::WriteBlock { block, data, auth } => {
            write_block_command(&operations, reader, block, &data, &with_default_key(auth))?
        }
        Commands::WriteTrailer {
            block,
            key_a,
            key_b,
            auth,
        } => write_trailer_command(
            &operations,
            reader,
            block,
            &key_a,
            &key_b,
            &with_default_key(auth),
        )?,
        Commands::ReadPage { page, password } => {
            read_page_command(&operations, reader, page, password.as_ref())?
        }
        Commands::WritePage {
            page,
            data,
            password,
        } => write_page_command(&operations, reader, page, &data, password.as_ref())?,
        Commands::WritePages { pages, password } => {
            write_pages_command(&operations, reader, &pages, password.as_ref())?
        }
        Commands::DeriveKey { aes_key } => derive_key_command(&operations, reader, &aes_key)?,
        Commands::AesWriteBlock {
            block,
            data,
            aes_key,
            auth,
        } => aes_write_block_command(
            &operations,
            reader,
            block,
            &data,
            &aes_key,
            &with_default_key(auth),
        )?,
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
}
