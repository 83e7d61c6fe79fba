//! Binary entry point for the radixkv command line tool.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use radixkv::{logging::init_logging, Db, TxOptions};

#[derive(Parser, Debug)]
#[command(
    name = "radixkv",
    version,
    about = "Inspect and edit radixkv database files",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "RADIXKV_LOG",
        default_value = "warn",
        help = "Tracing filter directive, e.g. info or radixkv=trace"
    )]
    log_level: String,

    #[command(flatten)]
    tx: TxArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct TxArgs {
    #[arg(
        long,
        global = true,
        value_name = "BYTES",
        help = "Allocate nodes from a fixed buffer of this size"
    )]
    fixed_buffer: Option<usize>,

    #[arg(long, global = true, value_name = "BYTES", help = "Alignment of values inside nodes")]
    value_align: Option<usize>,

    #[arg(
        long,
        global = true,
        default_value_t = 0,
        help = "Metadata bytes reserved next to each written value"
    )]
    meta_size: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert or overwrite a key.
    Put {
        #[arg(value_name = "DB")]
        db_path: PathBuf,
        key: String,
        value: String,
        #[arg(long, help = "Decode key and value as hex")]
        hex: bool,
    },
    /// Print the value stored under a key.
    Get {
        #[arg(value_name = "DB")]
        db_path: PathBuf,
        key: String,
        #[arg(long, help = "Decode the key and print the value as hex")]
        hex: bool,
    },
    /// Report file size and root offset.
    Stats {
        #[arg(value_name = "DB")]
        db_path: PathBuf,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let options = build_tx_options(&cli.tx);

    match cli.command {
        Command::Put {
            db_path,
            key,
            value,
            hex,
        } => {
            let db = Db::open(&db_path, options)?;
            let mut tx = db.begin_transaction()?;
            tx.put(&decode_arg(&key, hex)?, &decode_arg(&value, hex)?)?;
            let root = tx.commit()?;
            tx.stats().emit_tracing();
            match root {
                Some(off) => println!("committed, root at offset {off}"),
                None => println!("nothing to commit"),
            }
        }
        Command::Get { db_path, key, hex } => {
            let db = Db::open(&db_path, options)?;
            let mut tx = db.begin_transaction()?;
            match tx.get(&decode_arg(&key, hex)?)? {
                Some(value) if hex => println!("{}", hex::encode(value)),
                Some(value) => println!("{}", String::from_utf8_lossy(value)),
                None => {
                    eprintln!("key not found");
                    std::process::exit(2);
                }
            }
            tx.rollback()?;
        }
        Command::Stats { db_path } => {
            let db = Db::open(&db_path, options)?;
            let store = db.store();
            println!("file size: {} bytes", store.file_size());
            match store.root() {
                Some(root) => println!("root offset: {root}"),
                None => println!("root offset: none (empty database)"),
            }
        }
    }
    Ok(())
}

fn build_tx_options(args: &TxArgs) -> TxOptions {
    let mut options = match args.fixed_buffer {
        Some(capacity) => TxOptions::fixed_buffer(capacity),
        None => TxOptions::default(),
    };
    if let Some(align) = args.value_align {
        options = options.with_value_align(align);
    }
    options.with_meta_size(args.meta_size)
}

fn decode_arg(arg: &str, hex: bool) -> Result<Vec<u8>, Box<dyn Error>> {
    if hex {
        Ok(hex::decode(arg)?)
    } else {
        Ok(arg.as_bytes().to_vec())
    }
}
