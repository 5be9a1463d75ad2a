use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "recledger",
    about = "Record ledger over a durable ordered world state",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with [keys], [schema], [seed] and [storage] tables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides storage.data_dir from the config file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Seed the ledger with the configured record set
    Init(InitArgs),
    /// Create a record at an index
    Create(CreateArgs),
    /// Read one record
    Read(ReadArgs),
    /// List records, optionally within a key range
    List(ListArgs),
    /// Change one mutable field of a record
    Update(UpdateArgs),
    /// Submit a raw JSON invocation
    Invoke(InvokeArgs),
    /// Rewrite the commit log as a single snapshot
    Compact,
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite existing records instead of skipping a populated ledger
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct CreateArgs {
    pub index: String,
    /// One `field=value` pair per schema field
    #[arg(required = true)]
    pub fields: Vec<String>,
}

#[derive(Args)]
pub struct ReadArgs {
    pub key: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Inclusive start key or index
    #[arg(long)]
    pub start: Option<String>,
    /// Exclusive end key or index
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    pub key: String,
    pub field: String,
    pub value: String,
}

#[derive(Args)]
pub struct InvokeArgs {
    /// Invocation JSON, e.g. {"function":"QueryRecord","Args":["REC1"]}
    #[arg(short = 'c', long = "ctor")]
    pub invocation: String,
}
