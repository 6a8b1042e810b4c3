//! stencil CLI - Template generator and runner
//!
//! Commands:
//! - `stencil generate` - Print the rendered template for a type
//! - `stencil decode` - Decode a JSON file and print the value
//! - `stencil encode` - Re-encode a JSON file through the encoder template
//! - `stencil split` - Print the top-level boundaries of a list or dict
//! - `stencil cache` - Inspect, clear or warm the template cache

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod cache;
mod context;
mod convert;
mod generate;
mod split;

use context::Context;

#[derive(Parser)]
#[command(name = "stencil")]
#[command(author, version, about = "Type-driven JSON templates", long_about = None)]
struct Cli {
    /// Log more (-v debug, -vv trace); STENCIL_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory for generated templates
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Class schema (TOML, or JSON by extension)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the rendered template for a type
    Generate {
        /// Type, e.g. `list<User>` or `dict<string, ?int>`
        #[arg(short, long = "type")]
        ty: String,

        #[arg(short, long, value_enum)]
        direction: DirectionArg,

        #[arg(short, long, value_enum, default_value = "string")]
        flavor: FlavorArg,

        /// Generate a lazy decoder
        #[arg(long)]
        lazy: bool,
    },

    /// Decode a JSON file and print the value
    Decode {
        #[arg(short, long = "type")]
        ty: String,

        #[arg(short, long)]
        input: PathBuf,

        /// Decode lazily through boundaries
        #[arg(long)]
        lazy: bool,

        /// Skip failing elements and report them
        #[arg(long)]
        collect_errors: bool,
    },

    /// Decode a JSON file eagerly and write it back through the encoder
    Encode {
        #[arg(short, long = "type")]
        ty: String,

        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the top-level element boundaries of a list or dict
    Split {
        #[arg(short, long)]
        input: PathBuf,

        /// Split a dict instead of a list
        #[arg(long)]
        dict: bool,

        /// Byte offset of the container
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Byte length of the container (default: to end of file)
        #[arg(long)]
        length: Option<u64>,
    },

    /// Inspect, clear or warm the template cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print the template file path for a type
    Path {
        #[arg(short, long = "type")]
        ty: String,

        #[arg(short, long, value_enum)]
        direction: DirectionArg,

        #[arg(short, long, value_enum, default_value = "string")]
        flavor: FlavorArg,
    },

    /// Delete every template in the cache directory
    Clear,

    /// Generate encode and decode templates for each type
    Warm {
        #[arg(short, long = "type", required = true)]
        types: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Encode,
    Decode,
}

impl From<DirectionArg> for stencil::Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Encode => stencil::Direction::Encode,
            DirectionArg::Decode => stencil::Direction::Decode,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FlavorArg {
    String,
    Stream,
    Resource,
}

impl From<FlavorArg> for stencil::Flavor {
    fn from(arg: FlavorArg) -> Self {
        match arg {
            FlavorArg::String => stencil::Flavor::String,
            FlavorArg::Stream => stencil::Flavor::Stream,
            FlavorArg::Resource => stencil::Flavor::Resource,
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("STENCIL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let context = Context::load(cli.schema.as_deref(), cli.config.as_deref(), cli.cache_dir)?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Generate {
            ty,
            direction,
            flavor,
            lazy,
        } => {
            generate::run(&context, &ty, direction.into(), flavor.into(), lazy, &mut out)?;
        }
        Commands::Decode {
            ty,
            input,
            lazy,
            collect_errors,
        } => {
            convert::decode(&context, &ty, &input, lazy, collect_errors, &mut out)?;
        }
        Commands::Encode { ty, input } => {
            convert::encode(&context, &ty, &input, &mut out)?;
        }
        Commands::Split {
            input,
            dict,
            offset,
            length,
        } => {
            split::run(&input, dict, offset, length, &mut out)?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Path { ty, direction, flavor } => {
                cache::path(&context, &ty, direction.into(), flavor.into(), &mut out)?;
            }
            CacheAction::Clear => {
                cache::clear(&context, &mut out)?;
            }
            CacheAction::Warm { types } => {
                cache::warm(&context, &types, &mut out)?;
            }
        },
    }

    Ok(())
}
