//! # dotconst demo application
//!
//! A sample CLI tool showing how to wire dotconst into an application. It
//! exists purely to demonstrate and manually verify the crate's features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example dotconst_demo -- show
//! cargo run --example dotconst_demo -- consts list
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                | How to exercise it                                                      |
//! |------------------------|-------------------------------------------------------------------------|
//! | Load and define        | `cargo run --example dotconst_demo -- show`                             |
//! | Environment override   | `APP_ENV=production cargo run --example dotconst_demo -- show`          |
//! | Single constant        | `cargo run --example dotconst_demo -- consts get server_port`           |
//! | JSON listing           | `cargo run --example dotconst_demo -- consts list --json`               |
//! | Compile                | `cargo run --example dotconst_demo -- --compiled /tmp/dc consts compile`|
//! | Load compiled artifact | `cargo run --example dotconst_demo -- --compiled /tmp/dc show`          |
//! | Strict references      | `cargo run --example dotconst_demo -- --strict show`                    |
//! | Logging                | `RUST_LOG=dotconst=debug cargo run --example dotconst_demo -- show`     |

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dotconst::{ConstArgs, Constants, Dotconst, DotconstBuilder};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "dotconst=info";

/// dotconst demo: a sample CLI app for showcasing dotconst integration.
#[derive(Parser, Debug)]
#[command(name = "dotconst-demo")]
struct Cli {
    /// Directory holding `.const.ini`.
    #[arg(long, global = true, default_value = "demos/dotconst_demo/app")]
    source: PathBuf,

    /// Directory holding (or receiving) the compiled artifact.
    #[arg(long, global = true)]
    compiled: Option<PathBuf>,

    /// Fail on references to unknown keys.
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load, define and print every constant.
    Show,
    /// Inspect or compile the constants.
    Consts(ConstArgs),
}

fn dotconst_for(cli: &Cli) -> DotconstBuilder {
    let mut builder = Dotconst::builder()
        .source_dir(&cli.source)
        .strict(cli.strict);
    if let Some(dir) = &cli.compiled {
        builder = builder.compiled_dir(dir);
    }
    builder
}

/// `RUST_LOG` directives when given and valid, else `dotconst=info`.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let builder = dotconst_for(&cli);

    match cli.command {
        Commands::Show => {
            let values = builder.load()?;
            let mut constants = Constants::builtin();
            constants.define_all(&values)?;
            for (name, _) in values.iter() {
                if let Some(value) = constants.get(name) {
                    println!("{name} = {value}");
                }
            }
        }
        Commands::Consts(args) => builder.handle_and_print(&args.into_action())?,
    }

    Ok(())
}
