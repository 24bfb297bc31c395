//! Clap adapter for dotconst.
//!
//! Compiled only when the `clap` Cargo feature is enabled (on by default).
//! [`ConstArgs`] and [`ConstSubcommand`] can be embedded in an application's
//! `#[derive(Parser)]` struct to get `consts list|get|compile` subcommands.
//!
//! The only bridge to the core is [`ConstArgs::into_action()`], which
//! converts clap-parsed arguments into a [`ConstAction`](crate::ConstAction).
//! All logic then flows through the clap-free
//! [`DotconstBuilder::handle()`](crate::DotconstBuilder::handle) API.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::types::ConstAction;

/// Clap-derived args for the `consts` subcommand group.
///
/// ```ignore
/// #[derive(Subcommand)]
/// enum Commands {
///     Consts(ConstArgs),
/// }
/// ```
#[derive(Debug, Args)]
pub struct ConstArgs {
    #[command(subcommand)]
    pub action: Option<ConstSubcommand>,
}

/// Available constant subcommands.
#[derive(Debug, Subcommand)]
pub enum ConstSubcommand {
    /// Show every resolved constant.
    List {
        /// Print a JSON object instead of `KEY = value` lines.
        #[arg(long)]
        json: bool,
    },
    /// Show the resolved value of one constant.
    Get {
        /// Constant name, case-insensitive (e.g. "database_host").
        key: String,
    },
    /// Compile the configuration into a constants file.
    Compile {
        /// Output directory. Defaults to the builder's compiled directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl ConstArgs {
    /// Convert clap-parsed args into a framework-agnostic `ConstAction`.
    ///
    /// Bare `consts` (no subcommand) maps to a plain listing.
    pub fn into_action(self) -> ConstAction {
        match self.action {
            None => ConstAction::List { json: false },
            Some(ConstSubcommand::List { json }) => ConstAction::List { json },
            Some(ConstSubcommand::Get { key }) => ConstAction::Get { key },
            Some(ConstSubcommand::Compile { output }) => ConstAction::Compile { output },
        }
    }
}
