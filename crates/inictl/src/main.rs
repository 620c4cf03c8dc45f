//! inictl - read and edit INI configuration files from setup scripts

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use inicache::{LoadOptions, TextEncoding};
use tracing::debug;

use crate::commands::{Placement, Session};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    format: FormatArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct FormatArgs {
    /// Strip double quotes around values
    #[arg(long, global = true)]
    string_mode: bool,

    /// Fail on unterminated quoted values instead of dropping them
    #[arg(long, global = true)]
    strict: bool,

    /// Read and write UTF-8 instead of Latin-1
    #[arg(long, global = true)]
    utf8: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the value of a key
    Get {
        /// INI file
        file: PathBuf,
        /// Section name (case-insensitive)
        section: String,
        /// Key name (case-insensitive)
        key: String,
    },

    /// Create or update a key and save the file
    Set {
        /// INI file (created if missing)
        file: PathBuf,
        /// Section name, created if missing
        section: String,
        /// Key name
        key: String,
        /// New value
        value: String,
        /// Place a new key first in the section
        #[arg(long, conflicts_with_all = ["before", "after"])]
        first: bool,
        /// Place a new key before this key
        #[arg(long, value_name = "KEY", conflicts_with = "after")]
        before: Option<String>,
        /// Place a new key after this key
        #[arg(long, value_name = "KEY")]
        after: Option<String>,
    },

    /// List sections, or the keys of one section
    List {
        /// INI file
        file: PathBuf,
        /// Section to list
        section: Option<String>,
    },

    /// Rewrite a file in canonical form
    Fmt {
        /// INI file
        file: PathBuf,
        /// Write here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl FormatArgs {
    fn session(&self) -> Session {
        let encoding = if self.utf8 {
            TextEncoding::Utf8
        } else {
            TextEncoding::Latin1
        };
        Session::new(
            LoadOptions::new()
                .with_string_mode(self.string_mode)
                .with_strict_quotes(self.strict)
                .with_encoding(encoding),
        )
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    debug!(?args, "starting inictl");

    let session = args.format.session();
    match args.command {
        Command::Get { file, section, key } => {
            println!("{}", session.get(&file, &section, &key)?);
        }
        Command::Set {
            file,
            section,
            key,
            value,
            first,
            before,
            after,
        } => {
            let placement = match (first, before, after) {
                (true, _, _) => Placement::First,
                (_, Some(anchor), _) => Placement::Before(anchor),
                (_, _, Some(anchor)) => Placement::After(anchor),
                _ => Placement::Last,
            };
            session.set(&file, &section, &key, &value, placement)?;
        }
        Command::List { file, section } => {
            for line in session.list(&file, section.as_deref())? {
                println!("{}", line);
            }
        }
        Command::Fmt { file, output } => {
            session.fmt(&file, output.as_deref().unwrap_or(&file))?;
        }
    }

    Ok(())
}
