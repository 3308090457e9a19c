//! `plist` CLI — parse and inspect ASCII property lists from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Parse a document from stdin and pretty-print its tree
//! echo '{ "name" : "Alice" ; "age" : 37 ; }' | plist parse
//!
//! # Parse from a file
//! plist parse -i settings.plist
//!
//! # Exercise incremental parsing with tiny chunks
//! plist parse -i settings.plist --chunk-size 1
//!
//! # List the node kind names
//! plist kinds
//! ```

use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plist_core::Kind;

#[derive(Parser)]
#[command(name = "plist", version, about = "ASCII property list CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a property list document and pretty-print its tree
    Parse {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Feed the parser this many bytes at a time
        #[arg(long, default_value_t = 4096)]
        chunk_size: usize,
    },
    /// Print the node kind names
    Kinds,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { input, chunk_size } => {
            let data = read_input(input.as_deref())?;
            let chunk_size = chunk_size.max(1);

            let mut parser = plist_core::Parser::new();
            for chunk in data.chunks(chunk_size) {
                parser
                    .feed(chunk)
                    .context("Failed to parse property list text")?;
            }
            let (tree, root) = parser
                .result()
                .context("Input did not contain a complete property list")?;

            let mut stdout = io::stdout().lock();
            plist_core::dump(&tree, root, &mut stdout)?;
            stdout.flush()?;
        }
        Commands::Kinds => {
            for kind in Kind::ALL {
                println!("{}", kind.name());
            }
        }
    }

    Ok(())
}

fn read_input(path: Option<&str>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
