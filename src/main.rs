use std::path::PathBuf;

use clap::{Parser, Subcommand};
use doc_chat::Result;
use doc_chat::commands::{ask, chat, clear, history, init_config, reap, show_config};

#[derive(Parser)]
#[command(name = "doc-chat")]
#[command(about = "Ask questions about your PDF and DOCX documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize or inspect the configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Process documents and answer a single question
    Ask {
        /// The question to answer
        question: String,
        /// Document to process before asking; may be given multiple times
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        /// How many chunks to retrieve as context
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Process documents once, then answer questions read from stdin
    Chat {
        /// Document to process; may be given multiple times
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        /// How many chunks to retrieve as context
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show the current session's recent conversation turns
    History {
        /// Maximum number of turns to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete the current session's conversation history
    Clear,
    /// Remove sessions idle past the retention window
    Reap {
        /// Override the configured retention window, in days
        #[arg(long)]
        older_than_days: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                init_config()?;
            }
        }
        Commands::Ask {
            question,
            files,
            top_k,
        } => {
            ask(&files, &question, top_k)?;
        }
        Commands::Chat { files, top_k } => {
            chat(&files, top_k)?;
        }
        Commands::History { limit } => {
            history(limit)?;
        }
        Commands::Clear => {
            clear()?;
        }
        Commands::Reap { older_than_days } => {
            reap(older_than_days)?;
        }
    }

    Ok(())
}
