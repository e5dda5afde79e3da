use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::suggest::DEFAULT_MODEL;

#[derive(Parser, Debug)]
#[command(author, version, about = "Totion - terminal notes with AI autocomplete")]
pub struct Cli {
    /// Directory holding the `.md` notes (defaults to ~/.totion)
    #[arg(long, env = "TOTION_NOTES_DIR", value_name = "DIR")]
    pub notes_dir: Option<PathBuf>,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,
    /// Disable AI suggestions even when an API key is present
    #[arg(long)]
    pub no_ai: bool,
    #[arg(long, env = "TOTION_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Settings resolved once at startup and handed to the components.
#[derive(Debug, Clone)]
pub struct Config {
    pub notes_dir: PathBuf,
    pub api_key: Option<String>,
    pub model: String,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let notes_dir = match cli.notes_dir {
            Some(dir) => dir,
            None => default_notes_dir()?,
        };
        let api_key = if cli.no_ai {
            None
        } else {
            cli.api_key.filter(|k| !k.trim().is_empty())
        };
        let log_file = cli
            .log_file
            .unwrap_or_else(|| env::temp_dir().join("totion.log"));
        Ok(Self {
            notes_dir,
            api_key,
            model: cli.model,
            log_file,
        })
    }
}

fn default_notes_dir() -> Result<PathBuf> {
    let home = env::var("HOME").context("HOME is not set; pass --notes-dir")?;
    Ok(PathBuf::from(home).join(".totion"))
}
