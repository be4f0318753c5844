pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "sharedsecretd")]
#[command(about = "Escrow secrets until their caretakers unlock them")]
pub struct Args {
    /// URL of a running daemon (defaults to the configured listen port on localhost)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the config directory (defaults to ~/.sharedsecret)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
