pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "bookwire")]
#[command(about = "Book catalogue server and client with enveloped payloads")]
pub struct Args {
    /// API server to talk to (defaults to localhost on the configured port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the bookwire config directory (defaults to ~/.bookwire)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
