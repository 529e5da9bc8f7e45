use std::path::PathBuf;

use clap::Parser;

use crate::config::CONFIG_ENV;

#[derive(Debug, Parser)]
#[command(
    name = "artpick",
    version,
    about = "Pick artworks across pages of the collection API"
)]
pub struct Cli {
    /// Serve a built-in sample dataset instead of calling the API
    #[arg(long)]
    pub offline: bool,

    /// Settings file; defaults to <config dir>/artpick/config.toml
    #[arg(long, env = CONFIG_ENV, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
