use artpick::cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    artpick::run(Cli::parse()).await
}
