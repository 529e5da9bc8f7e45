pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod fetcher;
pub mod grid;
pub mod selection;

pub use error::{FetchError, InvalidInputError};
pub use fetcher::types::Artwork;
pub use fetcher::{Page, PageFetcher, Record};
pub use selection::{BulkSelectReport, NavigateOutcome, SelectionSet, SelectionStore};

use anyhow::Result;
use tokio::io::BufReader;
use tracing::info;

use self::cli::Cli;
use self::config::{LogSettings, Settings};
use self::console::Console;
use self::fetcher::http_client::ArticHttpClient;
use self::fetcher::memory::MemoryFetcher;

/// Records served by `--offline` sessions.
const OFFLINE_RECORDS: u64 = 60;

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    init_tracing(&settings.log);

    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();

    if cli.offline {
        info!("Starting offline session with {} sample records", OFFLINE_RECORDS);
        let records = (1..=OFFLINE_RECORDS).map(Artwork::untitled).collect();
        let fetcher = MemoryFetcher::new(records, settings.api.page_size);
        Console::new(SelectionStore::new(fetcher)).run(input, output).await
    } else {
        info!("Starting session against {}", settings.api.base_url);
        let fetcher = ArticHttpClient::new(&settings.api)?;
        Console::new(SelectionStore::new(fetcher)).run(input, output).await
    }
}

fn init_tracing(log: &LogSettings) {
    // stdout belongs to the console, logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log.filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
