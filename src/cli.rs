use clap::{Parser, Subcommand};

/// coinwatch: CoinGecko market dashboard for the terminal.
#[derive(Parser, Debug)]
#[command(name = "coinwatch", version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// CoinGecko API base URL
    #[arg(long, env = "COINGECKO_API_URL", global = true)]
    pub base_url: Option<String>,

    /// CoinGecko demo API key, sent as `x-cg-demo-api-key`
    #[arg(long, env = "COINGECKO_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream the instrument ticker, one line per instrument per refresh
    Ticker(TickerArgs),

    /// Fetch the instrument list once and print it as a table
    List(ListArgs),

    /// Print an instrument's 24h chart
    Chart(ChartArgs),

    /// Launch the dashboard TUI
    Monitor(MonitorArgs),
}

/// Arguments for the `ticker` subcommand.
#[derive(Parser, Debug)]
pub struct TickerArgs {
    /// Interval between list refreshes (ms)
    #[arg(long, default_value = "5000")]
    pub interval_ms: u64,

    /// Recompute each instrument's 24h change from its own chart
    #[arg(long)]
    pub enrich: bool,

    /// Maximum concurrent chart fetches while enriching
    #[arg(long, default_value = "8")]
    pub enrich_concurrency: usize,

    /// Output as JSON instead of TSV
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `list` subcommand.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output as JSON instead of TSV
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `chart` subcommand.
#[derive(Parser, Debug)]
pub struct ChartArgs {
    /// Instrument id (e.g. bitcoin, ethereum)
    pub id: String,

    /// Number of most recent points to print
    #[arg(long, default_value = "50")]
    pub points: usize,

    /// Keep refreshing and reprint on every update
    #[arg(long)]
    pub watch: bool,

    /// Interval between chart refreshes with --watch (ms)
    #[arg(long, default_value = "60000")]
    pub interval_ms: u64,

    /// Output as JSON instead of TSV
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `monitor` subcommand.
#[derive(Parser, Debug)]
pub struct MonitorArgs {
    /// Interval between list refreshes (ms)
    #[arg(long, default_value = "5000")]
    pub interval_ms: u64,

    /// Interval between chart refreshes of the open detail view (ms)
    #[arg(long, default_value = "60000")]
    pub chart_interval_ms: u64,

    /// Recompute each instrument's 24h change from its own chart
    #[arg(long)]
    pub enrich: bool,

    /// Maximum concurrent chart fetches while enriching
    #[arg(long, default_value = "8")]
    pub enrich_concurrency: usize,
}
