//! coinwatch: command-line front end
//!
//! Queries CoinGecko through the caching, throttled fetch layer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use coinwatch::api::decode;
use coinwatch::cache::DEFAULT_SWEEP_INTERVAL;
use coinwatch::{
    ChartService, CoinMarket, Config, Currency, RefreshHandle, RefreshMessage, RequestOutcome,
};

/// Crypto market data from the command line
#[derive(Parser)]
#[command(name = "coinwatch")]
#[command(version = coinwatch::PKG_VERSION)]
#[command(long_version = long_version())]
#[command(about = "Cached CoinGecko market data client")]
struct Args {
    /// Config file (default: ~/.coinwatch/config.toml, then /etc/coinwatch/config.toml)
    #[arg(short, long, env = "COINWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List coins by market cap
    Markets {
        #[arg(short = 'C', long)]
        currency: Option<Currency>,
        /// Number of rows to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Print a price chart series
    Chart {
        /// Coin id (e.g., "bitcoin")
        coin: String,
        /// Range: 1H, 4H, 1D, 7D, 30D or 1Y
        #[arg(short, long, default_value = "7D")]
        period: String,
        #[arg(short = 'C', long)]
        currency: Option<Currency>,
    },

    /// Show details for one coin
    Coin {
        /// Coin id
        id: String,
    },

    /// Show trending coins
    Trending,

    /// Show global market figures
    Global,

    /// Search coins by name or symbol
    Search {
        query: String,
    },

    /// Poll the market listing and print each update
    Watch {
        #[arg(short = 'C', long)]
        currency: Option<Currency>,
        /// Bypass the response cache on every poll
        #[arg(long)]
        fresh: bool,
    },
}

fn long_version() -> String {
    coinwatch::version_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let client = config.client()?;

    match args.command {
        Command::Markets { currency, limit } => {
            let currency = currency.unwrap_or(config.refresh.currency);
            let payload = client.markets(currency).await.into_result()?;
            let coins: Vec<CoinMarket> = decode(&payload)?;
            print_listing(&coins, currency, limit);
        }

        Command::Chart {
            coin,
            period,
            currency,
        } => {
            let currency = currency.unwrap_or(config.refresh.currency);
            let charts = ChartService::new(client);
            let chart = charts.fetch_chart_data(&coin, currency, &period).await?;
            if chart.is_empty() {
                println!("no price data for {coin}");
                return Ok(());
            }
            let dimension = chart.dimension();
            println!(
                "{coin} {period} ({}, {} intervals, {})",
                dimension.description, dimension.interval, dimension.total
            );
            for (label, point) in chart.labels().iter().zip(&chart.prices) {
                println!("{label:>16}  {}{:.4}", currency.symbol(), point.price);
            }
        }

        Command::Coin { id } => print_json(client.coin_details(&id).await)?,

        Command::Trending => print_json(client.trending().await)?,

        Command::Global => print_json(client.global().await)?,

        Command::Search { query } => print_json(client.search(&query).await)?,

        Command::Watch { currency, fresh } => {
            let mut refresh = config.refresh_config();
            if let Some(currency) = currency {
                refresh.currency = currency;
            }
            refresh.use_cache = !fresh;

            let sweeper = client
                .orchestrator()
                .cache()
                .spawn_sweeper(DEFAULT_SWEEP_INTERVAL);
            let mut handle = RefreshHandle::spawn(client, refresh);
            loop {
                tokio::select! {
                    message = handle.recv() => match message {
                        Some(RefreshMessage::Listings { currency, coins }) => {
                            println!("--- {} ---", chrono::Local::now().format("%H:%M:%S"));
                            print_listing(&coins, currency, 10);
                        }
                        Some(RefreshMessage::Failed(failure)) => {
                            eprintln!("refresh failed ({}): {failure}", failure.kind);
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        handle.shutdown().await;
                        break;
                    }
                }
            }
            sweeper.abort();
        }
    }

    Ok(())
}

fn print_listing(coins: &[CoinMarket], currency: Currency, limit: usize) {
    if coins.is_empty() {
        println!("no coins returned");
        return;
    }
    let symbol = currency.symbol();
    for coin in coins.iter().take(limit) {
        let rank = coin
            .market_cap_rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let price = coin
            .current_price
            .map(|p| format!("{symbol}{p:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let change = coin
            .price_change_percentage_24h
            .map(|c| format!("{c:+.2}%"))
            .unwrap_or_default();
        println!(
            "{rank:>4}  {:<24} {:<8} {price:>16} {change:>9}",
            coin.name,
            coin.symbol.to_uppercase()
        );
    }
}

fn print_json(outcome: RequestOutcome) -> Result<(), Box<dyn std::error::Error>> {
    let payload = outcome.into_result()?;
    println!("{}", serde_json::to_string_pretty(&*payload)?);
    Ok(())
}
