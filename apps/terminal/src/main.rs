mod config;

use std::{future::Future, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{DashboardApi, HttpDashboardClient, PollingSubscription};
use dashboard::{
    events::classify_startup_failure,
    pages::{
        Autocomplete, CommoditiesPage, ComparisonPage, ConverterPage, FundamentalsPage, Market,
        ModelPerformancePage, NewsPage, NotificationsPage, OptionsPage, PaperTradingPage,
        PredictionsPage, SearchPage, WatchlistPage,
    },
    Page,
};
use shared::domain::{
    AlertCondition, AlertId, EvaluationWindow, HistoryPeriod, OptionSide, PlView, TradeSide,
    TriggeredAlertId,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "marketmind", about = "Terminal front end for the MarketMind backend")]
struct Cli {
    /// Backend base url, e.g. http://127.0.0.1:5001
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Config file; defaults to ./marketmind.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Seconds between refreshes in --watch mode
    #[arg(long, global = true)]
    poll_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quote card for one ticker
    Search { ticker: String },
    /// Side-by-side comparison of two tickers
    Compare { first: String, second: String },
    /// Symbol suggestions for a partial query
    Suggest { query: String },
    Watchlist {
        #[command(subcommand)]
        action: WatchlistCommand,
    },
    Paper {
        #[command(subcommand)]
        action: PaperCommand,
    },
    Options {
        #[command(subcommand)]
        action: OptionsCommand,
    },
    /// Next-day price prediction
    Predict { ticker: String },
    /// Back-test the prediction models and compare their accuracy
    Evaluate {
        ticker: String,
        /// Test period in trading days: 20, 30, 60 or 90
        #[arg(long, default_value = "60")]
        days: EvaluationWindow,
        /// Model whose predictions are listed, e.g. random_forest
        #[arg(long)]
        model: Option<String>,
    },
    Fundamentals { ticker: String },
    Forex(ConvertArgs),
    Crypto(ConvertArgs),
    Commodities {
        /// Commodity code; the first listed one when omitted
        code: Option<String>,
    },
    Alerts {
        #[command(subcommand)]
        action: AlertsCommand,
    },
    News,
}

#[derive(Subcommand, Debug)]
enum WatchlistCommand {
    Show {
        #[arg(long)]
        watch: bool,
    },
    Add { ticker: String },
    Remove { ticker: String },
}

#[derive(Subcommand, Debug)]
enum PaperCommand {
    Portfolio {
        /// Show today's P/L instead of the total
        #[arg(long)]
        daily: bool,
        #[arg(long)]
        watch: bool,
    },
    Buy { ticker: String, shares: String },
    Sell { ticker: String, shares: String },
    Chart { ticker: String },
    History {
        #[arg(long, default_value = "ytd")]
        period: HistoryPeriod,
    },
}

#[derive(Subcommand, Debug)]
enum OptionsCommand {
    Chain {
        ticker: String,
        #[arg(long)]
        expiration: Option<String>,
        #[arg(long)]
        puts: bool,
    },
    Buy(OptionTradeArgs),
    Sell(OptionTradeArgs),
}

#[derive(clap::Args, Debug)]
struct OptionTradeArgs {
    ticker: String,
    contract: String,
    quantity: String,
    #[arg(long)]
    expiration: Option<String>,
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    #[arg(long, default_value = "1")]
    amount: String,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    #[arg(long)]
    swap: bool,
}

#[derive(Subcommand, Debug)]
enum AlertsCommand {
    List {
        #[arg(long)]
        watch: bool,
    },
    Create {
        ticker: String,
        condition: AlertCondition,
        price: String,
    },
    Delete { id: i64 },
    Dismiss { id: i64 },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = format!("{err:#}");
            error!(error = %message, "marketmind failed to start");
            eprintln!("{}", classify_startup_failure(&message));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = config::load_settings(cli.config.as_deref())?;
    config::apply_overrides(&mut settings, cli.api_url.as_deref(), cli.poll_secs);
    let base_url = config::validate_api_url(&settings.api_url)?;

    let client = HttpDashboardClient::new(base_url.as_str(), settings.request_timeout)
        .context("failed to build http client")?;
    let api: Arc<dyn DashboardApi> = Arc::new(client);
    info!(api_url = %base_url, "using backend");

    let poll = settings.poll_interval;
    let watch_every = |watch: bool| watch.then_some(poll);

    match cli.command {
        Command::Search { ticker } => {
            let mut page = SearchPage::new(api);
            page.search(&ticker);
            show(&mut page, None).await;
        }
        Command::Compare { first, second } => {
            let mut page = ComparisonPage::new(api);
            page.compare(&first, &second);
            show(&mut page, None).await;
        }
        Command::Suggest { query } => {
            let mut page = Autocomplete::new(api);
            page.input(&query);
            show(&mut page, None).await;
        }
        Command::Watchlist { action } => {
            let mut page = WatchlistPage::new(api);
            let watch = match action {
                WatchlistCommand::Show { watch } => {
                    page.load();
                    watch
                }
                WatchlistCommand::Add { ticker } => {
                    page.add(&ticker);
                    false
                }
                WatchlistCommand::Remove { ticker } => {
                    page.remove(&ticker);
                    false
                }
            };
            show(&mut page, watch_every(watch)).await;
        }
        Command::Paper { action } => {
            let mut page = PaperTradingPage::new(api);
            let watch = match action {
                PaperCommand::Portfolio { daily, watch } => {
                    if daily {
                        page.set_pl_view(PlView::Daily);
                    }
                    page.load();
                    watch
                }
                PaperCommand::Buy { ticker, shares } => {
                    page.trade(TradeSide::Buy, &ticker, &shares);
                    false
                }
                PaperCommand::Sell { ticker, shares } => {
                    page.trade(TradeSide::Sell, &ticker, &shares);
                    false
                }
                PaperCommand::Chart { ticker } => {
                    page.select_position(&ticker);
                    false
                }
                PaperCommand::History { period } => {
                    page.load_history(period);
                    false
                }
            };
            show(&mut page, watch_every(watch)).await;
        }
        Command::Options { action } => {
            let mut page = OptionsPage::new(api);
            match action {
                OptionsCommand::Chain {
                    ticker,
                    expiration,
                    puts,
                } => {
                    if puts {
                        page.set_side(OptionSide::Puts);
                    }
                    open_chain(&mut page, &ticker, expiration.as_deref()).await;
                }
                OptionsCommand::Buy(args) => trade_option(&mut page, TradeSide::Buy, args).await,
                OptionsCommand::Sell(args) => trade_option(&mut page, TradeSide::Sell, args).await,
            }
            show(&mut page, None).await;
        }
        Command::Predict { ticker } => {
            let mut page = PredictionsPage::new(api);
            page.predict(&ticker);
            show(&mut page, None).await;
        }
        Command::Evaluate {
            ticker,
            days,
            model,
        } => {
            let mut page = ModelPerformancePage::new(api);
            if let Some(model) = model {
                page.select_model(&model);
            }
            page.evaluate(&ticker, days);
            show(&mut page, None).await;
        }
        Command::Fundamentals { ticker } => {
            let mut page = FundamentalsPage::new(api);
            page.load(&ticker);
            show(&mut page, None).await;
        }
        Command::Forex(args) => {
            let mut page = ConverterPage::new(api, Market::Forex);
            convert(&mut page, args);
            show(&mut page, None).await;
        }
        Command::Crypto(args) => {
            let mut page = ConverterPage::new(api, Market::Crypto);
            convert(&mut page, args);
            show(&mut page, None).await;
        }
        Command::Commodities { code } => {
            let mut page = CommoditiesPage::new(api);
            if let Some(code) = code {
                page.select(&code);
            }
            page.load();
            show(&mut page, None).await;
        }
        Command::Alerts { action } => {
            let mut page = NotificationsPage::new(api);
            let watch = match action {
                AlertsCommand::List { watch } => {
                    page.load();
                    watch
                }
                AlertsCommand::Create {
                    ticker,
                    condition,
                    price,
                } => {
                    page.create(&ticker, condition, &price);
                    false
                }
                AlertsCommand::Delete { id } => {
                    page.delete(AlertId(id));
                    false
                }
                AlertsCommand::Dismiss { id } => {
                    page.dismiss(TriggeredAlertId(id));
                    false
                }
            };
            show(&mut page, watch_every(watch)).await;
        }
        Command::News => {
            let mut page = NewsPage::new(api);
            page.load();
            show(&mut page, None).await;
        }
    }
    Ok(())
}

async fn open_chain(page: &mut OptionsPage, ticker: &str, expiration: Option<&str>) {
    if !page.search(ticker) {
        return;
    }
    page.settled().await;
    if let Some(date) = expiration {
        page.select_expiration(date);
    }
}

async fn trade_option(page: &mut OptionsPage, side: TradeSide, args: OptionTradeArgs) {
    open_chain(page, &args.ticker, args.expiration.as_deref()).await;
    page.settled().await;
    page.trade(side, &args.contract, &args.quantity);
}

fn convert(page: &mut ConverterPage, args: ConvertArgs) {
    let (default_from, default_to) = page.market().default_pair();
    let from = args.from.as_deref().unwrap_or(default_from);
    let to = args.to.as_deref().unwrap_or(default_to);
    if !page.set_pair(from, to) || !page.set_amount(&args.amount) {
        return;
    }
    page.load();
    if args.swap {
        page.swap();
    }
}

fn print_page(page: &dyn Page) {
    println!("== {} ==", page.title());
    for line in page.render() {
        println!("{line}");
    }
}

/// Prints the page once everything it started has landed. With `watch`, keeps
/// refreshing on the poll interval and reprints until Ctrl-C.
async fn show(page: &mut dyn Page, watch: Option<Duration>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    show_until(page, watch, ctrl_c).await;
}

async fn show_until(page: &mut dyn Page, watch: Option<Duration>, stop: impl Future<Output = ()>) {
    page.settled().await;
    print_page(page);

    let Some(interval) = watch else {
        return;
    };
    let mut poll = PollingSubscription::start(interval);
    info!(interval_ms = poll.interval().as_millis() as u64, "watching; Ctrl-C to stop");
    tokio::pin!(stop);
    loop {
        tokio::select! {
            tick = poll.tick() => match tick {
                Some(_) => page.refresh(),
                None => break,
            },
            _ = page.changed() => {
                if !page.is_loading() {
                    println!();
                    print_page(page);
                }
            }
            _ = &mut stop => {
                info!("stopping");
                break;
            }
        }
    }
    poll.cancel();
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
