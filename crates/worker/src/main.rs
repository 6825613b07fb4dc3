use anyhow::Context;
use carteira_core::cancel::CancelToken;
use carteira_core::domain::instrument::InstrumentKind;
use carteira_core::history::http::HttpPriceClient;
use carteira_core::history::{Lookback, PriceClient};
use carteira_core::table::reader::{FilePage, HttpPage, PageSource, PollOptions};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod overlay;

#[derive(Debug, Parser)]
#[command(name = "carteira_worker")]
struct Args {
    /// Portfolio page to annotate: a file path or an http(s) URL.
    #[arg(long)]
    page: String,

    /// Where to write the annotated page. Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// History window preselected in every modal.
    #[arg(long, default_value_t = Lookback::Days30)]
    days: Lookback,

    /// Only overlay these tables (e.g. `Ticker-tickers`). Repeatable; all tracked
    /// tables when omitted.
    #[arg(long = "table")]
    tables: Vec<InstrumentKind>,

    /// Skip price-history requests.
    #[arg(long)]
    no_history: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = carteira_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let res = run(&settings, args).await;
    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "overlay run failed");
    }
    res
}

async fn run(settings: &carteira_core::config::Settings, args: Args) -> anyhow::Result<()> {
    let http = carteira_core::net::build_client(settings)?;

    let source: Arc<dyn PageSource> = if is_url(&args.page) {
        Arc::new(HttpPage::new(http.clone(), args.page.as_str()))
    } else {
        Arc::new(FilePage::new(&args.page))
    };
    let prices: Option<Arc<dyn PriceClient>> = if args.no_history {
        None
    } else {
        Some(Arc::new(HttpPriceClient::new(http, &settings.base_url)))
    };

    let cancel = CancelToken::new();
    spawn_ctrl_c(cancel.clone());

    tracing::info!(
        page = %source.describe(),
        days = args.days.days(),
        tables = args.tables.len(),
        history = !args.no_history,
        "starting overlay run"
    );

    let run = overlay::OverlayRun {
        source: source.clone(),
        prices,
        poll: PollOptions::from(settings),
        lookback: args.days,
    };
    let overlays = overlay::build_overlays(&run, &args.tables, &cancel).await?;

    let page = source
        .snapshot()
        .await
        .with_context(|| format!("failed to re-read {}", source.describe()))?;
    let annotated = carteira_core::present::inject(&page, &overlays);

    match &args.out {
        Some(path) => tokio::fs::write(path, annotated.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(annotated.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    tracing::info!(overlays = overlays.len(), "page annotated");
    Ok(())
}

fn is_url(page: &str) -> bool {
    let lower = page.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn spawn_ctrl_c(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling");
            cancel.cancel();
        }
    });
}

fn init_sentry(settings: &carteira_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
