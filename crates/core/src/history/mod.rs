pub mod http;
pub mod types;

use crate::cancel::CancelToken;
use crate::domain::instrument::{HistoryRoute, IdResolution};
use crate::domain::price::PriceSeries;
use crate::stats::SeriesStats;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Lookback windows the history modal offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookback {
    #[default]
    Days30,
    Days90,
    Days180,
    Days365,
}

impl Lookback {
    pub const ALL: [Lookback; 4] = [
        Lookback::Days30,
        Lookback::Days90,
        Lookback::Days180,
        Lookback::Days365,
    ];

    pub fn days(self) -> u32 {
        match self {
            Lookback::Days30 => 30,
            Lookback::Days90 => 90,
            Lookback::Days180 => 180,
            Lookback::Days365 => 365,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.days() == days)
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

impl FromStr for Lookback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_days)
            .ok_or_else(|| format!("lookback must be one of 30, 90, 180, 365 (got {s:?})"))
    }
}

/// Read-only access to the site's price data.
#[async_trait::async_trait]
pub trait PriceClient: Send + Sync {
    /// Scrape the internal identifier of `ticker` from `{site_route}/{ticker}/`.
    async fn resolve_id(&self, ticker: &str, site_route: &str, attribute: &str) -> Result<String>;

    async fn fetch_history(&self, api_route: &str, id: &str, lookback: Lookback)
        -> Result<PriceSeries>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryOutcome {
    Loaded {
        stats: SeriesStats,
        points: usize,
        /// First and last dated points, when the endpoint sends dates.
        range: Option<(NaiveDate, NaiveDate)>,
    },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerHistory {
    pub ticker: String,
    pub outcome: HistoryOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadCancelled;

impl fmt::Display for LoadCancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "history load cancelled")
    }
}

impl std::error::Error for LoadCancelled {}

/// Loads price history for the tickers of one table.
///
/// Tickers are processed strictly in order: ticker `i` is resolved, fetched and
/// summarized before ticker `i + 1` is requested. A failure only marks that ticker
/// unavailable.
pub struct HistoryLoader<'a> {
    client: &'a dyn PriceClient,
    route: HistoryRoute,
}

impl<'a> HistoryLoader<'a> {
    pub fn new(client: &'a dyn PriceClient, route: HistoryRoute) -> Self {
        Self { client, route }
    }

    pub async fn load(
        &self,
        tickers: &[String],
        lookback: Lookback,
        cancel: &CancelToken,
    ) -> Result<Vec<TickerHistory>, LoadCancelled> {
        let mut out = Vec::with_capacity(tickers.len());
        let mut failures = 0usize;

        for ticker in tickers {
            if cancel.is_cancelled() {
                return Err(LoadCancelled);
            }

            let result = tokio::select! {
                r = self.load_one(ticker, lookback) => r,
                _ = cancel.cancelled() => return Err(LoadCancelled),
            };

            let outcome = match result {
                Ok((stats, series)) => HistoryOutcome::Loaded {
                    stats,
                    points: series.len(),
                    range: series.date_range(),
                },
                Err(err) => {
                    failures += 1;
                    let reason = format!("{err:#}");
                    tracing::warn!(
                        %ticker,
                        api_route = self.route.api_route,
                        days = lookback.days(),
                        error = %reason,
                        "price history unavailable; skipping ticker"
                    );
                    HistoryOutcome::Unavailable { reason }
                }
            };
            out.push(TickerHistory {
                ticker: ticker.clone(),
                outcome,
            });
        }

        tracing::info!(
            api_route = self.route.api_route,
            days = lookback.days(),
            tickers = tickers.len(),
            failures,
            "price history loaded"
        );
        Ok(out)
    }

    async fn load_one(&self, ticker: &str, lookback: Lookback) -> Result<(SeriesStats, PriceSeries)> {
        let id = match self.route.resolution {
            IdResolution::Direct => ticker.to_lowercase(),
            IdResolution::ScrapeAttribute {
                site_route,
                attribute,
            } => self
                .client
                .resolve_id(ticker, site_route, attribute)
                .await
                .with_context(|| format!("resolving {attribute} for {ticker}"))?,
        };

        let series = self
            .client
            .fetch_history(self.route.api_route, &id, lookback)
            .await?;
        let stats = SeriesStats::from_series(&series)?;
        Ok((stats, series))
    }
}
