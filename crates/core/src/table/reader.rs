use crate::cancel::CancelToken;
use crate::html;
use crate::table::TableSnapshot;
use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Something that can hand out the current markup of the page being overlaid.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    fn describe(&self) -> String;

    async fn snapshot(&self) -> Result<String>;
}

/// Page markup kept on disk, re-read on every poll so an external renderer can keep
/// updating it.
#[derive(Debug, Clone)]
pub struct FilePage {
    path: PathBuf,
}

impl FilePage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl PageSource for FilePage {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn snapshot(&self) -> Result<String> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read page {}", self.path.display()))?;
        Ok(crate::net::decode(&bytes, None))
    }
}

#[derive(Debug, Clone)]
pub struct HttpPage {
    http: reqwest::Client,
    url: String,
}

impl HttpPage {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl PageSource for HttpPage {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn snapshot(&self) -> Result<String> {
        crate::net::get_text(&self.http, &self.url).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

impl From<&crate::config::Settings> for PollOptions {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            interval: settings.poll_interval,
            timeout: settings.poll_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TableLoad {
    Ready(TableSnapshot),
    NotFound,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    Timeout { table_id: String, waited: Duration },
    Cancelled { table_id: String },
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Timeout { table_id, waited } => {
                write!(f, "table #{table_id} still loading after {waited:?}")
            }
            ReadError::Cancelled { table_id } => write!(f, "wait for table #{table_id} cancelled"),
        }
    }
}

impl std::error::Error for ReadError {}

/// What one page snapshot says about a table.
#[derive(Debug)]
enum Probe {
    Missing,
    Loading,
    Loaded(TableLoad),
}

fn probe(markup: &str, table_id: &str) -> Probe {
    let Some(table) = html::find_by_id(markup, table_id) else {
        return Probe::Missing;
    };

    let processing_id = format!("{table_id}_processing");
    match html::find_by_id(markup, &processing_id) {
        Some(indicator) if indicator.is_hidden() => {}
        _ => return Probe::Loading,
    }

    if table.find_by_class("dataTables_empty").is_some() {
        return Probe::Loaded(TableLoad::Empty);
    }

    let snapshot = TableSnapshot::from_element(table_id, &table);
    if snapshot.is_empty() {
        Probe::Loaded(TableLoad::Empty)
    } else {
        Probe::Loaded(TableLoad::Ready(snapshot))
    }
}

/// Wait for a table to leave its loading state and snapshot it.
///
/// The table must exist in the first snapshot; after that the page is polled every
/// `options.interval` until the `{id}_processing` indicator is present and hidden.
/// Snapshot errors during polling are logged and retried on the next tick.
pub async fn wait_for_table(
    source: &dyn PageSource,
    table_id: &str,
    options: PollOptions,
    cancel: &CancelToken,
) -> Result<TableLoad> {
    let markup = source
        .snapshot()
        .await
        .with_context(|| format!("failed to snapshot {}", source.describe()))?;

    let mut state = probe(&markup, table_id);
    if matches!(state, Probe::Missing) {
        tracing::warn!(table_id, page = %source.describe(), "table not found");
        return Ok(TableLoad::NotFound);
    }

    let started = Instant::now();
    loop {
        if let Probe::Loaded(load) = state {
            tracing::debug!(table_id, waited = ?started.elapsed(), "table loaded");
            return Ok(load);
        }

        if cancel.is_cancelled() {
            return Err(ReadError::Cancelled {
                table_id: table_id.to_string(),
            }
            .into());
        }
        if started.elapsed() >= options.timeout {
            return Err(ReadError::Timeout {
                table_id: table_id.to_string(),
                waited: started.elapsed(),
            }
            .into());
        }

        tokio::select! {
            _ = tokio::time::sleep(options.interval) => {}
            _ = cancel.cancelled() => continue,
        }

        state = match source.snapshot().await {
            Ok(markup) => probe(&markup, table_id),
            Err(err) => {
                tracing::warn!(table_id, error = %err, "page snapshot failed; polling again");
                Probe::Loading
            }
        };
    }
}
