use anyhow::{bail, Context, Result};
use carteira_core::cancel::CancelToken;
use carteira_core::domain::instrument::{Instrument, InstrumentKind, TRACKED};
use carteira_core::history::{
    HistoryLoader, HistoryOutcome, LoadCancelled, Lookback, PriceClient, TickerHistory,
};
use carteira_core::present::{
    render_modal, render_summary, summarize, HistoryModal, ModalEvent, Overlay, WindowCards,
};
use carteira_core::table::reader::{wait_for_table, PageSource, PollOptions, TableLoad};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Everything one overlay pass needs, shared by the per-table tasks.
#[derive(Clone)]
pub struct OverlayRun {
    pub source: Arc<dyn PageSource>,
    /// `None` disables history fetches; cards are then rendered as unavailable.
    pub prices: Option<Arc<dyn PriceClient>>,
    pub poll: PollOptions,
    pub lookback: Lookback,
}

/// Build the overlay of every selected table, one task per table.
///
/// A table that is missing, empty or never finishes loading is skipped. The result
/// follows the order of `TRACKED`, whatever order the tasks finish in.
pub async fn build_overlays(
    run: &OverlayRun,
    kinds: &[InstrumentKind],
    cancel: &CancelToken,
) -> Result<Vec<Overlay>> {
    let mut tasks = JoinSet::new();
    for (order, instrument) in TRACKED.iter().enumerate() {
        if !kinds.is_empty() && !kinds.contains(&instrument.kind) {
            continue;
        }
        let run = run.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let res = overlay_for(&run, instrument, &cancel).await;
            (order, instrument.kind, res)
        });
    }

    let mut built = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (order, kind, res) = joined.context("overlay task panicked")?;
        match res {
            Ok(Some(overlay)) => built.push((order, overlay)),
            Ok(None) => {}
            Err(err) if cancel.is_cancelled() => {
                tracing::debug!(table_id = kind.table_id(), error = %format!("{err:#}"), "overlay abandoned");
            }
            Err(err) => {
                tracing::error!(table_id = kind.table_id(), error = %format!("{err:#}"), "overlay failed; table skipped");
            }
        }
    }

    if cancel.is_cancelled() {
        bail!("overlay run cancelled");
    }

    built.sort_by_key(|(order, _)| *order);
    Ok(built.into_iter().map(|(_, overlay)| overlay).collect())
}

async fn overlay_for(
    run: &OverlayRun,
    instrument: &Instrument,
    cancel: &CancelToken,
) -> Result<Option<Overlay>> {
    let table_id = instrument.kind.table_id();

    let table = match wait_for_table(run.source.as_ref(), table_id, run.poll, cancel).await? {
        TableLoad::Ready(table) => table,
        TableLoad::NotFound => return Ok(None),
        TableLoad::Empty => {
            tracing::info!(table_id, "table has no rows; skipped");
            return Ok(None);
        }
    };

    let figures = summarize(&table, instrument.fields);
    let summary = render_summary(table_id, &figures);

    let tickers = match table.tickers() {
        Ok(tickers) => tickers,
        Err(err) => {
            tracing::warn!(table_id, error = %err, "tickers unreadable; no history cards");
            Vec::new()
        }
    };

    // The preselected window loads first, then the others through the selector.
    let mut modal = HistoryModal::new(table_id, run.lookback);
    let mut others = Lookback::ALL.into_iter().filter(|l| *l != run.lookback);
    let mut windows = Vec::with_capacity(Lookback::ALL.len());
    let mut event = modal.toggle();
    loop {
        let (lookback, load) = match event {
            ModalEvent::Opened { lookback, cancel: load }
            | ModalEvent::Reload { lookback, cancel: load } => (lookback, load),
            ModalEvent::Closed | ModalEvent::Unchanged => break,
        };
        let histories = tokio::select! {
            res = load_histories(run, instrument.kind, &tickers, lookback, &load) => res?,
            _ = cancel.cancelled() => {
                modal.toggle();
                return Err(LoadCancelled.into());
            }
        };
        modal.finish_load();
        windows.push(WindowCards { lookback, histories });

        event = match others.next() {
            Some(next) => modal.select_window(next),
            None => break,
        };
    }
    modal.toggle();
    windows.sort_by_key(|w| Lookback::ALL.iter().position(|l| *l == w.lookback));

    tracing::info!(
        table_id,
        rows = table.row_count(),
        windows = windows.len(),
        "overlay ready"
    );
    Ok(Some(Overlay {
        table_id: table_id.to_string(),
        summary,
        modal: render_modal(table_id, run.lookback, &windows),
    }))
}

async fn load_histories(
    run: &OverlayRun,
    kind: InstrumentKind,
    tickers: &[String],
    lookback: Lookback,
    cancel: &CancelToken,
) -> Result<Vec<TickerHistory>, LoadCancelled> {
    let (Some(prices), Some(route)) = (run.prices.as_deref(), kind.history_route()) else {
        let reason = if run.prices.is_none() {
            "histórico desativado"
        } else {
            "sem histórico para esta classe"
        };
        return Ok(unavailable(tickers, reason));
    };

    HistoryLoader::new(prices, route)
        .load(tickers, lookback, cancel)
        .await
}

fn unavailable(tickers: &[String], reason: &str) -> Vec<TickerHistory> {
    tickers
        .iter()
        .map(|ticker| TickerHistory {
            ticker: ticker.clone(),
            outcome: HistoryOutcome::Unavailable {
                reason: reason.to_string(),
            },
        })
        .collect()
}
