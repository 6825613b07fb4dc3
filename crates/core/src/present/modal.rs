use crate::cancel::CancelToken;
use crate::history::{HistoryOutcome, Lookback, TickerHistory};
use crate::html::escape;
use crate::present::locale::{format_brl, format_number};
use crate::stats::Tier;

const CLOSE_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" fill="#222222" viewBox="0 0 256 256"><path d="M205.66,194.34a8,8,0,0,1-11.32,11.32L128,139.31,61.66,205.66a8,8,0,0,1-11.32-11.32L116.69,128,50.34,61.66A8,8,0,0,1,61.66,50.34L128,116.69l66.34-66.35a8,8,0,0,1,11.32,11.32L139.31,128Z"></path></svg>"##;

pub fn tier_color(tier: Tier) -> &'static str {
    match tier {
        Tier::Low => "#e74c3c",
        Tier::Neutral => "#f39c12",
        Tier::High => "#27ae60",
    }
}

fn tier_name(tier: Tier) -> &'static str {
    match tier {
        Tier::Low => "low",
        Tier::Neutral => "neutral",
        Tier::High => "high",
    }
}

/// Cards for one lookback window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowCards {
    pub lookback: Lookback,
    pub histories: Vec<TickerHistory>,
}

/// Hidden history modal for one table: window selector, close button and one block
/// of cards per loaded window. Only the `selected` block is displayed; the handler
/// script swaps blocks when the selector changes.
pub fn render_modal(table_id: &str, selected: Lookback, windows: &[WindowCards]) -> String {
    let id = escape(table_id);
    let options: String = windows
        .iter()
        .map(|w| {
            let mark = if w.lookback == selected { " selected" } else { "" };
            format!(r#"<option value="{days}"{mark}>{days} dias</option>"#, days = w.lookback.days())
        })
        .collect();
    let blocks: String = windows
        .iter()
        .map(|w| {
            let display = if w.lookback == selected { "grid" } else { "none" };
            let cards: String = w.histories.iter().map(render_card).collect();
            format!(
                r#"<div class="history-cards-container" data-history-days="{days}" style="display:{display};grid-template-columns:repeat(4,1fr);margin-top:2rem;gap:30px">{cards}</div>"#,
                days = w.lookback.days(),
            )
        })
        .collect();

    format!(
        r#"<div data-history="{id}" style="position:fixed;z-index:9999999999;background:rgba(0,0,0,0.6);inset:0;display:none;place-items:center"><div style="background:#ffffff;padding:2rem;width:100%;max-width:1280px;height:100%;max-height:720px;position:relative;overflow:auto;"><button type="button" data-history-handler="{id}" style="background:transparent;border:none;position:absolute;right:1.5rem;top:1.5rem;">{CLOSE_ICON}</button><div style="margin-top:1rem;"><div style="display:flex;gap:16px;align-items:center"><h2 style="color:#222222;">Histórico</h2><select data-history-window="{id}">{options}</select></div>{blocks}</div></div></div>"#
    )
}

pub fn render_card(history: &TickerHistory) -> String {
    let ticker = escape(&history.ticker);
    match &history.outcome {
        HistoryOutcome::Loaded {
            stats,
            points,
            range,
        } => {
            let score = stats.score();
            let tier = score.tier();
            let span = match range {
                Some((first, last)) => format!(
                    "<dt>Período</dt><dd>{} – {}</dd>",
                    first.format("%d/%m/%y"),
                    last.format("%d/%m/%y")
                ),
                None => String::new(),
            };
            format!(
                r#"<div class="history-card" data-ticker="{ticker}" data-tier="{tier_name}" style="border-radius:10px;border:1px solid #ccc;padding:20px;"><div style="display:flex;justify-content:space-between;align-items:center"><h3>{ticker}</h3><strong>{current}</strong></div><dl style="display:grid;grid-template-columns:auto 1fr;gap:4px 12px;margin-top:12px"><dt>Mínimo</dt><dd>{min}</dd><dt>Máximo</dt><dd>{max}</dd><dt>Média</dt><dd>{mean}</dd><dt>Volatilidade</dt><dd>{vol}</dd><dt>Cotações</dt><dd>{points}</dd>{span}</dl><strong class="history-score" style="color:{color}">Pontos: {score}</strong></div>"#,
                tier_name = tier_name(tier),
                current = escape(&format_brl(stats.current)),
                min = escape(&format_brl(stats.min)),
                max = escape(&format_brl(stats.max)),
                mean = escape(&format_brl(stats.mean)),
                vol = format_number(stats.volatility),
                color = tier_color(tier),
            )
        }
        HistoryOutcome::Unavailable { reason } => format!(
            r#"<div class="history-card" data-ticker="{ticker}" data-unavailable="true" title="{reason}" style="border-radius:10px;border:1px solid #ccc;padding:20px;opacity:0.6;"><div style="display:flex;justify-content:space-between;align-items:center"><h3>{ticker}</h3><strong>R$&nbsp;00,00</strong></div><p>Histórico indisponível</p></div>"#,
            reason = escape(reason),
        ),
    }
}

/// Inline handler wiring shared by every overlay on the page: toggle buttons show or
/// hide their modal, and the window selector shows the matching block of cards.
pub const HANDLER_SCRIPT: &str = r#"<script data-history-script>(function(){document.querySelectorAll("[data-history-handler]").forEach(function(b){b.addEventListener("click",function(){var id=b.getAttribute("data-history-handler");var m=document.querySelector('[data-history="'+id+'"]');if(!m)return;m.style.display=getComputedStyle(m).display==="grid"?"none":"grid";});});document.querySelectorAll("[data-history-window]").forEach(function(s){s.addEventListener("change",function(){var m=document.querySelector('[data-history="'+s.getAttribute("data-history-window")+'"]');if(!m)return;m.querySelectorAll("[data-history-days]").forEach(function(c){c.style.display=c.getAttribute("data-history-days")===s.value?"grid":"none";});});});})();</script>"#;

#[derive(Debug, Clone)]
pub enum ModalEvent {
    /// Modal became visible; load `lookback` under `cancel`.
    Opened { lookback: Lookback, cancel: CancelToken },
    /// Window changed while open; the previous load was cancelled.
    Reload { lookback: Lookback, cancel: CancelToken },
    Closed,
    Unchanged,
}

/// Open/closed state of one table's history modal. Every load it starts gets its
/// own token, and closing or switching windows cancels the load in flight.
#[derive(Debug)]
pub struct HistoryModal {
    table_id: String,
    open: bool,
    lookback: Lookback,
    in_flight: Option<CancelToken>,
}

impl HistoryModal {
    pub fn new(table_id: impl Into<String>, lookback: Lookback) -> Self {
        Self {
            table_id: table_id.into(),
            open: false,
            lookback,
            in_flight: None,
        }
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn lookback(&self) -> Lookback {
        self.lookback
    }

    pub fn toggle(&mut self) -> ModalEvent {
        if self.open {
            self.open = false;
            self.cancel_in_flight();
            ModalEvent::Closed
        } else {
            self.open = true;
            ModalEvent::Opened {
                lookback: self.lookback,
                cancel: self.start_load(),
            }
        }
    }

    pub fn select_window(&mut self, lookback: Lookback) -> ModalEvent {
        if lookback == self.lookback {
            return ModalEvent::Unchanged;
        }
        self.lookback = lookback;
        if !self.open {
            return ModalEvent::Unchanged;
        }
        ModalEvent::Reload {
            lookback,
            cancel: self.start_load(),
        }
    }

    /// The load started by the last `Opened`/`Reload` has finished.
    pub fn finish_load(&mut self) {
        self.in_flight = None;
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    fn start_load(&mut self) -> CancelToken {
        self.cancel_in_flight();
        let token = CancelToken::new();
        self.in_flight = Some(token.clone());
        token
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.in_flight.take() {
            tracing::debug!(table_id = %self.table_id, "cancelling history load");
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PriceSeries;
    use crate::stats::SeriesStats;

    fn loaded(ticker: &str, prices: &[f64]) -> TickerHistory {
        TickerHistory {
            ticker: ticker.to_string(),
            outcome: HistoryOutcome::Loaded {
                stats: SeriesStats::from_series(&PriceSeries::from_prices(prices)).unwrap(),
                points: prices.len(),
                range: None,
            },
        }
    }

    fn all_windows(histories: Vec<TickerHistory>) -> Vec<WindowCards> {
        Lookback::ALL
            .into_iter()
            .map(|lookback| WindowCards {
                lookback,
                histories: histories.clone(),
            })
            .collect()
    }

    #[test]
    fn modal_lists_cards_and_marks_selected_window() {
        let histories = vec![
            loaded("ITSA4", &[11.0, 11.0, 12.0, 11.0, 8.0]),
            TickerHistory {
                ticker: "GONE3".to_string(),
                outcome: HistoryOutcome::Unavailable {
                    reason: "HTTP 404 <not found>".to_string(),
                },
            },
        ];
        let html = render_modal("Ticker-tickers", Lookback::Days90, &all_windows(histories));

        assert!(html.contains(r#"data-history="Ticker-tickers""#));
        assert!(html.contains("display:none"));
        assert!(html.contains(r#"<option value="90" selected>90 dias</option>"#));
        assert!(html.contains(r#"<option value="365">365 dias</option>"#));
        assert!(html.contains(r#"data-ticker="ITSA4" data-tier="high""#));
        assert!(html.contains("Pontos: +3"));
        assert!(html.contains(r#"data-ticker="GONE3" data-unavailable="true""#));
        assert!(html.contains("HTTP 404 &lt;not found&gt;"));
    }

    #[test]
    fn one_block_per_window_and_only_the_selected_one_shows() {
        let html = render_modal(
            "Fii-tickers",
            Lookback::Days180,
            &all_windows(vec![loaded("HGLG11", &[150.0, 160.0])]),
        );

        assert_eq!(html.matches("history-cards-container").count(), 4);
        assert_eq!(html.matches(r#"data-ticker="HGLG11""#).count(), 4);
        for days in [30, 90, 365] {
            assert!(html.contains(&format!(r#"data-history-days="{days}" style="display:none;"#)));
        }
        assert!(html.contains(r#"data-history-days="180" style="display:grid;"#));
    }

    #[test]
    fn selector_change_swaps_card_blocks() {
        let (_, on_change) = HANDLER_SCRIPT.split_once(r#"addEventListener("change""#).unwrap();
        assert!(on_change.contains(r#"querySelectorAll("[data-history-days]")"#));
        assert!(on_change.contains(r#"getAttribute("data-history-days")===s.value?"grid":"none""#));
        assert!(!HANDLER_SCRIPT.contains("CustomEvent"));
    }

    #[test]
    fn card_colours_follow_tier() {
        let html = render_card(&loaded("BBAS3", &[10.0, 10.0, 11.0, 10.0, 14.0]));
        assert!(html.contains(r#"data-tier="low""#));
        assert!(html.contains(tier_color(Tier::Low)));
        assert!(html.contains("Pontos: -3"));
        assert!(html.contains("<strong>R$\u{a0}14,00</strong>"));
        assert!(!html.contains("Período"));
    }

    #[test]
    fn card_shows_dated_span() {
        let day = |d| chrono::NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let mut history = loaded("ITSA4", &[10.0, 12.0]);
        if let HistoryOutcome::Loaded { range, .. } = &mut history.outcome {
            *range = Some((day(2), day(5)));
        }
        let html = render_card(&history);
        assert!(html.contains("<dt>Período</dt><dd>02/01/24 – 05/01/24</dd>"));
    }

    #[test]
    fn toggle_opens_with_fresh_token_and_close_cancels_it() {
        let mut modal = HistoryModal::new("Fii-tickers", Lookback::Days30);
        let token = match modal.toggle() {
            ModalEvent::Opened { lookback, cancel } => {
                assert_eq!(lookback, Lookback::Days30);
                cancel
            }
            other => panic!("expected open, got {other:?}"),
        };
        assert!(modal.is_open() && modal.is_loading());
        assert!(!token.is_cancelled());

        assert!(matches!(modal.toggle(), ModalEvent::Closed));
        assert!(token.is_cancelled());
        assert!(!modal.is_loading());
    }

    #[test]
    fn window_change_while_open_restarts_load() {
        let mut modal = HistoryModal::new("Ticker-tickers", Lookback::Days30);
        let first = match modal.toggle() {
            ModalEvent::Opened { cancel, .. } => cancel,
            other => panic!("expected open, got {other:?}"),
        };

        let second = match modal.select_window(Lookback::Days180) {
            ModalEvent::Reload { lookback, cancel } => {
                assert_eq!(lookback, Lookback::Days180);
                cancel
            }
            other => panic!("expected reload, got {other:?}"),
        };
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        assert!(matches!(modal.select_window(Lookback::Days180), ModalEvent::Unchanged));
        modal.finish_load();
        assert!(!modal.is_loading());
        assert!(matches!(modal.toggle(), ModalEvent::Closed));
        assert!(!second.is_cancelled());
    }

    #[test]
    fn window_change_while_closed_is_remembered() {
        let mut modal = HistoryModal::new("Ticker-tickers", Lookback::Days30);
        assert!(matches!(modal.select_window(Lookback::Days365), ModalEvent::Unchanged));
        match modal.toggle() {
            ModalEvent::Opened { lookback, .. } => assert_eq!(lookback, Lookback::Days365),
            other => panic!("expected open, got {other:?}"),
        }
    }
}
