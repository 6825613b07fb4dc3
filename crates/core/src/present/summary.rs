use crate::domain::instrument::SummaryField;
use crate::html::escape;
use crate::present::locale::{format_brl, format_percent};
use crate::stats;
use crate::table::TableSnapshot;

pub(crate) const HISTORY_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" fill="#222222" viewBox="0 0 256 256"><path d="M136,80v43.47l36.12,21.67a8,8,0,0,1-8.24,13.72l-40-24A8,8,0,0,1,120,128V80a8,8,0,0,1,16,0Zm-8-48A95.44,95.44,0,0,0,60.08,60.15C52.81,67.51,46.35,74.59,40,82V64a8,8,0,0,0-16,0v40a8,8,0,0,0,8,8H72a8,8,0,0,0,0-16H49c7.15-8.42,14.27-16.35,22.39-24.57a80,80,0,1,1,1.66,114.75,8,8,0,1,0-11,11.64A96,96,0,1,0,128,32Z"></path></svg>"##;

/// The figures one summary strip shows. A `None` field was either not requested or
/// could not be computed from the table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryFigures {
    pub variation: Option<f64>,
    pub dividend_yield_average: Option<f64>,
    pub yield_on_cost_average: Option<f64>,
}

impl SummaryFigures {
    pub fn is_empty(&self) -> bool {
        self.variation.is_none()
            && self.dividend_yield_average.is_none()
            && self.yield_on_cost_average.is_none()
    }
}

/// Compute the requested figures. A figure whose columns are unusable is logged and
/// left out; the other figures are still shown.
pub fn summarize(table: &TableSnapshot, fields: &[SummaryField]) -> SummaryFigures {
    let wanted = |f: SummaryField| fields.contains(&f);
    let keep = |field: &str, r: Result<f64, crate::table::TableError>| match r {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(table_id = table.table_id(), field, error = %err, "summary figure unavailable");
            None
        }
    };

    SummaryFigures {
        variation: wanted(SummaryField::Variation)
            .then(|| keep("variation", stats::variation(table)))
            .flatten(),
        dividend_yield_average: wanted(SummaryField::DividendYield)
            .then(|| keep("dividend_yield_average", stats::dividend_yield_average(table)))
            .flatten(),
        yield_on_cost_average: wanted(SummaryField::YieldOnCost)
            .then(|| keep("yield_on_cost_average", stats::yield_on_cost_average(table)))
            .flatten(),
    }
}

/// Summary strip placed right after the table, with the history toggle button.
pub fn render_summary(table_id: &str, figures: &SummaryFigures) -> String {
    let id = escape(table_id);
    let mut items = String::new();

    if let Some(v) = figures.variation {
        items.push_str(&item("Variação (R$):", &format_brl(v)));
    }
    if let Some(v) = figures.dividend_yield_average {
        items.push_str(&item("DY (Média):", &format_percent(v)));
    }
    if let Some(v) = figures.yield_on_cost_average {
        items.push_str(&item("Yield On Cost (Média):", &format_percent(v)));
    }

    format!(
        r#"<div class="header" data-summary="{id}"><div class="col" style="display:flex;gap:32px;flex:1">{items}</div><button type="button" data-history-handler="{id}" title="Histórico" style="width:50px;display:grid;place-items:center;background:transparent;border:none;">{HISTORY_ICON}</button></div>"#
    )
}

fn item(label: &str, value: &str) -> String {
    format!(
        r#"<div><span class="desktop">{}</span> <strong>{}</strong></div>"#,
        escape(label),
        escape(value)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::portfolio_table;

    fn table() -> TableSnapshot {
        let markup = portfolio_table(
            "Ticker-tickers",
            &[
                ("ITSA4", "10", "R$ 10,00", "R$ 12,00", "5,00%", "6,00%"),
                ("BBAS3", "5", "R$ 9,00", "R$ 8,00", "10,00%", "8,00%"),
            ],
        );
        TableSnapshot::from_html("Ticker-tickers", &markup).unwrap()
    }

    #[test]
    fn computes_only_requested_fields() {
        let figures = summarize(&table(), &[SummaryField::Variation]);
        assert_eq!(
            figures,
            SummaryFigures {
                variation: Some(15.0),
                ..Default::default()
            }
        );
    }

    #[test]
    fn renders_fields_in_fixed_order_with_locale_formatting() {
        let figures = summarize(
            &table(),
            &[
                SummaryField::YieldOnCost,
                SummaryField::DividendYield,
                SummaryField::Variation,
            ],
        );
        let html = render_summary("Ticker-tickers", &figures);

        let var = html.find("Variação (R$):").unwrap();
        let dy = html.find("DY (Média):").unwrap();
        let yoc = html.find("Yield On Cost (Média):").unwrap();
        assert!(var < dy && dy < yoc);
        assert!(html.contains("<strong>R$\u{a0}15,00</strong>"));
        assert!(html.contains("<strong>7,50%</strong>"));
        assert!(html.contains("<strong>7,00%</strong>"));
        assert!(html.contains(r#"data-history-handler="Ticker-tickers""#));
    }

    #[test]
    fn unavailable_field_is_dropped_not_fatal() {
        let markup = r#"<table id="Crypto-tickers"><tr><th>Ativo</th><th>Quantidade</th><th>Preço Atual</th></tr>
            <tr><td><span class="name">BTC</span></td><td>1</td><td>R$ 300.000,00</td></tr></table>"#;
        let t = TableSnapshot::from_html("Crypto-tickers", markup).unwrap();
        let figures = summarize(&t, &[SummaryField::Variation]);
        assert!(figures.is_empty());
        let html = render_summary("Crypto-tickers", &figures);
        assert!(!html.contains("Variação"));
        assert!(html.contains("data-history-handler"));
    }
}
