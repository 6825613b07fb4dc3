use crate::html;
use crate::present::modal::HANDLER_SCRIPT;

/// Rendered markup for one portfolio table.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub table_id: String,
    pub summary: String,
    pub modal: String,
}

/// Insert every overlay into `page`: the summary strip right after its table, the
/// modals and the shared handler script at the end of `<body>`.
///
/// Overlays whose table is not on the page are skipped. A table that already carries
/// a summary strip is left alone, so running over an annotated page is a no-op.
pub fn inject(page: &str, overlays: &[Overlay]) -> String {
    let mut inserts: Vec<(usize, String)> = Vec::new();
    let mut trailer = String::new();

    for overlay in overlays {
        let Some(table) = html::find_by_id(page, &overlay.table_id) else {
            tracing::warn!(table_id = %overlay.table_id, "table not on page, overlay skipped");
            continue;
        };
        if already_injected(page, &overlay.table_id) {
            tracing::debug!(table_id = %overlay.table_id, "overlay already present");
            continue;
        }
        inserts.push((table.end(), overlay.summary.clone()));
        trailer.push_str(&overlay.modal);
    }

    if inserts.is_empty() {
        return page.to_string();
    }
    if !page.contains("data-history-script") {
        trailer.push_str(HANDLER_SCRIPT);
    }

    let body_end = html::find_by_tag(page, "body")
        .map(|body| body.inner_end())
        .unwrap_or(page.len());
    inserts.push((body_end, trailer));

    // Stable sort keeps summaries ahead of the trailer when offsets coincide.
    inserts.sort_by_key(|(at, _)| *at);

    let extra: usize = inserts.iter().map(|(_, s)| s.len()).sum();
    let mut out = String::with_capacity(page.len() + extra);
    let mut cursor = 0;
    for (at, markup) in inserts {
        out.push_str(&page[cursor..at]);
        out.push_str(&markup);
        cursor = at;
    }
    out.push_str(&page[cursor..]);
    out
}

fn already_injected(page: &str, table_id: &str) -> bool {
    let marker = format!(r#"data-summary="{}""#, html::escape(table_id));
    page.contains(&marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(id: &str) -> Overlay {
        Overlay {
            table_id: id.to_string(),
            summary: format!(r#"<div data-summary="{id}">S</div>"#),
            modal: format!(r#"<div data-history="{id}">M</div>"#),
        }
    }

    const PAGE: &str = r#"<html><body><h1>Carteira</h1><table id="Ticker-tickers"><tr><td>A</td></tr></table><p>entre</p><table id="Fii-tickers"><tr><td>B</td></tr></table><footer>fim</footer></body></html>"#;

    #[test]
    fn places_summaries_after_tables_and_modals_before_body_close() {
        let out = inject(PAGE, &[overlay("Ticker-tickers"), overlay("Fii-tickers")]);

        assert!(out.contains(
            r#"</table><div data-summary="Ticker-tickers">S</div><p>entre</p>"#
        ));
        assert!(out.contains(
            r#"</table><div data-summary="Fii-tickers">S</div><footer>"#
        ));
        let modals = out.find(r#"<div data-history="Ticker-tickers">"#).unwrap();
        assert!(modals > out.find("<footer>").unwrap());
        assert!(out.find(r#"<div data-history="Fii-tickers">"#).unwrap() > modals);
        assert_eq!(out.matches("data-history-script").count(), 1);
        assert!(out.ends_with("</script></body></html>"));
    }

    #[test]
    fn missing_table_is_skipped() {
        let out = inject(PAGE, &[overlay("Crypto-tickers"), overlay("Fii-tickers")]);
        assert!(!out.contains("Crypto-tickers"));
        assert!(out.contains(r#"data-summary="Fii-tickers""#));
    }

    #[test]
    fn nothing_to_place_returns_page_unchanged() {
        assert_eq!(inject(PAGE, &[overlay("Etf-tickers")]), PAGE);
        assert_eq!(inject(PAGE, &[]), PAGE);
    }

    #[test]
    fn second_pass_does_not_duplicate() {
        let once = inject(PAGE, &[overlay("Ticker-tickers")]);
        let twice = inject(&once, &[overlay("Ticker-tickers")]);
        assert_eq!(once, twice);
    }

    #[test]
    fn fragment_without_body_gets_trailer_appended() {
        let page = r#"<table id="Etf-tickers"><tr><td>C</td></tr></table>"#;
        let out = inject(page, &[overlay("Etf-tickers")]);
        assert!(out.starts_with(r#"<table id="Etf-tickers">"#));
        assert!(out.contains(r#"</table><div data-summary="Etf-tickers">S</div><div data-history="Etf-tickers">M</div><script"#));
    }
}
