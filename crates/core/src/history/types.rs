use crate::domain::price::{PricePoint, PriceSeries};
use anyhow::Context;
use serde::Deserialize;

/// Body of the chart endpoint. Both shapes show up in the wild.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceHistoryResponse {
    Wrapped { real: Vec<PricePoint> },
    Bare(Vec<PricePoint>),
}

impl PriceHistoryResponse {
    pub fn into_series(self) -> PriceSeries {
        match self {
            PriceHistoryResponse::Wrapped { real } => PriceSeries::new(real),
            PriceHistoryResponse::Bare(points) => PriceSeries::new(points),
        }
    }
}

pub fn parse_price_history(text: &str) -> anyhow::Result<PriceSeries> {
    let parsed = serde_json::from_str::<PriceHistoryResponse>(text)
        .with_context(|| format!("price history is not a point array or {{real: [...]}}: {}", snippet(text)))?;
    Ok(parsed.into_series())
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(120) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}
