pub mod series;

pub use series::{score, Score, SeriesError, SeriesStats, Tier};

use crate::table::{TableError, TableSnapshot};

/// Unrealized gain/loss: current market value minus cost basis, over every row.
pub fn variation(table: &TableSnapshot) -> Result<f64, TableError> {
    let amounts = table.amounts()?;
    let current = table.current_prices()?;
    let average = table.average_prices()?;

    let current_value: f64 = current.iter().zip(&amounts).map(|(p, a)| p * a).sum();
    let cost_basis: f64 = average.iter().zip(&amounts).map(|(p, a)| p * a).sum();
    Ok(current_value - cost_basis)
}

pub fn dividend_yield_average(table: &TableSnapshot) -> Result<f64, TableError> {
    mean(&table.dividend_yields()?)
}

pub fn yield_on_cost_average(table: &TableSnapshot) -> Result<f64, TableError> {
    mean(&table.yields_on_cost()?)
}

fn mean(values: &[f64]) -> Result<f64, TableError> {
    if values.is_empty() {
        return Err(TableError::NoRows);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}
