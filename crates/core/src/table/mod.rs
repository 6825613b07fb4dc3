pub mod parse;
pub mod reader;

use crate::html::{self, Element};
use parse::{parse_number, NumberFormat};
use std::fmt;

/// Columns the portfolio tables carry, located by header label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Ticker,
    Amount,
    CurrentPrice,
    AveragePrice,
    DividendYield,
    YieldOnCost,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Ticker => "Ativo",
            Field::Amount => "Quantidade",
            Field::CurrentPrice => "Preço Atual",
            Field::AveragePrice => "Preço Médio",
            Field::DividendYield => "DY",
            Field::YieldOnCost => "Yield On Cost",
        }
    }

    /// `None` for the ticker column, which is read as text.
    pub fn number_format(self) -> Option<NumberFormat> {
        match self {
            Field::Ticker => None,
            Field::Amount => Some(NumberFormat::Plain),
            Field::CurrentPrice | Field::AveragePrice => Some(NumberFormat::Currency),
            Field::DividendYield | Field::YieldOnCost => Some(NumberFormat::Percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableError {
    MissingColumn(&'static str),
    MissingCell { column: &'static str, row: usize },
    MissingTickerLabel { row: usize },
    Unparseable { column: &'static str, row: usize, text: String },
    NoRows,
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::MissingColumn(label) => write!(f, "column {label:?} not present in header"),
            TableError::MissingCell { column, row } => {
                write!(f, "row {row} has no cell for column {column:?}")
            }
            TableError::MissingTickerLabel { row } => {
                write!(f, "row {row} has no ticker label element")
            }
            TableError::Unparseable { column, row, text } => {
                write!(f, "row {row} column {column:?}: cannot parse {text:?}")
            }
            TableError::NoRows => write!(f, "table has no data rows"),
        }
    }
}

impl std::error::Error for TableError {}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    name_label: Option<String>,
}

/// Parsed header and data rows of one portfolio table, taken from a single page
/// snapshot. Row storage stays private; read it through the column accessors.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    table_id: String,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TableSnapshot {
    /// Build from the table element: the first `<tr>` is the header row, every later
    /// `<tr>` is a data row.
    pub fn from_element(table_id: &str, table: &Element<'_>) -> Self {
        let trs = table.descendants("tr");
        let mut iter = trs.iter();

        let headers: Vec<String> = iter
            .next()
            .map(|tr| tr.descendants("th").iter().map(|th| th.text()).collect())
            .unwrap_or_default();

        let rows: Vec<Vec<Cell>> = iter
            .map(|tr| {
                tr.descendants("td")
                    .iter()
                    .map(|td| Cell {
                        text: td.text(),
                        name_label: td.find_by_class("name").map(|n| n.text()),
                    })
                    .collect()
            })
            .collect();

        Self {
            table_id: table_id.to_string(),
            headers,
            rows,
        }
    }

    pub fn from_html(table_id: &str, markup: &str) -> Option<Self> {
        html::find_by_id(markup, table_id).map(|t| Self::from_element(table_id, &t))
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Index of the first header containing `label`.
    pub fn column(&self, label: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.contains(label))
    }

    pub fn tickers(&self) -> Result<Vec<String>, TableError> {
        let label = Field::Ticker.label();
        let column = self.column(label).ok_or(TableError::MissingColumn(label))?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                let cell = cells
                    .get(column)
                    .ok_or(TableError::MissingCell { column: label, row })?;
                cell.name_label
                    .clone()
                    .ok_or(TableError::MissingTickerLabel { row })
            })
            .collect()
    }

    pub fn amounts(&self) -> Result<Vec<f64>, TableError> {
        self.numbers(Field::Amount)
    }

    pub fn current_prices(&self) -> Result<Vec<f64>, TableError> {
        self.numbers(Field::CurrentPrice)
    }

    pub fn average_prices(&self) -> Result<Vec<f64>, TableError> {
        self.numbers(Field::AveragePrice)
    }

    pub fn dividend_yields(&self) -> Result<Vec<f64>, TableError> {
        self.numbers(Field::DividendYield)
    }

    pub fn yields_on_cost(&self) -> Result<Vec<f64>, TableError> {
        self.numbers(Field::YieldOnCost)
    }

    /// Numeric column values parsed with the field's format. The ticker field has no
    /// numeric form and reads as a missing column.
    pub fn numbers(&self, field: Field) -> Result<Vec<f64>, TableError> {
        let label = field.label();
        let format = field.number_format().ok_or(TableError::MissingColumn(label))?;
        let column = self.column(label).ok_or(TableError::MissingColumn(label))?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                let cell = cells
                    .get(column)
                    .ok_or(TableError::MissingCell { column: label, row })?;
                parse_number(&cell.text, format).ok_or_else(|| TableError::Unparseable {
                    column: label,
                    row,
                    text: cell.text.clone(),
                })
            })
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::portfolio_table;
    use super::*;

    fn snapshot() -> TableSnapshot {
        let markup = portfolio_table(
            "Ticker-tickers",
            &[
                ("ITSA4", "10", "R$ 10,00", "R$ 12,00", "5,00%", "6,00%"),
                ("BBAS3", "5", "R$ 9,00", "R$ 8,00", "7,50%", "6,67%"),
            ],
        );
        TableSnapshot::from_html("Ticker-tickers", &markup).unwrap()
    }

    #[test]
    fn reads_header_and_rows() {
        let s = snapshot();
        assert_eq!(s.row_count(), 2);
        assert_eq!(s.headers()[0], "Ativo");
        assert_eq!(s.tickers().unwrap(), vec!["ITSA4", "BBAS3"]);
        assert_eq!(s.amounts().unwrap(), vec![10.0, 5.0]);
        assert_eq!(s.current_prices().unwrap(), vec![12.0, 8.0]);
        assert_eq!(s.average_prices().unwrap(), vec![10.0, 9.0]);
        assert_eq!(s.dividend_yields().unwrap(), vec![5.0, 7.5]);
    }

    #[test]
    fn column_lookup_is_by_label_substring_first_match() {
        let s = snapshot();
        assert_eq!(s.column("Preço"), Some(2));
        assert_eq!(s.column("Atual"), Some(3));
        assert_eq!(s.column("Rentabilidade"), None);
    }

    #[test]
    fn missing_header_reports_unavailable() {
        let markup = r#"<table id="Crypto-tickers"><tr><th>Ativo</th><th>Quantidade</th></tr>
            <tr><td><span class="name">BTC</span></td><td>0,5</td></tr></table>"#;
        let s = TableSnapshot::from_html("Crypto-tickers", markup).unwrap();
        assert_eq!(s.amounts().unwrap(), vec![0.5]);
        assert_eq!(
            s.dividend_yields(),
            Err(TableError::MissingColumn("DY"))
        );
        assert_eq!(
            s.current_prices(),
            Err(TableError::MissingColumn("Preço Atual"))
        );
    }

    #[test]
    fn ticker_comes_from_nested_label_not_cell_text() {
        let markup = r#"<table id="x"><tr><th>Ativo</th></tr>
            <tr><td><span class="name">HGLG11</span> CSHG Logística</td></tr>
            <tr><td>SEM LABEL</td></tr></table>"#;
        let s = TableSnapshot::from_html("x", markup).unwrap();
        assert_eq!(s.tickers(), Err(TableError::MissingTickerLabel { row: 1 }));
    }

    #[test]
    fn unparseable_cell_is_reported_with_position() {
        let markup = r#"<table id="x"><tr><th>Quantidade</th></tr><tr><td>muitas</td></tr></table>"#;
        let s = TableSnapshot::from_html("x", markup).unwrap();
        assert_eq!(
            s.amounts(),
            Err(TableError::Unparseable {
                column: "Quantidade",
                row: 0,
                text: "muitas".to_string()
            })
        );
    }

    #[test]
    fn short_row_reports_missing_cell() {
        let markup = r#"<table id="x"><tr><th>Ativo</th><th>Quantidade</th></tr><tr><td>A</td></tr></table>"#;
        let s = TableSnapshot::from_html("x", markup).unwrap();
        assert_eq!(
            s.amounts(),
            Err(TableError::MissingCell { column: "Quantidade", row: 0 })
        );
    }
}
