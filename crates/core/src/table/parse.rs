/// How a column's cell text becomes a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    /// `R$ 1.234,56`
    Currency,
    /// `12,34%`, kept in percentage units.
    Percent,
    /// Decimal comma only; dots are left alone.
    Plain,
}

/// Parse cell text per the page's conventions. Blank text reads as zero, the way the
/// page's own numeric coercion treats an empty cell.
pub fn parse_number(text: &str, format: NumberFormat) -> Option<f64> {
    let normalized = match format {
        NumberFormat::Currency => text
            .replace('.', "")
            .replace(',', ".")
            .replace("R$", "")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect(),
        NumberFormat::Percent => text.replace('.', "").replace(',', ".").replace('%', ""),
        NumberFormat::Plain => text.replace(',', "."),
    };

    let t = normalized.trim_matches(|c: char| c.is_whitespace());
    if t.is_empty() {
        return Some(0.0);
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}
