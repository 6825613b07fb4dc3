//! pt-BR number formatting for the overlay text.

const NBSP: char = '\u{a0}';

/// `1234.5` -> `1.234,50`
pub fn format_number(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if is_negative(value) { "-" } else { "" };
    format!("{sign}{grouped},{frac}")
}

/// `-15.0` -> `-R$ 15,00` (non-breaking space after the symbol).
pub fn format_brl(value: f64) -> String {
    let body = format_number(value.abs());
    let sign = if is_negative(value) { "-" } else { "" };
    format!("{sign}R${NBSP}{body}")
}

/// Percentage units in, two decimals with a decimal comma out: `7.5` -> `7,50%`.
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value).replace('.', ",")
}

/// Negative once rounded to cents, so `-0.001` prints without a sign.
fn is_negative(value: f64) -> bool {
    value < 0.0 && (value.abs() * 100.0).round() > 0.0
}
