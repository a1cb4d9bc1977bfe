//! Text formatting shared by the page renderers.

use shared::protocol::Metric;

pub const NOT_AVAILABLE: &str = "N/A";

pub fn fixed(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{value:.decimals$}")
    } else {
        NOT_AVAILABLE.to_string()
    }
}

pub fn opt_fixed(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| fixed(v, decimals))
}

/// `$1,234.56`, `-$12.30`.
pub fn money(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = format!("{:.2}", value.abs());
    let (whole, fraction) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    format!("{sign}${}.{fraction}", group_thousands(whole))
}

pub fn opt_money(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), money)
}

pub fn signed(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    if value >= 0.0 {
        format!("+{value:.2}")
    } else {
        format!("{value:.2}")
    }
}

pub fn signed_money(value: f64) -> String {
    if value >= 0.0 {
        format!("+{}", money(value))
    } else {
        money(value)
    }
}

pub fn percent(value: f64) -> String {
    format!("{}%", fixed(value, 2))
}

pub fn signed_percent(value: f64) -> String {
    format!("{}%", signed(value))
}

/// `+2.75 (+1.62%)`
pub fn change(change: f64, change_percent: f64) -> String {
    format!("{} ({})", signed(change), signed_percent(change_percent))
}

pub fn metric(value: &Metric) -> String {
    match value {
        Metric::Number(v) => fixed(*v, 2),
        Metric::Text(text) if text.trim().is_empty() => NOT_AVAILABLE.to_string(),
        Metric::Text(text) => text.clone(),
    }
}

/// `2.81T`, `512.30B`, `12.00M`, `4.50K`.
pub fn abbreviate(value: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    UNITS
        .iter()
        .find(|(scale, _)| value.abs() >= *scale)
        .map_or_else(
            || fixed(value, 2),
            |(scale, suffix)| format!("{:.2}{suffix}", value / scale),
        )
}

/// Backend strings such as `"None"`, `"-"` or `""` all mean missing.
pub fn text_field(value: Option<&str>) -> String {
    match value.map(str::trim) {
        None | Some("") | Some("None") | Some("-") => NOT_AVAILABLE.to_string(),
        Some(text) => text.to_string(),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Left-aligned columns separated by two spaces.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            match widths.get_mut(idx) {
                Some(current) => *current = (*current).max(width),
                None => widths.push(width),
            }
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| format!("{cell:<width$}", width = widths[idx]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(line(headers.to_vec()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(line(row.iter().map(String::as_str).collect()));
    }
    lines
}

/// `Label ........ value` rows with labels padded to a common width.
pub fn key_values(rows: &[(&str, String)]) -> Vec<String> {
    let width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    rows.iter()
        .map(|(label, value)| format!("{label:<width$}  {value}"))
        .collect()
}
