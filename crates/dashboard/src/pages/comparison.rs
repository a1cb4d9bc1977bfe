use std::sync::Arc;

use async_trait::async_trait;
use client_core::{DashboardApi, Derived, FetchController, FetchError};
use shared::{
    domain::Ticker,
    protocol::{Metric, StockQuote},
};

use crate::{
    events::PageError,
    format,
    pages::Page,
};

type Pair = (StockQuote, StockQuote);

pub struct ComparisonPage {
    quotes: FetchController<(Ticker, Ticker), Pair>,
    rows: Derived<Vec<Vec<String>>>,
}

impl ComparisonPage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let quotes = FetchController::new("compare", move |(first, second): (Ticker, Ticker)| {
            let api = Arc::clone(&api);
            async move {
                let (a, b) = futures::future::join(api.stock(&first), api.stock(&second)).await;
                let a = a.map_err(|err| name_failure(&first, err))?;
                let b = b.map_err(|err| name_failure(&second, err))?;
                Ok::<_, FetchError>((a, b))
            }
        });
        Self {
            quotes,
            rows: Derived::new(),
        }
    }

    pub fn compare(&mut self, first: &str, second: &str) -> bool {
        if first.trim().is_empty() || second.trim().is_empty() {
            self.quotes.reject("Please enter both stock symbols");
            return false;
        }
        let pair = Ticker::parse(first).and_then(|a| Ticker::parse(second).map(|b| (a, b)));
        match pair {
            Ok((a, b)) if a == b => {
                self.quotes.reject("Please enter two different stock symbols");
                false
            }
            Ok(pair) => {
                self.quotes.trigger(pair);
                true
            }
            Err(err) => {
                self.quotes.reject(err.to_string());
                false
            }
        }
    }

    pub fn quotes(&self) -> Option<&Pair> {
        self.quotes.data()
    }

    pub fn error(&self) -> Option<PageError> {
        self.quotes.failure().map(PageError::from_fetch)
    }
}

fn name_failure(ticker: &Ticker, err: FetchError) -> FetchError {
    match err {
        FetchError::Http { status, code, .. } => FetchError::Http {
            status,
            code,
            message: format!("Failed to fetch {ticker}: Stock not found"),
        },
        FetchError::Decode(detail) => FetchError::Decode(format!("{ticker}: {detail}")),
        other => other,
    }
}

/// Position of the current price inside the 52-week range, in percent.
pub fn range_position(quote: &StockQuote) -> Option<f64> {
    let span = quote.week52_high - quote.week52_low;
    (span > 0.0).then(|| (quote.price - quote.week52_low) / span * 100.0)
}

fn range_label(quote: &StockQuote) -> String {
    range_position(quote).map_or_else(|| format::NOT_AVAILABLE.to_string(), |p| format!("{p:.0}%"))
}

fn difference(a: Option<f64>, b: Option<f64>) -> String {
    match (a, b) {
        (Some(a), Some(b)) => {
            let diff = a - b;
            let pct = if b != 0.0 {
                format::fixed(diff / b * 100.0, 2)
            } else {
                format::NOT_AVAILABLE.to_string()
            };
            format!("{} ({pct}%)", format::signed(diff))
        }
        _ => format::NOT_AVAILABLE.to_string(),
    }
}

fn numeric(metric: &Metric) -> Option<f64> {
    match metric {
        Metric::Number(v) => Some(*v),
        Metric::Text(_) => None,
    }
}

pub fn comparison_rows((a, b): &Pair) -> Vec<Vec<String>> {
    let row = |label: &str, left: String, right: String, diff: String| {
        vec![label.to_string(), left, right, diff]
    };
    vec![
        row(
            "Current Price",
            format::money(a.price),
            format::money(b.price),
            difference(Some(a.price), Some(b.price)),
        ),
        row(
            "Price Change",
            format::signed(a.change),
            format::signed(b.change),
            difference(Some(a.change), Some(b.change)),
        ),
        row(
            "Change %",
            format::signed_percent(a.change_percent),
            format::signed_percent(b.change_percent),
            difference(Some(a.change_percent), Some(b.change_percent)),
        ),
        row(
            "Market Cap",
            format::metric(&a.market_cap),
            format::metric(&b.market_cap),
            difference(numeric(&a.market_cap), numeric(&b.market_cap)),
        ),
        row(
            "P/E Ratio",
            format::metric(&a.pe_ratio),
            format::metric(&b.pe_ratio),
            difference(numeric(&a.pe_ratio), numeric(&b.pe_ratio)),
        ),
        row(
            "52W High",
            format::money(a.week52_high),
            format::money(b.week52_high),
            difference(Some(a.week52_high), Some(b.week52_high)),
        ),
        row(
            "52W Low",
            format::money(a.week52_low),
            format::money(b.week52_low),
            difference(Some(a.week52_low), Some(b.week52_low)),
        ),
        row(
            "52W Range",
            range_label(a),
            range_label(b),
            format::NOT_AVAILABLE.to_string(),
        ),
    ]
}

#[async_trait]
impl Page for ComparisonPage {
    fn title(&self) -> &'static str {
        "Stock Comparison"
    }

    fn refresh(&mut self) {
        self.quotes.retry();
    }

    fn pump(&mut self) -> bool {
        let applied = self.quotes.pump();
        self.rows.refresh(self.quotes.state(), comparison_rows) || applied
    }

    fn is_loading(&self) -> bool {
        self.quotes.state().is_loading()
    }

    async fn changed(&mut self) {
        self.quotes.changed().await;
        self.pump();
    }

    fn render(&self) -> Vec<String> {
        if self.quotes.state().is_loading() {
            return vec!["Comparing...".to_string()];
        }
        if let Some(err) = self.error() {
            return vec![err.render()];
        }
        let (Some((a, b)), Some(rows)) = (self.quotes(), self.rows.value()) else {
            return vec!["Enter two stock symbols to compare.".to_string()];
        };
        let mut lines = vec![format!(
            "{} ({}) vs {} ({})",
            a.company_name, a.symbol, b.company_name, b.symbol
        )];
        lines.extend(format::table(
            &["Metric", a.symbol.as_str(), b.symbol.as_str(), "Difference"],
            rows,
        ));
        lines
    }
}

#[cfg(test)]
#[path = "../tests/comparison_tests.rs"]
mod tests;
