use std::sync::Arc;

use async_trait::async_trait;
use client_core::{DashboardApi, Derived, FetchController};
use shared::{domain::Ticker, protocol::Fundamentals};

use crate::{
    events::PageError,
    format,
    pages::Page,
};

const DESCRIPTION_LIMIT: usize = 280;

fn large_amount(raw: Option<&str>) -> String {
    match raw.and_then(|v| v.trim().parse::<f64>().ok()) {
        Some(value) => format!("${}", format::abbreviate(value)),
        None => format::text_field(raw),
    }
}

/// Ratios the backend sends as fractions (`"0.2531"`) read as percentages.
fn ratio_percent(raw: Option<&str>) -> String {
    match raw.and_then(|v| v.trim().parse::<f64>().ok()) {
        Some(value) => format::percent(value * 100.0),
        None => format::text_field(raw),
    }
}

fn price_field(raw: Option<&str>) -> String {
    match raw.and_then(|v| v.trim().parse::<f64>().ok()) {
        Some(value) => format::money(value),
        None => format::text_field(raw),
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}...", cut.trim_end())
}

pub fn key_metrics(f: &Fundamentals) -> Vec<String> {
    let text = |v: &Option<String>| format::text_field(v.as_deref());
    let mut lines = vec![match &f.name {
        Some(name) => format!("{name} ({})", f.symbol),
        None => f.symbol.clone(),
    }];
    lines.extend(format::key_values(&[
        ("Exchange", text(&f.exchange)),
        ("Sector", text(&f.sector)),
        ("Industry", text(&f.industry)),
        ("Market Cap", large_amount(f.market_capitalization.as_deref())),
        ("P/E Ratio", text(&f.pe_ratio)),
        ("Forward P/E", text(&f.forward_pe)),
        ("PEG Ratio", text(&f.peg_ratio)),
        ("EPS", text(&f.eps)),
        ("Beta", text(&f.beta)),
        ("Revenue (TTM)", large_amount(f.revenue_ttm.as_deref())),
        ("Profit Margin", ratio_percent(f.profit_margin.as_deref())),
        ("Return on Equity", ratio_percent(f.return_on_equity_ttm.as_deref())),
        ("Dividend Yield", ratio_percent(f.dividend_yield.as_deref())),
        ("52 Week High", price_field(f.week_52_high.as_deref())),
        ("52 Week Low", price_field(f.week_52_low.as_deref())),
        ("50 Day MA", price_field(f.day_50_moving_average.as_deref())),
        ("200 Day MA", price_field(f.day_200_moving_average.as_deref())),
    ]));
    if let Some(description) = f.description.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(String::new());
        lines.push(truncate(description.trim(), DESCRIPTION_LIMIT));
    }
    lines
}

pub struct FundamentalsPage {
    overview: FetchController<Ticker, Fundamentals>,
    metrics: Derived<Vec<String>>,
}

impl FundamentalsPage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let overview = FetchController::new("fundamentals", move |ticker: Ticker| {
            let api = Arc::clone(&api);
            async move { api.fundamentals(&ticker).await }
        });
        Self {
            overview,
            metrics: Derived::new(),
        }
    }

    pub fn load(&mut self, raw: &str) -> bool {
        match Ticker::parse(raw) {
            Ok(ticker) => {
                self.overview.trigger(ticker);
                true
            }
            Err(err) => {
                self.overview.reject(err.to_string());
                false
            }
        }
    }

    pub fn fundamentals(&self) -> Option<&Fundamentals> {
        self.overview.data()
    }
}

#[async_trait]
impl Page for FundamentalsPage {
    fn title(&self) -> &'static str {
        "Fundamentals"
    }

    fn refresh(&mut self) {
        self.overview.retry();
    }

    fn pump(&mut self) -> bool {
        let applied = self.overview.pump();
        self.metrics.refresh(self.overview.state(), key_metrics) || applied
    }

    fn is_loading(&self) -> bool {
        self.overview.state().is_loading()
    }

    async fn changed(&mut self) {
        self.overview.changed().await;
        self.pump();
    }

    fn render(&self) -> Vec<String> {
        if self.is_loading() {
            return vec!["Loading fundamentals...".to_string()];
        }
        if let Some(err) = self.overview.failure() {
            return vec![PageError::from_fetch(err).render()];
        }
        self.metrics
            .value()
            .cloned()
            .unwrap_or_else(|| vec!["Enter a stock ticker to see its fundamentals.".to_string()])
    }
}

#[cfg(test)]
#[path = "../tests/fundamentals_tests.rs"]
mod tests;
