use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use client_core::{
    debounce::AUTOCOMPLETE_DELAY, DashboardApi, Debouncer, Derived, FetchController, FetchError,
    RequestState,
};
use shared::{
    domain::Ticker,
    protocol::{StockQuote, SymbolMatch},
};

use crate::{
    events::PageError,
    format,
    pages::Page,
};

pub const NOT_FOUND_HINT: &str = "Ticker not found. Try \"AAPL\", \"GOOGL\", or \"TSLA\".";

pub struct SearchPage {
    quote: FetchController<Ticker, StockQuote>,
    card: Derived<Vec<String>>,
}

impl SearchPage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let quote = FetchController::new("search", move |ticker: Ticker| {
            let api = Arc::clone(&api);
            async move { api.stock(&ticker).await }
        });
        Self {
            quote,
            card: Derived::new(),
        }
    }

    /// Returns `false` when the input was rejected without a request.
    pub fn search(&mut self, raw: &str) -> bool {
        match Ticker::parse(raw) {
            Ok(ticker) => {
                self.quote.trigger(ticker);
                true
            }
            Err(err) => {
                self.quote.reject(err.to_string());
                false
            }
        }
    }

    pub fn state(&self) -> &RequestState<StockQuote> {
        self.quote.state()
    }

    pub fn error(&self) -> Option<PageError> {
        self.quote
            .failure()
            .map(|err| PageError::with_fallback(err, NOT_FOUND_HINT))
    }

    fn sync(&mut self) -> bool {
        self.card.refresh(self.quote.state(), quote_card)
    }
}

pub fn quote_card(quote: &StockQuote) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({})", quote.company_name, quote.symbol),
        format!(
            "{}  {}",
            format::money(quote.price),
            format::change(quote.change, quote.change_percent)
        ),
    ];
    lines.extend(format::key_values(&[
        ("Market Cap", format::metric(&quote.market_cap)),
        ("P/E Ratio", format::metric(&quote.pe_ratio)),
        ("52 Week High", format::money(quote.week52_high)),
        ("52 Week Low", format::money(quote.week52_low)),
    ]));
    lines
}

#[async_trait]
impl Page for SearchPage {
    fn title(&self) -> &'static str {
        "Stock Ticker Search"
    }

    fn refresh(&mut self) {
        self.quote.retry();
    }

    fn pump(&mut self) -> bool {
        let applied = self.quote.pump();
        self.sync() || applied
    }

    fn is_loading(&self) -> bool {
        self.quote.state().is_loading()
    }

    async fn changed(&mut self) {
        self.quote.changed().await;
        self.pump();
    }

    fn render(&self) -> Vec<String> {
        let state = self.quote.state();
        if state.is_loading() {
            let symbol = self.quote.last_key().map(Ticker::as_str).unwrap_or("");
            return vec![format!("Searching {symbol}...")];
        }
        if let Some(err) = self.error() {
            return vec![err.message().to_string()];
        }
        match self.card.value() {
            Some(card) => card.clone(),
            None => vec!["Enter a stock symbol to get the latest data.".to_string()],
        }
    }
}

pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_SUGGESTIONS: usize = 8;

/// Debounced symbol lookup. Failures are logged by the controller and show up
/// as an empty suggestion list.
pub struct Autocomplete {
    debouncer: Debouncer<String>,
    lookup: FetchController<String, Vec<SymbolMatch>>,
}

impl Autocomplete {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self::with_delay(api, AUTOCOMPLETE_DELAY)
    }

    pub fn with_delay(api: Arc<dyn DashboardApi>, delay: Duration) -> Self {
        let lookup = FetchController::new("autocomplete", move |query: String| {
            let api = Arc::clone(&api);
            async move {
                let mut matches = api.search_symbols(&query).await?;
                matches.truncate(MAX_SUGGESTIONS);
                Ok::<_, FetchError>(matches)
            }
        });
        Self {
            debouncer: Debouncer::new(delay),
            lookup,
        }
    }

    pub fn input(&mut self, text: &str) {
        let query = text.trim().to_uppercase();
        if query.chars().count() < MIN_QUERY_LEN {
            self.debouncer.clear();
            self.lookup.reset();
        } else {
            self.debouncer.push(query);
        }
    }

    pub fn suggestions(&self) -> &[SymbolMatch] {
        if !self.lookup.state().is_success() {
            return &[];
        }
        self.lookup.data().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[async_trait]
impl Page for Autocomplete {
    fn title(&self) -> &'static str {
        "Symbol Suggestions"
    }

    fn refresh(&mut self) {
        self.lookup.retry();
    }

    fn pump(&mut self) -> bool {
        self.lookup.pump()
    }

    fn is_loading(&self) -> bool {
        self.debouncer.is_pending() || self.lookup.state().is_loading()
    }

    async fn changed(&mut self) {
        tokio::select! {
            query = self.debouncer.settled() => {
                self.lookup.trigger(query);
            }
            _ = self.lookup.changed() => {}
        }
    }

    fn render(&self) -> Vec<String> {
        self.suggestions()
            .iter()
            .map(|m| match &m.name {
                Some(name) => format!("{:<8}  {name}", m.symbol),
                None => m.symbol.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../tests/search_tests.rs"]
mod tests;
