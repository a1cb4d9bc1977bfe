use std::sync::Arc;

use async_trait::async_trait;
use client_core::{DashboardApi, FetchController, FetchError};
use futures::future::join_all;
use shared::{
    domain::Ticker,
    protocol::{MessageResponse, StockQuote},
};
use tracing::debug;

use crate::{
    events::{Notice, PageError},
    format,
    pages::Page,
};

const LOAD_FAILED: &str = "Failed to fetch watchlist data. Is the backend server running?";
const REMOVE_FAILED: &str = "Failed to remove stock.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchlistChange {
    Add(Ticker),
    Remove(Ticker),
}

pub struct WatchlistPage {
    quotes: FetchController<(), Vec<StockQuote>>,
    change: FetchController<WatchlistChange, MessageResponse>,
    change_pending: bool,
    notice: Option<Notice>,
}

impl WatchlistPage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let quotes_api = Arc::clone(&api);
        let quotes = FetchController::new("watchlist", move |()| {
            let api = Arc::clone(&quotes_api);
            async move { load_quotes(api.as_ref()).await }
        })
        .retain_data_while_loading();

        let change = FetchController::new("watchlist-change", move |change: WatchlistChange| {
            let api = Arc::clone(&api);
            async move {
                match &change {
                    WatchlistChange::Add(ticker) => api.add_to_watchlist(ticker).await,
                    WatchlistChange::Remove(ticker) => api.remove_from_watchlist(ticker).await,
                }
            }
        });

        Self {
            quotes,
            change,
            change_pending: false,
            notice: None,
        }
    }

    pub fn load(&mut self) {
        self.quotes.trigger(());
    }

    pub fn add(&mut self, raw: &str) -> bool {
        self.submit(raw, WatchlistChange::Add)
    }

    pub fn remove(&mut self, raw: &str) -> bool {
        self.submit(raw, WatchlistChange::Remove)
    }

    pub fn quotes(&self) -> &[StockQuote] {
        self.quotes.data().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn error(&self) -> Option<PageError> {
        self.quotes
            .failure()
            .map(|err| PageError::with_fallback(err, LOAD_FAILED))
    }

    fn submit(&mut self, raw: &str, change: fn(Ticker) -> WatchlistChange) -> bool {
        match Ticker::parse(raw) {
            Ok(ticker) => {
                self.notice = None;
                self.change.trigger(change(ticker));
                self.change_pending = true;
                true
            }
            Err(err) => {
                self.notice = Some(Notice::Error(err.to_string()));
                false
            }
        }
    }

    fn sync(&mut self) -> bool {
        if !self.change_pending || self.change.state().is_loading() {
            return false;
        }
        self.change_pending = false;
        let removing = matches!(self.change.last_key(), Some(WatchlistChange::Remove(_)));
        self.notice = match (self.change.data(), self.change.failure()) {
            (_, Some(_)) if removing => Some(Notice::Error(REMOVE_FAILED.to_string())),
            (_, Some(err)) => Some(Notice::Error(err.user_message())),
            (Some(response), None) => Some(Notice::Success(response.message.clone())),
            (None, None) => None,
        };
        self.quotes.trigger(());
        true
    }
}

/// Fetches the symbol list, then every quote in parallel. Symbols whose quote
/// fails are dropped from the result.
async fn load_quotes(api: &dyn DashboardApi) -> Result<Vec<StockQuote>, FetchError> {
    let symbols = api.watchlist().await?;
    let tickers: Vec<Ticker> = symbols
        .iter()
        .filter_map(|symbol| Ticker::parse(symbol).ok())
        .collect();
    let results = join_all(tickers.iter().map(|ticker| api.stock(ticker))).await;
    Ok(tickers
        .iter()
        .zip(results)
        .filter_map(|(ticker, result)| match result {
            Ok(quote) => Some(quote),
            Err(err) => {
                debug!(%ticker, error = %err, "dropping watchlist entry");
                None
            }
        })
        .collect())
}

#[async_trait]
impl Page for WatchlistPage {
    fn title(&self) -> &'static str {
        "My Watchlist"
    }

    fn refresh(&mut self) {
        if !self.quotes.state().is_loading() {
            self.quotes.trigger(());
        }
    }

    fn pump(&mut self) -> bool {
        let applied = self.quotes.pump() | self.change.pump();
        self.sync() || applied
    }

    fn is_loading(&self) -> bool {
        self.quotes.state().is_loading() || self.change.state().is_loading()
    }

    async fn changed(&mut self) {
        tokio::select! {
            _ = self.quotes.changed() => {}
            _ = self.change.changed() => {}
        }
        self.pump();
    }

    fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(notice) = &self.notice {
            lines.push(notice.render());
        }
        if let Some(err) = self.error() {
            lines.push(err.render());
            return lines;
        }
        if self.quotes.data().is_none() && self.quotes.state().is_loading() {
            lines.push("Loading watchlist...".to_string());
            return lines;
        }
        let quotes = self.quotes();
        if quotes.is_empty() {
            lines.push("Your watchlist is empty.".to_string());
            return lines;
        }
        let rows: Vec<Vec<String>> = quotes
            .iter()
            .map(|q| {
                vec![
                    q.symbol.clone(),
                    q.company_name.clone(),
                    format::money(q.price),
                    format::change(q.change, q.change_percent),
                ]
            })
            .collect();
        lines.extend(format::table(&["Symbol", "Company", "Price", "Change"], &rows));
        lines
    }
}

#[cfg(test)]
#[path = "../tests/watchlist_tests.rs"]
mod tests;
