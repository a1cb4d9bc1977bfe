//! Currency conversion for both fiat pairs and crypto-to-fiat pairs.

use std::sync::Arc;

use async_trait::async_trait;
use client_core::{DashboardApi, FetchController, FetchError};
use futures::future::try_join;
use shared::protocol::{CurrencyInfo, ExchangeRate};
use tracing::warn;

use crate::{
    events::PageError,
    format,
    pages::Page,
};

pub const INVALID_AMOUNT: &str = "Please enter a valid amount.";

pub const POPULAR_FOREX_PAIRS: [(&str, &str); 6] = [
    ("USD", "EUR"),
    ("USD", "GBP"),
    ("USD", "JPY"),
    ("EUR", "USD"),
    ("GBP", "USD"),
    ("USD", "CAD"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Forex,
    Crypto,
}

impl Market {
    pub fn default_pair(&self) -> (&'static str, &'static str) {
        match self {
            Market::Forex => ("USD", "EUR"),
            Market::Crypto => ("BTC", "USD"),
        }
    }

    fn rate_failure(&self) -> &'static str {
        match self {
            Market::Forex => "Could not fetch exchange rate. Please try again.",
            Market::Crypto => "Could not fetch crypto exchange rate. Please try again.",
        }
    }
}

/// What can be converted from and to. Forex uses one list for both sides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    pub sources: Vec<CurrencyInfo>,
    pub targets: Vec<CurrencyInfo>,
}

pub fn converted_amount(amount: f64, rate: &ExchangeRate) -> f64 {
    amount * rate.exchange_rate
}

fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    (!code.is_empty() && code.len() <= 10 && code.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(code)
}

pub struct ConverterPage {
    market: Market,
    catalog: FetchController<(), Catalog>,
    rate: FetchController<(String, String), ExchangeRate>,
    from: String,
    to: String,
    amount: f64,
}

impl ConverterPage {
    pub fn new(api: Arc<dyn DashboardApi>, market: Market) -> Self {
        let catalog_api = Arc::clone(&api);
        let catalog = FetchController::new("converter-catalog", move |()| {
            let api = Arc::clone(&catalog_api);
            async move {
                match market {
                    Market::Forex => {
                        let currencies = api.forex_currencies().await?;
                        Ok::<_, FetchError>(Catalog {
                            sources: currencies.clone(),
                            targets: currencies,
                        })
                    }
                    Market::Crypto => {
                        let (sources, targets) =
                            try_join(api.crypto_list(), api.crypto_currencies()).await?;
                        Ok(Catalog { sources, targets })
                    }
                }
            }
        })
        .retain_data_while_loading();

        let rate = FetchController::new("converter-rate", move |(from, to): (String, String)| {
            let api = Arc::clone(&api);
            async move {
                match market {
                    Market::Forex => api.forex_rate(&from, &to).await,
                    Market::Crypto => api.crypto_rate(&from, &to).await,
                }
            }
        })
        .retain_data_while_loading();

        let (from, to) = market.default_pair();
        Self {
            market,
            catalog,
            rate,
            from: from.to_string(),
            to: to.to_string(),
            amount: 1.0,
        }
    }

    pub fn market(&self) -> Market {
        self.market
    }

    /// Loads the catalog and converts the default pair.
    pub fn load(&mut self) {
        self.catalog.trigger(());
        self.convert();
    }

    pub fn set_pair(&mut self, from: &str, to: &str) -> bool {
        match (normalize_code(from), normalize_code(to)) {
            (Some(from), Some(to)) => {
                self.from = from;
                self.to = to;
                true
            }
            _ => {
                self.rate.reject("Please choose both currencies.");
                false
            }
        }
    }

    pub fn set_amount(&mut self, raw: &str) -> bool {
        match raw.trim().parse::<f64>() {
            Ok(amount) if amount.is_finite() && amount >= 0.0 => {
                self.amount = amount;
                true
            }
            _ => {
                self.rate.reject(INVALID_AMOUNT);
                false
            }
        }
    }

    pub fn convert(&mut self) {
        self.rate.trigger((self.from.clone(), self.to.clone()));
    }

    /// Flips the pair and converts again.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
        self.convert();
    }

    pub fn pair(&self) -> (&str, &str) {
        (&self.from, &self.to)
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn rate(&self) -> Option<&ExchangeRate> {
        self.rate.data()
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.data()
    }

    pub fn converted(&self) -> Option<f64> {
        self.rate().map(|rate| converted_amount(self.amount, rate))
    }

    pub fn error(&self) -> Option<PageError> {
        self.rate
            .failure()
            .map(|err| PageError::with_fallback(err, self.market.rate_failure()))
    }
}

#[async_trait]
impl Page for ConverterPage {
    fn title(&self) -> &'static str {
        match self.market {
            Market::Forex => "Forex Converter",
            Market::Crypto => "Crypto Converter",
        }
    }

    fn refresh(&mut self) {
        if !self.rate.state().is_loading() {
            self.convert();
        }
    }

    fn pump(&mut self) -> bool {
        let catalog_changed = self.catalog.pump();
        if catalog_changed {
            if let Some(err) = self.catalog.failure() {
                warn!(market = ?self.market, error = %err, "currency catalog unavailable");
            }
        }
        self.rate.pump() | catalog_changed
    }

    fn is_loading(&self) -> bool {
        self.catalog.state().is_loading() || self.rate.state().is_loading()
    }

    async fn changed(&mut self) {
        tokio::select! {
            _ = self.catalog.changed() => {}
            _ = self.rate.changed() => {}
        }
        self.pump();
    }

    fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(err) = self.error() {
            lines.push(err.render());
        } else if self.rate.state().is_loading() && self.rate().is_none() {
            lines.push(format!("Converting {} to {}...", self.from, self.to));
        } else if let (Some(rate), Some(converted)) = (self.rate(), self.converted()) {
            let from = &rate.from_currency;
            let to = &rate.to_currency;
            lines.push(format!(
                "{} {} = {} {}",
                format::fixed(self.amount, 2),
                from.code,
                format::fixed(converted, 2),
                to.code
            ));
            lines.push(format!(
                "1 {} = {} {}",
                from.code,
                format::fixed(rate.exchange_rate, 4),
                to.code
            ));
            let mut details = vec![
                ("From", format!("{} ({})", from.name, from.code)),
                ("To", format!("{} ({})", to.name, to.code)),
                ("Exchange rate", format::fixed(rate.exchange_rate, 6)),
            ];
            if let Some(bid) = rate.bid_price {
                details.push(("Bid", format::fixed(bid, 6)));
            }
            if let Some(ask) = rate.ask_price {
                details.push(("Ask", format::fixed(ask, 6)));
            }
            if let Some(refreshed) = &rate.last_refreshed {
                let zone = rate.timezone.as_deref().unwrap_or("");
                details.push(("Last refreshed", format!("{refreshed} {zone}").trim().to_string()));
            }
            lines.extend(format::key_values(&details));
        }

        if let Some(catalog) = self.catalog() {
            let codes = |list: &[CurrencyInfo]| {
                list.iter()
                    .map(|c| c.code.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            lines.push(String::new());
            match self.market {
                Market::Forex => {
                    lines.push(format!("Currencies: {}", codes(&catalog.sources)));
                    let popular: Vec<String> = POPULAR_FOREX_PAIRS
                        .iter()
                        .map(|(from, to)| format!("{from}->{to}"))
                        .collect();
                    lines.push(format!("Popular: {}", popular.join("  ")));
                }
                Market::Crypto => {
                    lines.push(format!("Cryptocurrencies: {}", codes(&catalog.sources)));
                    lines.push(format!("Quote currencies: {}", codes(&catalog.targets)));
                }
            }
        }
        lines
    }
}

#[cfg(test)]
#[path = "../tests/converter_tests.rs"]
mod tests;
