//! Options chain browser with a server-side trade suggestion and paper trades.

use std::sync::Arc;

use async_trait::async_trait;
use client_core::{DashboardApi, Derived, FetchController, FetchError};
use shared::{
    domain::{OptionSide, Ticker, TradeSide},
    protocol::{
        MessageResponse, OptionContract, OptionTradeRequest, OptionsChain, OptionsSuggestion,
        Portfolio,
    },
};
use tracing::warn;

use crate::{
    events::{Notice, PageError},
    format,
    pages::Page,
};

/// Each contract covers 100 shares.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;
pub const SUGGESTION_UNAVAILABLE: &str = "Error fetching suggestion.";
pub const INVALID_QUANTITY: &str = "Please enter a valid quantity.";
pub const ZERO_PRICE: &str = "Cannot trade with $0.00 price. Market may be closed or illiquid.";
pub const UNKNOWN_CONTRACT: &str = "Select a contract from the loaded chain.";

pub fn estimated_cost(price: f64, quantity: i64) -> f64 {
    price * quantity as f64 * CONTRACT_MULTIPLIER
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainRow {
    pub contract: OptionContract,
    pub in_the_money: bool,
    pub at_the_money: bool,
}

/// Sorts by strike, highest first, and flags in-the-money contracts plus the
/// single row whose strike sits closest to the stock price.
pub fn chain_rows(
    contracts: &[OptionContract],
    stock_price: Option<f64>,
    side: OptionSide,
) -> Vec<ChainRow> {
    let mut sorted = contracts.to_vec();
    sorted.sort_by(|a, b| b.strike.total_cmp(&a.strike));

    let atm_index = stock_price.and_then(|price| {
        sorted
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.strike - price)
                    .abs()
                    .total_cmp(&(b.strike - price).abs())
            })
            .map(|(idx, _)| idx)
    });

    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, contract)| {
            let in_the_money = stock_price.is_some_and(|price| match side {
                OptionSide::Calls => contract.strike < price,
                OptionSide::Puts => contract.strike > price,
            });
            ChainRow {
                contract,
                in_the_money,
                at_the_money: atm_index == Some(idx),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainView {
    pub stock_price: Option<f64>,
    pub calls: Vec<ChainRow>,
    pub puts: Vec<ChainRow>,
}

fn build_chain_view(chain: &OptionsChain) -> ChainView {
    ChainView {
        stock_price: chain.stock_price,
        calls: chain_rows(&chain.calls, chain.stock_price, OptionSide::Calls),
        puts: chain_rows(&chain.puts, chain.stock_price, OptionSide::Puts),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeTicket {
    pub side: TradeSide,
    pub request: OptionTradeRequest,
    pub estimated_cost: f64,
}

/// Buys fill at the ask, sells at the bid.
pub fn trade_ticket(
    side: TradeSide,
    contract: &OptionContract,
    quantity: &str,
) -> Result<TradeTicket, String> {
    let quantity = quantity
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| INVALID_QUANTITY.to_string())?;
    let price = match side {
        TradeSide::Buy => contract.ask,
        TradeSide::Sell => contract.bid,
    }
    .unwrap_or(0.0);
    if price <= 0.0 || !price.is_finite() {
        return Err(ZERO_PRICE.to_string());
    }
    Ok(TradeTicket {
        side,
        request: OptionTradeRequest {
            contract_symbol: contract.contract_symbol.clone(),
            quantity,
            price,
        },
        estimated_cost: estimated_cost(price, quantity),
    })
}

pub struct OptionsPage {
    expirations: FetchController<Ticker, Vec<String>>,
    chain: FetchController<(Ticker, String), OptionsChain>,
    chain_view: Derived<ChainView>,
    suggestion: FetchController<Ticker, OptionsSuggestion>,
    owned: FetchController<(), Portfolio>,
    trade: FetchController<TradeTicket, MessageResponse>,
    trade_pending: bool,
    expirations_seen: Option<u64>,
    side: OptionSide,
    notice: Option<Notice>,
}

impl OptionsPage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let expirations_api = Arc::clone(&api);
        let expirations = FetchController::new("option-expirations", move |ticker: Ticker| {
            let api = Arc::clone(&expirations_api);
            async move { api.option_expirations(&ticker).await }
        });

        let chain_api = Arc::clone(&api);
        let chain = FetchController::new("options-chain", move |(ticker, date): (Ticker, String)| {
            let api = Arc::clone(&chain_api);
            async move { api.options_chain(&ticker, &date).await }
        });

        let suggestion_api = Arc::clone(&api);
        let suggestion = FetchController::new("options-suggestion", move |ticker: Ticker| {
            let api = Arc::clone(&suggestion_api);
            async move {
                let suggestion = match api.options_suggestion(&ticker).await {
                    Ok(suggestion) => suggestion,
                    Err(FetchError::Http { message, .. }) => OptionsSuggestion::hold(message),
                    Err(err) => {
                        warn!(%ticker, error = %err, "options suggestion unavailable");
                        OptionsSuggestion::hold(SUGGESTION_UNAVAILABLE)
                    }
                };
                Ok::<_, FetchError>(suggestion)
            }
        });

        let owned_api = Arc::clone(&api);
        let owned = FetchController::new("options-positions", move |()| {
            let api = Arc::clone(&owned_api);
            async move { api.portfolio().await }
        })
        .retain_data_while_loading();

        let trade = FetchController::new("option-trade", move |ticket: TradeTicket| {
            let api = Arc::clone(&api);
            async move { api.trade_option(ticket.side, &ticket.request).await }
        });

        Self {
            expirations,
            chain,
            chain_view: Derived::new(),
            suggestion,
            owned,
            trade,
            trade_pending: false,
            expirations_seen: None,
            side: OptionSide::Calls,
            notice: None,
        }
    }

    /// Loads expirations (then the nearest chain), the suggestion and the
    /// owned contracts for `raw`.
    pub fn search(&mut self, raw: &str) -> bool {
        let ticker = match Ticker::parse(raw) {
            Ok(ticker) => ticker,
            Err(err) => {
                self.expirations.reject(err.to_string());
                return false;
            }
        };
        self.notice = None;
        self.chain.reset();
        self.expirations.trigger(ticker.clone());
        self.suggestion.trigger(ticker);
        self.owned.trigger(());
        true
    }

    pub fn select_expiration(&mut self, date: &str) -> bool {
        let Some(ticker) = self.ticker().cloned() else {
            return false;
        };
        self.chain.trigger((ticker, date.trim().to_string()));
        true
    }

    pub fn set_side(&mut self, side: OptionSide) {
        self.side = side;
    }

    pub fn ticker(&self) -> Option<&Ticker> {
        self.expirations.last_key()
    }

    pub fn expirations(&self) -> &[String] {
        self.expirations.data().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn selected_expiration(&self) -> Option<&str> {
        self.chain.last_key().map(|(_, date)| date.as_str())
    }

    pub fn chain(&self) -> Option<&ChainView> {
        self.chain.data().and(self.chain_view.value())
    }

    pub fn suggestion(&self) -> Option<&OptionsSuggestion> {
        self.suggestion.data()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn find_contract(&self, symbol: &str) -> Option<&OptionContract> {
        let chain = self.chain.data()?;
        chain
            .calls
            .iter()
            .chain(chain.puts.iter())
            .find(|c| c.contract_symbol.eq_ignore_ascii_case(symbol.trim()))
    }

    /// Validates against the loaded chain and sends the order. Returns the
    /// ticket that was sent.
    pub fn trade(
        &mut self,
        side: TradeSide,
        contract_symbol: &str,
        quantity: &str,
    ) -> Option<TradeTicket> {
        let ticket = match self.find_contract(contract_symbol) {
            Some(contract) => trade_ticket(side, contract, quantity),
            None => Err(UNKNOWN_CONTRACT.to_string()),
        };
        match ticket {
            Ok(ticket) => {
                self.notice = None;
                self.trade.trigger(ticket.clone());
                self.trade_pending = true;
                Some(ticket)
            }
            Err(message) => {
                self.notice = Some(Notice::Error(message));
                None
            }
        }
    }

    fn sync(&mut self) -> bool {
        let mut changed = self.chain_view.refresh(self.chain.state(), build_chain_view);

        let version = self.expirations.state().version;
        if self.expirations.state().is_success() && self.expirations_seen != Some(version) {
            self.expirations_seen = Some(version);
            let first = self.expirations().first().cloned();
            if let (Some(date), Some(ticker)) = (first, self.ticker().cloned()) {
                self.chain.trigger((ticker, date));
            }
            changed = true;
        }

        if self.trade_pending && !self.trade.state().is_loading() {
            self.trade_pending = false;
            self.notice = match (self.trade.data(), self.trade.failure()) {
                (_, Some(err)) => Some(Notice::Error(err.user_message())),
                (Some(response), None) => Some(Notice::Success(response.message.clone())),
                (None, None) => None,
            };
            self.owned.trigger(());
            changed = true;
        }
        changed
    }

    fn render_suggestion(&self, lines: &mut Vec<String>) {
        if self.suggestion.state().is_loading() {
            lines.push("Suggestion: analysing...".to_string());
            return;
        }
        let Some(suggestion) = self.suggestion() else {
            return;
        };
        if suggestion.is_hold() {
            let reason = if suggestion.reason.is_empty() {
                "No strong signal found. Hold."
            } else {
                suggestion.reason.as_str()
            };
            lines.push(format!("Suggestion: Hold. {reason}"));
            return;
        }
        lines.push(format!(
            "Suggestion: {} (confidence {:?})",
            suggestion.suggestion, suggestion.confidence
        ));
        if !suggestion.reason.is_empty() {
            lines.push(format!("  {}", suggestion.reason));
        }
        if let Some(contract) = &suggestion.contract {
            lines.push(format!(
                "  {} strike {} exp {} ask {}",
                contract.contract_symbol,
                format::opt_money(contract.strike_price),
                contract.expiration_date.as_deref().unwrap_or(format::NOT_AVAILABLE),
                format::opt_money(contract.ask)
            ));
        }
        if let Some(targets) = &suggestion.targets {
            for (label, text) in [
                ("Stop loss", &targets.stop_loss),
                ("Take profit", &targets.take_profit),
            ] {
                if let Some(text) = text.as_deref().filter(|t| !t.trim().is_empty()) {
                    lines.push(format!("  {label}: {}", text.trim()));
                }
            }
        }
    }

    fn render_chain(&self, view: &ChainView, lines: &mut Vec<String>) {
        let rows = match self.side {
            OptionSide::Calls => &view.calls,
            OptionSide::Puts => &view.puts,
        };
        if rows.is_empty() {
            lines.push("No contracts for this expiration.".to_string());
            return;
        }
        let table_rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                let c = &row.contract;
                let marker = match (row.at_the_money, row.in_the_money) {
                    (true, true) => "ATM ITM",
                    (true, false) => "ATM",
                    (false, true) => "ITM",
                    (false, false) => "",
                };
                vec![
                    format::money(c.strike),
                    format::opt_fixed(c.last_price, 2),
                    format::opt_fixed(c.bid, 2),
                    format::opt_fixed(c.ask, 2),
                    format::opt_fixed(c.volume, 0),
                    format::opt_fixed(c.open_interest, 0),
                    format::opt_fixed(c.implied_volatility.map(|iv| iv * 100.0), 2),
                    marker.to_string(),
                    c.contract_symbol.clone(),
                ]
            })
            .collect();
        lines.extend(format::table(
            &["Strike", "Last", "Bid", "Ask", "Vol", "OI", "IV", "", "Contract"],
            &table_rows,
        ));
    }

    fn render_owned(&self, lines: &mut Vec<String>) {
        let (Some(ticker), Some(portfolio)) = (self.ticker(), self.owned.data()) else {
            return;
        };
        let owned: Vec<Vec<String>> = portfolio
            .options_positions
            .iter()
            .filter(|p| p.ticker.starts_with(ticker.as_str()))
            .map(|p| {
                vec![
                    p.ticker.clone(),
                    p.quantity.to_string(),
                    format::money(p.avg_cost),
                ]
            })
            .collect();
        if owned.is_empty() {
            return;
        }
        lines.push(String::new());
        lines.push(format!("Your {ticker} contracts"));
        lines.extend(format::table(&["Contract", "Qty", "Avg Cost"], &owned));
    }
}

#[async_trait]
impl Page for OptionsPage {
    fn title(&self) -> &'static str {
        "Options"
    }

    fn refresh(&mut self) {
        if let Some(key) = self.chain.last_key().cloned() {
            self.chain.trigger(key);
        }
        self.owned.trigger(());
    }

    fn pump(&mut self) -> bool {
        let applied = self.expirations.pump()
            | self.chain.pump()
            | self.suggestion.pump()
            | self.owned.pump()
            | self.trade.pump();
        self.sync() || applied
    }

    fn is_loading(&self) -> bool {
        self.expirations.state().is_loading()
            || self.chain.state().is_loading()
            || self.suggestion.state().is_loading()
            || self.owned.state().is_loading()
            || self.trade.state().is_loading()
    }

    async fn changed(&mut self) {
        tokio::select! {
            _ = self.expirations.changed() => {}
            _ = self.chain.changed() => {}
            _ = self.suggestion.changed() => {}
            _ = self.owned.changed() => {}
            _ = self.trade.changed() => {}
        }
        self.pump();
    }

    fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(notice) = &self.notice {
            lines.push(notice.render());
        }
        if self.expirations.state().is_loading() {
            lines.push("Loading expirations...".to_string());
            return lines;
        }
        if let Some(err) = self.expirations.failure() {
            lines.push(PageError::from_fetch(err).render());
            return lines;
        }
        let Some(ticker) = self.ticker() else {
            lines.push("Enter a ticker to load its options chain.".to_string());
            return lines;
        };

        self.render_suggestion(&mut lines);
        lines.push(String::new());

        if self.expirations().is_empty() {
            lines.push(format!("No options found for {ticker}."));
            return lines;
        }
        let date = self.selected_expiration().unwrap_or(format::NOT_AVAILABLE);
        if self.chain.state().is_loading() {
            lines.push(format!("Loading {ticker} chain for {date}..."));
        } else if let Some(err) = self.chain.failure() {
            lines.push(PageError::from_fetch(err).render());
        } else if let Some(view) = self.chain() {
            let side = match self.side {
                OptionSide::Calls => "Calls",
                OptionSide::Puts => "Puts",
            };
            lines.push(format!(
                "{ticker} {side} expiring {date}  (stock {})",
                format::opt_money(view.stock_price)
            ));
            lines.push(format!("Expirations: {}", self.expirations().join(", ")));
            self.render_chain(view, &mut lines);
        }
        self.render_owned(&mut lines);
        lines
    }
}

#[cfg(test)]
#[path = "../tests/options_tests.rs"]
mod tests;
