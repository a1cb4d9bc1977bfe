use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{AlertCondition, AlertId, Confidence, Ticker, TriggeredAlertId};

/// Numeric field the backend replaces with a placeholder string ("N/A") when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Number(f64),
    Text(String),
}

impl Metric {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Metric::Number(v) => Some(*v),
            Metric::Text(raw) => raw.trim().parse().ok(),
        }
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Text("N/A".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    pub symbol: String,
    #[serde(default)]
    pub company_name: String,
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
    #[serde(default)]
    pub market_cap: Metric,
    #[serde(default)]
    pub pe_ratio: Metric,
    #[serde(default)]
    pub week52_high: f64,
    #[serde(default)]
    pub week52_low: f64,
}

const CHART_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl ChartPoint {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.date, CHART_DATE_FORMAT).ok()
    }

    /// Calendar day of the bar, or the raw date text when it does not parse.
    pub fn day_label(&self) -> String {
        self.timestamp()
            .map(|ts| ts.date().to_string())
            .unwrap_or_else(|| self.date.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub shares: i64,
    pub avg_cost: f64,
    pub current_price: f64,
    #[serde(default)]
    pub daily_pl: f64,
    #[serde(default)]
    pub total_pl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPosition {
    /// Contract symbol, e.g. `AAPL250117C00150000`.
    pub ticker: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub avg_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub options_positions: Vec<OptionPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub period: String,
    pub start_date: String,
    pub end_date: String,
    pub end_value: f64,
    pub wealth_generated: f64,
    pub return_cumulative_pct: f64,
    pub return_annualized_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioHistory {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub summary: Option<HistorySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedClose {
    pub date: String,
    pub predicted_close: f64,
}

/// Accepts both the detailed prediction payload and the compact
/// `{ticker, last_close, predicted_next_close}` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(alias = "ticker")]
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    /// Trading day of `recent_close`.
    #[serde(default)]
    pub recent_date: Option<String>,
    #[serde(alias = "last_close")]
    pub recent_close: f64,
    #[serde(alias = "predicted_next_close")]
    pub recent_predicted: f64,
    #[serde(default)]
    pub predictions: Vec<PredictedClose>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPeriod {
    pub start_date: String,
    pub end_date: String,
    pub days: u32,
}

/// Error and direction-hit metrics of one model over the test period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub mape: f64,
    pub r_squared: f64,
    pub directional_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    #[serde(default)]
    pub predictions: Vec<f64>,
    pub metrics: ModelMetrics,
}

/// Back-tested trading of the best model's signals against buy-and-hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingReturns {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub buy_hold_return: f64,
    pub outperformance: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub num_trades: u32,
    #[serde(default)]
    pub portfolio_values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub ticker: String,
    pub test_period: TestPeriod,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub actuals: Vec<f64>,
    pub models: BTreeMap<String, ModelEvaluation>,
    #[serde(default)]
    pub returns: Option<TradingReturns>,
    pub best_model: String,
}

impl Evaluation {
    pub fn model(&self, name: &str) -> Option<&ModelEvaluation> {
        self.models.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionContract {
    pub contract_symbol: String,
    pub strike: f64,
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsChain {
    #[serde(default)]
    pub stock_price: Option<f64>,
    #[serde(default)]
    pub calls: Vec<OptionContract>,
    #[serde(default)]
    pub puts: Vec<OptionContract>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedContract {
    pub contract_symbol: String,
    #[serde(default)]
    pub strike_price: Option<f64>,
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub underlying_price: Option<f64>,
}

/// Exit guidance as sentences, e.g. "Consider selling if premium drops to ~$1.25".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionTargets {
    #[serde(default)]
    pub stop_loss: Option<String>,
    #[serde(default)]
    pub take_profit: Option<String>,
}

pub const SUGGESTION_HOLD: &str = "Hold";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsSuggestion {
    /// "Buy Call", "Buy Put" or "Hold".
    pub suggestion: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub contract: Option<SuggestedContract>,
    #[serde(default)]
    pub targets: Option<SuggestionTargets>,
}

impl OptionsSuggestion {
    pub fn hold(reason: impl Into<String>) -> Self {
        Self {
            suggestion: SUGGESTION_HOLD.to_string(),
            reason: reason.into(),
            confidence: Confidence::Low,
            contract: None,
            targets: None,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.suggestion == SUGGESTION_HOLD
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: AlertId,
    pub ticker: String,
    pub condition: AlertCondition,
    pub target_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAlert {
    pub id: TriggeredAlertId,
    #[serde(default)]
    pub ticker: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRef {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    #[serde(alias = "from_crypto")]
    pub from_currency: CurrencyRef,
    pub to_currency: CurrencyRef,
    pub exchange_rate: f64,
    #[serde(default)]
    pub bid_price: Option<f64>,
    #[serde(default)]
    pub ask_price: Option<f64>,
    #[serde(default)]
    pub last_refreshed: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, alias = "icon")]
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommodityInfo {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "Other".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityHistoryPoint {
    pub date: String,
    pub value: f64,
}

impl CommodityHistoryPoint {
    pub fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityPrice {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    pub current_price: f64,
    #[serde(default)]
    pub previous_price: Option<f64>,
    #[serde(default)]
    pub price_change: f64,
    #[serde(default)]
    pub price_change_percent: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub history: Vec<CommodityHistoryPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Company overview as delivered by the backend (string-valued, PascalCase keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Fundamentals {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub market_capitalization: Option<String>,
    #[serde(default, rename = "PERatio")]
    pub pe_ratio: Option<String>,
    #[serde(default, rename = "ForwardPE")]
    pub forward_pe: Option<String>,
    #[serde(default, rename = "PEGRatio")]
    pub peg_ratio: Option<String>,
    #[serde(default, rename = "EPS")]
    pub eps: Option<String>,
    #[serde(default)]
    pub beta: Option<String>,
    #[serde(default, rename = "RevenueTTM")]
    pub revenue_ttm: Option<String>,
    #[serde(default)]
    pub profit_margin: Option<String>,
    #[serde(default, rename = "ReturnOnEquityTTM")]
    pub return_on_equity_ttm: Option<String>,
    #[serde(default)]
    pub dividend_yield: Option<String>,
    #[serde(default, rename = "52WeekHigh")]
    pub week_52_high: Option<String>,
    #[serde(default, rename = "52WeekLow")]
    pub week_52_low: Option<String>,
    #[serde(default, rename = "50DayMovingAverage")]
    pub day_50_moving_average: Option<String>,
    #[serde(default, rename = "200DayMovingAverage")]
    pub day_200_moving_average: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTradeRequest {
    pub ticker: Ticker,
    pub shares: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTradeRequest {
    pub contract_symbol: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAlertRequest {
    pub ticker: Ticker,
    pub condition: AlertCondition,
    pub target_price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}
