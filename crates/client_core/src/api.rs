//! Typed access to the dashboard backend.
//!
//! Every endpoint returns JSON; any non-2xx response is surfaced as
//! [`FetchError::Http`] carrying the server's `{"error": ...}` message when present.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{
        AlertId, ChartPeriod, EvaluationWindow, HistoryPeriod, Ticker, TradeSide,
        TriggeredAlertId,
    },
    protocol::{
        ChartPoint, CommodityInfo, CommodityPrice, CreateAlertRequest, CurrencyInfo, Evaluation,
        ExchangeRate, Fundamentals, MessageResponse, NewsArticle, OptionTradeRequest,
        OptionsChain, OptionsSuggestion, Portfolio, PortfolioHistory, Prediction, PriceAlert,
        StockQuote, StockTradeRequest, SymbolMatch, TriggeredAlert,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientBuildError, FetchError};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Evaluation trains every model before answering.
pub const EVALUATION_TIMEOUT: Duration = Duration::from_secs(120);

pub type ApiResult<T> = Result<T, FetchError>;

#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn stock(&self, ticker: &Ticker) -> ApiResult<StockQuote>;
    async fn chart(&self, ticker: &Ticker, period: ChartPeriod) -> ApiResult<Vec<ChartPoint>>;
    async fn search_symbols(&self, query: &str) -> ApiResult<Vec<SymbolMatch>>;
    async fn fundamentals(&self, ticker: &Ticker) -> ApiResult<Fundamentals>;
    async fn predict(&self, ticker: &Ticker) -> ApiResult<Prediction>;
    async fn evaluate(&self, ticker: &Ticker, window: EvaluationWindow) -> ApiResult<Evaluation>;

    async fn watchlist(&self) -> ApiResult<Vec<String>>;
    async fn add_to_watchlist(&self, ticker: &Ticker) -> ApiResult<MessageResponse>;
    async fn remove_from_watchlist(&self, ticker: &Ticker) -> ApiResult<MessageResponse>;

    async fn portfolio(&self) -> ApiResult<Portfolio>;
    async fn portfolio_history(&self, period: HistoryPeriod) -> ApiResult<PortfolioHistory>;
    async fn trade_stock(
        &self,
        side: TradeSide,
        request: &StockTradeRequest,
    ) -> ApiResult<MessageResponse>;

    async fn option_expirations(&self, ticker: &Ticker) -> ApiResult<Vec<String>>;
    async fn options_chain(&self, ticker: &Ticker, date: &str) -> ApiResult<OptionsChain>;
    async fn options_suggestion(&self, ticker: &Ticker) -> ApiResult<OptionsSuggestion>;
    async fn trade_option(
        &self,
        side: TradeSide,
        request: &OptionTradeRequest,
    ) -> ApiResult<MessageResponse>;

    async fn alerts(&self) -> ApiResult<Vec<PriceAlert>>;
    async fn triggered_alerts(&self, include_all: bool) -> ApiResult<Vec<TriggeredAlert>>;
    async fn create_alert(&self, request: &CreateAlertRequest) -> ApiResult<MessageResponse>;
    async fn delete_alert(&self, id: AlertId) -> ApiResult<MessageResponse>;
    async fn dismiss_triggered_alert(&self, id: TriggeredAlertId) -> ApiResult<MessageResponse>;

    async fn forex_currencies(&self) -> ApiResult<Vec<CurrencyInfo>>;
    async fn forex_rate(&self, from: &str, to: &str) -> ApiResult<ExchangeRate>;
    async fn crypto_list(&self) -> ApiResult<Vec<CurrencyInfo>>;
    async fn crypto_currencies(&self) -> ApiResult<Vec<CurrencyInfo>>;
    async fn crypto_rate(&self, from: &str, to: &str) -> ApiResult<ExchangeRate>;

    async fn commodities(&self) -> ApiResult<Vec<CommodityInfo>>;
    async fn commodity_price(&self, code: &str) -> ApiResult<CommodityPrice>;

    async fn news(&self) -> ApiResult<Vec<NewsArticle>>;
}

#[derive(Debug, Clone)]
pub struct HttpDashboardClient {
    http: Client,
    base_url: Url,
}

impl HttpDashboardClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientBuildError> {
        let base_url = parse_base_url(base_url)?;
        let http = Client::builder()
            .user_agent("marketmind-terminal/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Validation(format!("cannot route onto '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ApiResult<RequestBuilder> {
        let url = self.url(segments)?;
        debug!(%method, %url, "sending dashboard request");
        Ok(self.http.request(method, url))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        execute(self.request(Method::GET, segments)?).await
    }

    async fn get_with_query<T, Q>(&self, segments: &[&str], query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized + Sync,
    {
        execute(self.request(Method::GET, segments)?.query(query)).await
    }

    async fn post_json<T, B>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        execute(self.request(Method::POST, segments)?.json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        execute(self.request(Method::DELETE, segments)?).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientBuildError> {
    let invalid = |reason: String| ClientBuildError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("url cannot carry a path".to_string()));
    }
    Ok(url)
}

async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> ApiResult<T> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        let err = FetchError::http(status.as_u16(), &body);
        warn!(%url, status = status.as_u16(), error = %err, "dashboard request failed");
        return Err(err);
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn trade_segment(side: TradeSide) -> &'static str {
    match side {
        TradeSide::Buy => "buy",
        TradeSide::Sell => "sell",
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardClient {
    async fn stock(&self, ticker: &Ticker) -> ApiResult<StockQuote> {
        self.get(&["stock", ticker.as_str()]).await
    }

    async fn chart(&self, ticker: &Ticker, period: ChartPeriod) -> ApiResult<Vec<ChartPoint>> {
        self.get_with_query(&["chart", ticker.as_str()], &[("period", period.as_str())])
            .await
    }

    async fn search_symbols(&self, query: &str) -> ApiResult<Vec<SymbolMatch>> {
        self.get_with_query(&["search-symbols"], &[("q", query)])
            .await
    }

    async fn fundamentals(&self, ticker: &Ticker) -> ApiResult<Fundamentals> {
        self.get(&["fundamentals", ticker.as_str()]).await
    }

    async fn predict(&self, ticker: &Ticker) -> ApiResult<Prediction> {
        self.get(&["predict", ticker.as_str()]).await
    }

    async fn evaluate(&self, ticker: &Ticker, window: EvaluationWindow) -> ApiResult<Evaluation> {
        let days = window.days().to_string();
        let request = self
            .request(Method::GET, &["evaluate", ticker.as_str()])?
            .query(&[("test_days", days.as_str())])
            .timeout(EVALUATION_TIMEOUT);
        execute(request).await
    }

    async fn watchlist(&self) -> ApiResult<Vec<String>> {
        self.get(&["watchlist"]).await
    }

    async fn add_to_watchlist(&self, ticker: &Ticker) -> ApiResult<MessageResponse> {
        execute(self.request(Method::POST, &["watchlist", ticker.as_str()])?).await
    }

    async fn remove_from_watchlist(&self, ticker: &Ticker) -> ApiResult<MessageResponse> {
        self.delete(&["watchlist", ticker.as_str()]).await
    }

    async fn portfolio(&self) -> ApiResult<Portfolio> {
        self.get(&["paper", "portfolio"]).await
    }

    async fn portfolio_history(&self, period: HistoryPeriod) -> ApiResult<PortfolioHistory> {
        self.get_with_query(&["paper", "history"], &[("period", period.as_str())])
            .await
    }

    async fn trade_stock(
        &self,
        side: TradeSide,
        request: &StockTradeRequest,
    ) -> ApiResult<MessageResponse> {
        self.post_json(&["paper", trade_segment(side)], request)
            .await
    }

    async fn option_expirations(&self, ticker: &Ticker) -> ApiResult<Vec<String>> {
        self.get(&["options", ticker.as_str()]).await
    }

    async fn options_chain(&self, ticker: &Ticker, date: &str) -> ApiResult<OptionsChain> {
        self.get_with_query(&["options", "chain", ticker.as_str()], &[("date", date)])
            .await
    }

    async fn options_suggestion(&self, ticker: &Ticker) -> ApiResult<OptionsSuggestion> {
        self.get(&["options", "suggest", ticker.as_str()]).await
    }

    async fn trade_option(
        &self,
        side: TradeSide,
        request: &OptionTradeRequest,
    ) -> ApiResult<MessageResponse> {
        self.post_json(&["paper", "options", trade_segment(side)], request)
            .await
    }

    async fn alerts(&self) -> ApiResult<Vec<PriceAlert>> {
        self.get(&["notifications"]).await
    }

    async fn triggered_alerts(&self, include_all: bool) -> ApiResult<Vec<TriggeredAlert>> {
        if include_all {
            self.get_with_query(&["notifications", "triggered"], &[("all", "true")])
                .await
        } else {
            self.get(&["notifications", "triggered"]).await
        }
    }

    async fn create_alert(&self, request: &CreateAlertRequest) -> ApiResult<MessageResponse> {
        self.post_json(&["notifications"], request).await
    }

    async fn delete_alert(&self, id: AlertId) -> ApiResult<MessageResponse> {
        self.delete(&["notifications", &id.to_string()]).await
    }

    async fn dismiss_triggered_alert(&self, id: TriggeredAlertId) -> ApiResult<MessageResponse> {
        self.delete(&["notifications", "triggered", &id.to_string()])
            .await
    }

    async fn forex_currencies(&self) -> ApiResult<Vec<CurrencyInfo>> {
        self.get(&["forex", "currencies"]).await
    }

    async fn forex_rate(&self, from: &str, to: &str) -> ApiResult<ExchangeRate> {
        self.get_with_query(&["forex", "convert"], &[("from", from), ("to", to)])
            .await
    }

    async fn crypto_list(&self) -> ApiResult<Vec<CurrencyInfo>> {
        self.get(&["crypto", "list"]).await
    }

    async fn crypto_currencies(&self) -> ApiResult<Vec<CurrencyInfo>> {
        self.get(&["crypto", "currencies"]).await
    }

    async fn crypto_rate(&self, from: &str, to: &str) -> ApiResult<ExchangeRate> {
        self.get_with_query(&["crypto", "convert"], &[("from", from), ("to", to)])
            .await
    }

    async fn commodities(&self) -> ApiResult<Vec<CommodityInfo>> {
        self.get(&["commodities", "list"]).await
    }

    async fn commodity_price(&self, code: &str) -> ApiResult<CommodityPrice> {
        self.get(&["commodities", "price", code]).await
    }

    async fn news(&self) -> ApiResult<Vec<NewsArticle>> {
        self.get(&["api", "news"]).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
