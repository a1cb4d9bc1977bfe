use std::sync::Arc;

use async_trait::async_trait;
use client_core::{DashboardApi, Derived, FetchController};
use shared::{
    domain::{ChartPeriod, HistoryPeriod, PlView, Ticker, TradeSide},
    protocol::{ChartPoint, MessageResponse, Portfolio, PortfolioHistory, StockTradeRequest},
};

use crate::{
    events::{Notice, PageError},
    format,
    pages::Page,
};

pub const INVALID_TRADE: &str = "Enter a valid ticker and number of shares";
pub const POSITION_CHART_PERIOD: ChartPeriod = ChartPeriod::SixMonths;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSummary {
    pub points: usize,
    pub first_date: String,
    pub last_date: String,
    pub first_close: f64,
    pub last_close: f64,
    pub high: f64,
    pub low: f64,
}

impl ChartSummary {
    pub fn change_percent(&self) -> Option<f64> {
        (self.first_close != 0.0)
            .then(|| (self.last_close - self.first_close) / self.first_close * 100.0)
    }
}

/// Bars are ordered by their parsed timestamp; unparsable dates keep their
/// position at the front.
pub fn summarize_chart(points: &[ChartPoint]) -> Option<ChartSummary> {
    let mut ordered: Vec<&ChartPoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.timestamp());
    let first = *ordered.first()?;
    let last = *ordered.last()?;
    Some(ChartSummary {
        points: points.len(),
        first_date: first.day_label(),
        last_date: last.day_label(),
        first_close: first.close,
        last_close: last.close,
        high: points.iter().map(|p| p.high).fold(f64::MIN, f64::max),
        low: points.iter().map(|p| p.low).fold(f64::MAX, f64::min),
    })
}

/// Cash plus the market value of every stock position.
pub fn equity_value(portfolio: &Portfolio) -> f64 {
    portfolio.cash
        + portfolio
            .positions
            .iter()
            .map(|p| p.shares as f64 * p.current_price)
            .sum::<f64>()
}

fn parse_trade(ticker: &str, shares: &str) -> Option<StockTradeRequest> {
    let ticker = Ticker::parse(ticker).ok()?;
    let shares = shares.trim().parse::<i64>().ok().filter(|s| *s > 0)?;
    Some(StockTradeRequest { ticker, shares })
}

pub struct PaperTradingPage {
    portfolio: FetchController<(), Portfolio>,
    trade: FetchController<(TradeSide, StockTradeRequest), MessageResponse>,
    trade_pending: bool,
    chart: FetchController<Ticker, Vec<ChartPoint>>,
    chart_summary: Derived<Option<ChartSummary>>,
    history: FetchController<HistoryPeriod, PortfolioHistory>,
    pl_view: PlView,
    notice: Option<Notice>,
}

impl PaperTradingPage {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        let portfolio_api = Arc::clone(&api);
        let portfolio = FetchController::new("portfolio", move |()| {
            let api = Arc::clone(&portfolio_api);
            async move { api.portfolio().await }
        })
        .retain_data_while_loading();

        let trade_api = Arc::clone(&api);
        let trade = FetchController::new(
            "stock-trade",
            move |(side, request): (TradeSide, StockTradeRequest)| {
                let api = Arc::clone(&trade_api);
                async move { api.trade_stock(side, &request).await }
            },
        );

        let chart_api = Arc::clone(&api);
        let chart = FetchController::new("position-chart", move |ticker: Ticker| {
            let api = Arc::clone(&chart_api);
            async move { api.chart(&ticker, POSITION_CHART_PERIOD).await }
        });

        let history = FetchController::new("portfolio-history", move |period: HistoryPeriod| {
            let api = Arc::clone(&api);
            async move { api.portfolio_history(period).await }
        });

        Self {
            portfolio,
            trade,
            trade_pending: false,
            chart,
            chart_summary: Derived::new(),
            history,
            pl_view: PlView::default(),
            notice: None,
        }
    }

    pub fn load(&mut self) {
        self.portfolio.trigger(());
    }

    pub fn trade(&mut self, side: TradeSide, ticker: &str, shares: &str) -> bool {
        let Some(request) = parse_trade(ticker, shares) else {
            self.notice = Some(Notice::Error(INVALID_TRADE.to_string()));
            return false;
        };
        self.notice = None;
        self.trade.trigger((side, request));
        self.trade_pending = true;
        true
    }

    pub fn select_position(&mut self, raw: &str) -> bool {
        match Ticker::parse(raw) {
            Ok(ticker) => {
                self.chart.trigger(ticker);
                true
            }
            Err(err) => {
                self.chart.reject(err.to_string());
                false
            }
        }
    }

    pub fn load_history(&mut self, period: HistoryPeriod) {
        self.history.trigger(period);
    }

    pub fn set_pl_view(&mut self, view: PlView) {
        self.pl_view = view;
    }

    pub fn portfolio(&self) -> Option<&Portfolio> {
        self.portfolio.data()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn chart_summary(&self) -> Option<&ChartSummary> {
        self.chart_summary.value().and_then(Option::as_ref)
    }

    fn sync(&mut self) -> bool {
        let mut changed = self
            .chart_summary
            .refresh(self.chart.state(), |points| summarize_chart(points));
        if self.trade_pending && !self.trade.state().is_loading() {
            self.trade_pending = false;
            self.notice = match (self.trade.data(), self.trade.failure()) {
                (_, Some(err)) => Some(Notice::Error(err.user_message())),
                (Some(response), None) => Some(Notice::Success(response.message.clone())),
                (None, None) => None,
            };
            self.portfolio.trigger(());
            if let Some(period) = self.history.last_key().copied() {
                self.history.trigger(period);
            }
            changed = true;
        }
        changed
    }

    fn render_positions(&self, portfolio: &Portfolio, lines: &mut Vec<String>) {
        if portfolio.positions.is_empty() {
            lines.push("No stock positions.".to_string());
        } else {
            let pl_header = match self.pl_view {
                PlView::Total => "Total P/L",
                PlView::Daily => "Daily P/L",
            };
            let rows: Vec<Vec<String>> = portfolio
                .positions
                .iter()
                .map(|p| {
                    let pl = match self.pl_view {
                        PlView::Total => p.total_pl,
                        PlView::Daily => p.daily_pl,
                    };
                    vec![
                        p.ticker.clone(),
                        p.shares.to_string(),
                        format::money(p.avg_cost),
                        format::money(p.current_price),
                        format::signed_money(pl),
                    ]
                })
                .collect();
            lines.extend(format::table(
                &["Ticker", "Shares", "Avg Cost", "Price", pl_header],
                &rows,
            ));
        }

        if !portfolio.options_positions.is_empty() {
            lines.push(String::new());
            let rows: Vec<Vec<String>> = portfolio
                .options_positions
                .iter()
                .map(|o| {
                    vec![
                        o.ticker.clone(),
                        o.quantity.to_string(),
                        format::money(o.avg_cost),
                    ]
                })
                .collect();
            lines.extend(format::table(&["Contract", "Qty", "Avg Cost"], &rows));
        }
    }

    fn render_chart(&self, lines: &mut Vec<String>) {
        let state = self.chart.state();
        let symbol = self.chart.last_key().map(Ticker::as_str).unwrap_or("");
        if state.is_loading() {
            lines.push(format!("Loading {symbol} chart..."));
        } else if let Some(err) = self.chart.failure() {
            lines.push(PageError::from_fetch(err).render());
        } else if let Some(summary) = self.chart_summary() {
            lines.push(format!(
                "{symbol} {}: {} -> {} ({}) over {} points",
                POSITION_CHART_PERIOD.as_str(),
                format::money(summary.first_close),
                format::money(summary.last_close),
                summary
                    .change_percent()
                    .map_or_else(|| format::NOT_AVAILABLE.to_string(), format::signed_percent),
                summary.points
            ));
            lines.push(format!(
                "  high {}  low {}  ({} to {})",
                format::money(summary.high),
                format::money(summary.low),
                summary.first_date,
                summary.last_date
            ));
        } else if state.is_success() {
            lines.push(format!("No chart data for {symbol}."));
        }
    }

    fn render_history(&self, lines: &mut Vec<String>) {
        if self.history.state().is_loading() {
            lines.push("Loading portfolio history...".to_string());
            return;
        }
        if let Some(err) = self.history.failure() {
            lines.push(PageError::from_fetch(err).render());
            return;
        }
        let Some(summary) = self.history.data().and_then(|h| h.summary.as_ref()) else {
            return;
        };
        lines.push(format!(
            "Performance ({}, {} to {})",
            summary.period, summary.start_date, summary.end_date
        ));
        lines.extend(format::key_values(&[
            ("End value", format::money(summary.end_value)),
            ("Wealth generated", format::signed_money(summary.wealth_generated)),
            (
                "Cumulative return",
                format::signed_percent(summary.return_cumulative_pct),
            ),
            (
                "Annualized return",
                format::signed_percent(summary.return_annualized_pct),
            ),
        ]));
    }
}

#[async_trait]
impl Page for PaperTradingPage {
    fn title(&self) -> &'static str {
        "Paper Trading"
    }

    fn refresh(&mut self) {
        if !self.portfolio.state().is_loading() {
            self.portfolio.trigger(());
        }
    }

    fn pump(&mut self) -> bool {
        let applied = self.portfolio.pump()
            | self.trade.pump()
            | self.chart.pump()
            | self.history.pump();
        self.sync() || applied
    }

    fn is_loading(&self) -> bool {
        self.portfolio.state().is_loading()
            || self.trade.state().is_loading()
            || self.chart.state().is_loading()
            || self.history.state().is_loading()
    }

    async fn changed(&mut self) {
        tokio::select! {
            _ = self.portfolio.changed() => {}
            _ = self.trade.changed() => {}
            _ = self.chart.changed() => {}
            _ = self.history.changed() => {}
        }
        self.pump();
    }

    fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(notice) = &self.notice {
            lines.push(notice.render());
        }
        match (self.portfolio.data(), self.portfolio.failure()) {
            (_, Some(err)) => {
                lines.push(PageError::from_fetch(err).render());
            }
            (Some(portfolio), None) => {
                lines.push(format!("Cash: {}", format::money(portfolio.cash)));
                lines.push(format!("Equity: {}", format::money(equity_value(portfolio))));
                lines.push(String::new());
                self.render_positions(portfolio, &mut lines);
            }
            (None, None) if self.portfolio.state().is_loading() => {
                lines.push("Loading...".to_string());
            }
            (None, None) => {}
        }

        let mut extra = Vec::new();
        self.render_chart(&mut extra);
        self.render_history(&mut extra);
        if !extra.is_empty() {
            lines.push(String::new());
            lines.extend(extra);
        }
        lines
    }
}

#[cfg(test)]
#[path = "../tests/paper_tests.rs"]
mod tests;
