use serde_json::{json, Value};
use shared::domain::HistoryPeriod;

use super::*;
use crate::mock_api::{message_json, MockApi};

fn portfolio_json(cash: f64) -> Value {
    json!({
        "cash": cash,
        "positions": [{
            "ticker": "AAPL",
            "shares": 10,
            "avg_cost": 150.0,
            "current_price": 190.0,
            "daily_pl": -12.5,
            "total_pl": 400.0
        }],
        "options_positions": []
    })
}

fn history_json() -> Value {
    json!({
        "dates": ["2026-01-02", "2026-10-15"],
        "values": [100000.0, 104200.0],
        "summary": {
            "period": "ytd",
            "start_date": "2026-01-02",
            "end_date": "2026-10-15",
            "end_value": 104200.0,
            "wealth_generated": 4200.0,
            "return_cumulative_pct": 4.2,
            "return_annualized_pct": 5.31
        }
    })
}

#[tokio::test]
async fn invalid_trades_are_rejected_locally() {
    let api = MockApi::new();
    let mut page = PaperTradingPage::new(api.shared());

    for (ticker, shares) in [("", "5"), ("AAPL", "0"), ("AAPL", "-3"), ("AAPL", "2.5"), ("AAPL", "ten")] {
        assert!(!page.trade(TradeSide::Buy, ticker, shares));
        assert_eq!(page.notice(), Some(&Notice::Error(INVALID_TRADE.to_string())));
    }
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn portfolio_renders_cash_equity_and_positions() {
    let api = MockApi::new();
    api.respond("GET /paper/portfolio", portfolio_json(10_000.0));
    let mut page = PaperTradingPage::new(api.shared());

    page.load();
    page.settled().await;

    let lines = page.render();
    assert_eq!(lines[0], "Cash: $10,000.00");
    assert_eq!(lines[1], "Equity: $11,900.00");
    assert!(lines.iter().any(|l| l.contains("Total P/L")));
    assert!(lines.iter().any(|l| l.starts_with("AAPL") && l.ends_with("+$400.00")));

    page.set_pl_view(PlView::Daily);
    let lines = page.render();
    assert!(lines.iter().any(|l| l.contains("Daily P/L")));
    assert!(lines.iter().any(|l| l.starts_with("AAPL") && l.ends_with("-$12.50")));
}

#[tokio::test]
async fn buying_posts_the_order_and_refreshes() {
    let api = MockApi::new();
    api.respond("GET /paper/portfolio", portfolio_json(10_000.0));
    api.respond("GET /paper/history?period=ytd", history_json());
    api.respond("POST /paper/buy", message_json("Bought 5 shares of AAPL"));
    api.respond("GET /paper/portfolio", portfolio_json(9_050.0));
    api.respond("GET /paper/history?period=ytd", history_json());
    let mut page = PaperTradingPage::new(api.shared());

    page.load();
    page.load_history(HistoryPeriod::Ytd);
    page.settled().await;

    assert!(page.trade(TradeSide::Buy, "aapl", " 5 "));
    page.settled().await;

    let order = api
        .calls()
        .into_iter()
        .find(|call| call.key == "POST /paper/buy")
        .and_then(|call| call.body)
        .expect("order body");
    assert_eq!(order, json!({ "ticker": "AAPL", "shares": 5 }));
    assert_eq!(
        page.notice(),
        Some(&Notice::Success("Bought 5 shares of AAPL".to_string()))
    );
    assert_eq!(api.call_count("GET /paper/portfolio"), 2);
    assert_eq!(api.call_count("GET /paper/history?period=ytd"), 2);
    assert_eq!(page.portfolio().map(|p| p.cash), Some(9_050.0));
}

#[tokio::test]
async fn rejected_sell_surfaces_server_message() {
    let api = MockApi::new();
    api.fail_http("POST /paper/sell", 400, "Not enough shares to sell");
    api.respond("GET /paper/portfolio", portfolio_json(10_000.0));
    let mut page = PaperTradingPage::new(api.shared());

    page.trade(TradeSide::Sell, "AAPL", "500");
    page.settled().await;

    assert_eq!(
        page.notice(),
        Some(&Notice::Error("Not enough shares to sell".to_string()))
    );
    assert_eq!(page.render()[0], "Error: Not enough shares to sell");
}

#[tokio::test]
async fn position_chart_is_summarized() {
    let api = MockApi::new();
    api.respond(
        "GET /chart/AAPL?period=6mo",
        json!([
            { "date": "2026-04-15 00:00:00", "open": 170.0, "high": 175.0, "low": 168.0, "close": 172.0 },
            { "date": "2026-07-15 00:00:00", "open": 180.0, "high": 201.0, "low": 179.0, "close": 199.0 },
            { "date": "2026-10-15 00:00:00", "open": 190.0, "high": 193.0, "low": 187.0, "close": 189.2 }
        ]),
    );
    let mut page = PaperTradingPage::new(api.shared());

    assert!(page.select_position("aapl"));
    page.settled().await;

    let summary = page.chart_summary().expect("summary");
    assert_eq!(summary.points, 3);
    assert_eq!(summary.high, 201.0);
    assert_eq!(summary.low, 168.0);
    assert!((summary.change_percent().expect("change") - 10.0).abs() < 1e-9);
    assert_eq!(summary.first_date, "2026-04-15");
    assert_eq!(summary.last_date, "2026-10-15");
    assert!(page
        .render()
        .iter()
        .any(|l| l.starts_with("AAPL 6mo: $172.00 -> $189.20 (+10.00%)")));
}

#[test]
fn chart_summary_orders_bars_by_timestamp() {
    let bar = |date: &str, close: f64| ChartPoint {
        date: date.to_string(),
        open: close,
        high: close,
        low: close,
        close,
        volume: 0.0,
    };
    let points = vec![
        bar("2026-10-15 00:00:00", 189.2),
        bar("2026-04-15 00:00:00", 172.0),
        bar("2026-07-15 00:00:00", 199.0),
    ];

    let summary = summarize_chart(&points).expect("summary");

    assert_eq!(summary.first_close, 172.0);
    assert_eq!(summary.last_close, 189.2);
    assert_eq!(summary.first_date, "2026-04-15");
    assert_eq!(summary.last_date, "2026-10-15");
}

#[test]
fn empty_chart_has_no_summary() {
    assert_eq!(summarize_chart(&[]), None);
}
