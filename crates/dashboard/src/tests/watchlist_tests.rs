use serde_json::json;

use super::*;
use crate::mock_api::{message_json, quote_json, MockApi};

fn symbols(quotes: &[StockQuote]) -> Vec<&str> {
    quotes.iter().map(|q| q.symbol.as_str()).collect()
}

#[tokio::test]
async fn tickers_without_quotes_are_filtered_out() {
    let api = MockApi::new();
    api.respond("GET /watchlist", json!(["AAPL", "ZZZZ", "MSFT"]));
    api.respond("GET /stock/AAPL", quote_json("AAPL", 190.0));
    api.fail_http("GET /stock/ZZZZ", 404, "Invalid ticker symbol 'ZZZZ'");
    api.respond("GET /stock/MSFT", quote_json("MSFT", 410.0));
    let mut page = WatchlistPage::new(api.shared());

    page.load();
    page.settled().await;

    assert_eq!(symbols(page.quotes()), vec!["AAPL", "MSFT"]);
    assert!(page.error().is_none());
    let lines = page.render();
    assert!(lines[0].starts_with("Symbol"));
    assert_eq!(lines.len(), 4);
}

#[tokio::test]
async fn empty_watchlist_renders_placeholder() {
    let api = MockApi::new();
    api.respond("GET /watchlist", json!([]));
    let mut page = WatchlistPage::new(api.shared());

    page.load();
    page.settled().await;

    assert_eq!(page.render(), vec!["Your watchlist is empty.".to_string()]);
}

#[tokio::test]
async fn list_failure_uses_backend_hint() {
    let api = MockApi::new();
    api.fail_http("GET /watchlist", 500, "database locked");
    let mut page = WatchlistPage::new(api.shared());

    page.load();
    page.settled().await;

    assert_eq!(page.render(), vec![format!("Error: {LOAD_FAILED}")]);
}

#[tokio::test]
async fn adding_refreshes_the_list() {
    let api = MockApi::new();
    api.respond("POST /watchlist/TSLA", message_json("TSLA added to watchlist"));
    api.respond("GET /watchlist", json!(["TSLA"]));
    api.respond("GET /stock/TSLA", quote_json("TSLA", 250.0));
    let mut page = WatchlistPage::new(api.shared());

    assert!(page.add(" tsla"));
    page.settled().await;

    assert_eq!(
        page.notice(),
        Some(&Notice::Success("TSLA added to watchlist".to_string()))
    );
    assert_eq!(api.call_count("GET /watchlist"), 1);
    assert_eq!(symbols(page.quotes()), vec!["TSLA"]);
    assert_eq!(page.render()[0], "OK: TSLA added to watchlist");
}

#[tokio::test]
async fn failed_remove_shows_fixed_message() {
    let api = MockApi::new();
    api.fail_http("DELETE /watchlist/AAPL", 404, "AAPL not in watchlist");
    api.respond("GET /watchlist", json!([]));
    let mut page = WatchlistPage::new(api.shared());

    page.remove("AAPL");
    page.settled().await;

    assert_eq!(page.notice(), Some(&Notice::Error(REMOVE_FAILED.to_string())));
}

#[tokio::test]
async fn invalid_ticker_is_not_sent() {
    let api = MockApi::new();
    let mut page = WatchlistPage::new(api.shared());

    assert!(!page.add("   "));

    assert!(page.notice().is_some_and(Notice::is_error));
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn poll_refresh_is_skipped_while_loading() {
    let api = MockApi::new();
    let release = api.respond_on_trigger("GET /watchlist", json!([]));
    let mut page = WatchlistPage::new(api.shared());

    page.load();
    tokio::task::yield_now().await;
    page.refresh();
    page.refresh();
    let _ = release.send(());
    page.settled().await;

    assert_eq!(api.call_count("GET /watchlist"), 1);
}
