use super::*;
use crate::mock_api::{quote_json, MockApi};

#[tokio::test]
async fn both_symbols_are_required_and_must_differ() {
    let api = MockApi::new();
    let mut page = ComparisonPage::new(api.shared());

    assert!(!page.compare("", "MSFT"));
    assert_eq!(page.render(), vec!["Error: Please enter both stock symbols".to_string()]);

    assert!(!page.compare("aapl", " AAPL "));
    assert_eq!(
        page.render(),
        vec!["Error: Please enter two different stock symbols".to_string()]
    );

    assert!(!page.compare("AAPL", "MS FT"));
    assert!(page.error().is_some());
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn fetches_both_quotes_and_builds_rows() {
    let api = MockApi::new();
    api.respond("GET /stock/AAPL", quote_json("AAPL", 100.0));
    api.respond("GET /stock/MSFT", quote_json("MSFT", 200.0));
    let mut page = ComparisonPage::new(api.shared());

    assert!(page.compare("aapl", "msft"));
    page.settled().await;

    assert_eq!(api.call_count("GET /stock/AAPL"), 1);
    assert_eq!(api.call_count("GET /stock/MSFT"), 1);
    let rows = comparison_rows(page.quotes().expect("quotes loaded"));
    assert_eq!(
        rows[0],
        vec!["Current Price", "$100.00", "$200.00", "-100.00 (-50.00%)"]
    );
    let range = rows.iter().find(|r| r[0] == "52W Range").expect("range row");
    assert_eq!(range[1], "50%");
    assert_eq!(page.render()[0], "AAPL Inc. (AAPL) vs MSFT Inc. (MSFT)");
}

#[tokio::test]
async fn failure_names_the_missing_ticker() {
    let api = MockApi::new();
    api.respond("GET /stock/AAPL", quote_json("AAPL", 100.0));
    api.fail_http("GET /stock/ZZZZ", 404, "Invalid ticker symbol 'ZZZZ'");
    let mut page = ComparisonPage::new(api.shared());

    page.compare("AAPL", "ZZZZ");
    page.settled().await;

    assert_eq!(
        page.render(),
        vec!["Error: Failed to fetch ZZZZ: Stock not found".to_string()]
    );
}

#[test]
fn range_position_needs_a_positive_span() {
    let mut quote: StockQuote = serde_json::from_value(quote_json("AAPL", 100.0)).unwrap();
    let position = range_position(&quote).expect("range");
    assert!((position - 50.0).abs() < 1e-9);
    quote.week52_high = quote.week52_low;
    assert_eq!(range_position(&quote), None);
}
