use serde_json::{json, Value};

use super::*;
use crate::mock_api::MockApi;

fn rate_json(from_key: &str, from: &str, to: &str, rate: f64) -> Value {
    json!({
        from_key: { "code": from, "name": format!("{from} name") },
        "to_currency": { "code": to, "name": format!("{to} name") },
        "exchange_rate": rate,
        "last_refreshed": "2026-10-16 09:30:00",
        "timezone": "UTC"
    })
}

fn currencies() -> Value {
    json!([
        { "code": "USD", "name": "US Dollar", "symbol": "$" },
        { "code": "EUR", "name": "Euro", "symbol": "€" }
    ])
}

#[tokio::test]
async fn forex_converts_amount_with_rate() {
    let api = MockApi::new();
    api.respond("GET /forex/currencies", currencies());
    api.respond(
        "GET /forex/convert?from=USD&to=EUR",
        rate_json("from_currency", "USD", "EUR", 0.92),
    );
    let mut page = ConverterPage::new(api.shared(), Market::Forex);

    page.load();
    assert!(page.set_amount("100"));
    page.settled().await;

    let converted = page.converted().expect("converted");
    assert!((converted - 92.0).abs() < 1e-9);
    let lines = page.render();
    assert_eq!(lines[0], "100.00 USD = 92.00 EUR");
    assert_eq!(lines[1], "1 USD = 0.9200 EUR");
    assert!(lines.iter().any(|l| l == "Currencies: USD EUR"));
    assert!(lines.iter().any(|l| l.starts_with("Popular: USD->EUR")));
}

#[tokio::test]
async fn swap_requests_the_inverse_pair() {
    let api = MockApi::new();
    api.respond(
        "GET /forex/convert?from=USD&to=EUR",
        rate_json("from_currency", "USD", "EUR", 0.92),
    );
    api.respond(
        "GET /forex/convert?from=EUR&to=USD",
        rate_json("from_currency", "EUR", "USD", 1.087),
    );
    let mut page = ConverterPage::new(api.shared(), Market::Forex);

    page.convert();
    page.settled().await;
    page.swap();
    page.settled().await;

    assert_eq!(page.pair(), ("EUR", "USD"));
    assert_eq!(page.rate().map(|r| r.exchange_rate), Some(1.087));
    assert_eq!(api.call_count("GET /forex/convert?from=EUR&to=USD"), 1);
}

#[tokio::test]
async fn invalid_amount_is_reported() {
    let api = MockApi::new();
    let mut page = ConverterPage::new(api.shared(), Market::Forex);

    for raw in ["", "abc", "-5", "NaN"] {
        assert!(!page.set_amount(raw));
        assert_eq!(page.render()[0], format!("Error: {INVALID_AMOUNT}"));
    }
    assert_eq!(page.amount(), 1.0);
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn crypto_uses_both_catalogs_and_its_own_error_text() {
    let api = MockApi::new();
    api.respond("GET /crypto/list", json!([{ "code": "BTC", "name": "Bitcoin" }]));
    api.respond("GET /crypto/currencies", currencies());
    api.respond(
        "GET /crypto/convert?from=BTC&to=USD",
        rate_json("from_crypto", "BTC", "USD", 65_000.0),
    );
    api.fail_http("GET /crypto/convert?from=ETH&to=USD", 500, "rate limit");
    let mut page = ConverterPage::new(api.shared(), Market::Crypto);

    page.load();
    page.settled().await;
    assert_eq!(page.catalog().map(|c| c.sources.len()), Some(1));
    assert_eq!(page.catalog().map(|c| c.targets.len()), Some(2));
    assert_eq!(page.render()[0], "1.00 BTC = 65000.00 USD");

    assert!(page.set_pair("eth", "usd"));
    page.convert();
    page.settled().await;
    assert_eq!(
        page.render()[0],
        "Error: Could not fetch crypto exchange rate. Please try again."
    );
}

#[test]
fn converted_amount_multiplies() {
    let rate: ExchangeRate =
        serde_json::from_value(rate_json("from_currency", "GBP", "USD", 1.25)).unwrap();
    assert_eq!(converted_amount(8.0, &rate), 10.0);
}
