use serde_json::json;

use super::*;
use crate::mock_api::MockApi;

#[test]
fn percentage_error_is_relative_to_actual() {
    let error = percentage_error(105.0, 100.0).expect("defined");
    assert!((error - 5.0).abs() < 1e-9);
    let error = percentage_error(95.0, 100.0).expect("defined");
    assert!((error - 5.0).abs() < 1e-9);
    assert_eq!(percentage_error(10.0, 0.0), None);
    assert_eq!(percentage_error(f64::NAN, 10.0), None);
}

#[tokio::test]
async fn renders_prediction_table() {
    let api = MockApi::new();
    api.respond(
        "GET /predict/AAPL",
        json!({
            "symbol": "AAPL",
            "companyName": "Apple Inc.",
            "recentDate": "2026-10-15",
            "recentClose": 200.0,
            "recentPredicted": 210.0,
            "predictions": [
                { "date": "2026-10-16", "predictedClose": 211.5 },
                { "date": "2026-10-17", "predictedClose": 212.25 }
            ]
        }),
    );
    let mut page = PredictionsPage::new(api.shared());

    assert!(page.predict("aapl"));
    assert_eq!(page.render(), vec!["Running prediction model...".to_string()]);
    page.settled().await;

    let lines = page.render();
    assert_eq!(lines[0], "Apple Inc. (AAPL)");
    assert!(lines[1].starts_with("Recent date") && lines[1].ends_with("2026-10-15"));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("Prediction error") && l.ends_with("5.00%")));
    assert!(lines.iter().any(|l| l.starts_with("2026-10-17") && l.ends_with("$212.25")));
}

#[tokio::test]
async fn accepts_compact_payload() {
    let api = MockApi::new();
    api.respond(
        "GET /predict/TSLA",
        json!({ "ticker": "TSLA", "last_close": 250.0, "predicted_next_close": 245.0 }),
    );
    let mut page = PredictionsPage::new(api.shared());

    page.predict("TSLA");
    page.settled().await;

    let prediction = page.prediction().expect("prediction");
    assert_eq!(prediction.symbol, "TSLA");
    assert!(prediction.predictions.is_empty());
    assert_eq!(prediction.recent_date, None);
    let lines = page.render();
    assert_eq!(lines[0], "TSLA");
    assert!(lines[1].starts_with("Recent close"));
}

#[tokio::test]
async fn failure_names_the_ticker() {
    let api = MockApi::new();
    api.fail_http("GET /predict/ZZZZ", 404, "No data");
    let mut page = PredictionsPage::new(api.shared());

    page.predict("zzzz");
    page.settled().await;

    assert_eq!(
        page.render(),
        vec![
            "Error: Could not fetch predictions for ZZZZ. Please check the ticker and try again."
                .to_string()
        ]
    );
}

#[tokio::test]
async fn empty_input_reads_as_validation_error() {
    let api = MockApi::new();
    let mut page = PredictionsPage::new(api.shared());

    assert!(!page.predict(""));

    assert_eq!(page.error_message().as_deref(), Some("Please enter a stock ticker"));
    assert_eq!(api.total_calls(), 0);
}
