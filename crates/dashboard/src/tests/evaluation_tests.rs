use serde_json::{json, Value};

use super::*;
use crate::mock_api::MockApi;

fn metrics(mape: f64) -> Value {
    json!({
        "mae": 1.25,
        "rmse": 1.5,
        "mape": mape,
        "r_squared": 0.8123,
        "directional_accuracy": 55.0
    })
}

fn evaluation_json(days: u32) -> Value {
    json!({
        "ticker": "AAPL",
        "test_period": { "start_date": "2026-07-21", "end_date": "2026-10-15", "days": days },
        "dates": ["2026-10-14", "2026-10-15"],
        "actuals": [200.0, 202.0],
        "models": {
            "linear_regression": { "predictions": [198.0, 203.0], "metrics": metrics(1.1) },
            "random_forest": { "predictions": [200.5, 202.5], "metrics": metrics(0.4) },
            "ensemble": { "predictions": [201.0, 201.5], "metrics": metrics(0.6) }
        },
        "returns": {
            "initial_capital": 10000.0,
            "final_value": 11250.0,
            "total_return": 12.5,
            "buy_hold_return": 8.25,
            "outperformance": 4.25,
            "sharpe_ratio": 1.3,
            "max_drawdown": 6.1,
            "num_trades": 14,
            "portfolio_values": [10000.0, 11250.0]
        },
        "best_model": "random_forest"
    })
}

#[test]
fn model_label_replaces_first_underscore() {
    assert_eq!(model_label("random_forest"), "RANDOM FOREST");
    assert_eq!(model_label("ensemble"), "ENSEMBLE");
    assert_eq!(model_label("gru_deep_v2"), "GRU DEEP_V2");
}

#[tokio::test]
async fn renders_summary_comparison_and_default_model() {
    let api = MockApi::new();
    api.respond("GET /evaluate/AAPL?test_days=60", evaluation_json(60));
    let mut page = ModelPerformancePage::new(api.shared());

    assert!(page.evaluate("aapl", EvaluationWindow::default()));
    assert_eq!(page.render()[0], "Running evaluation...");
    page.settled().await;

    assert_eq!(page.selected_model(), DEFAULT_MODEL);
    assert_eq!(page.window(), Some(EvaluationWindow::Days60));
    let lines = page.render();
    assert!(lines[0].starts_with("Ticker") && lines[0].ends_with("AAPL"));
    assert!(lines[1].ends_with("60 days (2026-07-21 to 2026-10-15)"));
    assert!(lines[2].ends_with("RANDOM FOREST"));
    assert!(lines[3].ends_with('3'));

    let comparison = lines
        .iter()
        .position(|l| l == "Model Comparison")
        .expect("comparison table");
    assert!(lines[comparison + 1].starts_with("Model"));
    assert!(lines[comparison + 3].starts_with("ENSEMBLE"));
    assert!(lines[comparison + 5].starts_with("RANDOM FOREST (best)"));
    assert!(lines[comparison + 5].contains("0.40%"));
    assert!(lines[comparison + 5].contains("0.8123"));

    let view = lines
        .iter()
        .position(|l| l == "Actual vs predicted: ENSEMBLE")
        .expect("model view");
    assert!(lines[view + 3].starts_with("2026-10-14") && lines[view + 3].ends_with("+$1.00"));
    assert!(lines[view + 4].starts_with("2026-10-15") && lines[view + 4].ends_with("-$0.50"));

    assert!(lines.iter().any(|l| l == "Trading Performance"));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("Total return") && l.ends_with("+12.50%")));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("vs Buy & Hold") && l.ends_with("+4.25%")));
    assert!(lines.iter().any(|l| l.starts_with("Trades") && l.ends_with("14")));
}

#[tokio::test]
async fn selecting_a_model_switches_the_view_without_a_request() {
    let api = MockApi::new();
    api.respond("GET /evaluate/AAPL?test_days=30", evaluation_json(30));
    let mut page = ModelPerformancePage::new(api.shared());

    page.evaluate("AAPL", EvaluationWindow::Days30);
    page.settled().await;

    assert!(page.select_model("Linear Regression"));
    assert_eq!(page.selected_model(), "linear_regression");
    assert!(!page.select_model("gru"));
    assert_eq!(page.selected_model(), "linear_regression");

    let lines = page.render();
    let view = lines
        .iter()
        .position(|l| l == "Actual vs predicted: LINEAR REGRESSION")
        .expect("model view");
    assert!(lines[view + 3].ends_with("-$2.00"));
    assert_eq!(api.total_calls(), 1);
}

#[tokio::test]
async fn selection_missing_from_results_falls_back_to_best_model() {
    let api = MockApi::new();
    api.respond("GET /evaluate/AAPL?test_days=20", evaluation_json(20));
    let mut page = ModelPerformancePage::new(api.shared());

    assert!(page.select_model("gru"));
    page.evaluate("AAPL", EvaluationWindow::Days20);
    page.settled().await;

    let (name, _) = page.shown_model().expect("shown model");
    assert_eq!(name, "random_forest");
    assert!(page
        .render()
        .iter()
        .any(|l| l == "Actual vs predicted: RANDOM FOREST"));
}

#[tokio::test]
async fn evaluation_without_returns_skips_trading_section() {
    let api = MockApi::new();
    let mut body = evaluation_json(90);
    body["returns"] = Value::Null;
    api.respond("GET /evaluate/AAPL?test_days=90", body);
    let mut page = ModelPerformancePage::new(api.shared());

    page.evaluate("AAPL", EvaluationWindow::Days90);
    page.settled().await;

    assert!(!page.render().iter().any(|l| l == "Trading Performance"));
}

#[tokio::test]
async fn empty_ticker_sends_nothing() {
    let api = MockApi::new();
    let mut page = ModelPerformancePage::new(api.shared());

    assert!(!page.evaluate("  ", EvaluationWindow::Days60));
    assert_eq!(page.render(), vec!["Please enter a stock ticker".to_string()]);
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn failure_names_the_ticker() {
    let api = MockApi::new();
    api.fail_http("GET /evaluate/ZZZZ?test_days=60", 500, "Evaluation failed");
    let mut page = ModelPerformancePage::new(api.shared());

    page.evaluate("zzzz", EvaluationWindow::Days60);
    page.settled().await;

    assert_eq!(
        page.render(),
        vec!["Error: Could not evaluate ZZZZ. Please check the ticker and try again.".to_string()]
    );
}
